//! One-shot TCP reachability probe.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use mpinstall_core::transport::ProbeOutcome;
use tracing::debug;

/// Decides whether a TCP port on a remote host accepts connections.
pub trait PortProbe {
    fn probe(&self, host: &str, port: u16, timeout: Duration) -> ProbeOutcome;
}

/// Probes with a real `connect_timeout` against every resolved address.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProbe;

impl PortProbe for TcpProbe {
    fn probe(&self, host: &str, port: u16, timeout: Duration) -> ProbeOutcome {
        let addrs = match (host, port).to_socket_addrs() {
            Ok(addrs) => addrs.collect::<Vec<_>>(),
            Err(e) => {
                debug!(host, error = %e, "could not resolve probe host");
                return ProbeOutcome::Unresolved;
            }
        };
        if addrs.is_empty() {
            return ProbeOutcome::Unresolved;
        }

        let mut outcome = ProbeOutcome::Refused;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(_) => {
                    debug!(%addr, "probe connected");
                    return ProbeOutcome::Reachable;
                }
                Err(e) if is_timeout(&e) => {
                    debug!(%addr, "probe timed out");
                    outcome = ProbeOutcome::TimedOut;
                }
                Err(e) => {
                    debug!(%addr, error = %e, "probe failed");
                }
            }
        }
        outcome
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

/// A probe that always reports the same outcome.
///
/// Used when the caller already knows the answer, and by tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub ProbeOutcome);

impl PortProbe for FixedProbe {
    fn probe(&self, _host: &str, _port: u16, _timeout: Duration) -> ProbeOutcome {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn listening_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert_eq!(
            TcpProbe.probe("127.0.0.1", port, TIMEOUT),
            ProbeOutcome::Reachable
        );
    }

    #[test]
    fn closed_port_is_not_reachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let outcome = TcpProbe.probe("127.0.0.1", port, TIMEOUT);
        assert!(!outcome.is_reachable(), "unexpected outcome {outcome}");
    }

    #[test]
    fn fixed_probe_repeats_itself() {
        let probe = FixedProbe(ProbeOutcome::TimedOut);
        assert_eq!(probe.probe("any", 873, TIMEOUT), ProbeOutcome::TimedOut);
        assert_eq!(probe.probe("any", 873, TIMEOUT), ProbeOutcome::TimedOut);
    }
}
