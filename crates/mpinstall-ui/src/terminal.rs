//! Terminal detection.

use std::env;

/// Returns `true` if stdout is connected to a terminal.
pub fn is_tty() -> bool {
    crossterm::tty::IsTty::is_tty(&std::io::stdout())
}

/// Returns `true` if stderr is connected to a terminal.
///
/// Log output goes to stderr, so this decides whether log lines get ANSI
/// escapes.
pub fn is_stderr_tty() -> bool {
    crossterm::tty::IsTty::is_tty(&std::io::stderr())
}

/// Determines if ANSI color codes should be used on stdout.
///
/// Respects standard conventions:
/// - `NO_COLOR` (any value): disables color (<https://no-color.org/>)
/// - `CLICOLOR=0`: disables color
/// - `TERM=dumb`: disables color
/// - `CLICOLOR_FORCE` (any value): forces color even in non-TTY
/// - Falls back to TTY detection
pub fn supports_color() -> bool {
    color_from_env(|key| env::var(key).ok()).unwrap_or_else(is_tty)
}

/// Applies the environment conventions; `None` means "ask the terminal".
fn color_from_env(var: impl Fn(&str) -> Option<String>) -> Option<bool> {
    if var("NO_COLOR").is_some() {
        return Some(false);
    }
    if var("CLICOLOR").as_deref() == Some("0") {
        return Some(false);
    }
    if var("TERM").as_deref() == Some("dumb") {
        return Some(false);
    }
    if var("CLICOLOR_FORCE").is_some() {
        return Some(true);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn no_color_wins_over_force() {
        let var = env_of(&[("NO_COLOR", ""), ("CLICOLOR_FORCE", "1")]);
        assert_eq!(color_from_env(var), Some(false));
    }

    #[test]
    fn dumb_terminal_disables_color() {
        assert_eq!(color_from_env(env_of(&[("TERM", "dumb")])), Some(false));
        assert_eq!(color_from_env(env_of(&[("CLICOLOR", "0")])), Some(false));
    }

    #[test]
    fn force_enables_color() {
        assert_eq!(color_from_env(env_of(&[("CLICOLOR_FORCE", "1")])), Some(true));
        assert_eq!(color_from_env(env_of(&[])), None);
    }
}
