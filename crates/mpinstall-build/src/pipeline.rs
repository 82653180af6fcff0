//! Sequential step runner.
//!
//! Steps run strictly in order. The first error stops the run: later steps
//! are never invoked and nothing already done is rolled back.

use serde::Serialize;
use tracing::{error, info};

use crate::error::BuildError;
use crate::step::{Step, StepContext, StepStatus};

/// Final state of one step in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum StepState {
    Done,
    Skipped(String),
    Failed(String),
}

/// Record of one step in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub name: String,
    #[serde(flatten)]
    pub state: StepState,
}

/// Outcome of [`Pipeline::run`].
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// One record per step that was invoked, in order.
    pub records: Vec<StepRecord>,
    /// Names of steps that never ran because an earlier one failed.
    pub not_run: Vec<String>,
    /// The error that stopped the run.
    pub error: Option<BuildError>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Name of the step that failed, if any.
    pub fn failed_step(&self) -> Option<&str> {
        self.records
            .iter()
            .find(|r| matches!(r.state, StepState::Failed(_)))
            .map(|r| r.name.as_str())
    }
}

/// An ordered list of steps.
#[derive(Default)]
pub struct Pipeline<'a> {
    steps: Vec<Box<dyn Step + 'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn push(&mut self, step: impl Step + 'a) {
        self.steps.push(Box::new(step));
    }

    pub fn with(mut self, step: impl Step + 'a) -> Self {
        self.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step in order, stopping at the first failure.
    pub fn run(&self, ctx: &StepContext<'_>) -> PipelineReport {
        let mut report = PipelineReport::default();
        let total = self.steps.len();

        for (i, step) in self.steps.iter().enumerate() {
            let name = step.name().to_string();
            info!(step = %name, "[{}/{}] {}", i + 1, total, name);

            match step.run(ctx) {
                Ok(StepStatus::Done) => report.records.push(StepRecord {
                    name,
                    state: StepState::Done,
                }),
                Ok(StepStatus::Skipped(reason)) => {
                    info!(step = %name, %reason, "skipped");
                    report.records.push(StepRecord {
                        name,
                        state: StepState::Skipped(reason),
                    });
                }
                Err(e) => {
                    error!(step = %name, error = %e, "step failed");
                    report.records.push(StepRecord {
                        name,
                        state: StepState::Failed(e.to_string()),
                    });
                    report.not_run = self.steps[i + 1..]
                        .iter()
                        .map(|s| s.name().to_string())
                        .collect();
                    report.error = Some(e);
                    break;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, CommandRunner, CommandSpec};
    use crate::error::Result;
    use mpinstall_net::http::Fetcher;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io::Write;

    struct Offline;

    impl Fetcher for Offline {
        fn get_text(&self, _url: &str) -> mpinstall_net::error::Result<String> {
            unreachable!()
        }
        fn content_length(&self, _url: &str) -> mpinstall_net::error::Result<Option<u64>> {
            unreachable!()
        }
        fn download(&self, _url: &str, _dest: &mut dyn Write) -> mpinstall_net::error::Result<u64> {
            unreachable!()
        }
    }

    struct NoCommands;

    impl CommandRunner for NoCommands {
        fn run(&self, _spec: &CommandSpec) -> Result<CommandOutput> {
            unreachable!()
        }
    }

    /// Records its invocation in a shared log; optionally fails.
    struct Instrumented<'l> {
        name: &'static str,
        fail: bool,
        log: &'l RefCell<Vec<&'static str>>,
    }

    impl Step for Instrumented<'_> {
        fn name(&self) -> &str {
            self.name
        }

        fn run(&self, _ctx: &StepContext<'_>) -> Result<StepStatus> {
            self.log.borrow_mut().push(self.name);
            if self.fail {
                return Err(BuildError::ProcessFailure {
                    command: self.name.to_string(),
                    code: Some(1),
                });
            }
            Ok(StepStatus::Done)
        }
    }

    const NAMES: [&str; 5] = ["fetch", "extract", "configure", "build", "install"];

    fn pipeline<'l>(fail_at: Option<usize>, log: &'l RefCell<Vec<&'static str>>) -> Pipeline<'l> {
        let mut p = Pipeline::new();
        for (i, name) in NAMES.iter().enumerate() {
            p.push(Instrumented {
                name: *name,
                fail: fail_at == Some(i),
                log,
            });
        }
        p
    }

    fn ctx() -> (Offline, NoCommands) {
        (Offline, NoCommands)
    }

    #[test]
    fn all_steps_run_in_order() {
        let log = RefCell::new(Vec::new());
        let (f, r) = ctx();
        let report = pipeline(None, &log).run(&StepContext {
            fetcher: &f,
            runner: &r,
        });
        assert!(report.is_success());
        assert_eq!(*log.borrow(), NAMES.to_vec());
        assert_eq!(report.records.len(), 5);
        assert!(report.not_run.is_empty());
    }

    #[test]
    fn failure_at_each_position_halts_the_run() {
        for n in 0..NAMES.len() {
            let log = RefCell::new(Vec::new());
            let (f, r) = ctx();
            let report = pipeline(Some(n), &log).run(&StepContext {
                fetcher: &f,
                runner: &r,
            });

            assert!(!report.is_success());
            assert!(report.error.as_ref().unwrap().is_process_failure());
            // Steps after the failing one were never invoked.
            assert_eq!(*log.borrow(), NAMES[..=n].to_vec());
            assert_eq!(report.failed_step(), Some(NAMES[n]));
            assert_eq!(
                report.not_run,
                NAMES[n + 1..].iter().map(|s| s.to_string()).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn empty_pipeline_succeeds() {
        let (f, r) = ctx();
        let report = Pipeline::new().run(&StepContext {
            fetcher: &f,
            runner: &r,
        });
        assert!(report.is_success());
        assert!(report.records.is_empty());
        assert_eq!(report.failed_step(), None);
    }
}
