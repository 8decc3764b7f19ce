use std::str::FromStr;
use serde::Deserialize;

/// What the binary does with units still running when the control loop
/// stops.
///
/// - `Drain`: wait for every outstanding unit to exit and log its completion
///   (default).
/// - `Abandon`: exit immediately. Spawned solver processes keep running on
///   their own; remote units lose their pull step, so those cells are picked
///   up again on the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnExit {
    #[default]
    Drain,
    Abandon,
}

impl FromStr for OnExit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drain" => Ok(OnExit::Drain),
            "abandon" => Ok(OnExit::Abandon),
            other => Err(format!(
                "invalid on_exit: {other} (expected \"drain\" or \"abandon\")"
            )),
        }
    }
}

/// What the control loop does with a cell whose unit failed.
///
/// - `Skip`: leave it; the next run re-admits it because its marker is
///   still missing. Every cell is dispatched at most once per run (default).
/// - `Requeue`: put it back into the pending set at its original position,
///   up to `max_attempts` dispatches per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Skip,
    Requeue,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(FailurePolicy::Skip),
            "requeue" => Ok(FailurePolicy::Requeue),
            other => Err(format!(
                "invalid on_failure: {other} (expected \"skip\" or \"requeue\")"
            )),
        }
    }
}
