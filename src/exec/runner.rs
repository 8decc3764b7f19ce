// src/exec/runner.rs

//! Command runner abstraction.
//!
//! Execution units never spawn processes directly; they go through a
//! [`CommandRunner`] so tests can record the exact `scp`/`ssh`/solver
//! invocations without touching the system.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Boxed future returned by [`CommandRunner::run`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<i32>> + Send + 'a>>;

/// Runs a program to completion and reports its exit code.
///
/// `Err` means the program could not be started or waited on at all; a
/// program that ran and failed is `Ok(code)` with a non-zero code. A
/// process killed by a signal reports `-1`.
pub trait CommandRunner: Send + Sync + Debug {
    fn run<'a>(&'a self, program: &'a str, args: &'a [String]) -> RunFuture<'a>;
}

/// Production runner backed by `tokio::process`.
///
/// Child output is drained line by line and logged at debug level. Children
/// are not killed when their unit is dropped, so abandoning a run leaves the
/// solver processes to finish on their own.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run<'a>(&'a self, program: &'a str, args: &'a [String]) -> RunFuture<'a> {
        Box::pin(async move {
            let mut child = Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(false)
                .spawn()
                .with_context(|| format!("spawning `{}`", program))?;

            let mut drains = Vec::new();
            if let Some(stdout) = child.stdout.take() {
                let program = program.to_string();
                drains.push(tokio::spawn(async move {
                    let mut lines = BufReader::new(stdout).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!(program = %program, "stdout: {}", line);
                    }
                }));
            }
            if let Some(stderr) = child.stderr.take() {
                let program = program.to_string();
                drains.push(tokio::spawn(async move {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!(program = %program, "stderr: {}", line);
                    }
                }));
            }

            let status = child
                .wait()
                .await
                .with_context(|| format!("waiting for `{}`", program))?;

            for drain in drains {
                let _ = drain.await;
            }

            Ok(status.code().unwrap_or(-1))
        })
    }
}

/// Expand a leading `~/` using `$HOME`. Anything else is returned as is.
pub fn expand_home(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => match std::env::var("HOME") {
            Ok(home) => format!("{}/{}", home.trim_end_matches('/'), rest),
            Err(_) => path.to_string(),
        },
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_only_touches_tilde_prefix() {
        assert_eq!(expand_home("/usr/bin/solver"), "/usr/bin/solver");
        assert_eq!(expand_home("solver"), "solver");
        let expanded = expand_home("~/programming/solver");
        if std::env::var("HOME").is_ok() {
            assert!(!expanded.starts_with('~'));
            assert!(expanded.ends_with("/programming/solver"));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_reports_exit_codes() {
        let runner = ProcessRunner;
        let ok = runner.run("sh", &["-c".into(), "echo hi".into()]).await.unwrap();
        assert_eq!(ok, 0);

        let failed = runner.run("sh", &["-c".into(), "exit 3".into()]).await.unwrap();
        assert_eq!(failed, 3);

        assert!(runner.run("/definitely/not/a/program", &[]).await.is_err());
    }
}
