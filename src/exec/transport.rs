// src/exec/transport.rs

//! Remote transport: argument vectors for `ssh` and `scp`.
//!
//! Uses the system binaries rather than an SSH library; authentication is
//! whatever the operator's SSH setup provides. Only argument building lives
//! here; running them is the job of a [`CommandRunner`](super::CommandRunner).

use std::path::Path;

/// How to reach remote machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    pub ssh_program: String,
    pub scp_program: String,
    /// Extra options passed to both `ssh` and `scp` before the target.
    pub options: Vec<String>,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            scp_program: "scp".to_string(),
            options: vec!["-o".to_string(), "BatchMode=yes".to_string()],
        }
    }
}

/// A program plus its arguments, ready for a runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Shell-ish rendering for logs.
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }
}

impl Transport {
    /// Copy a local file to `host:remote`.
    pub fn push(&self, host: &str, local: &Path, remote: &Path) -> Invocation {
        let mut args = self.options.clone();
        args.push(local.display().to_string());
        args.push(remote_spec(host, remote));
        Invocation {
            program: self.scp_program.clone(),
            args,
        }
    }

    /// Copy `host:remote` to a local file.
    pub fn pull(&self, host: &str, remote: &Path, local: &Path) -> Invocation {
        let mut args = self.options.clone();
        args.push(remote_spec(host, remote));
        args.push(local.display().to_string());
        Invocation {
            program: self.scp_program.clone(),
            args,
        }
    }

    /// Run `command` on `host`. The command is handed to the remote login
    /// shell as a single argument, so `~` in it expands remotely.
    pub fn exec(&self, host: &str, command: &str) -> Invocation {
        let mut args = self.options.clone();
        args.push(host.to_string());
        args.push(command.to_string());
        Invocation {
            program: self.ssh_program.clone(),
            args,
        }
    }
}

fn remote_spec(host: &str, path: &Path) -> String {
    format!("{}:{}", host, path.display())
}
