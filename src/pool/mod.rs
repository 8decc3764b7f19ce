// src/pool/mod.rs

//! Execution targets and which of them are currently busy.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::fs::FileSystem;

/// Reserved machine identifier meaning "run on this host".
pub const LOCAL_MACHINE: &str = "here";

/// An execution target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Machine {
    Local,
    Remote(String),
}

impl Machine {
    pub fn parse(id: &str) -> Self {
        let id = id.trim();
        if id == LOCAL_MACHINE {
            Machine::Local
        } else {
            Machine::Remote(id.to_string())
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Machine::Local => LOCAL_MACHINE,
            Machine::Remote(host) => host,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Machine::Local)
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Where the list of allowed machines comes from.
///
/// Implementations are queried on every pool lookup so operators can edit
/// the list while a run is in progress.
pub trait MachineSource: Send + Sync + fmt::Debug {
    fn allowed_machines(&self) -> Result<Vec<Machine>>;
}

/// Machine list stored as a text file, one identifier per line.
///
/// Blank lines and lines starting with `#` are ignored; repeated
/// identifiers keep their first position.
#[derive(Debug, Clone)]
pub struct MachineListFile {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl MachineListFile {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }
}

impl MachineSource for MachineListFile {
    fn allowed_machines(&self) -> Result<Vec<Machine>> {
        let contents = self.fs.read_to_string(&self.path)?;
        Ok(parse_machine_list(&contents))
    }
}

pub fn parse_machine_list(contents: &str) -> Vec<Machine> {
    let mut out: Vec<Machine> = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let machine = Machine::parse(line);
        if !out.contains(&machine) {
            out.push(machine);
        }
    }
    out
}

/// Allowed machines minus those currently bound to a running unit.
///
/// Only the control loop mutates the busy set.
#[derive(Debug)]
pub struct MachinePool {
    source: Box<dyn MachineSource>,
    busy: HashSet<Machine>,
}

impl MachinePool {
    pub fn new(source: Box<dyn MachineSource>) -> Self {
        Self {
            source,
            busy: HashSet::new(),
        }
    }

    /// Fresh read of the allowed list. A source that cannot be read is
    /// logged and treated as empty for this query.
    pub fn allowed_machines(&self) -> Vec<Machine> {
        match self.source.allowed_machines() {
            Ok(machines) => machines,
            Err(err) => {
                warn!(error = %err, "could not read machine list; treating it as empty");
                Vec::new()
            }
        }
    }

    /// First allowed machine, in list order, that is not busy.
    pub fn available_machine(&self) -> Option<Machine> {
        self.allowed_machines()
            .into_iter()
            .find(|m| !self.busy.contains(m))
    }

    pub fn is_busy(&self, machine: &Machine) -> bool {
        self.busy.contains(machine)
    }

    pub fn busy_count(&self) -> usize {
        self.busy.len()
    }

    /// Mark a machine busy. Returns `false` (and changes nothing) if it
    /// already is.
    pub fn mark_busy(&mut self, machine: &Machine) -> bool {
        let inserted = self.busy.insert(machine.clone());
        if !inserted {
            warn!(machine = %machine, "machine already busy; refusing double booking");
        }
        inserted
    }

    /// Drop a machine from the busy set after its unit finished.
    ///
    /// Returns whether the machine is still in the allowed list, i.e.
    /// whether it goes back into rotation.
    pub fn release(&mut self, machine: &Machine) -> bool {
        self.busy.remove(machine);
        let still_allowed = self.allowed_machines().contains(machine);
        if !still_allowed {
            debug!(machine = %machine, "machine no longer listed; retiring it");
        }
        still_allowed
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn pool_with(contents: &str) -> (MockFileSystem, MachinePool) {
        let fs = MockFileSystem::new();
        fs.add_file("machines.txt", contents);
        let source = MachineListFile::new(Arc::new(fs.clone()), "machines.txt");
        (fs, MachinePool::new(Box::new(source)))
    }

    #[test]
    fn parse_handles_local_comments_and_duplicates() {
        let machines = parse_machine_list("here\n\n# spare\n node1 \nnode2\nnode1\n");
        assert_eq!(
            machines,
            vec![
                Machine::Local,
                Machine::Remote("node1".into()),
                Machine::Remote("node2".into()),
            ]
        );
    }

    #[test]
    fn available_machine_skips_busy_in_list_order() {
        let (_fs, mut pool) = pool_with("here\nnode1\n");
        assert_eq!(pool.available_machine(), Some(Machine::Local));

        assert!(pool.mark_busy(&Machine::Local));
        assert!(!pool.mark_busy(&Machine::Local));
        assert_eq!(pool.busy_count(), 1);
        assert_eq!(pool.available_machine(), Some(Machine::Remote("node1".into())));

        pool.mark_busy(&Machine::Remote("node1".into()));
        assert_eq!(pool.available_machine(), None);

        assert!(pool.release(&Machine::Local));
        assert_eq!(pool.available_machine(), Some(Machine::Local));
    }

    #[test]
    fn list_is_reread_on_every_query() {
        let (fs, mut pool) = pool_with("node1\n");
        let node1 = Machine::Remote("node1".into());
        pool.mark_busy(&node1);
        assert_eq!(pool.available_machine(), None);

        fs.add_file("machines.txt", "node1\nnode2\n");
        assert_eq!(pool.available_machine(), Some(Machine::Remote("node2".into())));

        // node1 removed while busy: freed but no longer offered.
        fs.add_file("machines.txt", "node2\n");
        assert!(!pool.release(&node1));
        assert!(!pool.is_busy(&node1));
        assert_eq!(pool.available_machine(), Some(Machine::Remote("node2".into())));
    }

    #[test]
    fn unreadable_list_means_no_machines() {
        let (fs, pool) = pool_with("here\n");
        fs.remove(Path::new("machines.txt"));
        assert!(pool.allowed_machines().is_empty());
        assert_eq!(pool.available_machine(), None);
    }
}
