// src/engine/stop.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::fs::FileSystem;

/// Operator request to stop dispatching.
///
/// Set by the existence of a sentinel file, or programmatically (Ctrl-C)
/// through [`StopSignal::trigger`]. Once seen, the control loop issues no
/// further dispatches. Running units are not touched.
#[derive(Debug, Clone)]
pub struct StopSignal {
    fs: Arc<dyn FileSystem>,
    sentinel: PathBuf,
    triggered: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new(fs: Arc<dyn FileSystem>, sentinel: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            sentinel: sentinel.into(),
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sentinel(&self) -> &PathBuf {
        &self.sentinel
    }

    /// Request a stop without touching the filesystem. Visible to every
    /// clone of this signal.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.triggered.load(Ordering::SeqCst) || self.fs.exists(&self.sentinel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn sentinel_file_or_trigger_sets_signal() {
        let fs = MockFileSystem::new();
        let stop = StopSignal::new(Arc::new(fs.clone()), "distributed/stop");
        assert!(!stop.is_set());

        fs.add_file("distributed/stop", Vec::new());
        assert!(stop.is_set());

        fs.remove("distributed/stop");
        assert!(!stop.is_set());

        let clone = stop.clone();
        clone.trigger();
        assert!(stop.is_set());
    }
}
