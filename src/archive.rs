//! Storage interface for finished runs.

use std::collections::BTreeMap;

use crate::result::OptimizationResult;

/// Keyed store of results. The key is [`OptimizationResult::label`].
pub trait ResultArchive {
    /// Stores `result`, returning the one it replaces.
    fn store(&mut self, result: OptimizationResult) -> Option<OptimizationResult>;

    fn load(&self, label: &str) -> Option<OptimizationResult>;

    /// Stored labels in ascending order.
    fn list(&self) -> Vec<String>;

    fn remove(&mut self, label: &str) -> Option<OptimizationResult>;
}

/// In-process archive.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    results: BTreeMap<String, OptimizationResult>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl ResultArchive for MemoryArchive {
    fn store(&mut self, result: OptimizationResult) -> Option<OptimizationResult> {
        self.results.insert(result.label().to_string(), result)
    }

    fn load(&self, label: &str) -> Option<OptimizationResult> {
        self.results.get(label).cloned()
    }

    fn list(&self) -> Vec<String> {
        self.results.keys().cloned().collect()
    }

    fn remove(&mut self, label: &str) -> Option<OptimizationResult> {
        self.results.remove(label)
    }
}
