//! In-memory store of finished runs, so reports and downloads can be fetched
//! after the upload request returns.

use crate::pipeline::RunReport;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

/// How many runs are kept before the oldest is dropped.
pub const DEFAULT_CAPACITY: usize = 32;

#[derive(Debug, Default)]
struct Inner {
    runs: HashMap<String, RunReport>,
    order: VecDeque<String>,
}

/// Bounded, insertion-ordered run store. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct RunStore {
    inner: Arc<RwLock<Inner>>,
    capacity: usize,
}

impl Default for RunStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::default(),
            capacity: capacity.max(1),
        }
    }

    /// Store a run, evicting the oldest ones beyond capacity.
    pub fn insert(&self, report: RunReport) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let id = report.id.clone();
        if inner.runs.insert(id.clone(), report).is_none() {
            inner.order.push_back(id);
        }

        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.runs.remove(&oldest);
                tracing::debug!("RunStore: evicted '{}'", oldest);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<RunReport> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.runs.get(id).cloned()
    }

    /// Apply `f` to a stored run without cloning it.
    pub fn with<R>(&self, id: &str, f: impl FnOnce(&RunReport) -> R) -> Option<R> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.runs.get(id).map(f)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
