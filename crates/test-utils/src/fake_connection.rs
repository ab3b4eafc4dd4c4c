use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use dagrun::errors::{DagrunError, Result};
use dagrun::exec::{Connection, ConnectionConfig};

/// Shared log of what a `FakeConnection` was asked to do.
pub type CallLog = Arc<Mutex<Vec<FakeCall>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Setup(ConnectionConfig),
    Execute(String),
    Commit,
    Rollback,
}

/// A fake connection that:
/// - records every call into a shared log
/// - fails `execute` for queries listed in `failing`
pub struct FakeConnection {
    calls: CallLog,
    failing: HashSet<String>,
}

impl FakeConnection {
    pub fn new(calls: CallLog) -> Self {
        Self {
            calls,
            failing: HashSet::new(),
        }
    }

    /// Make `execute(query)` fail for this exact query text.
    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    fn record(&self, call: FakeCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Connection for FakeConnection {
    fn setup(&mut self, config: &ConnectionConfig) -> Result<()> {
        self.record(FakeCall::Setup(config.clone()));
        Ok(())
    }

    fn execute(&mut self, query: &str) -> Result<()> {
        self.record(FakeCall::Execute(query.to_string()));
        if self.failing.contains(query) {
            return Err(DagrunError::Other(anyhow::anyhow!(
                "scripted failure for '{query}'"
            )));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.record(FakeCall::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.record(FakeCall::Rollback);
        Ok(())
    }
}

/// Queries passed to `execute`, in call order.
pub fn executed_queries(calls: &CallLog) -> Vec<String> {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter_map(|c| match c {
            FakeCall::Execute(q) => Some(q.clone()),
            _ => None,
        })
        .collect()
}
