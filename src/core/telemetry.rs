#[cfg(feature = "telemetry")]
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A single entry in the execution trace: one unit run once.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "telemetry", derive(Serialize, Deserialize))]
pub struct TraceEntry {
    pub timestamp: u64,
    pub workflow_id: String,
    pub unit_index: usize,
    pub unit_name: String,
    pub input_count: usize,
    pub output_count: usize,
    pub elapsed_micros: u64,
}

impl TraceEntry {
    pub(crate) fn now_secs() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "timestamp": self.timestamp,
            "workflow_id": self.workflow_id,
            "unit_index": self.unit_index,
            "unit_name": self.unit_name,
            "input_count": self.input_count,
            "output_count": self.output_count,
            "elapsed_micros": self.elapsed_micros,
        })
    }
}

/// Trait for recording execution traces.
pub trait Telemetry: Send + Sync {
    fn record(&self, entry: TraceEntry);
    fn flush(&self);
}

/// Simple in-memory collector for traces.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    traces: Mutex<Vec<TraceEntry>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_traces(&self) -> Vec<TraceEntry> {
        match self.traces.lock() {
            Ok(traces) => traces.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Exports collected traces as a JSON array.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.get_traces().iter().map(TraceEntry::to_json).collect())
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, entry: TraceEntry) {
        match self.traces.lock() {
            Ok(mut traces) => traces.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    fn flush(&self) {
        // No-op for memory collector
    }
}
