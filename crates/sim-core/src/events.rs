//! Event Log
//!
//! Append-only JSONL logging of discrete simulation events. The sink is
//! owned by the caller and injected into the engine; the update path never
//! prints anything on its own.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

use crate::agent::{AgentId, LearningStrategy, Tier};

/// A discrete, reportable simulation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    /// The population was seeded onto the topology.
    PopulationSeeded { agents: usize, nodes: usize },
    /// An agent abandoned its strategy for a social variant.
    StrategySwitched {
        tick: u64,
        agent: AgentId,
        tier: Tier,
        from: LearningStrategy,
        to: LearningStrategy,
    },
    /// The configured run length was exhausted.
    RunTerminated { tick: u64 },
}

/// An event with its log identifier, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: String,
    #[serde(flatten)]
    pub event: SimEvent,
}

/// Sink for simulation events, writing JSONL to a file.
pub struct EventLogger {
    writer: Option<BufWriter<File>>,
    event_count: u64,
    next_event_id: u64,
}

impl EventLogger {
    /// Create a new event logger writing to the specified path.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            event_count: 0,
            next_event_id: 1,
        })
    }

    /// Create a logger that discards events (the engine default).
    pub fn null() -> Self {
        Self {
            writer: None,
            event_count: 0,
            next_event_id: 1,
        }
    }

    fn next_id(&mut self) -> String {
        let id = format!("evt_{:08}", self.next_event_id);
        self.next_event_id += 1;
        id
    }

    /// Get the number of events seen so far (counted even when discarded).
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Log an event.
    pub fn log(&mut self, event: SimEvent) -> std::io::Result<()> {
        let record = EventRecord {
            event_id: self.next_id(),
            event,
        };
        self.event_count += 1;
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(&record)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    /// Flush the buffer to disk.
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for EventLogger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("failed to flush event log: {}", e);
        }
    }
}
