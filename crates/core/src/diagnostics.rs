//! Out-of-band error detail surface.
//!
//! Server rejections, transport failures and platform-switch errors are reported here with
//! their raw payloads, so the transcript itself only carries the short user-facing text.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub report_id: String,
    pub title: String,
    pub message: String,
    pub raw_details: Option<Value>,
    pub occurred_at: DateTime<Utc>,
}

impl DiagnosticReport {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            report_id: Uuid::new_v4().to_string(),
            title: title.into(),
            message: message.into(),
            raw_details: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_raw_details(mut self, raw_details: Value) -> Self {
        self.raw_details = Some(raw_details);
        self
    }

    pub fn pretty_details(&self) -> Option<String> {
        self.raw_details.as_ref().map(|details| {
            serde_json::to_string_pretty(details).unwrap_or_else(|_| details.to_string())
        })
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, report: DiagnosticReport);
}

/// Keeps every report plus the one currently shown, until it is dismissed.
#[derive(Clone, Default)]
pub struct InMemoryDiagnosticSink {
    state: Arc<Mutex<SinkState>>,
}

#[derive(Default)]
struct SinkState {
    reports: Vec<DiagnosticReport>,
    showing: Option<usize>,
}

impl InMemoryDiagnosticSink {
    pub fn reports(&self) -> Vec<DiagnosticReport> {
        self.with_state(|state| state.reports.clone())
    }

    pub fn current(&self) -> Option<DiagnosticReport> {
        self.with_state(|state| state.showing.and_then(|index| state.reports.get(index).cloned()))
    }

    pub fn dismiss(&self) {
        self.with_state(|state| state.showing = None);
    }

    fn with_state<T>(&self, apply: impl FnOnce(&mut SinkState) -> T) -> T {
        match self.state.lock() {
            Ok(mut state) => apply(&mut state),
            Err(poisoned) => apply(&mut poisoned.into_inner()),
        }
    }
}

impl DiagnosticSink for InMemoryDiagnosticSink {
    fn emit(&self, report: DiagnosticReport) {
        self.with_state(|state| {
            state.reports.push(report);
            state.showing = Some(state.reports.len() - 1);
        });
    }
}
