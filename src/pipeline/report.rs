//! Reporting collaborators.
//!
//! A stage hands one [`TraceEntry`] per evaluation to the injected [`Reporter`].
//! Reporters only observe: `record` returns nothing and cannot alter a decision.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::utils::types::Signal;

/// Human-readable trace of one stage's result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub stage: String,
    pub signal: Option<Signal>,
    pub confidence: Option<f64>,
    pub detail: serde_json::Value,
}

impl TraceEntry {
    pub fn new(
        stage: &str, signal: Option<Signal>, confidence: Option<f64>, detail: serde_json::Value,
    ) -> Self {
        Self { stage: stage.to_string(), signal, confidence, detail }
    }
}

/// Sink for stage traces.
pub trait Reporter: Send + Sync {
    fn record(&self, entry: &TraceEntry);
}

/// Which reporter the CLI wires in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReporterKind {
    Console,
    #[default]
    Log,
    None,
}

impl ReporterKind {
    pub fn build(self) -> Box<dyn Reporter> {
        match self {
            | ReporterKind::Console => Box::new(ConsoleReporter),
            | ReporterKind::Log => Box::new(LogReporter),
            | ReporterKind::None => Box::new(NullReporter),
        }
    }
}

/// Discards every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn record(&self, _entry: &TraceEntry) {}
}

/// Emits one structured `tracing` event per stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn record(&self, entry: &TraceEntry) {
        tracing::info!(
            target: "hedgefund::report",
            stage = %entry.stage,
            signal = ?entry.signal,
            confidence = ?entry.confidence,
            detail = %entry.detail,
            "stage completed"
        );
    }
}

/// Prints a banner and the pretty-printed trace to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Render an entry the way it is printed, without the trailing rule.
    pub fn render(entry: &TraceEntry) -> String {
        let mut body = serde_json::Map::new();
        if let Some(signal) = entry.signal {
            body.insert("signal".into(), serde_json::Value::String(signal.to_string()));
        }
        if let Some(confidence) = entry.confidence {
            body.insert(
                "confidence".into(),
                serde_json::Value::String(format!("{:.0}%", confidence * 100.0)),
            );
        }
        body.insert("reasoning".into(), entry.detail.clone());
        let json = serde_json::to_string_pretty(&serde_json::Value::Object(body))
            .unwrap_or_else(|_| entry.detail.to_string());
        format!("==========    {}    ==========\n{}", entry.stage, json)
    }
}

impl Reporter for ConsoleReporter {
    fn record(&self, entry: &TraceEntry) {
        let rendered = Self::render(entry);
        let (banner, body) = rendered.split_once('\n').unwrap_or((rendered.as_str(), ""));
        let banner = match entry.signal {
            | Some(Signal::Bullish) => banner.green().bold(),
            | Some(Signal::Bearish) => banner.red().bold(),
            | _ => banner.cyan().bold(),
        };
        println!("\n{}\n{}", banner, body);
        println!("================================================\n");
    }
}

/// Keeps entries in memory, for JSON output and tests.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<TraceEntry>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn stages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.stage).collect()
    }
}

impl Reporter for MemoryReporter {
    fn record(&self, entry: &TraceEntry) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).push(entry.clone());
    }
}
