//! User-visible messages
//!
//! Everything the adapter wants the engineer to see goes through an
//! [`OutputSink`]: console/stderr lines for the debug console, and short
//! information messages that front-ends usually show as a notification.

use std::fmt;

use log::{error, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputCategory {
    Console,
    Stderr,
}

impl fmt::Display for OutputCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputCategory::Console => f.write_str("console"),
            OutputCategory::Stderr => f.write_str("stderr"),
        }
    }
}

pub trait OutputSink: Send + Sync {
    fn output(&self, category: OutputCategory, text: &str);

    fn information(&self, text: &str);

    fn console(&self, text: &str) {
        self.output(OutputCategory::Console, text);
    }

    fn stderr(&self, text: &str) {
        self.output(OutputCategory::Stderr, text);
    }
}

/// Forwards everything to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOutput;

impl OutputSink for LogOutput {
    fn output(&self, category: OutputCategory, text: &str) {
        match category {
            OutputCategory::Console => info!(target: "osdbg::console", "{text}"),
            OutputCategory::Stderr => error!(target: "osdbg::console", "{text}"),
        }
    }

    fn information(&self, text: &str) {
        info!(target: "osdbg::notify", "{text}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMessage {
    Output { category: OutputCategory, text: String },
    Information(String),
}

impl OutputMessage {
    pub fn text(&self) -> &str {
        match self {
            OutputMessage::Output { text, .. } => text,
            OutputMessage::Information(text) => text,
        }
    }
}

/// Keeps every message in memory, in arrival order.
#[derive(Debug, Default)]
pub struct BufferedOutput {
    messages: Mutex<Vec<OutputMessage>>,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<OutputMessage> {
        self.messages.lock().clone()
    }

    pub fn take(&self) -> Vec<OutputMessage> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn stderr_lines(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                OutputMessage::Output {
                    category: OutputCategory::Stderr,
                    text,
                } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|m| m.text().contains(needle))
    }
}

impl OutputSink for BufferedOutput {
    fn output(&self, category: OutputCategory, text: &str) {
        self.messages.lock().push(OutputMessage::Output {
            category,
            text: text.to_string(),
        });
    }

    fn information(&self, text: &str) {
        self.messages
            .lock()
            .push(OutputMessage::Information(text.to_string()));
    }
}
