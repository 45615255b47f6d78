use serde::{Deserialize, Serialize};
use std::mem;
use std::sync::Arc;

/// A shared handle to a record. The buffer stores and hands out handles only;
/// a record is dropped when its last handle goes away.
pub type RecordHandle<R> = Arc<R>;

/// Anything that can be retained by a record buffer.
///
/// The buffer never looks inside a record. It only asks how many bytes the
/// record accounts for, and charges that against its budget.
pub trait Record: Send + Sync {
    /// Bytes attributable to holding this record: its own size plus any heap
    /// storage it owns. Must be stable for the lifetime of the record.
    fn footprint(&self) -> usize;
}

impl Record for String {
    fn footprint(&self) -> usize {
        mem::size_of::<String>() + self.capacity()
    }
}

impl Record for Vec<u8> {
    fn footprint(&self) -> usize {
        mem::size_of::<Vec<u8>>() + self.capacity()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// A log entry as produced by the logging front end.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogRecord {
    severity: Severity,
    category: String,
    message: String,
    attributes: Vec<(String, String)>,
}

impl LogRecord {
    pub fn new(severity: Severity, category: &str, message: &str) -> Self {
        LogRecord {
            severity,
            category: category.to_string(),
            message: message.to_string(),
            attributes: Vec::new(),
        }
    }

    /// Attach a key/value attribute. Must happen before the record is shared.
    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn into_handle(self) -> RecordHandle<LogRecord> {
        Arc::new(self)
    }
}

impl Record for LogRecord {
    fn footprint(&self) -> usize {
        let attributes: usize = self
            .attributes
            .iter()
            .map(|(k, v)| k.capacity() + v.capacity())
            .sum();
        mem::size_of::<LogRecord>()
            + self.category.capacity()
            + self.message.capacity()
            + self.attributes.capacity() * mem::size_of::<(String, String)>()
            + attributes
    }
}
