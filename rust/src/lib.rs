//! # RecordBuffer - Bounded Retention Buffer for Log Records
//!
//! A thread-safe, double-ended buffer of shared record handles that never
//! holds more than a fixed number of bytes. It is the retention stage of an
//! in-process logger: recent records are kept, older ones are evicted to make
//! room, and a record too large to ever fit is quietly dropped.
//!
//! ## Features
//!
//! - **Byte Budget**: Every stored handle is charged its record's footprint plus a
//!   per-element overhead; the total never exceeds the capacity
//! - **Opposite-End Eviction**: A push at the back evicts from the front and vice versa
//! - **Pluggable Evictors**: Swap the eviction rule with an `EvictorFn`
//! - **Shared Ownership**: Records are held through `Arc` handles and never copied
//! - **Scoped Sequences**: A re-entrant lock lets one thread run several operations
//!   without other threads interleaving
//!
//! ## Basic Usage
//!
//! ```rust
//! use recordbuffer::fixedsize::FixedSizeRecordBuffer;
//! use recordbuffer::record::{LogRecord, Severity};
//!
//! let buffer = FixedSizeRecordBuffer::new(32 * 1024).unwrap();
//!
//! for i in 0..10 {
//!     let record = LogRecord::new(Severity::Info, "app", &format!("message no. {}", i));
//!     let outcome = buffer.push_back(record.into_handle());
//!     assert!(outcome.is_accepted());
//! }
//!
//! // Drain in LIFO order while holding the buffer's lock.
//! let seq = buffer.begin_sequence();
//! while !seq.is_empty() {
//!     let record = seq.back().unwrap();
//!     println!("{}", record.message());
//!     seq.pop_back().unwrap();
//! }
//! seq.end();
//! ```
//!
//! ## Eviction
//!
//! ```rust
//! use std::sync::Arc;
//! use recordbuffer::budget::ElementCost;
//! use recordbuffer::fixedsize::{self, FixedSizeRecordBuffer};
//!
//! // 3 records of 32 + 24 bytes each fill a 168 byte buffer with no extra overhead.
//! let buffer = FixedSizeRecordBuffer::with_options(
//!     168,
//!     ElementCost::new(0),
//!     fixedsize::opposite_end_evictor,
//!     0,
//! )
//! .unwrap();
//!
//! for name in ["first", "second", "third", "fourth"] {
//!     let mut s = String::with_capacity(32);
//!     s.push_str(name);
//!     let _ = buffer.push_back(Arc::new(s));
//! }
//!
//! assert_eq!(buffer.len(), 3);
//! assert_eq!(buffer.pop_front().unwrap().as_str(), "second");
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use recordbuffer::config::BufferConfig;
//! use recordbuffer::fixedsize::FixedSizeRecordBuffer;
//! use recordbuffer::record::LogRecord;
//!
//! let config = BufferConfig::from_json_str(
//!     r#"{ "capacity_bytes": 65536, "eviction": "opposite_end" }"#,
//! )
//! .unwrap();
//! let buffer: FixedSizeRecordBuffer<LogRecord> =
//!     FixedSizeRecordBuffer::from_config(&config).unwrap();
//! assert_eq!(buffer.capacity_bytes(), 65536);
//! ```
//!
//! ## Performance Analysis
//!
//! ```bash
//! # Run standalone eviction report
//! cargo run --bin benchmark_runner
//!
//! # Run criterion benchmarks
//! cargo bench
//! ```

pub mod budget;
pub mod config;
pub mod fixedsize;
pub mod record;
pub mod recordbuffer;
