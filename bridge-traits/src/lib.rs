//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the genre library core and the
//! platform-specific adapters it runs on. The core never talks to a concrete
//! storage engine; it is handed a [`KeyValueStore`](storage::KeyValueStore)
//! and works exclusively through it.
//!
//! ## Traits
//!
//! - [`KeyValueStore`](storage::KeyValueStore) - Durable string key-value persistence
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ SQLite + in-memory |
//! | Mobile   | host-provided       | 📋 Injected at bootstrap |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters should
//! convert engine-specific failures into it and keep the offending key in the
//! message where one exists.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so one adapter instance can be
//! shared by every screen of the host application.

pub mod error;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use storage::KeyValueStore;
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
