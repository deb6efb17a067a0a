//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the genre library core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Library event bus
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the other core crates
//! depend on. It establishes the logging conventions, the configuration
//! builder, and the event broadcasting used to keep host screens in sync
//! with the persisted library.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
