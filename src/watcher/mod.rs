//! Change detection for the watched input file.
//!
//! This module turns raw filesystem notifications into settled change events:
//! - **Debounce**: multi-write bursts (e.g., a writer doing read-modify-write)
//!   collapse into one logical event after a configurable quiet period
//! - **Re-arm**: notification-subsystem errors are logged and the watch is
//!   rebuilt; they never take the process down
//!
//! # Event Flow
//!
//! 1. A `notify` watcher observes the input file's parent directory
//! 2. Raw events are bridged onto a tokio channel from the notify thread
//! 3. [`ChangeDetector`] filters them to the watched path and waits for the
//!    file to stay quiet for the stability window, probing its size and
//!    mtime at the re-check interval
//! 4. One [`ChangeEvent`] is emitted per settled mutation

pub mod debounce;

pub use debounce::{ChangeDetector, ChangeEvent};
