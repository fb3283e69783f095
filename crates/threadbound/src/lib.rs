//! # THREADBOUND
//!
//! Two ways of editing a collection owned by one thread, run side by side:
//!
//! - [`SafeWorker`] submits each edit to the affinity executor and never
//!   touches the collection itself.
//! - [`UnguardedWorker`] edits the collection straight from its own thread
//!   and reports the index races and corrupted bookkeeping that follow.
//!
//! [`Harness`] owns all of it and plays the role of the buttons in a UI.
//!
//! ## Example
//!
//! ```rust,ignore
//! use threadbound::{Harness, HarnessConfig};
//!
//! let mut harness = Harness::new(HarnessConfig::default())?;
//! harness.start_safe_worker()?;
//! harness.start_unsafe_worker()?;
//! std::thread::sleep(std::time::Duration::from_millis(200));
//! let report = harness.shutdown()?;
//! println!("anomalies: {}", report.anomalies());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod events;
pub mod harness;
pub mod worker;

pub use config::HarnessConfig;
pub use events::{EventBus, EventReceiver, EventSender, HarnessEvent};
pub use harness::{Harness, HarnessReport, WorkerReport};
pub use worker::{SafeWorker, UnguardedWorker, WorkerHandle, WorkerKind, WorkerState, WorkerStats};
