//! Persistence of events, metrics, and trends
//!
//! The monitoring core never writes anything itself. Cycle reports are handed to a
//! [`Recorder`] by the recorder actor.
//!
//! ## Backends
//!
//! - **File** (default): JSON lines for events, CSV for metrics and trends
//! - **In-Memory**: No persistence, for testing
//!
//! ## Usage
//!
//! ```no_run
//! use host_sentinel::{config::LoggingConfig, storage::{Recorder, file::FileRecorder}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let recorder = FileRecorder::new(&LoggingConfig::default()).await?;
//!     recorder.record_system("Automation suite started").await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod file;
pub mod memory;

pub use backend::{Event, EventKind, Recorder, TrendRecord};
pub use error::{StorageError, StorageResult};
