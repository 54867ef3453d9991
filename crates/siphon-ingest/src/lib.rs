//! Siphon Ingest Library
//!
//! Adaptive bulk-ingestion pipeline: reads records from local JSON or CSV
//! files and uploads them in batches to a remote search index, adapting batch
//! size to payload targets, measured network throughput, and memory pressure.
//!
//! # Pipeline
//!
//! ```text
//! files -> RecordSource -> transform -> Batcher -> UploadQueue -> Destination
//!                                          ^            |
//!                                   MemoryWatchdog   retry split
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use siphon_ingest::config::ImportConfig;
//! use siphon_ingest::destination::HttpDestination;
//! use siphon_ingest::memory::ProcessMemory;
//! use siphon_ingest::probe::HttpProbe;
//! use siphon_ingest::progress::NoopProgress;
//! use siphon_ingest::pipeline;
//!
//! #[tokio::main]
//! async fn main() -> siphon_ingest::Result<()> {
//!     let config = ImportConfig::new("./data");
//!     let destination = Arc::new(HttpDestination::new(
//!         "https://index.example.com".into(),
//!         "app".into(),
//!         "key".into(),
//!         "products".into(),
//!     )?);
//!     let probe = HttpProbe::new("https://index.example.com".into())?;
//!     let summary = pipeline::run(
//!         config,
//!         destination,
//!         &probe,
//!         Box::new(ProcessMemory),
//!         Arc::new(NoopProgress),
//!     )
//!     .await?;
//!     println!("imported {} records", summary.records_imported);
//!     Ok(())
//! }
//! ```

pub mod batcher;
pub mod config;
pub mod destination;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod queue;
pub mod record;
pub mod retry;
pub mod sizer;
pub mod source;
pub mod state;

// Re-export commonly used types
pub use config::ImportConfig;
pub use error::{ImportError, Result, UploadError};
pub use pipeline::ImportSummary;
pub use record::Record;
pub use state::PipelineState;
