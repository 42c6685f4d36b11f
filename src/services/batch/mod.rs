//! Adaptive batch scheduling service.
//!
//! A typed, priority-aware write-behind queue. Callers enqueue persistence
//! intents; the scheduler buffers them and flushes in typed groups, either
//! immediately when a priority threshold or the hard cap is crossed, or on
//! a debounce timer for a trickle of low-urgency writes.
//!
//! # Architecture
//!
//! ```text
//!  enqueue(type, payload, priority)
//!       │
//!       ▼
//! ┌─────────────┐  threshold / cap   ┌───────────────────────────┐
//! │ FIFO queue  ├───────────────────►│ flush: drain up to cap,   │
//! │ (VecDeque)  │                    │ partition by type,        │
//! └──────┬──────┘                    │ dispatch groups           │
//!        │ below thresholds          │ concurrently via handler  │
//!        ▼                           └───────────────────────────┘
//! ┌─────────────┐      fires
//! │ debounce    ├────────────────────────────►(same flush path)
//! │ timer       │
//! └─────────────┘
//! ```
//!
//! A group's failure resolves its acknowledgments with an error without
//! touching sibling groups. The scheduler never retries on its own;
//! `retry_count` is a caller-maintained field.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use qonduit::services::batch::{BatchConfig, BatchScheduler, Priority};
//!
//! let scheduler = BatchScheduler::new(BatchConfig::default(), Arc::new(writer));
//!
//! let (id, ack) = scheduler.enqueue_with_ack(
//!     "capture",
//!     serde_json::json!({"text": "decoherence timings"}),
//!     Priority::High,
//! )?;
//! ack.await??;
//! ```

mod config;
mod scheduler;
mod types;

pub use config::BatchConfig;
pub use scheduler::BatchScheduler;
pub use types::{BatchHandler, BatchOperation, BatchOutcome, Priority, SchedulerStats};
