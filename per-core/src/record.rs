//! Records of diagnostics produced by replay cycles.
//!
//! A [`Record`] is a set of key-value pairs. [`PrioritizedReplayBuffer`] returns
//! one from every replay cycle with scalars such as `"beta"`, `"mean_abs_td_error"`
//! and `"total_priority"`. Records can be handed to any [`Recorder`].
//!
//! ```rust
//! use per_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("beta", 0.4);
//! record.insert("slots", RecordValue::Array1(vec![0.0, 3.0]));
//! assert_eq!(record.get_scalar("beta").unwrap(), 0.4);
//! ```
//!
//! [`PrioritizedReplayBuffer`]: crate::PrioritizedReplayBuffer
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
