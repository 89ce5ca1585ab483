//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the workspace:
//! stamps, dispatches, capture windows and states, configuration and errors.
//! All business crates depend on this crate; reverse dependencies are
//! prohibited.
//!
//! ## Time Model
//! - Every dispatch carries a [`Stamp`]: any totally ordered, subtractable
//!   type (`i64` ticks, `u64` nanoseconds, `Duration`, ...)
//! - Differences between stamps are offsets; policy parameters are offsets

mod captor_id;
mod capture;
mod config;
mod dispatch;
mod error;
mod stamp;
mod sync;

pub use captor_id::CaptorId;
pub use capture::*;
pub use config::*;
pub use dispatch::*;
pub use error::*;
pub use stamp::Stamp;
pub use sync::*;
