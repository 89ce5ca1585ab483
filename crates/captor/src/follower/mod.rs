//! Follower policies: captors that satisfy the driver's window.

mod latched;
mod ranged;

pub use latched::Latched;
pub use ranged::Ranged;
