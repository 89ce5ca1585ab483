//! Driver policies: captors that propose the window of each cycle.

mod throttled;

pub use throttled::Throttled;
