//! The sampling → decision → update control loop
//!
//! One `ControlLoop` drives one target pod. Each tick samples usage, reads
//! the declared requests, decides per resource and applies the changes; a
//! failing tick is reported and the loop carries on after the usual sleep.

mod r#loop;
mod streak;


pub use r#loop::{ControlLoop, ControlLoopBuilder, LoopState, TickOutcome};
pub use streak::FailureStreak;
