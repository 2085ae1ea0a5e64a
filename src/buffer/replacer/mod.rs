//! Eviction policy implementations (replacers).
//!
//! - [`ClockReplacer`] - second-chance CLOCK

mod clock;

pub use clock::ClockReplacer;
