#![forbid(unsafe_code)]

pub mod easing;
pub mod feedback;
pub mod gesture;
pub mod model;
pub mod session;
pub mod time;

pub use time::Clock;
