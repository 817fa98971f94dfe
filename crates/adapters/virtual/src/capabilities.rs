//! Virtual capabilities: counter, log.

mod counter;
mod log;

pub use counter::Counter;
pub use log::{Log, LogBook};
