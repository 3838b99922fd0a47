//! Turning filesystem activity into debounced commit triggers.

pub mod debounce;
pub mod filter;
pub mod fs;

pub use debounce::Debouncer;
pub use filter::PathFilter;
pub use fs::{ChangeEvent, FsWatcher};
