//! Process lifecycle coordination.

pub mod shutdown;

pub use shutdown::Shutdown;
