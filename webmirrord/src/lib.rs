pub mod config;
pub mod daemon;
pub mod report;
pub mod sync;
