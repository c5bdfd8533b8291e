pub mod backup;
pub mod engine;
pub mod fingerprints;
pub mod local_file;
pub mod paths;
pub mod sanitize;
