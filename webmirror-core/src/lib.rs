mod client;

pub use client::{FetchError, MirrorClient, REQUEST_TIMEOUT, looks_like_not_found};
