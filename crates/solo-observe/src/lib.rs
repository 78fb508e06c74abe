//! Logging setup shared by solo binaries.
mod logger;
pub use logger::*;
