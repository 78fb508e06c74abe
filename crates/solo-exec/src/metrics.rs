//! Metrics labels for launchers.

/// Subprocess launcher type identifier for metrics.
pub const LAUNCHER_TYPE_SUBPROCESS: &str = "subprocess";

/// Docker launcher type identifier for metrics.
pub const LAUNCHER_TYPE_DOCKER: &str = "docker";
