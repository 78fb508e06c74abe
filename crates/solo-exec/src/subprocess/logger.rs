use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

/// Configuration for backing-process output logging.
#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    /// Max line length before truncation.
    pub max_line_length: usize,
    /// Log stdout at INFO level (false = DEBUG).
    pub stdout_info: bool,
    /// Log stderr at WARN level (false = DEBUG).
    pub stderr_warn: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_line_length: 4096,
            stdout_info: true,
            stderr_warn: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn as_str(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

fn truncate(line: &mut String, max: usize) {
    if line.len() <= max {
        return;
    }
    let mut cut = max;
    while !line.is_char_boundary(cut) {
        cut -= 1;
    }
    line.truncate(cut);
    line.push_str("…");
}

/// Forward every line of `reader` to `tracing` until EOF.
pub(crate) async fn forward_lines<R>(reader: R, stream: Stream, worker: String, cfg: LogConfig)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let mut line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!(worker = %worker, stream = stream.as_str(), error = %e, "output stream closed");
                break;
            }
        };
        truncate(&mut line, cfg.max_line_length);

        match stream {
            Stream::Stdout if cfg.stdout_info => info!(worker = %worker, stream = "stdout", "{line}"),
            Stream::Stderr if cfg.stderr_warn => warn!(worker = %worker, stream = "stderr", "{line}"),
            _ => debug!(worker = %worker, stream = stream.as_str(), "{line}"),
        }
    }
}
