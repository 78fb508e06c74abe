use std::sync::atomic::{AtomicU64, Ordering};

use solo_model::AffinityLabel;

/// Process-wide sequence for worker names.
static WORKER_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_seq() -> u64 {
    WORKER_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Build a worker name for a label.
///
/// Format: `{label}-{seq:x}`; every call yields a new name.
pub fn make_worker_name(label: &AffinityLabel) -> String {
    format!("{label}-{seq:x}", seq = next_seq())
}
