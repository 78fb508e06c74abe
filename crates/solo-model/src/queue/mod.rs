mod item;
pub use item::{BuildableItem, QueueItemId};
