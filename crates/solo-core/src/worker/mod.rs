mod connection;
pub use connection::{ConnectionCell, TransitionError};

mod handle;
pub use handle::{WorkerHandle, WorkerRef};

mod name;
pub use name::make_worker_name;
