mod mode;
pub use mode::UsageMode;

mod state;
pub use state::ConnectionState;
