//! CLI command implementations

pub mod list;
pub mod load;
pub mod watch;

pub use list::ListArgs;
pub use load::LoadArgs;
pub use watch::WatchArgs;
