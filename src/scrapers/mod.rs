//! Browser automation plumbing used by the crawler.

pub mod browser;
pub mod retry;
pub mod session;
pub mod wait;

#[cfg(feature = "browser")]
pub use browser::ChromeSession;
pub use retry::{retry, RetryPolicy};
pub use session::{DriverError, EntryHandle, ListSnapshot, MapSession};
