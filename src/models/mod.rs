//! Data models for bizcrawl.

mod record;

pub use record::{BusinessRecord, COLUMNS};
