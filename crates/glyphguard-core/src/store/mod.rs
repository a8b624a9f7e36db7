//! Durable option storage.
//!
//! GlyphGuard keeps two keys: the user options (which carry the scanner
//! deadline) and the aggregate of unregistered clients. Both go through the
//! [`OptionStore`] get/update contract.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryOptionStore;
pub use sqlite::SqliteOptionStore;
pub use traits::OptionStore;
