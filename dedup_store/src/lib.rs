//! Relational metadata store.
//!
//! Durable per-file records indexed for the exact pHash lookup and the
//! four-band LSH recall probe the duplicate detector depends on. This
//! crate owns the `files` table and its indexes; it has no knowledge of
//! similarity or clustering.

mod connection;
mod row;
mod schema;

pub use connection::Store;
pub use row::{FileRow, MediaSummary};
