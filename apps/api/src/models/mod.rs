pub mod company;
pub mod document;
pub mod record;

pub use company::{Company, NewCompany};
pub use document::{CrmDocument, Stats};
pub use record::{EntityRecord, RecordKind};

/// Next identifier for a collection: max(existing) + 1, starting at 1.
/// `None` once the collection already holds `i64::MAX`.
pub fn next_id(ids: impl Iterator<Item = i64>) -> Option<i64> {
    ids.max().unwrap_or(0).checked_add(1)
}
