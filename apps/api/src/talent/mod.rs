// Talent pool: candidate submission, anonymization, and the public listing.
// Derived fields (talent id, seniority) are computed at read time, never stored.

pub mod anonymize;
pub mod fields;
pub mod filter;
pub mod handlers;
pub mod seniority;
pub mod store;
pub mod talent_id;
pub mod validation;
