// Company side: hiring requests for candidates found in the talent pool.

pub mod handlers;
pub mod validation;
