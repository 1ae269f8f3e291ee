pub mod candidate;
pub mod hiring_request;
