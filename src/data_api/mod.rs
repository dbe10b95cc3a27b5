//! Data API Client
//!
//! Constructs select / insert / upsert calls against the auto-generated REST
//! API over the members database (`members`, `occupations` resources).
//! Filters use the API's `column=eq.value` syntax; writes ask for the
//! written rows back with `Prefer: return=representation`.

pub mod client;
pub mod error;
pub mod query;

pub use client::DataApiClient;
pub use error::{DataApiError, DataApiResult};
pub use query::{Mutation, Select, Table, MERGE_DUPLICATES, RETURN_REPRESENTATION};

/// Table holding member records
pub const MEMBERS: &str = "members";

/// Table holding occupations, keyed by `member_id`
pub const OCCUPATIONS: &str = "occupations";
