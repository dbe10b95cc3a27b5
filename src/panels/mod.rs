//! Page Controllers
//!
//! Each page owns its view state and issues its network calls one after
//! another. Two guards keep the pages from doubling up on requests:
//!
//! - [`LoadGuard`]: initial data is fetched once; a failed load may be retried
//! - [`UpdateGuard`]: a submission is ignored while another is in flight

pub mod member_detail;
pub mod members_table;
pub mod new_member;
pub mod profile;
pub mod welcome;

pub use member_detail::MemberDetailPage;
pub use members_table::MembersTable;
pub use new_member::{parse_date, NewMemberForm, SaveOutcome, SavedMember};
pub use profile::ProfilePage;
pub use welcome::WelcomePage;

use thiserror::Error;
use uuid::Uuid;

use crate::adapter::ApiClientError;
use crate::data_api::DataApiError;
use crate::identity::AuthError;
use crate::model::ValidationError;

/// Initial data load state of a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadGuard {
    is_loading: bool,
    initial_data_loaded: bool,
}

impl LoadGuard {
    /// Returns false when a load is running or already succeeded
    pub fn begin(&mut self) -> bool {
        if self.is_loading || self.initial_data_loaded {
            return false;
        }
        self.is_loading = true;
        true
    }

    pub fn succeed(&mut self) {
        self.is_loading = false;
        self.initial_data_loaded = true;
    }

    pub fn fail(&mut self) {
        self.is_loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn initial_data_loaded(&self) -> bool {
        self.initial_data_loaded
    }
}

/// Submission state of a form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateGuard {
    is_updating: bool,
}

impl UpdateGuard {
    /// Returns false while another submission is in flight
    pub fn begin(&mut self) -> bool {
        if self.is_updating {
            return false;
        }
        self.is_updating = true;
        true
    }

    pub fn finish(&mut self) {
        self.is_updating = false;
    }

    pub fn is_updating(&self) -> bool {
        self.is_updating
    }
}

/// Outcome of a guarded submission
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<T> {
    Done(T),
    /// Another submission was still running
    Busy,
}

/// Errors surfaced by the pages
#[derive(Error, Debug)]
pub enum PanelError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    DataApi(#[from] DataApiError),

    #[error(transparent)]
    Api(#[from] ApiClientError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Member number {0} not found")]
    MemberNotFound(i64),

    /// The inserted member could not be read back
    #[error("Member was saved but its id could not be determined")]
    MissingId,

    /// Second half of the chained insert failed
    #[error("Member {member_id} was saved but the occupation was not: {source}")]
    OccupationNotSaved {
        member_id: Uuid,
        #[source]
        source: DataApiError,
    },

    /// Page has no member loaded yet
    #[error("No member loaded")]
    NotLoaded,
}

pub type PanelResult<T> = Result<T, PanelError>;

/// Empty input clears the field
pub fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn display(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_guard() {
        let mut guard = LoadGuard::default();
        assert!(guard.begin());
        assert!(guard.is_loading());
        assert!(!guard.begin());

        guard.fail();
        assert!(!guard.is_loading());
        assert!(!guard.initial_data_loaded());
        assert!(guard.begin());

        guard.succeed();
        assert!(guard.initial_data_loaded());
        assert!(!guard.begin());
    }

    #[test]
    fn test_update_guard() {
        let mut guard = UpdateGuard::default();
        assert!(guard.begin());
        assert!(!guard.begin());
        guard.finish();
        assert!(!guard.is_updating());
        assert!(guard.begin());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("  "), None);
        assert_eq!(optional_text(" Praha "), Some("Praha".to_string()));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(" "), Ok(None));
        assert_eq!(
            parse_date("1990-04-01"),
            Ok(chrono::NaiveDate::from_ymd_opt(1990, 4, 1))
        );
        assert_eq!(
            parse_date("1.4.1990"),
            Err(ValidationError::InvalidDate("1.4.1990".to_string()))
        );
    }
}
