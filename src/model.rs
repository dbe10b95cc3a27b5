//! Membership records
//!
//! Flat records mirrored from the members database. The same shapes are
//! sent to the data API, returned by the membership API and rendered by
//! the panels.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// Correspondence language of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Cs,
    En,
}

impl Language {
    /// Languages offered by the forms, default first
    pub const ALL: [Language; 2] = [Language::Cs, Language::En];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cs => "cs",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cs" => Ok(Language::Cs),
            "en" => Ok(Language::En),
            other => Err(ValidationError::UnknownLanguage(other.to_string())),
        }
    }
}

/// Member as submitted by the new member form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewMember {
    /// Left empty, the membership API assigns the next free number
    pub member_number: Option<i64>,
    #[validate(required)]
    #[validate(email)]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    #[serde(default)]
    pub language: Language,
    pub phone_number: Option<String>,
}

impl NewMember {
    /// Email is the only required field
    pub fn validate(&self) -> Result<(), ValidationError> {
        Validate::validate(self).map_err(|e| email_error(&e, self.email.as_deref()))
    }
}

/// Full member record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Member {
    pub id: Uuid,
    pub member_number: i64,
    #[validate(required)]
    #[validate(email)]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    #[serde(default)]
    pub language: Language,
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Member {
    pub fn address(&self) -> Address {
        Address {
            address: self.address.clone(),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
        }
    }

    pub fn set_address(&mut self, address: Address) {
        self.address = address.address;
        self.city = address.city;
        self.postal_code = address.postal_code;
    }

    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        Validate::validate(self).map_err(|e| email_error(&e, self.email.as_deref()))
    }
}

/// Row of the members table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub member_number: i64,
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl MemberSummary {
    /// Columns selected for the members table
    pub const COLUMNS: [&'static str; 6] = [
        "member_number",
        "id",
        "email",
        "first_name",
        "last_name",
        "phone_number",
    ];
}

/// Postal address fields of a member
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

/// Occupation as submitted by the forms
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOccupation {
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub member_id: Option<Uuid>,
}

impl NewOccupation {
    pub fn is_empty(&self) -> bool {
        is_blank(&self.company_name) && is_blank(&self.position)
    }
}

/// Stored occupation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occupation {
    pub id: Uuid,
    #[serde(default)]
    pub member_id: Option<Uuid>,
    pub company_name: Option<String>,
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Member row as listed by the membership API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberOverview {
    pub id: Uuid,
    pub member_number: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub note: Option<String>,
    pub city: Option<String>,
    pub left_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub company_names: Vec<Option<String>>,
    pub created_at: DateTime<Utc>,
}

/// Member changes accepted by the membership API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct MemberUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(required)]
    #[validate(email)]
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub note: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    #[serde(default)]
    pub language: Language,
}

impl MemberUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        Validate::validate(self).map_err(|e| email_error(&e, self.email.as_deref()))
    }
}

impl From<&Member> for MemberUpdate {
    fn from(member: &Member) -> Self {
        Self {
            first_name: member.first_name.clone(),
            last_name: member.last_name.clone(),
            date_of_birth: member.date_of_birth,
            email: member.email.clone(),
            phone_number: member.phone_number.clone(),
            note: member.note.clone(),
            address: member.address.clone(),
            city: member.city.clone(),
            postal_code: member.postal_code.clone(),
            language: member.language,
        }
    }
}

/// Which members a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberFilter {
    #[default]
    All,
    /// Not left
    Current,
    /// Left the organization
    Past,
    /// Joined within [`NEW_MEMBER_DAYS`] and not left
    New,
}

/// How long a member counts as new
pub const NEW_MEMBER_DAYS: i64 = 30;

impl MemberFilter {
    /// Path segment under `/members`
    pub fn path(&self) -> &'static str {
        match self {
            MemberFilter::All => "members",
            MemberFilter::Current => "members/current",
            MemberFilter::Past => "members/past",
            MemberFilter::New => "members/new",
        }
    }
}

impl FromStr for MemberFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(MemberFilter::All),
            "current" => Ok(MemberFilter::Current),
            "past" => Ok(MemberFilter::Past),
            "new" => Ok(MemberFilter::New),
            other => Err(format!(
                "unknown member filter {other} (expected all, current, past or new)"
            )),
        }
    }
}

/// Member counts per state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembersStats {
    pub new: i64,
    pub current: i64,
    pub past: i64,
}

/// Workplace members can be grouped under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workplace {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /workplaces`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewWorkplace {
    #[validate(required)]
    pub name: Option<String>,
    #[validate(required)]
    #[validate(email)]
    pub email: Option<String>,
}

impl NewWorkplace {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_blank(&self.name) {
            return Err(ValidationError::MissingField("name"));
        }
        Validate::validate(self).map_err(|e| {
            if e.field_errors().contains_key("name") {
                ValidationError::MissingField("name")
            } else {
                email_error(&e, self.email.as_deref())
            }
        })
    }
}

/// Body of `POST /workplaces/:id` and `DELETE /workplaces/:id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkplaceMember {
    pub member_id: Uuid,
}

/// Claims returned by the identity provider's userinfo endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_language")]
    pub locale: Option<Language>,
}

// Keycloak sends whatever locale the user picked; anything unknown is dropped
fn lenient_language<'de, D>(deserializer: D) -> Result<Option<Language>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Validation failures shared by the forms and the membership API
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("email is required")]
    MissingEmail,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("unknown language: {0} (expected cs or en)")]
    UnknownLanguage(String),

    #[error("invalid member number: {0}")]
    InvalidMemberNumber(String),

    #[error("invalid date {0}, expected YYYY-MM-DD")]
    InvalidDate(String),
}

// Email is the only field checked beyond presence
fn email_error(errors: &ValidationErrors, email: Option<&str>) -> ValidationError {
    let missing = errors
        .field_errors()
        .get("email")
        .is_some_and(|errs| errs.iter().any(|e| e.code == "required"));

    if missing {
        ValidationError::MissingEmail
    } else {
        ValidationError::InvalidEmail(email.unwrap_or_default().to_string())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse_and_default() {
        assert_eq!(Language::default(), Language::Cs);
        assert_eq!("EN".parse::<Language>().unwrap(), Language::En);
        assert!(matches!(
            "de".parse::<Language>(),
            Err(ValidationError::UnknownLanguage(_))
        ));
        assert_eq!(serde_json::to_string(&Language::En).unwrap(), "\"en\"");
    }

    fn new_member_with(email: Option<&str>) -> NewMember {
        NewMember {
            email: email.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(new_member_with(Some("jan@example.org")).validate().is_ok());
        assert_eq!(
            new_member_with(None).validate(),
            Err(ValidationError::MissingEmail)
        );

        for bad in [
            "jan.example.org",
            "@example.org",
            "jan @example.org",
            "jan@praha..cz",
            "jan@-praha.cz",
            "jan@pra_ha.cz",
            "<jan>@praha.cz",
        ] {
            assert_eq!(
                new_member_with(Some(bad)).validate(),
                Err(ValidationError::InvalidEmail(bad.to_string())),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_update_requires_valid_email() {
        let update = MemberUpdate {
            email: Some("jan@praha..cz".to_string()),
            ..Default::default()
        };
        assert!(matches!(update.validate(), Err(ValidationError::InvalidEmail(_))));
        assert_eq!(MemberUpdate::default().validate(), Err(ValidationError::MissingEmail));
    }

    #[test]
    fn test_new_workplace_requires_name_and_email() {
        let workplace = NewWorkplace {
            name: Some("Depo Hostivař".to_string()),
            email: Some("depo@example.org".to_string()),
        };
        assert_eq!(workplace.validate(), Ok(()));

        let unnamed = NewWorkplace {
            name: Some("  ".to_string()),
            ..workplace.clone()
        };
        assert_eq!(unnamed.validate(), Err(ValidationError::MissingField("name")));

        let no_email = NewWorkplace {
            email: None,
            ..workplace.clone()
        };
        assert_eq!(no_email.validate(), Err(ValidationError::MissingEmail));

        let bad_email = NewWorkplace {
            email: Some("depo.example.org".to_string()),
            ..workplace
        };
        assert!(matches!(bad_email.validate(), Err(ValidationError::InvalidEmail(_))));
    }

    #[test]
    fn test_new_member_serializes_nulls() {
        let member = NewMember {
            email: Some("jan@example.org".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&member).unwrap();
        assert!(json["member_number"].is_null());
        assert_eq!(json["language"], "cs");
        assert_eq!(json["email"], "jan@example.org");
    }

    #[test]
    fn test_member_from_data_api_row() {
        let json = r#"{
            "id": "6c4a3f0e-8d43-4f8e-9a57-2b0f6f1f2a10",
            "member_number": 42,
            "email": "jana@example.org",
            "first_name": "Jana",
            "last_name": "Nováková",
            "date_of_birth": "1990-04-01",
            "address": "Dlouhá 1",
            "city": "Praha",
            "postal_code": "11000",
            "language": "cs",
            "phone_number": null
        }"#;
        let member: Member = serde_json::from_str(json).unwrap();
        assert_eq!(member.member_number, 42);
        assert_eq!(member.full_name(), "Jana Nováková");
        assert_eq!(member.address().city.as_deref(), Some("Praha"));
        assert!(member.left_at.is_none());

        // Absent bookkeeping fields stay absent on the way back
        let back = serde_json::to_value(&member).unwrap();
        assert!(back.get("left_at").is_none());
    }

    #[test]
    fn test_user_info_unknown_locale() {
        let info: UserInfo =
            serde_json::from_str(r#"{"preferred_username": "jana", "locale": "de"}"#).unwrap();
        assert_eq!(info.preferred_username.as_deref(), Some("jana"));
        assert_eq!(info.locale, None);

        let info: UserInfo = serde_json::from_str(r#"{"locale": "en"}"#).unwrap();
        assert_eq!(info.locale, Some(Language::En));
    }

    #[test]
    fn test_occupation_is_empty() {
        assert!(NewOccupation::default().is_empty());
        let occupation = NewOccupation {
            company_name: Some("ACME".to_string()),
            ..Default::default()
        };
        assert!(!occupation.is_empty());
    }
}
