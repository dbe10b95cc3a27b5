//! New member form
//!
//! Saving is a chained insert: the member first, then the occupation keyed
//! by the id the data API generated for that member.

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::{optional_text, PanelError, PanelResult, Submission, UpdateGuard};
use crate::data_api::{DataApiClient, MEMBERS, OCCUPATIONS};
use crate::model::{Language, NewMember, NewOccupation, Occupation, ValidationError};

#[derive(Debug, Deserialize)]
struct InsertedId {
    id: Uuid,
}

/// Result of a completed save
#[derive(Debug, Clone, PartialEq)]
pub struct SavedMember {
    pub id: Uuid,
    pub member: NewMember,
    /// None when the form had no occupation
    pub occupation: Option<Occupation>,
}

pub type SaveOutcome = Submission<SavedMember>;

#[derive(Debug, Default)]
pub struct NewMemberForm {
    member: NewMember,
    occupation: NewOccupation,
    guard: UpdateGuard,
}

impl NewMemberForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn member(&self) -> &NewMember {
        &self.member
    }

    pub fn occupation(&self) -> &NewOccupation {
        &self.occupation
    }

    pub fn guard(&self) -> &UpdateGuard {
        &self.guard
    }

    /// Empty input leaves the number to the database
    pub fn set_member_number(&mut self, value: &str) -> Result<(), ValidationError> {
        self.member.member_number = match value.trim() {
            "" => None,
            raw => Some(
                raw.parse::<i64>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ValidationError::InvalidMemberNumber(raw.to_string()))?,
            ),
        };
        Ok(())
    }

    pub fn set_email(&mut self, value: &str) {
        self.member.email = optional_text(value);
    }

    pub fn set_first_name(&mut self, value: &str) {
        self.member.first_name = optional_text(value);
    }

    pub fn set_last_name(&mut self, value: &str) {
        self.member.last_name = optional_text(value);
    }

    /// `YYYY-MM-DD`, empty clears
    pub fn set_date_of_birth(&mut self, value: &str) -> Result<(), ValidationError> {
        self.member.date_of_birth = parse_date(value)?;
        Ok(())
    }

    pub fn set_address(&mut self, value: &str) {
        self.member.address = optional_text(value);
    }

    pub fn set_city(&mut self, value: &str) {
        self.member.city = optional_text(value);
    }

    pub fn set_postal_code(&mut self, value: &str) {
        self.member.postal_code = optional_text(value);
    }

    pub fn set_language(&mut self, value: &str) -> Result<(), ValidationError> {
        self.member.language = value.parse::<Language>()?;
        Ok(())
    }

    pub fn set_phone_number(&mut self, value: &str) {
        self.member.phone_number = optional_text(value);
    }

    pub fn set_company_name(&mut self, value: &str) {
        self.occupation.company_name = optional_text(value);
    }

    pub fn set_position(&mut self, value: &str) {
        self.occupation.position = optional_text(value);
    }

    /// Insert the member, then its occupation
    pub async fn save(&mut self, client: &DataApiClient) -> PanelResult<SaveOutcome> {
        if !self.guard.begin() {
            return Ok(Submission::Busy);
        }

        let result = self.save_chain(client).await;
        self.guard.finish();

        match &result {
            Ok(saved) => tracing::info!(member_id = %saved.id, "Saved new member"),
            Err(e) => tracing::error!(error = %e, "Failed to save new member"),
        }
        result.map(Submission::Done)
    }

    async fn save_chain(&mut self, client: &DataApiClient) -> PanelResult<SavedMember> {
        self.member.validate()?;

        let inserted: Vec<InsertedId> = client.from(MEMBERS).insert(&self.member).execute().await?;
        let id = match inserted.into_iter().next() {
            Some(row) => row.id,
            None => self.lookup_id(client).await?,
        };

        if self.occupation.is_empty() {
            return Ok(SavedMember {
                id,
                member: self.member.clone(),
                occupation: None,
            });
        }

        self.occupation.member_id = Some(id);
        let occupation = client
            .from(OCCUPATIONS)
            .insert(&self.occupation)
            .execute::<Occupation>()
            .await
            .map_err(|source| PanelError::OccupationNotSaved { member_id: id, source })?
            .into_iter()
            .next();

        Ok(SavedMember {
            id,
            member: self.member.clone(),
            occupation,
        })
    }

    /// Find the inserted member by number when the insert returned no rows
    async fn lookup_id(&self, client: &DataApiClient) -> PanelResult<Uuid> {
        let number = self.member.member_number.ok_or(PanelError::MissingId)?;
        let rows: Vec<InsertedId> = client
            .from(MEMBERS)
            .select("id")
            .eq("member_number", number)
            .execute()
            .await?;

        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or(PanelError::MissingId)
    }
}

/// `YYYY-MM-DD`, empty input clears
pub fn parse_date(value: &str) -> Result<Option<NaiveDate>, ValidationError> {
    match value.trim() {
        "" => Ok(None),
        raw => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ValidationError::InvalidDate(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataApiConfig;
    use crate::identity::StaticToken;
    use crate::test_support::{spawn_data_api, FakeDataApi};
    use std::sync::{Arc, Mutex};

    async fn setup() -> (DataApiClient, Arc<Mutex<FakeDataApi>>) {
        let fake = Arc::new(Mutex::new(FakeDataApi::default()));
        let url = spawn_data_api(Arc::clone(&fake)).await;
        let config = DataApiConfig {
            url,
            ..Default::default()
        };
        let client = DataApiClient::new(&config, Arc::new(StaticToken::new("t"))).unwrap();
        (client, fake)
    }

    fn filled_form() -> NewMemberForm {
        let mut form = NewMemberForm::new();
        form.set_member_number("12").unwrap();
        form.set_email("jana@example.org");
        form.set_first_name("Jana");
        form.set_last_name("Nováková");
        form.set_date_of_birth("1990-04-01").unwrap();
        form.set_city("Praha");
        form.set_language("en").unwrap();
        form.set_company_name("ACME");
        form.set_position("Welder");
        form
    }

    #[test]
    fn test_setters() {
        let mut form = NewMemberForm::new();
        assert_eq!(form.member().language, Language::Cs);

        form.set_member_number("").unwrap();
        assert_eq!(form.member().member_number, None);
        assert!(form.set_member_number("abc").is_err());
        assert!(form.set_member_number("-3").is_err());

        assert!(form.set_date_of_birth("01.04.1990").is_err());
        form.set_date_of_birth("").unwrap();
        assert_eq!(form.member().date_of_birth, None);

        assert!(form.set_language("de").is_err());
    }

    #[tokio::test]
    async fn test_chained_insert_uses_returned_id() {
        let (client, fake) = setup().await;
        let mut form = filled_form();

        let saved = match form.save(&client).await.unwrap() {
            Submission::Done(saved) => saved,
            Submission::Busy => panic!("form was busy"),
        };
        assert!(!form.guard().is_updating());

        let fake = fake.lock().unwrap();
        assert_eq!(fake.members.len(), 1);
        assert_eq!(fake.members[0]["id"], saved.id.to_string());
        assert_eq!(fake.members[0]["date_of_birth"], "1990-04-01");
        assert_eq!(fake.members[0]["language"], "en");

        assert_eq!(fake.occupations.len(), 1);
        assert_eq!(fake.occupations[0]["member_id"], saved.id.to_string());
        assert_eq!(saved.occupation.unwrap().member_id, Some(saved.id));
    }

    #[tokio::test]
    async fn test_failed_member_insert_skips_occupation() {
        let (client, fake) = setup().await;
        fake.lock().unwrap().failing_tables.insert(MEMBERS.to_string());

        let mut form = filled_form();
        let err = form.save(&client).await.unwrap_err();
        assert!(matches!(err, PanelError::DataApi(_)));
        assert!(!form.guard().is_updating());

        let fake = fake.lock().unwrap();
        assert_eq!(fake.writes_to(MEMBERS), 1);
        assert_eq!(fake.writes_to(OCCUPATIONS), 0);

        // The rejected insert still carried the form's values
        let body = fake.requests[0].body.as_ref().unwrap();
        assert_eq!(body["member_number"], 12);
        assert_eq!(body["email"], "jana@example.org");
        assert_eq!(body["last_name"], "Nováková");
        assert!(body.get("company_name").is_none());
    }

    #[tokio::test]
    async fn test_failed_occupation_reports_member() {
        let (client, fake) = setup().await;
        fake.lock().unwrap().failing_tables.insert(OCCUPATIONS.to_string());

        let mut form = filled_form();
        let err = form.save(&client).await.unwrap_err();
        assert!(matches!(err, PanelError::OccupationNotSaved { .. }));
        assert_eq!(fake.lock().unwrap().members.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_email_issues_no_request() {
        let (client, fake) = setup().await;
        let mut form = NewMemberForm::new();
        form.set_first_name("Jan");

        let err = form.save(&client).await.unwrap_err();
        assert!(matches!(err, PanelError::Validation(ValidationError::MissingEmail)));
        assert!(fake.lock().unwrap().requests.is_empty());
    }

    #[tokio::test]
    async fn test_empty_occupation_is_skipped() {
        let (client, fake) = setup().await;
        let mut form = NewMemberForm::new();
        form.set_email("petr@example.org");

        let outcome = form.save(&client).await.unwrap();
        assert!(matches!(outcome, Submission::Done(SavedMember { occupation: None, .. })));
        assert_eq!(fake.lock().unwrap().writes_to(OCCUPATIONS), 0);
    }

    #[tokio::test]
    async fn test_busy_form_ignores_save() {
        let (client, fake) = setup().await;
        let mut form = filled_form();
        form.guard.begin();

        assert_eq!(form.save(&client).await.unwrap(), Submission::Busy);
        assert!(fake.lock().unwrap().requests.is_empty());
    }
}
