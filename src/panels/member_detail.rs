//! Member detail page
//!
//! Looks a member up by member number and edits it in three independent
//! parts: personal fields, address, occupation. Every edit is an upsert
//! keyed by `id`.

use serde::Serialize;
use std::fmt::Write;
use uuid::Uuid;

use super::{display, LoadGuard, PanelError, PanelResult, Submission, UpdateGuard};
use crate::data_api::{DataApiClient, MEMBERS, OCCUPATIONS};
use crate::model::{Address, Member, NewOccupation, Occupation};

/// Occupation row as written by the detail page
#[derive(Debug, Serialize)]
struct OccupationRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    member_id: Uuid,
    company_name: &'a Option<String>,
    position: &'a Option<String>,
}

#[derive(Debug)]
pub struct MemberDetailPage {
    member_number: i64,
    member: Option<Member>,
    occupations: Vec<Occupation>,
    load: LoadGuard,
    update: UpdateGuard,
}

impl MemberDetailPage {
    pub fn new(member_number: i64) -> Self {
        Self {
            member_number,
            member: None,
            occupations: Vec::new(),
            load: LoadGuard::default(),
            update: UpdateGuard::default(),
        }
    }

    pub fn member_number(&self) -> i64 {
        self.member_number
    }

    pub fn member(&self) -> Option<&Member> {
        self.member.as_ref()
    }

    pub fn occupations(&self) -> &[Occupation] {
        &self.occupations
    }

    pub fn load_guard(&self) -> &LoadGuard {
        &self.load
    }

    pub fn update_guard(&self) -> &UpdateGuard {
        &self.update
    }

    /// Fetch the member and its occupations unless already loaded
    pub async fn load(&mut self, client: &DataApiClient) -> PanelResult<()> {
        if !self.load.begin() {
            return Ok(());
        }

        match self.fetch(client).await {
            Ok((member, occupations)) => {
                self.member = Some(member);
                self.occupations = occupations;
                self.load.succeed();
                Ok(())
            }
            Err(e) => {
                tracing::error!(member_number = self.member_number, error = %e, "Failed to load member");
                self.load.fail();
                Err(e)
            }
        }
    }

    async fn fetch(&self, client: &DataApiClient) -> PanelResult<(Member, Vec<Occupation>)> {
        let member = client
            .from(MEMBERS)
            .select("*")
            .eq("member_number", self.member_number)
            .execute::<Member>()
            .await?
            .into_iter()
            .next()
            .ok_or(PanelError::MemberNotFound(self.member_number))?;

        let occupations = client
            .from(OCCUPATIONS)
            .select("*")
            .eq("member_id", member.id)
            .execute::<Occupation>()
            .await?;

        Ok((member, occupations))
    }

    /// Save edited personal fields
    pub async fn update_member(&mut self, client: &DataApiClient, updated: Member) -> PanelResult<Submission<Member>> {
        if !self.update.begin() {
            return Ok(Submission::Busy);
        }

        let result = self.upsert_member(client, updated).await;
        self.update.finish();
        result.map(Submission::Done)
    }

    /// Save a new address for the loaded member
    pub async fn update_address(&mut self, client: &DataApiClient, address: Address) -> PanelResult<Submission<Member>> {
        if !self.update.begin() {
            return Ok(Submission::Busy);
        }

        let result = match self.member.clone() {
            Some(mut member) => {
                member.set_address(address);
                self.upsert_member(client, member).await
            }
            None => Err(PanelError::NotLoaded),
        };
        self.update.finish();
        result.map(Submission::Done)
    }

    /// Save the member's occupation
    ///
    /// Updates the first stored occupation, or adds one when the member has none.
    pub async fn update_occupation(
        &mut self,
        client: &DataApiClient,
        occupation: NewOccupation,
    ) -> PanelResult<Submission<Occupation>> {
        if !self.update.begin() {
            return Ok(Submission::Busy);
        }

        let result = self.upsert_occupation(client, &occupation).await;
        self.update.finish();
        result.map(Submission::Done)
    }

    async fn upsert_member(&mut self, client: &DataApiClient, member: Member) -> PanelResult<Member> {
        member.validate()?;

        let saved = client
            .from(MEMBERS)
            .upsert(&member)
            .on_conflict("id")
            .execute::<Member>()
            .await
            .map_err(|e| {
                tracing::error!(member_id = %member.id, error = %e, "Failed to update member");
                e
            })?
            .into_iter()
            .next()
            .unwrap_or(member);

        tracing::info!(member_id = %saved.id, "Updated member");
        self.member = Some(saved.clone());
        Ok(saved)
    }

    async fn upsert_occupation(&mut self, client: &DataApiClient, occupation: &NewOccupation) -> PanelResult<Occupation> {
        let member_id = self.member.as_ref().map(|m| m.id).ok_or(PanelError::NotLoaded)?;
        let existing = self.occupations.first().map(|o| o.id);

        let record = OccupationRecord {
            id: existing,
            member_id,
            company_name: &occupation.company_name,
            position: &occupation.position,
        };

        let saved = client
            .from(OCCUPATIONS)
            .upsert(&record)
            .on_conflict("id")
            .execute::<Occupation>()
            .await
            .map_err(|e| {
                tracing::error!(member_id = %member_id, error = %e, "Failed to update occupation");
                e
            })?
            .into_iter()
            .next()
            .ok_or(PanelError::MissingId)?;

        match self.occupations.iter_mut().find(|o| o.id == saved.id) {
            Some(slot) => *slot = saved.clone(),
            None => self.occupations.push(saved.clone()),
        }
        Ok(saved)
    }

    pub fn render(&self) -> String {
        let Some(member) = &self.member else {
            return format!("Member {} not loaded", self.member_number);
        };

        let mut out = String::new();
        let _ = writeln!(out, "Member detail");
        let _ = writeln!(out, "  Member number: {}", member.member_number);
        let _ = writeln!(out, "  Id:            {}", member.id);
        let _ = writeln!(out, "  Name:          {}", member.full_name());
        let _ = writeln!(out, "  Email:         {}", display(&member.email));
        let _ = writeln!(out, "  Phone number:  {}", display(&member.phone_number));
        let _ = writeln!(
            out,
            "  Date of birth: {}",
            member.date_of_birth.map(|d| d.to_string()).unwrap_or_default()
        );
        let _ = writeln!(out, "  Language:      {}", member.language);
        let _ = writeln!(out, "Address");
        let _ = writeln!(out, "  {}", display(&member.address));
        let _ = writeln!(out, "  {} {}", display(&member.postal_code), display(&member.city));
        let _ = write!(out, "Occupations");
        if self.occupations.is_empty() {
            let _ = write!(out, "\n  (none)");
        }
        for occupation in &self.occupations {
            let _ = write!(
                out,
                "\n  {} - {}",
                display(&occupation.company_name),
                display(&occupation.position)
            );
        }
        out
    }
}
