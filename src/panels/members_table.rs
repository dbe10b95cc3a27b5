//! Members table of the administration panel

use std::fmt::Write;

use super::{display, LoadGuard, PanelResult};
use crate::data_api::{DataApiClient, MEMBERS};
use crate::model::MemberSummary;

/// Grid columns: (field, header)
pub const GRID_COLUMNS: [(&str, &str); 5] = [
    ("member_number", "Member Number"),
    ("last_name", "Last name"),
    ("first_name", "First Name"),
    ("phone_number", "Phone number"),
    ("email", "Email"),
];

pub const PAGE_SIZE_OPTIONS: [usize; 3] = [100, 50, 25];

pub const DEFAULT_PAGE_SIZE: usize = PAGE_SIZE_OPTIONS[0];

#[derive(Debug)]
pub struct MembersTable {
    rows: Vec<MemberSummary>,
    guard: LoadGuard,
    page_size: usize,
    page: usize,
}

impl Default for MembersTable {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            guard: LoadGuard::default(),
            page_size: DEFAULT_PAGE_SIZE,
            page: 0,
        }
    }
}

impl MembersTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the table rows unless they are already loaded
    pub async fn load(&mut self, client: &DataApiClient) -> PanelResult<()> {
        if !self.guard.begin() {
            return Ok(());
        }

        let result = client
            .from(MEMBERS)
            .select(&MemberSummary::COLUMNS.join(","))
            .execute::<MemberSummary>()
            .await;

        match result {
            Ok(rows) => {
                tracing::debug!(count = rows.len(), "Loaded members");
                self.rows = rows;
                self.guard.succeed();
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load members");
                self.guard.fail();
                Err(e.into())
            }
        }
    }

    pub fn guard(&self) -> &LoadGuard {
        &self.guard
    }

    pub fn rows(&self) -> &[MemberSummary] {
        &self.rows
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Only sizes from [`PAGE_SIZE_OPTIONS`] are accepted
    pub fn set_page_size(&mut self, size: usize) -> bool {
        if !PAGE_SIZE_OPTIONS.contains(&size) {
            return false;
        }
        self.page_size = size;
        self.page = 0;
        true
    }

    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.page_size).max(1)
    }

    /// Zero-based page, clamped to the last page
    pub fn set_page(&mut self, page: usize) {
        self.page = page.min(self.page_count() - 1);
    }

    pub fn current_page(&self) -> &[MemberSummary] {
        let start = (self.page * self.page_size).min(self.rows.len());
        let end = (start + self.page_size).min(self.rows.len());
        &self.rows[start..end]
    }

    /// Current page as a text table
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<14} {:<20} {:<20} {:<18} {}",
            GRID_COLUMNS[0].1, GRID_COLUMNS[1].1, GRID_COLUMNS[2].1, GRID_COLUMNS[3].1, GRID_COLUMNS[4].1
        );
        let _ = writeln!(out, "{}", "-".repeat(100));

        for row in self.current_page() {
            let _ = writeln!(
                out,
                "{:<14} {:<20} {:<20} {:<18} {}",
                row.member_number,
                display(&row.last_name),
                display(&row.first_name),
                display(&row.phone_number),
                display(&row.email),
            );
        }

        let _ = write!(
            out,
            "Page {} of {} ({} members, {} per page)",
            self.page + 1,
            self.page_count(),
            self.rows.len(),
            self.page_size
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataApiConfig;
    use crate::identity::StaticToken;
    use crate::test_support::{spawn_data_api, FakeDataApi};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    async fn client_for(fake: &Arc<Mutex<FakeDataApi>>) -> DataApiClient {
        let url = spawn_data_api(Arc::clone(fake)).await;
        let config = DataApiConfig {
            url,
            ..Default::default()
        };
        DataApiClient::new(&config, Arc::new(StaticToken::new("t"))).unwrap()
    }

    fn member_row(number: i64, last_name: &str) -> serde_json::Value {
        json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "member_number": number,
            "email": format!("{}@example.org", last_name.to_lowercase()),
            "first_name": "Jan",
            "last_name": last_name,
            "phone_number": null,
            "city": "Praha",
        })
    }

    #[tokio::test]
    async fn test_load_once() {
        let fake = Arc::new(Mutex::new(FakeDataApi::default()));
        fake.lock().unwrap().members = vec![member_row(1, "Novák"), member_row(2, "Svoboda")];
        let client = client_for(&fake).await;

        let mut table = MembersTable::new();
        table.load(&client).await.unwrap();
        table.load(&client).await.unwrap();

        assert_eq!(table.rows().len(), 2);
        assert!(table.guard().initial_data_loaded());

        let fake = fake.lock().unwrap();
        assert_eq!(fake.requests.len(), 1);
        assert_eq!(
            fake.requests[0].query.get("select").map(String::as_str),
            Some("member_number,id,email,first_name,last_name,phone_number")
        );
    }

    #[tokio::test]
    async fn test_failed_load_can_retry() {
        let config = DataApiConfig {
            url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        };
        let client = DataApiClient::new(&config, Arc::new(StaticToken::new("t"))).unwrap();

        let mut table = MembersTable::new();
        assert!(table.load(&client).await.is_err());
        assert!(!table.guard().is_loading());
        assert!(!table.guard().initial_data_loaded());
    }

    #[test]
    fn test_paging_and_render() {
        let mut table = MembersTable::new();
        table.rows = (1..=60)
            .map(|n| MemberSummary {
                member_number: n,
                id: uuid::Uuid::new_v4(),
                email: None,
                first_name: Some("Jan".to_string()),
                last_name: Some(format!("Member{}", n)),
                phone_number: None,
            })
            .collect();

        assert_eq!(table.page_size(), 100);
        assert_eq!(table.page_count(), 1);
        assert!(!table.set_page_size(10));
        assert!(table.set_page_size(25));
        assert_eq!(table.page_count(), 3);

        table.set_page(7);
        assert_eq!(table.current_page().len(), 10);
        assert_eq!(table.current_page()[0].member_number, 51);

        let rendered = table.render();
        assert!(rendered.starts_with("Member Number"));
        assert!(rendered.contains("Member55"));
        assert!(rendered.ends_with("Page 3 of 3 (60 members, 25 per page)"));
    }
}
