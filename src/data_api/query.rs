//! Request builders for the data API verbs
//!
//! ```rust,ignore
//! let rows: Vec<MemberSummary> = client
//!     .from("members")
//!     .select("member_number,id,email")
//!     .eq("member_number", 42)
//!     .execute()
//!     .await?;
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::client::DataApiClient;
use super::error::{DataApiError, DataApiResult};

/// `Prefer` value asking for the written rows back
pub const RETURN_REPRESENTATION: &str = "return=representation";

/// `Prefer` value turning an insert into an upsert
pub const MERGE_DUPLICATES: &str = "resolution=merge-duplicates";

/// A table of the data API
pub struct Table<'a> {
    client: &'a DataApiClient,
    name: String,
}

impl<'a> Table<'a> {
    pub(crate) fn new(client: &'a DataApiClient, name: &str) -> Self {
        Self {
            client,
            name: name.to_string(),
        }
    }

    /// Read rows, projecting `columns` (`*` for all)
    pub fn select(self, columns: &str) -> Select<'a> {
        Select {
            client: self.client,
            table: self.name,
            params: vec![("select".to_string(), columns.to_string())],
        }
    }

    /// Insert one record or an array of records
    pub fn insert<T: Serialize + ?Sized>(self, record: &T) -> Mutation<'a> {
        Mutation::new(self, record, MutationKind::Insert)
    }

    /// Insert, merging into existing rows on primary key conflicts
    pub fn upsert<T: Serialize + ?Sized>(self, record: &T) -> Mutation<'a> {
        Mutation::new(self, record, MutationKind::Upsert)
    }
}

/// Read request
pub struct Select<'a> {
    client: &'a DataApiClient,
    table: String,
    params: Vec<(String, String)>,
}

impl<'a> Select<'a> {
    /// Filter `column = value`
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".to_string(), format!("{}.{}", column, direction)));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.params.push(("limit".to_string(), count.to_string()));
        self
    }

    /// Query string parameters in the order they were added
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.params
    }

    pub async fn execute<T: DeserializeOwned>(self) -> DataApiResult<Vec<T>> {
        let url = self.client.table_url(&self.table);
        let request = self.client.http().get(&url).query(&self.params);

        let response = self.client.send(request, &url).await?;
        let rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| DataApiError::Decode(e.to_string()))?;

        tracing::debug!(table = %self.table, rows = rows.len(), "Selected rows");
        Ok(rows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MutationKind {
    Insert,
    Upsert,
}

/// Insert or upsert request
pub struct Mutation<'a> {
    client: &'a DataApiClient,
    table: String,
    body: Result<serde_json::Value, String>,
    kind: MutationKind,
    on_conflict: Option<String>,
    representation: bool,
}

impl<'a> Mutation<'a> {
    fn new<T: Serialize + ?Sized>(table: Table<'a>, record: &T, kind: MutationKind) -> Self {
        Self {
            client: table.client,
            table: table.name,
            body: serde_json::to_value(record).map_err(|e| e.to_string()),
            kind,
            on_conflict: None,
            representation: true,
        }
    }

    /// Column(s) identifying the row an upsert merges into
    pub fn on_conflict(mut self, columns: &str) -> Self {
        self.on_conflict = Some(columns.to_string());
        self
    }

    /// Do not ask for the written rows back
    pub fn minimal(mut self) -> Self {
        self.representation = false;
        self
    }

    /// Value of the `Prefer` header sent with this request
    pub fn prefer_header(&self) -> String {
        let mut prefs = Vec::new();
        if self.kind == MutationKind::Upsert {
            prefs.push(MERGE_DUPLICATES);
        }
        prefs.push(if self.representation {
            RETURN_REPRESENTATION
        } else {
            "return=minimal"
        });
        prefs.join(",")
    }

    /// Send the request, returning the written rows when the API sends them
    pub async fn execute<T: DeserializeOwned>(self) -> DataApiResult<Vec<T>> {
        let body = self.body.clone().map_err(DataApiError::Decode)?;
        let url = self.client.table_url(&self.table);

        let mut request = self
            .client
            .http()
            .post(&url)
            .header("Prefer", self.prefer_header())
            .json(&body);
        if let Some(columns) = &self.on_conflict {
            request = request.query(&[("on_conflict", columns)]);
        }

        let response = self.client.send(request, &url).await?;
        let text = response
            .text()
            .await
            .map_err(|e| DataApiError::Decode(e.to_string()))?;

        tracing::debug!(table = %self.table, kind = ?self.kind, "Wrote rows");

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| DataApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataApiConfig;
    use crate::identity::StaticToken;
    use std::sync::Arc;

    fn client() -> DataApiClient {
        DataApiClient::new(&DataApiConfig::default(), Arc::new(StaticToken::new("t"))).unwrap()
    }

    #[test]
    fn test_select_query_pairs() {
        let client = client();
        let select = client
            .from("members")
            .select("member_number,id,email")
            .eq("member_number", 42)
            .order("last_name", true)
            .limit(10);

        let pairs: Vec<(&str, &str)> = select
            .query_pairs()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("select", "member_number,id,email"),
                ("member_number", "eq.42"),
                ("order", "last_name.asc"),
                ("limit", "10"),
            ]
        );
    }

    #[test]
    fn test_prefer_headers() {
        let client = client();
        let record = serde_json::json!({"a": 1});

        assert_eq!(
            client.from("members").insert(&record).prefer_header(),
            "return=representation"
        );
        assert_eq!(
            client.from("members").upsert(&record).prefer_header(),
            "resolution=merge-duplicates,return=representation"
        );
        assert_eq!(
            client.from("members").insert(&record).minimal().prefer_header(),
            "return=minimal"
        );
    }
}
