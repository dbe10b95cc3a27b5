//! In-process stand-ins for the identity provider and the data API.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Serve `router` on a random local port, returning its base URL
pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Request seen by [`FakeDataApi`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub table: String,
    pub query: HashMap<String, String>,
    pub prefer: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// Minimal data API: `members` and `occupations`, eq filters, projection,
/// insert and merge-duplicates upsert
#[derive(Debug, Default)]
pub struct FakeDataApi {
    pub members: Vec<Value>,
    pub occupations: Vec<Value>,
    pub requests: Vec<RecordedRequest>,
    /// Writes to these tables answer 400
    pub failing_tables: HashSet<String>,
}

impl FakeDataApi {
    fn rows_mut(&mut self, table: &str) -> Option<&mut Vec<Value>> {
        match table {
            "members" => Some(&mut self.members),
            "occupations" => Some(&mut self.occupations),
            _ => None,
        }
    }

    pub fn writes_to(&self, table: &str) -> usize {
        self.requests
            .iter()
            .filter(|r| r.method == "POST" && r.table == table)
            .count()
    }
}

type Shared = Arc<Mutex<FakeDataApi>>;

pub async fn spawn_data_api(fake: Shared) -> String {
    let router = Router::new()
        .route("/:table", get(select_rows).post(write_rows))
        .with_state(fake);
    spawn_stub(router).await
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn error_body(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({"code": code, "message": message, "details": null, "hint": null})),
    )
        .into_response()
}

async fn select_rows(
    State(fake): State<Shared>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let mut fake = fake.lock().unwrap();
    fake.requests.push(RecordedRequest {
        method: "GET".to_string(),
        table: table.clone(),
        query: params.iter().cloned().collect(),
        prefer: header(&headers, "prefer"),
        authorization: header(&headers, "authorization"),
        body: None,
    });

    let Some(rows) = fake.rows_mut(&table) else {
        return error_body(StatusCode::NOT_FOUND, "42P01", "relation does not exist");
    };

    let filters: Vec<(&String, &str)> = params
        .iter()
        .filter_map(|(k, v)| v.strip_prefix("eq.").map(|v| (k, v)))
        .collect();
    let columns: Option<Vec<&str>> = params
        .iter()
        .find(|(k, _)| k == "select")
        .map(|(_, v)| v.as_str())
        .filter(|v| *v != "*")
        .map(|v| v.split(',').collect());

    let selected: Vec<Value> = rows
        .iter()
        .filter(|row| {
            filters
                .iter()
                .all(|(col, expected)| row.get(col.as_str()).map(value_as_text).as_deref() == Some(*expected))
        })
        .map(|row| match &columns {
            None => row.clone(),
            Some(cols) => {
                let mut projected = Map::new();
                for col in cols {
                    projected.insert(col.to_string(), row.get(*col).cloned().unwrap_or(Value::Null));
                }
                Value::Object(projected)
            }
        })
        .collect();

    Json(selected).into_response()
}

async fn write_rows(
    State(fake): State<Shared>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut fake = fake.lock().unwrap();
    let prefer = header(&headers, "prefer").unwrap_or_default();
    fake.requests.push(RecordedRequest {
        method: "POST".to_string(),
        table: table.clone(),
        query: params.iter().cloned().collect(),
        prefer: Some(prefer.clone()).filter(|p| !p.is_empty()),
        authorization: header(&headers, "authorization"),
        body: Some(body.clone()),
    });

    if fake.failing_tables.contains(&table) {
        return error_body(StatusCode::BAD_REQUEST, "PGRST102", "rejected by test");
    }

    let upsert = prefer.contains("resolution=merge-duplicates");
    let conflict_column = params
        .iter()
        .find(|(k, _)| k == "on_conflict")
        .map(|(_, v)| v.clone())
        .unwrap_or_else(|| "id".to_string());

    let records = match body {
        Value::Array(items) => items,
        single => vec![single],
    };

    let Some(rows) = fake.rows_mut(&table) else {
        return error_body(StatusCode::NOT_FOUND, "42P01", "relation does not exist");
    };

    let mut written = Vec::new();
    for record in records {
        let Value::Object(mut record) = record else {
            return error_body(StatusCode::BAD_REQUEST, "PGRST102", "expected object");
        };

        if upsert {
            if let Some(key) = record.get(&conflict_column).filter(|v| !v.is_null()).cloned() {
                if let Some(existing) = rows.iter_mut().find(|r| r.get(&conflict_column) == Some(&key)) {
                    if let Value::Object(fields) = existing {
                        for (k, v) in record {
                            fields.insert(k, v);
                        }
                    }
                    written.push(existing.clone());
                    continue;
                }
            }
        }

        if table == "members" {
            let number = record.get("member_number").cloned().unwrap_or(Value::Null);
            if !number.is_null() && rows.iter().any(|r| r.get("member_number") == Some(&number)) {
                return error_body(
                    StatusCode::CONFLICT,
                    "23505",
                    "duplicate key value violates unique constraint \"members_member_number_key\"",
                );
            }
        }

        if record.get("id").map_or(true, Value::is_null) {
            record.insert("id".to_string(), json!(uuid::Uuid::new_v4().to_string()));
        }
        let row = Value::Object(record);
        rows.push(row.clone());
        written.push(row);
    }

    if prefer.contains("return=representation") {
        (StatusCode::CREATED, Json(Value::Array(written))).into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}
