//! Membership API Adapter
//!
//! Client the panels use for the membership API. [`ApiAdapter::get`] hands
//! back the raw response; the typed helpers decode the JSON records.

pub mod error;

pub use error::{ApiClientError, ApiClientResult};

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::api::dto::{Accepted, NoteRequest, SessionInfo, StatusResponse};
use crate::config::ApiClientConfig;
use crate::identity::TokenSource;
use crate::model::{
    Member, MemberFilter, MemberOverview, MemberUpdate, MembersStats, NewMember, NewOccupation,
    NewWorkplace, Occupation, Workplace, WorkplaceMember,
};

/// Authenticated client for the membership API
#[derive(Clone)]
pub struct ApiAdapter {
    client: Client,
    base_url: String,
    token: Arc<dyn TokenSource>,
}

impl ApiAdapter {
    pub fn new(config: &ApiClientConfig, token: Arc<dyn TokenSource>) -> ApiClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ApiClientError::Request)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` with JSON and bearer headers, whatever the status
    pub async fn get(&self, path: &str) -> ApiClientResult<Response> {
        let url = self.url(path);
        let request = self.client.get(&url);
        self.authorized(request)
            .await?
            .send()
            .await
            .map_err(|e| ApiClientError::from_reqwest(e, &url))
    }

    async fn authorized(&self, request: RequestBuilder) -> ApiClientResult<RequestBuilder> {
        let token = self.token.bearer_token().await?;
        Ok(request
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(token))
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ApiClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self
            .authorized(request)
            .await?
            .send()
            .await
            .map_err(|e| ApiClientError::from_reqwest(e, &url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ApiClientError::from_body(status.as_u16(), &body);
            tracing::warn!(%method, url = %url, status = status.as_u16(), error = %err, "Membership API request failed");
            return Err(err);
        }

        response
            .json()
            .await
            .map_err(|e| ApiClientError::Decode(e.to_string()))
    }

    pub async fn status(&self) -> ApiClientResult<StatusResponse> {
        self.call::<(), _>(Method::GET, "status", None).await
    }

    pub async fn list_members(&self, filter: MemberFilter) -> ApiClientResult<Vec<MemberOverview>> {
        self.call::<(), _>(Method::GET, filter.path(), None).await
    }

    pub async fn member_detail(&self, id: Uuid) -> ApiClientResult<Member> {
        self.call::<(), _>(Method::GET, &format!("members/{}", id), None)
            .await
    }

    pub async fn list_occupations(&self, id: Uuid) -> ApiClientResult<Vec<Occupation>> {
        self.call::<(), _>(Method::GET, &format!("members/{}/occupations", id), None)
            .await
    }

    pub async fn create_member(&self, member: &NewMember) -> ApiClientResult<MemberOverview> {
        self.call(Method::POST, "members", Some(member)).await
    }

    pub async fn update_member(&self, id: Uuid, update: &MemberUpdate) -> ApiClientResult<Member> {
        self.call(Method::PATCH, &format!("members/{}", id), Some(update))
            .await
    }

    pub async fn update_note(&self, id: Uuid, note: Option<String>) -> ApiClientResult<Member> {
        self.call(
            Method::PATCH,
            &format!("members/{}/note", id),
            Some(&NoteRequest { note }),
        )
        .await
    }

    /// Mark the member as left
    pub async fn remove_member(&self, id: Uuid) -> ApiClientResult<Member> {
        self.call::<(), _>(Method::DELETE, &format!("members/{}", id), None)
            .await
    }

    pub async fn add_occupation(&self, id: Uuid, occupation: &NewOccupation) -> ApiClientResult<Occupation> {
        self.call(
            Method::POST,
            &format!("members/{}/occupations", id),
            Some(occupation),
        )
        .await
    }

    pub async fn current_session(&self) -> ApiClientResult<SessionInfo> {
        self.call::<(), _>(Method::GET, "session/current", None).await
    }

    pub async fn members_stats(&self) -> ApiClientResult<MembersStats> {
        self.call::<(), _>(Method::GET, "stats/members/basic", None)
            .await
    }

    pub async fn list_workplaces(&self) -> ApiClientResult<Vec<Workplace>> {
        self.call::<(), _>(Method::GET, "workplaces", None).await
    }

    pub async fn create_workplace(&self, workplace: &NewWorkplace) -> ApiClientResult<Workplace> {
        self.call(Method::POST, "workplaces", Some(workplace)).await
    }

    pub async fn workplace_members(&self, id: Uuid) -> ApiClientResult<Vec<MemberOverview>> {
        self.call::<(), _>(Method::GET, &format!("workplaces/{}", id), None)
            .await
    }

    pub async fn assign_to_workplace(&self, id: Uuid, member_id: Uuid) -> ApiClientResult<Accepted> {
        self.call(
            Method::POST,
            &format!("workplaces/{}", id),
            Some(&WorkplaceMember { member_id }),
        )
        .await
    }

    pub async fn remove_from_workplace(&self, id: Uuid, member_id: Uuid) -> ApiClientResult<Accepted> {
        self.call(
            Method::DELETE,
            &format!("workplaces/{}", id),
            Some(&WorkplaceMember { member_id }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::testing::{authorizer, token_with_roles};
    use crate::api::auth::Role;
    use crate::api::{build_router, ApiConfig, AppState};
    use crate::identity::StaticToken;
    use crate::store::MemberStore;
    use crate::test_support::spawn_stub;

    async fn setup(roles: &[Role]) -> ApiAdapter {
        let store = Arc::new(MemberStore::in_memory().unwrap());
        let state = AppState::new(store, Arc::new(authorizer()), ApiConfig::default());
        let url = spawn_stub(build_router(state)).await;

        let config = ApiClientConfig {
            url,
            ..Default::default()
        };
        ApiAdapter::new(&config, Arc::new(StaticToken::new(token_with_roles(roles)))).unwrap()
    }

    #[tokio::test]
    async fn test_raw_get() {
        let adapter = setup(&[]).await;
        let response = adapter.get("/status").await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let status: StatusResponse = response.json().await.unwrap();
        assert!(status.database_connected);
    }

    #[tokio::test]
    async fn test_member_roundtrip() {
        let adapter = setup(&[Role::ListMembers, Role::ManageMembers]).await;

        let created = adapter
            .create_member(&NewMember {
                email: Some("jana@example.org".to_string()),
                first_name: Some("Jana".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.member_number, 1);

        let mut update = MemberUpdate::from(&adapter.member_detail(created.id).await.unwrap());
        update.phone_number = Some("+420 777 123 456".to_string());
        let member = adapter.update_member(created.id, &update).await.unwrap();
        assert_eq!(member.phone_number.as_deref(), Some("+420 777 123 456"));

        adapter
            .add_occupation(
                created.id,
                &NewOccupation {
                    company_name: Some("ACME".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(adapter.list_occupations(created.id).await.unwrap().len(), 1);

        let noted = adapter
            .update_note(created.id, Some("founder".to_string()))
            .await
            .unwrap();
        assert_eq!(noted.note.as_deref(), Some("founder"));

        adapter.remove_member(created.id).await.unwrap();
        assert_eq!(adapter.list_members(MemberFilter::Past).await.unwrap().len(), 1);
        assert_eq!(
            adapter.members_stats().await.unwrap(),
            MembersStats {
                new: 0,
                current: 0,
                past: 1
            }
        );

        let session = adapter.current_session().await.unwrap();
        assert_eq!(session.token_claims.preferred_username.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_workplace_roundtrip() {
        let adapter = setup(&[
            Role::ListMembers,
            Role::ManageMembers,
            Role::ListWorkplaces,
            Role::ManageWorkplaces,
        ])
        .await;

        let workplace = adapter
            .create_workplace(&NewWorkplace {
                name: Some("Depo Hostivař".to_string()),
                email: Some("depo@example.org".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(adapter.list_workplaces().await.unwrap(), vec![workplace.clone()]);

        let member = adapter
            .create_member(&NewMember {
                email: Some("jana@example.org".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let accepted = adapter.assign_to_workplace(workplace.id, member.id).await.unwrap();
        assert_eq!(accepted.status, 202);
        let members = adapter.workplace_members(workplace.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, member.id);

        let err = adapter
            .assign_to_workplace(workplace.id, member.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiClientError::Api { status: 409, .. }));

        adapter.remove_from_workplace(workplace.id, member.id).await.unwrap();
        assert!(adapter.workplace_members(workplace.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_body_is_decoded() {
        let adapter = setup(&[Role::ViewMember]).await;

        let err = adapter.list_members(MemberFilter::All).await.unwrap_err();
        match err {
            ApiClientError::Api { status, reason, .. } => {
                assert_eq!(status, 403);
                assert_eq!(reason, "Forbidden");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
