//! Reference-data operations.
//!
//! Lookups populate form choices; the mutation endpoints exist for
//! back-office maintenance of the catalogs.

use serde::Serialize;

use gymdesk_common::{BloodType, ClientGoal, Gender, Membership, NewMembership, State};

use crate::error::Result;
use crate::http::Http;
use crate::routes;

#[derive(Serialize)]
struct Named<'a> {
    name: &'a str,
}

/// Reference-data endpoint surface.
pub struct CatalogApi {
    http: Http,
}

impl CatalogApi {
    pub(crate) const fn new(http: Http) -> Self {
        Self { http }
    }

    /// All gender options.
    pub async fn genders(&self) -> Result<Vec<Gender>> {
        self.http.get(routes::GENDERS).await
    }

    /// All blood-type options.
    pub async fn blood_types(&self) -> Result<Vec<BloodType>> {
        self.http.get(routes::BLOOD_TYPES).await
    }

    /// All states/provinces.
    pub async fn states(&self) -> Result<Vec<State>> {
        self.http.get(routes::STATES).await
    }

    /// All training goals.
    pub async fn client_goals(&self) -> Result<Vec<ClientGoal>> {
        self.http.get(routes::CLIENT_GOALS).await
    }

    /// All membership plans.
    pub async fn memberships(&self) -> Result<Vec<Membership>> {
        self.http.get(routes::MEMBERSHIPS).await
    }

    /// Add a gender option.
    pub async fn create_gender(&self, name: &str) -> Result<Gender> {
        self.http.post(routes::GENDERS, &Named { name }).await
    }

    /// Add a blood-type option.
    pub async fn create_blood_type(&self, name: &str) -> Result<BloodType> {
        self.http.post(routes::BLOOD_TYPES, &Named { name }).await
    }

    /// Add a state/province.
    pub async fn create_state(&self, name: &str) -> Result<State> {
        self.http.post(routes::STATES, &Named { name }).await
    }

    /// Add a membership plan.
    pub async fn create_membership(&self, membership: &NewMembership) -> Result<Membership> {
        self.http.post(routes::MEMBERSHIPS, membership).await
    }

    /// Replace a membership plan.
    pub async fn update_membership(
        &self,
        id: i64,
        membership: &NewMembership,
    ) -> Result<Membership> {
        self.http
            .put(&format!("{}/{id}", routes::MEMBERSHIPS), membership)
            .await
    }

    /// Remove a membership plan.
    pub async fn delete_membership(&self, id: i64) -> Result<()> {
        self.http
            .delete_discarding(&format!("{}/{id}", routes::MEMBERSHIPS))
            .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::{ClientConfig, LogSessionExpired, build_transport};
    use crate::session::MemorySessionStore;

    fn catalog_api(base_url: &str) -> CatalogApi {
        let config = ClientConfig::new(base_url);
        let client = build_transport(
            &config,
            Arc::new(MemorySessionStore::new()),
            Arc::new(LogSessionExpired),
        )
        .unwrap();
        CatalogApi::new(Http::new(client, base_url))
    }

    #[tokio::test]
    async fn test_lookups_deserialize_collections() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gender"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "name": "Male"},
                {"id": 2, "name": "Female"},
                {"id": 3, "name": "Prefer not to say"}
            ])))
            .mount(&server)
            .await;

        let api = catalog_api(&server.uri());
        let genders = api.genders().await.unwrap();
        assert_eq!(genders.len(), 3);
        assert_eq!(genders[2].name, "Prefer not to say");
    }

    #[tokio::test]
    async fn test_create_posts_name_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/blood-type"))
            .and(body_json(serde_json::json!({"name": "O+"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"id": 4, "name": "O+"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = catalog_api(&server.uri());
        let blood_type = api.create_blood_type("O+").await.unwrap();
        assert_eq!(blood_type.id, 4);
    }

    #[tokio::test]
    async fn test_delete_membership_tolerates_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/membership/2"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let api = catalog_api(&server.uri());
        api.delete_membership(2).await.unwrap();
    }
}
