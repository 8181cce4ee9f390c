//! Client (member) record operations.
//!
//! Thin request/response mappings over the `/client` endpoints. The only
//! logic on this side is a pre-submission check of the required reference
//! fields, which skips a round trip the backend would reject anyway; the
//! backend stays authoritative for everything.

use serde::Deserialize;

use gymdesk_common::{
    AttendanceRequest, ClientRecord, CreateClientRequest, FeeCollectionRequest, NewSubscription,
    Page, PageQuery, Subscription, UpdateClientRequest,
};

use crate::error::{ApiError, Result};
use crate::http::Http;
use crate::routes;

/// Acknowledgement for operations whose body the front end does not
/// consume beyond an optional message.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    /// Backend message, when one is included.
    #[serde(default)]
    pub message: Option<String>,
}

/// `/client` endpoint surface.
pub struct ClientsApi {
    http: Http,
}

impl ClientsApi {
    pub(crate) const fn new(http: Http) -> Self {
        Self { http }
    }

    /// Fetch one page of the member list.
    pub async fn list(&self, query: &PageQuery) -> Result<Page<ClientRecord>> {
        self.http.get_with_query(routes::CLIENTS, query).await
    }

    /// Create a member record.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] before any request is sent when a required
    /// reference field does not point at a selectable row.
    pub async fn create(&self, request: &CreateClientRequest) -> Result<ClientRecord> {
        check_reference("gender", Some(request.gender_id))?;
        check_reference("blood type", Some(request.blood_type_id))?;
        self.http.post(routes::CLIENTS, request).await
    }

    /// Update a member record; omitted fields are left untouched.
    pub async fn update(&self, id: i64, request: &UpdateClientRequest) -> Result<ClientRecord> {
        check_reference("gender", request.gender_id)?;
        check_reference("blood type", request.blood_type_id)?;
        self.http
            .put(&format!("{}/{id}", routes::CLIENTS), request)
            .await
    }

    /// Delete a member record.
    pub async fn delete(&self, id: i64) -> Result<OperationStatus> {
        self.http.delete(&format!("{}/{id}", routes::CLIENTS)).await
    }

    /// Register an attendance by the member's document number.
    pub async fn register_attendance(
        &self,
        request: &AttendanceRequest,
    ) -> Result<OperationStatus> {
        self.http.post(routes::ATTENDANCE, request).await
    }

    /// Register a fee payment.
    pub async fn register_fee_collection(
        &self,
        request: &FeeCollectionRequest,
    ) -> Result<OperationStatus> {
        self.http.post(routes::FEE_COLLECTION, request).await
    }

    /// Fetch a member's active subscription.
    pub async fn current_subscription(&self, client_id: i64) -> Result<Subscription> {
        self.http
            .get(&format!("{}/{client_id}/currentSubscription", routes::CLIENTS))
            .await
    }

    /// Open a subscription for a member.
    pub async fn create_subscription(
        &self,
        client_id: i64,
        request: &NewSubscription,
    ) -> Result<Subscription> {
        self.http
            .post(&format!("{}/{client_id}/subscription", routes::CLIENTS), request)
            .await
    }

    /// Close a member's active subscription.
    pub async fn deactivate_subscription(&self, client_id: i64) -> Result<OperationStatus> {
        self.http
            .get(&format!(
                "{}/{client_id}/makeSubscriptionInActive",
                routes::CLIENTS
            ))
            .await
    }
}

/// Reference ids are backend row ids; anything below 1 can only be an
/// unselected form placeholder.
fn check_reference(field: &str, id: Option<i64>) -> Result<()> {
    match id {
        Some(id) if id < 1 => Err(ApiError::Validation(format!("select a {field}"))),
        _ => Ok(()),
    }
}
