//! Client (member) records and their request types.
//!
//! The backend owns every record's lifecycle; the types here are the typed
//! request/response mappings the front end exchanges with it. Create and
//! update requests are distinct types rather than loose maps, so each
//! endpoint's contract is explicit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::catalog::{BloodType, ClientGoal, Gender, Membership};

/// A gym client (member) record as served by the backend.
///
/// Reference relations come in two forms: bare ids (for submitting) and
/// expanded objects (for display), matching what each endpoint includes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: i64,
    pub name: String,
    pub last_name: String,
    pub document_number: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub birth_date: NaiveDate,
    pub registration_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_goal_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<BloodType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_goal: Option<ClientGoal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscriptions: Vec<Subscription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<Observation>,
}

/// A free-text, dated annotation attached to a member record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Backend identifier; absent on observations that have not been saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
}

impl Observation {
    /// Create an unsaved observation.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: description.into(),
            date,
        }
    }
}

/// A membership subscription held by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub client_id: i64,
    pub membership_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership: Option<Membership>,
}

/// Payload for `POST /client`.
///
/// Matches the backend's client DTO. Gender and blood type are required by
/// the backend; the client checks them before submitting to skip a doomed
/// round trip.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[builder(setter(into))]
    pub name: String,
    #[builder(setter(into))]
    pub last_name: String,
    pub gender_id: i64,
    pub blood_type_id: i64,
    #[builder(setter(into))]
    pub document_number: String,
    #[builder(setter(into))]
    pub email: String,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub birth_date: NaiveDate,
    /// Defaults to "today" on the backend when omitted.
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<NaiveDate>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_goal_id: Option<i64>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub client_observations: Vec<Observation>,
}

/// Payload for `PUT /client/:id`.
///
/// Every field optional; omitted fields are left untouched by the backend.
#[derive(Debug, Clone, Default, Serialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender_id: Option<i64>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_type_id: Option<i64>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<NaiveDate>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_goal_id: Option<i64>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_observations: Option<Vec<Observation>>,
}

/// Payload for `POST /client/attendance`.
///
/// Attendance is keyed by document number, the id a member states at the
/// front desk.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub document_number: String,
}

impl AttendanceRequest {
    /// Create an attendance registration for a document number.
    #[must_use]
    pub fn new(document_number: impl Into<String>) -> Self {
        Self {
            document_number: document_number.into(),
        }
    }
}

/// Payload for `POST /client/fee-collection`.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct FeeCollectionRequest {
    pub client_id: i64,
    /// Amount collected.
    pub amount: f64,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership_id: Option<i64>,
    /// Defaults to "today" on the backend when omitted.
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// Payload for `POST /client/:id/subscription`.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    pub membership_id: i64,
    /// Defaults to "today" on the backend when omitted.
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}
