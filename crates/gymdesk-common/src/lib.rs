//! # gymdesk-common
//!
//! Common types for the gymdesk gym-management client.
//!
//! This crate provides the data structures shared between the API client and
//! the terminal front end:
//! - Authentication payloads and the user model
//! - Client (member) records and their request types
//! - Reference-data catalogs (genders, blood types, goals, memberships)
//! - Server-driven pagination
//!
//! ## Example
//!
//! ```
//! use gymdesk_common::{CreateClientRequest, Observation, PageQuery, SortOrder};
//! use chrono::NaiveDate;
//!
//! let request = CreateClientRequest::builder()
//!     .name("Juan")
//!     .last_name("Pérez")
//!     .gender_id(1)
//!     .blood_type_id(2)
//!     .document_number("12345678")
//!     .email("juan.perez@example.com")
//!     .birth_date(NaiveDate::from_ymd_opt(1990, 10, 10).unwrap())
//!     .client_observations(vec![Observation::new(
//!         "Schedule",
//!         "Prefers morning sessions",
//!         NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
//!     )])
//!     .build();
//!
//! let query = PageQuery::new()
//!     .with_page(2)
//!     .with_sort("lastName", SortOrder::Asc);
//! # let _ = (request, query);
//! ```

/// Authentication payloads, users, roles, and token claims.
pub mod auth;
/// Reference-data catalogs served by the backend.
pub mod catalog;
/// Client (member) records and their request types.
pub mod client;
/// Server-driven pagination types.
pub mod page;

pub use auth::{
    AuthSession, Credentials, Permission, Profile, RegisterRequest, Role, TokenClaims, User,
};
pub use catalog::{BloodType, ClientGoal, Gender, Membership, NewMembership, State};
pub use client::{
    AttendanceRequest, ClientRecord, CreateClientRequest, FeeCollectionRequest, NewSubscription,
    Observation, Subscription, UpdateClientRequest,
};
pub use page::{Page, PageQuery, SortOrder};
