//! Backend route table.
//!
//! Paths are relative to the configured base URL.

pub const LOGIN: &str = "users/login";
pub const REGISTER: &str = "users/register";
pub const REFRESH: &str = "users/refresh-token";
pub const ME: &str = "users/me";
pub const CAN_DO: &str = "users/can-do";
pub const CLIENTS: &str = "client";
pub const ATTENDANCE: &str = "client/attendance";
pub const FEE_COLLECTION: &str = "client/fee-collection";
pub const GENDERS: &str = "gender";
pub const BLOOD_TYPES: &str = "blood-type";
pub const STATES: &str = "state";
pub const CLIENT_GOALS: &str = "client-goals";
pub const MEMBERSHIPS: &str = "membership";
