//! Reference-data catalogs.
//!
//! Small, rarely-changing lookup collections used to populate form choices.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// A gender option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gender {
    pub id: i64,
    pub name: String,
}

/// A blood-type option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodType {
    pub id: i64,
    pub name: String,
}

/// A state or province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub id: i64,
    pub name: String,
}

/// A training goal a client can pursue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientGoal {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A membership plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Plan price per period.
    pub price: f64,
    /// Plan duration in days.
    pub duration: u32,
}

/// Payload for creating or replacing a membership plan.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
pub struct NewMembership {
    #[builder(setter(into))]
    pub name: String,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    /// Duration in days.
    pub duration: u32,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_new_membership_builder_skips_empty_description() {
        let membership = NewMembership::builder()
            .name("Monthly")
            .price(30.0)
            .duration(30)
            .build();

        let json = serde_json::to_value(&membership).unwrap();
        assert_eq!(json["name"], "Monthly");
        assert!(json.get("description").is_none());
    }
}
