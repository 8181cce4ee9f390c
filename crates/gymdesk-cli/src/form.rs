//! Client form state machine and validation.
//!
//! The form moves through explicit phases:
//!
//! ```text
//! Idle -> Editing -> Validating -> Submitting -> (Succeeded | Failed) -> Idle
//! ```
//!
//! Validation runs entirely on this side and failures never reach the
//! network; each broken field gets its own [`FieldError`] so the prompt
//! loop can point at what to fix. Observation drafts carry a stable draft
//! id, so editing or deleting one names the draft itself rather than its
//! current position in the list.

use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use thiserror::Error;

use gymdesk_common::{ClientRecord, CreateClientRequest, Observation, UpdateClientRequest};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    // The pattern is a literal; it cannot fail to compile.
    #[allow(clippy::unwrap_used)]
    let pattern = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    pattern
});

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Where the form currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Idle,
    Editing,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

/// Policy knobs for validation.
#[derive(Debug, Clone)]
pub struct FormPolicy {
    /// Oldest accepted birth year.
    pub minimum_birth_year: i32,
    /// Whether at least one observation is needed before the form can be
    /// submitted.
    pub require_observation: bool,
}

impl Default for FormPolicy {
    fn default() -> Self {
        Self {
            minimum_birth_year: 1900,
            require_observation: false,
        }
    }
}

/// A per-field validation failure, surfaced inline next to its field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct FieldError {
    /// Field the failure belongs to.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Raw field values as the user typed them.
///
/// Dates stay strings until validation, which is where "is this a real
/// calendar date" gets decided.
#[derive(Debug, Clone, Default)]
pub struct ClientFields {
    pub name: String,
    pub last_name: String,
    pub document_number: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub birth_date: String,
    pub registration_date: String,
    pub gender_id: Option<i64>,
    pub blood_type_id: Option<i64>,
    pub client_goal_id: Option<i64>,
}

/// An observation draft inside the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationDraft {
    /// Stable id within this form; survives adds and deletes around it.
    pub draft_id: u32,
    /// Backend id when the draft came from a saved observation.
    pub saved_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
}

/// The client editor form.
#[derive(Debug)]
pub struct ClientForm {
    phase: FormPhase,
    /// Field values, freely editable while the phase allows it.
    pub fields: ClientFields,
    observations: Vec<ObservationDraft>,
    next_draft_id: u32,
    editing_observation: Option<u32>,
    policy: FormPolicy,
}

impl ClientForm {
    /// Create an empty form.
    #[must_use]
    pub fn new(policy: FormPolicy) -> Self {
        Self {
            phase: FormPhase::Idle,
            fields: ClientFields::default(),
            observations: Vec::new(),
            next_draft_id: 1,
            editing_observation: None,
            policy,
        }
    }

    /// Create a form pre-populated from a fetched record.
    #[must_use]
    pub fn from_record(record: &ClientRecord, policy: FormPolicy) -> Self {
        let mut form = Self::new(policy);
        form.fields = ClientFields {
            name: record.name.clone(),
            last_name: record.last_name.clone(),
            document_number: record.document_number.clone(),
            email: record.email.clone(),
            phone_number: record.phone_number.clone().unwrap_or_default(),
            address: record.address.clone().unwrap_or_default(),
            birth_date: record.birth_date.format(DATE_FORMAT).to_string(),
            registration_date: record.registration_date.format(DATE_FORMAT).to_string(),
            gender_id: record
                .gender_id
                .or_else(|| record.gender.as_ref().map(|g| g.id)),
            blood_type_id: record
                .blood_type_id
                .or_else(|| record.blood_type.as_ref().map(|b| b.id)),
            client_goal_id: record
                .client_goal_id
                .or_else(|| record.client_goal.as_ref().map(|g| g.id)),
        };
        for observation in &record.observations {
            let draft_id = form.allocate_draft_id();
            form.observations.push(ObservationDraft {
                draft_id,
                saved_id: observation.id,
                title: observation.title.clone(),
                description: observation.description.clone(),
                date: observation.date,
            });
        }
        form.begin_editing();
        form
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> FormPhase {
        self.phase
    }

    /// The observation drafts, in display order.
    #[must_use]
    pub fn observations(&self) -> &[ObservationDraft] {
        &self.observations
    }

    /// The draft currently being edited, if any.
    #[must_use]
    pub fn editing_observation(&self) -> Option<&ObservationDraft> {
        self.editing_observation
            .and_then(|id| self.observations.iter().find(|o| o.draft_id == id))
    }

    /// Start (or resume) editing.
    pub fn begin_editing(&mut self) {
        self.phase = FormPhase::Editing;
    }

    /// Add an observation draft; returns its stable draft id.
    ///
    /// # Errors
    ///
    /// Title and description are both required.
    pub fn add_observation(
        &mut self,
        title: &str,
        description: &str,
        date: NaiveDate,
    ) -> Result<u32, FieldError> {
        check_observation(title, description)?;
        let draft_id = self.allocate_draft_id();
        self.observations.push(ObservationDraft {
            draft_id,
            saved_id: None,
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            date,
        });
        Ok(draft_id)
    }

    /// Select a draft for editing; returns it for pre-filling the prompt.
    #[must_use]
    pub fn begin_observation_edit(&mut self, draft_id: u32) -> Option<&ObservationDraft> {
        if self.observations.iter().any(|o| o.draft_id == draft_id) {
            self.editing_observation = Some(draft_id);
        } else {
            self.editing_observation = None;
        }
        self.editing_observation()
    }

    /// Replace the selected draft's content and leave edit mode.
    ///
    /// # Errors
    ///
    /// Fails when no draft is selected or the new content is incomplete;
    /// the selection survives so the user can retry.
    pub fn apply_observation_edit(
        &mut self,
        title: &str,
        description: &str,
        date: NaiveDate,
    ) -> Result<(), FieldError> {
        check_observation(title, description)?;
        let Some(draft_id) = self.editing_observation else {
            return Err(FieldError::new("observations", "no observation selected"));
        };
        let Some(draft) = self
            .observations
            .iter_mut()
            .find(|o| o.draft_id == draft_id)
        else {
            return Err(FieldError::new("observations", "observation was removed"));
        };
        draft.title = title.trim().to_string();
        draft.description = description.trim().to_string();
        draft.date = date;
        self.editing_observation = None;
        Ok(())
    }

    /// Leave observation edit mode without changing anything.
    pub fn cancel_observation_edit(&mut self) {
        self.editing_observation = None;
    }

    /// Remove a draft by its stable id; true when something was removed.
    pub fn remove_observation(&mut self, draft_id: u32) -> bool {
        let before = self.observations.len();
        self.observations.retain(|o| o.draft_id != draft_id);
        if self.editing_observation == Some(draft_id) {
            self.editing_observation = None;
        }
        self.observations.len() != before
    }

    /// Validate against "today's" calendar date.
    ///
    /// On success the form holds at [`FormPhase::Validating`] and the
    /// caller gets the parsed values; on failure it drops back to
    /// [`FormPhase::Editing`] with every broken field reported.
    ///
    /// # Errors
    ///
    /// One [`FieldError`] per broken field.
    pub fn validate_at(&mut self, today: NaiveDate) -> Result<ValidatedClient, Vec<FieldError>> {
        self.phase = FormPhase::Validating;
        let mut errors = Vec::new();

        for (field, value) in [
            ("name", &self.fields.name),
            ("last name", &self.fields.last_name),
            ("document number", &self.fields.document_number),
            ("email", &self.fields.email),
        ] {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, "required"));
            }
        }

        if !self.fields.email.trim().is_empty() && !EMAIL.is_match(self.fields.email.trim()) {
            errors.push(FieldError::new("email", "not a valid email address"));
        }

        let gender_id = match self.fields.gender_id {
            Some(id) if id >= 1 => Some(id),
            _ => {
                errors.push(FieldError::new("gender", "select a gender"));
                None
            }
        };
        let blood_type_id = match self.fields.blood_type_id {
            Some(id) if id >= 1 => Some(id),
            _ => {
                errors.push(FieldError::new("blood type", "select a blood type"));
                None
            }
        };

        let birth_date = match parse_birth_date(
            &self.fields.birth_date,
            today,
            self.policy.minimum_birth_year,
        ) {
            Ok(date) => Some(date),
            Err(error) => {
                errors.push(error);
                None
            }
        };

        let registration_date = if self.fields.registration_date.trim().is_empty() {
            None
        } else {
            match NaiveDate::parse_from_str(self.fields.registration_date.trim(), DATE_FORMAT) {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.push(FieldError::new(
                        "registration date",
                        "not a valid date (use YYYY-MM-DD)",
                    ));
                    None
                }
            }
        };

        if self.policy.require_observation && self.observations.is_empty() {
            errors.push(FieldError::new(
                "observations",
                "add at least one observation",
            ));
        }

        if !errors.is_empty() {
            self.phase = FormPhase::Editing;
            return Err(errors);
        }

        // Every empty option above pushed an error, so this cannot fail.
        let (Some(gender_id), Some(blood_type_id), Some(birth_date)) =
            (gender_id, blood_type_id, birth_date)
        else {
            self.phase = FormPhase::Editing;
            return Err(vec![FieldError::new("form", "incomplete")]);
        };

        Ok(ValidatedClient {
            name: self.fields.name.trim().to_string(),
            last_name: self.fields.last_name.trim().to_string(),
            document_number: self.fields.document_number.trim().to_string(),
            email: self.fields.email.trim().to_string(),
            phone_number: optional(&self.fields.phone_number),
            address: optional(&self.fields.address),
            birth_date,
            registration_date,
            gender_id,
            blood_type_id,
            client_goal_id: self.fields.client_goal_id.filter(|id| *id >= 1),
            observations: self
                .observations
                .iter()
                .map(|draft| Observation {
                    id: draft.saved_id,
                    title: draft.title.clone(),
                    description: draft.description.clone(),
                    date: draft.date,
                })
                .collect(),
        })
    }

    /// Validate against the local calendar date.
    ///
    /// # Errors
    ///
    /// Same as [`ClientForm::validate_at`].
    pub fn validate(&mut self) -> Result<ValidatedClient, Vec<FieldError>> {
        self.validate_at(Local::now().date_naive())
    }

    /// The request is on its way.
    pub fn begin_submit(&mut self) {
        self.phase = FormPhase::Submitting;
    }

    /// The request resolved.
    pub fn finish_submit(&mut self, succeeded: bool) {
        self.phase = if succeeded {
            FormPhase::Succeeded
        } else {
            FormPhase::Failed
        };
    }

    /// Back to the starting state.
    pub fn reset(&mut self) {
        self.phase = FormPhase::Idle;
    }

    fn allocate_draft_id(&mut self) -> u32 {
        let draft_id = self.next_draft_id;
        self.next_draft_id += 1;
        draft_id
    }
}

fn check_observation(title: &str, description: &str) -> Result<(), FieldError> {
    if title.trim().is_empty() {
        return Err(FieldError::new("observation title", "required"));
    }
    if description.trim().is_empty() {
        return Err(FieldError::new("observation description", "required"));
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_birth_date(
    value: &str,
    today: NaiveDate,
    minimum_year: i32,
) -> Result<NaiveDate, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::new("birth date", "required"));
    }
    let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) else {
        return Err(FieldError::new(
            "birth date",
            "not a valid date (use YYYY-MM-DD)",
        ));
    };
    if date > today {
        return Err(FieldError::new("birth date", "cannot be in the future"));
    }
    if date.year() < minimum_year {
        return Err(FieldError::new(
            "birth date",
            format!("year must be {minimum_year} or later"),
        ));
    }
    Ok(date)
}

/// A validated, parsed form ready to become a request.
#[derive(Debug, Clone)]
pub struct ValidatedClient {
    pub name: String,
    pub last_name: String,
    pub document_number: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub birth_date: NaiveDate,
    pub registration_date: Option<NaiveDate>,
    pub gender_id: i64,
    pub blood_type_id: i64,
    pub client_goal_id: Option<i64>,
    pub observations: Vec<Observation>,
}

impl ValidatedClient {
    /// Turn the form into a creation payload.
    #[must_use]
    pub fn into_create_request(self) -> CreateClientRequest {
        CreateClientRequest {
            name: self.name,
            last_name: self.last_name,
            gender_id: self.gender_id,
            blood_type_id: self.blood_type_id,
            document_number: self.document_number,
            email: self.email,
            phone_number: self.phone_number,
            address: self.address,
            birth_date: self.birth_date,
            registration_date: self.registration_date,
            client_goal_id: self.client_goal_id,
            client_observations: self.observations,
        }
    }

    /// Turn the form into a full-record update payload.
    #[must_use]
    pub fn into_update_request(self) -> UpdateClientRequest {
        UpdateClientRequest {
            name: Some(self.name),
            last_name: Some(self.last_name),
            gender_id: Some(self.gender_id),
            blood_type_id: Some(self.blood_type_id),
            document_number: Some(self.document_number),
            email: Some(self.email),
            phone_number: self.phone_number,
            address: self.address,
            birth_date: Some(self.birth_date),
            registration_date: self.registration_date,
            client_goal_id: self.client_goal_id,
            client_observations: Some(self.observations),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use gymdesk_common::{BloodType, Gender};

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn today() -> NaiveDate {
        date(2026, 8, 7)
    }

    fn filled_form(policy: FormPolicy) -> ClientForm {
        let mut form = ClientForm::new(policy);
        form.begin_editing();
        form.fields.name = "Juan".to_string();
        form.fields.last_name = "Pérez".to_string();
        form.fields.document_number = "12345678".to_string();
        form.fields.email = "juan@example.com".to_string();
        form.fields.birth_date = "1990-10-10".to_string();
        form.fields.gender_id = Some(1);
        form.fields.blood_type_id = Some(4);
        form
    }

    fn field_names(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_valid_form_produces_create_request() {
        let mut form = filled_form(FormPolicy::default());
        let request = form
            .validate_at(today())
            .unwrap()
            .into_create_request();
        assert_eq!(request.name, "Juan");
        assert_eq!(request.gender_id, 1);
        assert_eq!(request.birth_date, date(1990, 10, 10));
        assert!(request.registration_date.is_none());
    }

    #[test]
    fn test_required_fields_each_get_an_error() {
        let mut form = ClientForm::new(FormPolicy::default());
        form.begin_editing();
        let errors = form.validate_at(today()).unwrap_err();
        let names = field_names(&errors);
        assert!(names.contains(&"name"));
        assert!(names.contains(&"last name"));
        assert!(names.contains(&"document number"));
        assert!(names.contains(&"email"));
        assert!(names.contains(&"gender"));
        assert!(names.contains(&"blood type"));
        assert!(names.contains(&"birth date"));
        assert_eq!(form.phase(), FormPhase::Editing);
    }

    #[test]
    fn test_email_must_look_like_an_address() {
        let mut form = filled_form(FormPolicy::default());
        form.fields.email = "not-an-email".to_string();
        let errors = form.validate_at(today()).unwrap_err();
        assert_eq!(field_names(&errors), vec!["email"]);
    }

    #[test]
    fn test_birth_date_rejects_future_accepts_today() {
        let mut form = filled_form(FormPolicy::default());
        form.fields.birth_date = "2999-01-01".to_string();
        let errors = form.validate_at(today()).unwrap_err();
        assert_eq!(errors[0].field, "birth date");
        assert!(errors[0].message.contains("future"));

        form.fields.birth_date = "2026-08-07".to_string();
        assert!(form.validate_at(today()).is_ok());
    }

    #[test]
    fn test_birth_date_rejects_impossible_and_ancient_dates() {
        let mut form = filled_form(FormPolicy::default());
        form.fields.birth_date = "1990-02-30".to_string();
        assert_eq!(form.validate_at(today()).unwrap_err()[0].field, "birth date");

        form.fields.birth_date = "1899-12-31".to_string();
        let errors = form.validate_at(today()).unwrap_err();
        assert!(errors[0].message.contains("1900"));

        // A stricter minimum year applies when configured.
        let mut form = filled_form(FormPolicy {
            minimum_birth_year: 1950,
            require_observation: false,
        });
        form.fields.birth_date = "1949-06-01".to_string();
        assert!(form.validate_at(today()).is_err());
    }

    #[test]
    fn test_observation_policy_variants() {
        // Default: no observation needed.
        let mut form = filled_form(FormPolicy::default());
        assert!(form.validate_at(today()).is_ok());

        // Strict variant: at least one.
        let mut form = filled_form(FormPolicy {
            minimum_birth_year: 1900,
            require_observation: true,
        });
        let errors = form.validate_at(today()).unwrap_err();
        assert_eq!(field_names(&errors), vec!["observations"]);

        form.add_observation("Schedule", "Morning sessions", today())
            .unwrap();
        assert!(form.validate_at(today()).is_ok());
    }

    #[test]
    fn test_observation_edits_follow_draft_ids_not_positions() {
        let mut form = filled_form(FormPolicy::default());
        let first = form
            .add_observation("Schedule", "Morning sessions", today())
            .unwrap();
        let second = form
            .add_observation("Diet", "Vegetarian", today())
            .unwrap();

        // Select the second draft, then mutate the list under it.
        assert!(form.begin_observation_edit(second).is_some());
        assert!(form.remove_observation(first));

        // The edit still lands on "Diet" even though it moved to index 0.
        form.apply_observation_edit("Diet", "Vegan since June", today())
            .unwrap();
        assert_eq!(form.observations().len(), 1);
        assert_eq!(form.observations()[0].description, "Vegan since June");
        assert_eq!(form.observations()[0].draft_id, second);
    }

    #[test]
    fn test_removing_selected_observation_clears_the_selection() {
        let mut form = filled_form(FormPolicy::default());
        let draft_id = form
            .add_observation("Schedule", "Morning sessions", today())
            .unwrap();
        form.begin_observation_edit(draft_id);
        form.remove_observation(draft_id);

        assert!(form.editing_observation().is_none());
        let err = form
            .apply_observation_edit("Schedule", "Evenings", today())
            .unwrap_err();
        assert_eq!(err.field, "observations");
    }

    #[test]
    fn test_observation_requires_title_and_description() {
        let mut form = filled_form(FormPolicy::default());
        assert!(form.add_observation("", "text", today()).is_err());
        assert!(form.add_observation("title", "  ", today()).is_err());
        assert!(form.observations().is_empty());
    }

    #[test]
    fn test_phase_walk() {
        let mut form = filled_form(FormPolicy::default());
        assert_eq!(form.phase(), FormPhase::Editing);

        assert!(form.validate_at(today()).is_ok());
        assert_eq!(form.phase(), FormPhase::Validating);

        form.begin_submit();
        assert_eq!(form.phase(), FormPhase::Submitting);

        form.finish_submit(true);
        assert_eq!(form.phase(), FormPhase::Succeeded);

        form.reset();
        assert_eq!(form.phase(), FormPhase::Idle);

        // A failed submission parks the form at Failed until reset.
        form.begin_editing();
        let _ = form.validate_at(today());
        form.begin_submit();
        form.finish_submit(false);
        assert_eq!(form.phase(), FormPhase::Failed);
    }

    fn sample_record() -> ClientRecord {
        ClientRecord {
            id: 3,
            name: "Mateo".to_string(),
            last_name: "Briolo".to_string(),
            document_number: "46882993".to_string(),
            email: "mateo@example.com".to_string(),
            phone_number: Some("3531234567".to_string()),
            address: None,
            birth_date: date(2000, 12, 9),
            registration_date: date(2022, 3, 23),
            gender_id: None,
            blood_type_id: None,
            client_goal_id: Some(2),
            gender: Some(Gender {
                id: 1,
                name: "Male".to_string(),
            }),
            blood_type: Some(BloodType {
                id: 4,
                name: "O+".to_string(),
            }),
            client_goal: None,
            subscriptions: Vec::new(),
            observations: vec![Observation {
                id: Some(11),
                title: "Schedule".to_string(),
                description: "Afternoon sessions".to_string(),
                date: date(2022, 3, 23),
            }],
        }
    }

    #[test]
    fn test_unchanged_round_trip_reproduces_the_record() {
        let record = sample_record();
        let mut form = ClientForm::from_record(&record, FormPolicy::default());

        // Submit without touching anything.
        let request = form
            .validate_at(today())
            .unwrap()
            .into_update_request();

        assert_eq!(request.name.as_deref(), Some("Mateo"));
        assert_eq!(request.last_name.as_deref(), Some("Briolo"));
        assert_eq!(request.document_number.as_deref(), Some("46882993"));
        assert_eq!(request.email.as_deref(), Some("mateo@example.com"));
        assert_eq!(request.phone_number.as_deref(), Some("3531234567"));
        assert_eq!(request.address, None);
        assert_eq!(request.birth_date, Some(record.birth_date));
        assert_eq!(request.registration_date, Some(record.registration_date));
        // Expanded relations collapse back to their ids.
        assert_eq!(request.gender_id, Some(1));
        assert_eq!(request.blood_type_id, Some(4));
        assert_eq!(request.client_goal_id, Some(2));

        let observations = request.client_observations.unwrap();
        assert_eq!(observations, record.observations);
    }
}
