//! Onboarding form fields and payload types.
//!
//! [`FieldId`] is the closed set of form fields. Validation rules, step
//! ownership and telemetry completion tracking all key off it, so adding a
//! field is a single enum edit.
//!
//! Two payload shapes exist:
//!
//! - [`FormDraft`] is the raw, partially-filled state the user is editing.
//!   Every field is optional and loosely typed so that half-typed input can
//!   be held, persisted and validated.
//! - [`FormRecord`] is the canonical payload. It can only be produced by
//!   [`validate_all`](crate::validation::validate_all).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Field identifiers
// ---------------------------------------------------------------------------

/// Every field of the onboarding form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldId {
    FullName,
    Email,
    CompanyName,
    Services,
    BudgetUsd,
    ProjectStartDate,
    AcceptTerms,
}

impl FieldId {
    /// All fields in form order.
    pub const ALL: [FieldId; 7] = [
        Self::FullName,
        Self::Email,
        Self::CompanyName,
        Self::Services,
        Self::BudgetUsd,
        Self::ProjectStartDate,
        Self::AcceptTerms,
    ];

    /// Fields that must be filled for the form to be complete.
    pub const REQUIRED: [FieldId; 6] = [
        Self::FullName,
        Self::Email,
        Self::CompanyName,
        Self::Services,
        Self::ProjectStartDate,
        Self::AcceptTerms,
    ];

    /// Parse a wire field name (`"fullName"`, `"budgetUsd"`, ...).
    pub fn from_name(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown form field '{s}'")))
    }

    /// The wire name used in JSON payloads and telemetry.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::Email => "email",
            Self::CompanyName => "companyName",
            Self::Services => "services",
            Self::BudgetUsd => "budgetUsd",
            Self::ProjectStartDate => "projectStartDate",
            Self::AcceptTerms => "acceptTerms",
        }
    }

    /// Human-readable label for the field.
    pub fn label(self) -> &'static str {
        match self {
            Self::FullName => "Full Name",
            Self::Email => "Email",
            Self::CompanyName => "Company Name",
            Self::Services => "Services Interested In",
            Self::BudgetUsd => "Budget (USD)",
            Self::ProjectStartDate => "Project Start Date",
            Self::AcceptTerms => "Accept Terms",
        }
    }

    pub fn is_required(self) -> bool {
        self != Self::BudgetUsd
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// The services a client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ServiceOption {
    #[serde(rename = "UI/UX")]
    UiUx,
    #[serde(rename = "Branding")]
    Branding,
    #[serde(rename = "Web Dev")]
    WebDev,
    #[serde(rename = "Mobile App")]
    MobileApp,
}

impl ServiceOption {
    pub const ALL: [ServiceOption; 4] = [Self::UiUx, Self::Branding, Self::WebDev, Self::MobileApp];

    /// Parse the display string of a service.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UiUx => "UI/UX",
            Self::Branding => "Branding",
            Self::WebDev => "Web Dev",
            Self::MobileApp => "Mobile App",
        }
    }
}

// ---------------------------------------------------------------------------
// Draft (raw form state)
// ---------------------------------------------------------------------------

/// The in-progress form state.
///
/// `None` means the field has never been set. Values are stored as the user
/// entered them; nothing here is guaranteed valid. Budget and consent keep
/// the raw JSON value so a wrongly typed entry reaches validation instead of
/// failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_usd: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_terms: Option<serde_json::Value>,
}

/// A single field assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    FullName(String),
    Email(String),
    CompanyName(String),
    Services(Vec<String>),
    BudgetUsd(Option<f64>),
    ProjectStartDate(String),
    AcceptTerms(bool),
}

impl FieldValue {
    /// The field this value is assigned to.
    pub fn field(&self) -> FieldId {
        match self {
            Self::FullName(_) => FieldId::FullName,
            Self::Email(_) => FieldId::Email,
            Self::CompanyName(_) => FieldId::CompanyName,
            Self::Services(_) => FieldId::Services,
            Self::BudgetUsd(_) => FieldId::BudgetUsd,
            Self::ProjectStartDate(_) => FieldId::ProjectStartDate,
            Self::AcceptTerms(_) => FieldId::AcceptTerms,
        }
    }
}

impl FormDraft {
    /// The state a fresh form starts in: no services selected, terms not
    /// accepted, everything else unset.
    pub fn initial() -> Self {
        Self {
            services: Some(Vec::new()),
            accept_terms: Some(serde_json::Value::Bool(false)),
            ..Self::default()
        }
    }

    /// Assign one field.
    pub fn apply(&mut self, value: FieldValue) {
        match value {
            FieldValue::FullName(v) => self.full_name = Some(v),
            FieldValue::Email(v) => self.email = Some(v),
            FieldValue::CompanyName(v) => self.company_name = Some(v),
            FieldValue::Services(v) => self.services = Some(v),
            FieldValue::BudgetUsd(v) => {
                self.budget_usd = v.and_then(budget_number).map(serde_json::Value::Number)
            }
            FieldValue::ProjectStartDate(v) => self.project_start_date = Some(v),
            FieldValue::AcceptTerms(v) => self.accept_terms = Some(serde_json::Value::Bool(v)),
        }
    }

    /// Overwrite every field that is set in `other`, leaving the rest alone.
    ///
    /// Returns the fields that were taken from `other`, in form order.
    pub fn merge(&mut self, other: &FormDraft) -> Vec<FieldId> {
        let mut merged = Vec::new();

        macro_rules! take {
            ($field:ident, $id:expr) => {
                if let Some(v) = &other.$field {
                    self.$field = Some(v.clone());
                    merged.push($id);
                }
            };
        }

        take!(full_name, FieldId::FullName);
        take!(email, FieldId::Email);
        take!(company_name, FieldId::CompanyName);
        take!(services, FieldId::Services);
        take!(budget_usd, FieldId::BudgetUsd);
        take!(project_start_date, FieldId::ProjectStartDate);
        take!(accept_terms, FieldId::AcceptTerms);

        merged
    }

    /// The field's current value as JSON (`null` when unset).
    pub fn value_of(&self, field: FieldId) -> serde_json::Value {
        use serde_json::Value;

        match field {
            FieldId::FullName => self.full_name.clone().map_or(Value::Null, Value::String),
            FieldId::Email => self.email.clone().map_or(Value::Null, Value::String),
            FieldId::CompanyName => self.company_name.clone().map_or(Value::Null, Value::String),
            FieldId::Services => self.services.as_ref().map_or(Value::Null, |s| {
                Value::Array(s.iter().cloned().map(Value::String).collect())
            }),
            FieldId::BudgetUsd => self.budget_usd.clone().unwrap_or(Value::Null),
            FieldId::ProjectStartDate => self
                .project_start_date
                .clone()
                .map_or(Value::Null, Value::String),
            FieldId::AcceptTerms => self.accept_terms.clone().unwrap_or(Value::Null),
        }
    }

    /// Whether the user has put something meaningful into the field.
    pub fn is_filled(&self, field: FieldId) -> bool {
        fn non_blank(s: &Option<String>) -> bool {
            s.as_deref().is_some_and(|v| !v.trim().is_empty())
        }

        match field {
            FieldId::FullName => non_blank(&self.full_name),
            FieldId::Email => non_blank(&self.email),
            FieldId::CompanyName => non_blank(&self.company_name),
            FieldId::Services => self.services.as_ref().is_some_and(|s| !s.is_empty()),
            FieldId::BudgetUsd => self.budget_usd.is_some(),
            FieldId::ProjectStartDate => self
                .project_start_date
                .as_deref()
                .is_some_and(|d| !d.is_empty()),
            FieldId::AcceptTerms => self.accepted_terms(),
        }
    }

    /// Consent counts only as the JSON boolean `true`.
    pub fn accepted_terms(&self) -> bool {
        self.accept_terms == Some(serde_json::Value::Bool(true))
    }

    /// Percentage (0–100, rounded) of required fields that are filled.
    pub fn fill_progress(&self) -> u8 {
        let filled = FieldId::REQUIRED
            .iter()
            .filter(|f| self.is_filled(**f))
            .count();
        ((filled as f64 / FieldId::REQUIRED.len() as f64) * 100.0).round() as u8
    }

    /// Pre-select a service named by an inbound link (e.g. `?service=Branding`).
    ///
    /// Unknown or missing values are ignored. Returns `true` when the
    /// selection was replaced.
    pub fn apply_service_hint(&mut self, hint: Option<&str>) -> bool {
        match hint.and_then(ServiceOption::parse) {
            Some(option) => {
                self.services = Some(vec![option.as_str().to_string()]);
                true
            }
            None => false,
        }
    }
}

/// Store whole budgets as JSON integers so drafts round-trip as `50000`
/// rather than `50000.0`.
fn budget_number(v: f64) -> Option<serde_json::Number> {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(serde_json::Number::from(v as i64))
    } else {
        serde_json::Number::from_f64(v)
    }
}

// ---------------------------------------------------------------------------
// Record (validated payload)
// ---------------------------------------------------------------------------

/// A fully validated onboarding submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub full_name: String,
    pub email: String,
    pub company_name: String,
    pub services: Vec<ServiceOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_usd: Option<u32>,
    pub project_start_date: NaiveDate,
    pub accept_terms: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
