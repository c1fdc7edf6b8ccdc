//! Field validation rules for the onboarding form.
//!
//! Every rule is a pure function of the draft value (and, for the start
//! date, the reference `today`). Rules run in a fixed order per field and
//! the first failing check supplies the message, so the user sees one
//! message per field at a time.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::form::{FieldId, FormDraft, FormRecord, ServiceOption};

/// Letters, whitespace, apostrophes and hyphens only.
const FULL_NAME_PATTERN: &str = r"^[a-zA-Z\s'-]+$";

static FULL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FULL_NAME_PATTERN).expect("valid regex"));

pub const FULL_NAME_MIN_LEN: usize = 2;
pub const FULL_NAME_MAX_LEN: usize = 80;
pub const COMPANY_NAME_MIN_LEN: usize = 2;
pub const COMPANY_NAME_MAX_LEN: usize = 100;
pub const BUDGET_MIN_USD: f64 = 100.0;
pub const BUDGET_MAX_USD: f64 = 1_000_000.0;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Per-field failures from one validation pass.
///
/// Fields that passed (or were not checked) are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: BTreeMap<FieldId, String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The failure message for a field, if it failed.
    pub fn message_for(&self, field: FieldId) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Failed fields in form order.
    pub fn failed_fields(&self) -> Vec<FieldId> {
        self.errors.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }

    fn record(&mut self, field: FieldId, outcome: Result<(), String>) {
        if let Err(message) = outcome {
            self.errors.insert(field, message);
        }
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.iter().map(|(field, msg)| format!("{field}: {msg}")).collect();
        f.write_str(&parts.join("; "))
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Validate a single field of the draft.
pub fn validate_field(draft: &FormDraft, field: FieldId, today: NaiveDate) -> Result<(), String> {
    match field {
        FieldId::FullName => check_full_name(draft.full_name.as_deref()).map(drop),
        FieldId::Email => check_email(draft.email.as_ref()).map(drop),
        FieldId::CompanyName => check_company_name(draft.company_name.as_deref()).map(drop),
        FieldId::Services => check_services(draft.services.as_deref()).map(drop),
        FieldId::BudgetUsd => check_budget(draft.budget_usd.as_ref()).map(drop),
        FieldId::ProjectStartDate => {
            check_start_date(draft.project_start_date.as_deref(), today).map(drop)
        }
        FieldId::AcceptTerms => check_accept_terms(draft.accept_terms.as_ref()),
    }
}

/// Validate a subset of fields (typically the fields owned by one step).
pub fn validate_fields(draft: &FormDraft, fields: &[FieldId], today: NaiveDate) -> ValidationReport {
    let mut report = ValidationReport::default();
    for field in fields {
        report.record(*field, validate_field(draft, *field, today));
    }
    report
}

/// Validate every field and, when all pass, produce the canonical record.
pub fn validate_all(draft: &FormDraft, today: NaiveDate) -> Result<FormRecord, ValidationReport> {
    let full_name = check_full_name(draft.full_name.as_deref());
    let email = check_email(draft.email.as_ref());
    let company_name = check_company_name(draft.company_name.as_deref());
    let services = check_services(draft.services.as_deref());
    let budget_usd = check_budget(draft.budget_usd.as_ref());
    let project_start_date = check_start_date(draft.project_start_date.as_deref(), today);
    let accept_terms = check_accept_terms(draft.accept_terms.as_ref());

    match (
        full_name,
        email,
        company_name,
        services,
        budget_usd,
        project_start_date,
        accept_terms,
    ) {
        (Ok(full_name), Ok(email), Ok(company_name), Ok(services), Ok(budget_usd), Ok(date), Ok(())) => {
            Ok(FormRecord {
                full_name,
                email,
                company_name,
                services,
                budget_usd,
                project_start_date: date,
                accept_terms: true,
            })
        }
        (full_name, email, company_name, services, budget_usd, date, accept_terms) => {
            let mut report = ValidationReport::default();
            report.record(FieldId::FullName, full_name.map(drop));
            report.record(FieldId::Email, email.map(drop));
            report.record(FieldId::CompanyName, company_name.map(drop));
            report.record(FieldId::Services, services.map(drop));
            report.record(FieldId::BudgetUsd, budget_usd.map(drop));
            report.record(FieldId::ProjectStartDate, date.map(drop));
            report.record(FieldId::AcceptTerms, accept_terms);
            Err(report)
        }
    }
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

fn check_full_name(value: Option<&str>) -> Result<String, String> {
    let value = value.unwrap_or_default();
    let len = value.chars().count();
    if len == 0 {
        return Err("Full name is required".to_string());
    }
    if len < FULL_NAME_MIN_LEN {
        return Err(format!("Full name must be at least {FULL_NAME_MIN_LEN} characters"));
    }
    if len > FULL_NAME_MAX_LEN {
        return Err(format!("Full name must be less than {FULL_NAME_MAX_LEN} characters"));
    }
    if !FULL_NAME_RE.is_match(value) {
        return Err(
            "Full name can only contain letters, spaces, apostrophes, and hyphens".to_string(),
        );
    }
    Ok(value.to_string())
}

fn check_email(value: Option<&String>) -> Result<String, String> {
    match value {
        None => Err("Email is required".to_string()),
        Some(v) if v.is_empty() => Err("Email is required".to_string()),
        Some(v) if !v.validate_email() => Err("Please enter a valid email address".to_string()),
        Some(v) => Ok(v.clone()),
    }
}

fn check_company_name(value: Option<&str>) -> Result<String, String> {
    let value = value.unwrap_or_default();
    let len = value.chars().count();
    if len == 0 {
        return Err("Company name is required".to_string());
    }
    if len < COMPANY_NAME_MIN_LEN {
        return Err(format!(
            "Company name must be at least {COMPANY_NAME_MIN_LEN} characters"
        ));
    }
    if len > COMPANY_NAME_MAX_LEN {
        return Err(format!(
            "Company name must be less than {COMPANY_NAME_MAX_LEN} characters"
        ));
    }
    Ok(value.to_string())
}

fn check_services(value: Option<&[String]>) -> Result<Vec<ServiceOption>, String> {
    let values = value.unwrap_or_default();
    if values.is_empty() {
        return Err("Please select at least one service".to_string());
    }
    values
        .iter()
        .map(|v| {
            ServiceOption::parse(v).ok_or_else(|| {
                let allowed: Vec<&str> = ServiceOption::ALL.iter().map(|o| o.as_str()).collect();
                format!("Invalid service '{v}'. Must be one of: {}", allowed.join(", "))
            })
        })
        .collect()
}

fn check_budget(value: Option<&serde_json::Value>) -> Result<Option<u32>, String> {
    let Some(value) = value else {
        return Ok(None);
    };
    let amount = match value.as_f64() {
        Some(v) if v.fract() == 0.0 => v,
        _ => return Err("Budget must be a whole number".to_string()),
    };
    if amount < BUDGET_MIN_USD {
        return Err("Budget must be at least $100".to_string());
    }
    if amount > BUDGET_MAX_USD {
        return Err("Budget must be less than $1,000,000".to_string());
    }
    Ok(Some(amount as u32))
}

fn check_start_date(value: Option<&str>, today: NaiveDate) -> Result<NaiveDate, String> {
    let value = value.unwrap_or_default();
    if value.is_empty() {
        return Err("Project start date is required".to_string());
    }
    match parse_calendar_date(value) {
        Some(date) if date >= today => Ok(date),
        _ => Err("Project start date must be today or later".to_string()),
    }
}

fn check_accept_terms(value: Option<&serde_json::Value>) -> Result<(), String> {
    if value == Some(&serde_json::Value::Bool(true)) {
        Ok(())
    } else {
        Err("You must accept the terms and conditions".to_string())
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.date_naive()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
