//! Budget guidance for a service selection.

use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use onboard_core::budget::{
    budget_insights, calculate_budget_range, format_budget_range, project_complexity,
    suggest_budgets, BudgetInsights, BudgetRange, BudgetSuggestion, ProjectComplexity,
};
use onboard_core::ServiceOption;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct BudgetQuery {
    /// Comma-separated service names, e.g. `UI/UX,Web Dev`.
    #[serde(default)]
    pub services: String,
    pub budget: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct BudgetGuidance {
    pub range: BudgetRange,
    pub formatted_range: String,
    pub suggestions: Vec<BudgetSuggestion>,
    pub insights: BudgetInsights,
    pub complexity: ProjectComplexity,
}

async fn budget_guidance(Query(query): Query<BudgetQuery>) -> AppResult<Json<BudgetGuidance>> {
    let services = parse_services(&query.services)?;
    let range = calculate_budget_range(&services);

    Ok(Json(BudgetGuidance {
        formatted_range: format_budget_range(range.minimum, range.maximum),
        suggestions: suggest_budgets(&services),
        insights: budget_insights(&services, query.budget),
        complexity: project_complexity(&services),
        range,
    }))
}

fn parse_services(raw: &str) -> AppResult<Vec<ServiceOption>> {
    let mut services = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let service = ServiceOption::parse(name)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown service '{name}'")))?;
        if !services.contains(&service) {
            services.push(service);
        }
    }
    Ok(services)
}

pub fn router() -> Router {
    Router::new().route("/budget", get(budget_guidance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_dedupes_services() {
        assert_eq!(
            parse_services(" UI/UX , Web Dev,UI/UX,").unwrap(),
            vec![ServiceOption::UiUx, ServiceOption::WebDev]
        );
        assert!(parse_services("").unwrap().is_empty());
        assert!(matches!(parse_services("Gardening"), Err(AppError::BadRequest(_))));
    }
}
