//! Budget guidance for the selected services.
//!
//! Pure lookups over a fixed per-service price table. Used to offer the
//! user suggested budget tiers next to the (optional) budget field and to
//! comment on how a chosen budget compares with typical project costs.

use serde::Serialize;

use crate::form::ServiceOption;

// ---------------------------------------------------------------------------
// Price table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    fn score(self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

/// Typical cost range for one service, in USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBudgetRange {
    pub service: ServiceOption,
    pub min_budget: u64,
    pub max_budget: u64,
    pub average_budget: u64,
    pub complexity: Complexity,
}

pub fn service_budget(service: ServiceOption) -> ServiceBudgetRange {
    let (min_budget, max_budget, average_budget, complexity) = match service {
        ServiceOption::UiUx => (5_000, 50_000, 15_000, Complexity::Medium),
        ServiceOption::Branding => (3_000, 25_000, 8_000, Complexity::Low),
        ServiceOption::WebDev => (10_000, 200_000, 35_000, Complexity::High),
        ServiceOption::MobileApp => (25_000, 500_000, 75_000, Complexity::High),
    };
    ServiceBudgetRange {
        service,
        min_budget,
        max_budget,
        average_budget,
        complexity,
    }
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetRange {
    pub minimum: u64,
    pub maximum: u64,
    pub recommended: u64,
    pub breakdown: Vec<ServiceBudgetRange>,
}

/// Sum the per-service ranges.
pub fn calculate_budget_range(services: &[ServiceOption]) -> BudgetRange {
    let breakdown: Vec<ServiceBudgetRange> = services.iter().map(|s| service_budget(*s)).collect();
    BudgetRange {
        minimum: breakdown.iter().map(|b| b.min_budget).sum(),
        maximum: breakdown.iter().map(|b| b.max_budget).sum(),
        recommended: breakdown.iter().map(|b| b.average_budget).sum(),
        breakdown,
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn is_cross_platform(services: &[ServiceOption]) -> bool {
    services.contains(&ServiceOption::WebDev) && services.contains(&ServiceOption::MobileApp)
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSuggestion {
    pub label: &'static str,
    pub amount: u64,
    pub description: &'static str,
    pub services: Vec<ServiceOption>,
    pub reasoning: Vec<&'static str>,
}

/// Suggested budget tiers for the selection. Empty when nothing is selected.
pub fn suggest_budgets(services: &[ServiceOption]) -> Vec<BudgetSuggestion> {
    if services.is_empty() {
        return Vec::new();
    }

    let range = calculate_budget_range(services);
    let tier = |label: &'static str, amount: u64, description: &'static str, reasoning: Vec<&'static str>| {
        BudgetSuggestion {
            label,
            amount,
            description,
            services: services.to_vec(),
            reasoning,
        }
    };

    let mut suggestions = vec![
        tier(
            "Essential",
            range.minimum,
            "Basic implementation with core features",
            vec![
                "Minimum viable product approach",
                "Core functionality only",
                "Standard design patterns",
            ],
        ),
        tier(
            "Professional",
            range.recommended,
            "Balanced approach with quality and features",
            vec![
                "Industry standard quality",
                "Enhanced user experience",
                "Custom design elements",
                "Performance optimization",
            ],
        ),
        tier(
            "Premium",
            (range.recommended as f64 * 1.5).round() as u64,
            "High-end solution with advanced features",
            vec![
                "Cutting-edge technology",
                "Advanced animations and interactions",
                "Comprehensive testing",
                "Future-proof architecture",
            ],
        ),
    ];

    if is_cross_platform(services) {
        suggestions.push(tier(
            "Enterprise",
            (range.maximum as f64 * 0.8).round() as u64,
            "Full-scale enterprise solution",
            vec![
                "Scalable architecture",
                "Advanced security features",
                "Integration capabilities",
                "Dedicated support team",
            ],
        ));
    }

    suggestions
}

// ---------------------------------------------------------------------------
// Insights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetAdequacy {
    Insufficient,
    Minimal,
    Adequate,
    Generous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetInsights {
    pub adequacy: BudgetAdequacy,
    pub suggestions: Vec<String>,
    pub alternatives: Vec<String>,
}

/// Compare a chosen budget with the typical range for the selection.
pub fn budget_insights(services: &[ServiceOption], budget: Option<u64>) -> BudgetInsights {
    let budget = match budget {
        Some(b) if b > 0 => b,
        _ => {
            return BudgetInsights {
                adequacy: BudgetAdequacy::Minimal,
                suggestions: owned(&["Please enter a budget to get personalized insights"]),
                alternatives: Vec::new(),
            }
        }
    };

    let range = calculate_budget_range(services);

    if budget < range.minimum {
        BudgetInsights {
            adequacy: BudgetAdequacy::Insufficient,
            suggestions: owned(&[
                "Consider reducing project scope",
                "Phase the project into multiple releases",
                "Focus on MVP (Minimum Viable Product) first",
            ]),
            alternatives: owned(&[
                "Remove some services to fit budget",
                "Consider template-based solutions",
                "Extend project timeline for better rates",
            ]),
        }
    } else if budget < range.recommended {
        BudgetInsights {
            adequacy: BudgetAdequacy::Minimal,
            suggestions: owned(&[
                "Budget covers basic requirements",
                "Limited customization options",
                "Standard implementation approach",
            ]),
            alternatives: vec![
                format!(
                    "Increase budget to {} for better quality",
                    format_usd(range.recommended)
                ),
                "Phase premium features into later releases".to_string(),
            ],
        }
    } else if budget <= range.maximum {
        BudgetInsights {
            adequacy: BudgetAdequacy::Adequate,
            suggestions: owned(&[
                "Great budget for quality implementation",
                "Room for custom features and optimization",
                "Can include advanced functionality",
            ]),
            alternatives: Vec::new(),
        }
    } else {
        BudgetInsights {
            adequacy: BudgetAdequacy::Generous,
            suggestions: owned(&[
                "Excellent budget for premium implementation",
                "Can include cutting-edge features",
                "Room for extensive testing and optimization",
            ]),
            alternatives: owned(&[
                "Consider adding additional services",
                "Invest in premium design and UX",
                "Plan for future enhancements",
            ]),
        }
    }
}

// ---------------------------------------------------------------------------
// Complexity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
    Enterprise,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectComplexity {
    pub score: u32,
    pub level: ComplexityLevel,
    pub factors: Vec<&'static str>,
}

pub fn project_complexity(services: &[ServiceOption]) -> ProjectComplexity {
    let mut score: u32 = services
        .iter()
        .map(|s| service_budget(*s).complexity.score())
        .sum();
    let mut factors = Vec::new();

    if is_cross_platform(services) {
        score += 2;
        factors.push("Cross-platform development complexity");
    }
    if services.contains(&ServiceOption::UiUx) && services.len() > 2 {
        score += 1;
        factors.push("Multi-service design coordination");
    }

    let level = match score {
        0..=2 => ComplexityLevel::Simple,
        3..=4 => ComplexityLevel::Moderate,
        5..=6 => ComplexityLevel::Complex,
        _ => ComplexityLevel::Enterprise,
    };

    ProjectComplexity {
        score,
        level,
        factors,
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// `$1,234,567`
pub fn format_usd(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("${out}")
}

/// `$5,000 - $50,000`
pub fn format_budget_range(min: u64, max: u64) -> String {
    format!("{} - {}", format_usd(min), format_usd(max))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ServiceOption::*;

    #[test]
    fn range_sums_selected_services() {
        let range = calculate_budget_range(&[UiUx, Branding]);
        assert_eq!(range.minimum, 8_000);
        assert_eq!(range.maximum, 75_000);
        assert_eq!(range.recommended, 23_000);
        assert_eq!(range.breakdown.len(), 2);
    }

    #[test]
    fn empty_selection_has_no_suggestions() {
        assert!(suggest_budgets(&[]).is_empty());
    }

    #[test]
    fn three_tiers_for_simple_selection() {
        let tiers = suggest_budgets(&[UiUx]);
        let summary: Vec<_> = tiers.iter().map(|t| (t.label, t.amount)).collect();
        assert_eq!(
            summary,
            vec![("Essential", 5_000), ("Professional", 15_000), ("Premium", 22_500)]
        );
    }

    #[test]
    fn enterprise_tier_for_web_and_mobile() {
        let tiers = suggest_budgets(&[WebDev, MobileApp]);
        assert_eq!(tiers.len(), 4);
        let enterprise = tiers.last().unwrap();
        assert_eq!(enterprise.label, "Enterprise");
        assert_eq!(enterprise.amount, 560_000);
    }

    // -- insights --

    #[test]
    fn insights_without_budget() {
        let insights = budget_insights(&[UiUx], None);
        assert_eq!(insights.adequacy, BudgetAdequacy::Minimal);
        assert_eq!(
            insights.suggestions,
            vec!["Please enter a budget to get personalized insights".to_string()]
        );
        assert_eq!(budget_insights(&[UiUx], Some(0)).adequacy, BudgetAdequacy::Minimal);
    }

    #[test]
    fn insights_adequacy_bands() {
        // UI/UX: min 5,000, recommended 15,000, max 50,000.
        assert_eq!(budget_insights(&[UiUx], Some(4_999)).adequacy, BudgetAdequacy::Insufficient);
        assert_eq!(budget_insights(&[UiUx], Some(5_000)).adequacy, BudgetAdequacy::Minimal);
        assert_eq!(budget_insights(&[UiUx], Some(15_000)).adequacy, BudgetAdequacy::Adequate);
        assert_eq!(budget_insights(&[UiUx], Some(50_000)).adequacy, BudgetAdequacy::Adequate);
        assert_eq!(budget_insights(&[UiUx], Some(50_001)).adequacy, BudgetAdequacy::Generous);
    }

    #[test]
    fn minimal_insight_names_recommended_amount() {
        let insights = budget_insights(&[UiUx], Some(10_000));
        assert_eq!(
            insights.alternatives[0],
            "Increase budget to $15,000 for better quality"
        );
    }

    // -- complexity --

    #[test]
    fn complexity_levels() {
        assert_eq!(project_complexity(&[Branding]).level, ComplexityLevel::Simple);
        assert_eq!(project_complexity(&[UiUx, Branding]).level, ComplexityLevel::Moderate);

        let cross = project_complexity(&[WebDev, MobileApp]);
        assert_eq!(cross.score, 8);
        assert_eq!(cross.level, ComplexityLevel::Enterprise);
        assert_eq!(cross.factors, vec!["Cross-platform development complexity"]);

        let design = project_complexity(&[UiUx, Branding, WebDev]);
        assert_eq!(design.score, 7);
        assert_eq!(design.factors, vec!["Multi-service design coordination"]);
    }

    // -- formatting --

    #[test]
    fn usd_formatting() {
        assert_eq!(format_usd(0), "$0");
        assert_eq!(format_usd(999), "$999");
        assert_eq!(format_usd(1_000), "$1,000");
        assert_eq!(format_usd(1_234_567), "$1,234,567");
        assert_eq!(format_budget_range(5_000, 50_000), "$5,000 - $50,000");
    }
}
