use crate::calculator::is_illegal;
use crate::schema::{CalculatedStep, Cents, CategoryKind, StepKind};
use serde::{Deserialize, Serialize};

/// Headline numbers for a computed waterfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallSummary {
    pub monthly_income: Cents,
    pub total_deductions: Cents,
    pub investment_total: Cents,
    pub spend_total: Cents,
    pub true_surplus: Cents,
    /// Investment total as a fraction of income; 0 when there is no income.
    pub savings_rate: f64,
    pub is_illegal: bool,
}

impl WaterfallSummary {
    pub fn from_steps(steps: &[CalculatedStep]) -> Self {
        let monthly_income = steps
            .iter()
            .find(|step| step.kind == StepKind::Income)
            .map(|step| step.value)
            .unwrap_or(0);

        let mut investment_total: Cents = 0;
        let mut spend_total: Cents = 0;
        for step in steps.iter().filter(|step| step.is_deduction()) {
            match step.category_kind.unwrap_or_default() {
                CategoryKind::Investment => {
                    investment_total = investment_total.saturating_add(step.value)
                }
                CategoryKind::Spend => spend_total = spend_total.saturating_add(step.value),
            }
        }

        let true_surplus = steps.last().map(|step| step.remaining).unwrap_or(0);

        let savings_rate = if monthly_income == 0 {
            0.0
        } else {
            investment_total as f64 / monthly_income as f64
        };

        Self {
            monthly_income,
            total_deductions: investment_total.saturating_add(spend_total),
            investment_total,
            spend_total,
            true_surplus,
            savings_rate,
            is_illegal: is_illegal(steps),
        }
    }
}
