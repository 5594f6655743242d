use crate::error::{BudgetError, Result};
use crate::schema::{CalculatedStep, Cents, CategoryKind};
use crate::utils::month_ends_from;
use chrono::NaiveDate;
use log::debug;
use rand::{thread_rng, Rng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Any date inside the first projected month.
    pub start: NaiveDate,
    pub months: usize,
    pub starting_net_worth: Cents,
    /// Leading months treated as observed history and jittered with noise.
    #[serde(default)]
    pub history_months: usize,
    /// Standard deviation of the monthly history noise, in cents. Zero disables noise.
    #[serde(default)]
    pub noise_std_dev: f64,
    /// Markers to attach to projected months. They annotate points and never move the value.
    #[serde(default)]
    pub events: Vec<ScheduledEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Windfall,
    Expense,
    Milestone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionEvent {
    pub kind: EventKind,
    pub description: String,
}

/// A [`ProjectionEvent`] pinned to a zero-based month offset from `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub month: usize,
    #[serde(flatten)]
    pub event: ProjectionEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetWorthPoint {
    pub month_end: NaiveDate,
    pub value: Cents,
    pub is_history: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ProjectionEvent>,
}

/// Monthly amount moved into investment categories by the waterfall.
pub fn monthly_savings(steps: &[CalculatedStep]) -> Cents {
    steps
        .iter()
        .filter(|step| step.is_deduction() && step.category_kind == Some(CategoryKind::Investment))
        .fold(0, |total: Cents, step| total.saturating_add(step.value))
}

pub fn project_net_worth(
    steps: &[CalculatedStep],
    config: &ProjectionConfig,
) -> Result<Vec<NetWorthPoint>> {
    project_net_worth_with_rng(steps, config, &mut thread_rng())
}

/// Grows net worth by the waterfall's monthly savings, jittering the
/// leading history months with Gaussian noise drawn from `rng`.
pub fn project_net_worth_with_rng<R: Rng + ?Sized>(
    steps: &[CalculatedStep],
    config: &ProjectionConfig,
    rng: &mut R,
) -> Result<Vec<NetWorthPoint>> {
    if config.months == 0 {
        return Err(BudgetError::InvalidProjection(
            "projection must cover at least one month".to_string(),
        ));
    }

    if !config.noise_std_dev.is_finite() || config.noise_std_dev < 0.0 {
        return Err(BudgetError::InvalidProjection(format!(
            "noise standard deviation {} must be a non-negative finite number",
            config.noise_std_dev
        )));
    }

    if let Some(late) = config.events.iter().find(|e| e.month >= config.months) {
        return Err(BudgetError::InvalidProjection(format!(
            "event '{}' at month {} falls outside the {}-month projection",
            late.event.description, late.month, config.months
        )));
    }

    let noise = if config.noise_std_dev > 0.0 && config.history_months > 0 {
        let normal = Normal::new(0.0, config.noise_std_dev)
            .map_err(|e| BudgetError::InvalidProjection(e.to_string()))?;
        Some(normal)
    } else {
        None
    };

    let dates = month_ends_from(config.start, config.months).ok_or_else(|| {
        BudgetError::InvalidProjection(format!(
            "{} is too close to the end of the calendar",
            config.start
        ))
    })?;

    let savings = monthly_savings(steps);
    debug!(
        "Projecting {} months of net worth with {} monthly savings",
        config.months, savings
    );

    let mut net_worth = config.starting_net_worth;
    let mut points = Vec::with_capacity(dates.len());
    for (i, month_end) in dates.into_iter().enumerate() {
        net_worth = net_worth.saturating_add(savings);
        let is_history = i < config.history_months;
        if let (true, Some(normal)) = (is_history, &noise) {
            net_worth = net_worth.saturating_add(normal.sample(&mut *rng).round() as Cents);
        }
        let events = config
            .events
            .iter()
            .filter(|scheduled| scheduled.month == i)
            .map(|scheduled| scheduled.event.clone())
            .collect();
        points.push(NetWorthPoint {
            month_end,
            value: net_worth,
            is_history,
            events,
        });
    }

    Ok(points)
}
