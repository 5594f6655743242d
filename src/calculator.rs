//! The waterfall calculator: turns a [`FinancialData`] into an ordered list of
//! running-balance checkpoints and deduction steps.
//!
//! The stage order is fixed and lives in [`WATERFALL_PIPELINE`]. Each deduction
//! stage names the top-level step it reads from and the child category whose
//! breakdown is subtracted from the running balance.

use crate::error::{BudgetError, Result};
use crate::schema::*;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Opens the waterfall with the monthly income.
    Income,
    /// Subtracts `steps[parent].outflow[child].breakdown` and emits a deduction named `child`.
    Deduction {
        parent: &'static str,
        child: &'static str,
    },
    /// Emits the running balance under the given name.
    Checkpoint(&'static str),
}

pub const WATERFALL_PIPELINE: &[PipelineStage] = &[
    PipelineStage::Income,
    PipelineStage::Deduction {
        parent: TOTAL_INCOME,
        child: PRE_TAX_DEDUCTIONS,
    },
    PipelineStage::Deduction {
        parent: TOTAL_INCOME,
        child: TAXES,
    },
    PipelineStage::Checkpoint(TAKEHOME),
    PipelineStage::Deduction {
        parent: TAKEHOME,
        child: FIXED_SPEND,
    },
    PipelineStage::Checkpoint(FREE_CASH),
    PipelineStage::Deduction {
        parent: FREE_CASH,
        child: VARIABLE_SPEND,
    },
    PipelineStage::Checkpoint(NET_INCOME),
    PipelineStage::Deduction {
        parent: NET_INCOME,
        child: INVESTMENTS,
    },
    PipelineStage::Deduction {
        parent: NET_INCOME,
        child: EMERGENCY_FUND,
    },
    PipelineStage::Checkpoint(TRUE_SURPLUS),
];

/// What to do when a deduction stage finds no breakdown to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSectionPolicy {
    /// Skip the stage: no step is emitted and the balance is untouched.
    #[default]
    Lenient,
    /// Report the first missing section as [`BudgetError::MissingSection`].
    Strict,
}

/// Running state threaded through the pipeline.
#[derive(Debug, Default)]
pub(crate) struct WaterfallRun {
    pub(crate) balance: Cents,
    pub(crate) steps: Vec<CalculatedStep>,
    pub(crate) missing: Vec<(&'static str, &'static str)>,
}

impl PipelineStage {
    pub(crate) fn apply(&self, data: &FinancialData, run: &mut WaterfallRun) {
        match *self {
            PipelineStage::Income => {
                run.balance = data.monthly_income;
                run.steps.push(CalculatedStep {
                    name: MONTHLY_INCOME.to_string(),
                    value: data.monthly_income,
                    kind: StepKind::Income,
                    category_kind: None,
                    level: 0,
                    breakdown: None,
                    remaining: data.monthly_income,
                });
            }
            PipelineStage::Deduction { parent, child } => {
                let Some((category, breakdown)) = section(data, parent, child) else {
                    debug!("No breakdown for '{}' under '{}', skipping", child, parent);
                    run.missing.push((parent, child));
                    return;
                };

                let total = breakdown.total();
                run.balance = run.balance.saturating_sub(total);
                run.steps.push(CalculatedStep {
                    name: child.to_string(),
                    value: total,
                    kind: StepKind::Deduction,
                    category_kind: Some(category.kind),
                    level: 1,
                    breakdown: Some(breakdown.clone()),
                    remaining: run.balance,
                });
            }
            PipelineStage::Checkpoint(name) => {
                run.steps.push(CalculatedStep {
                    name: name.to_string(),
                    value: run.balance,
                    kind: StepKind::Checkpoint,
                    category_kind: None,
                    level: 0,
                    breakdown: None,
                    remaining: run.balance,
                });
            }
        }
    }
}

fn section<'a>(
    data: &'a FinancialData,
    parent: &str,
    child: &str,
) -> Option<(&'a FlowStep, &'a Breakdown)> {
    let category = data.steps.get(parent)?.child(child)?;
    let breakdown = category.breakdown.as_ref()?;
    Some((category, breakdown))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaterfallCalculator {
    policy: MissingSectionPolicy,
}

impl WaterfallCalculator {
    pub fn new(policy: MissingSectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MissingSectionPolicy {
        self.policy
    }

    /// Runs every stage in order. Never fails under [`MissingSectionPolicy::Lenient`].
    pub fn calculate(&self, data: &FinancialData) -> Result<Vec<CalculatedStep>> {
        let run = run_pipeline(data);

        if self.policy == MissingSectionPolicy::Strict {
            if let Some((parent, child)) = run.missing.first() {
                return Err(BudgetError::MissingSection {
                    parent: parent.to_string(),
                    child: child.to_string(),
                });
            }
        }

        Ok(run.steps)
    }
}

fn run_pipeline(data: &FinancialData) -> WaterfallRun {
    let mut run = WaterfallRun::default();
    for stage in WATERFALL_PIPELINE {
        stage.apply(data, &mut run);
    }

    if run.balance < 0 {
        debug!("Budget is over-allocated: true surplus is {}", run.balance);
    }

    run
}

/// Computes the waterfall, silently skipping any missing section.
pub fn calculate(data: &FinancialData) -> Vec<CalculatedStep> {
    run_pipeline(data).steps
}

/// True when any running balance in the waterfall is negative.
pub fn is_illegal(steps: &[CalculatedStep]) -> bool {
    steps.iter().any(|step| step.remaining < 0)
}
