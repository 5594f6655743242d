//! # Cash Flow Waterfall
//!
//! A library for turning a hierarchical monthly budget into a waterfall of running
//! balances, with previewable what-if scenarios and bounded undo/redo.
//!
//! ## Core Concepts
//!
//! - **Breakdown**: named line items with amounts in integer cents
//! - **Waterfall**: income, followed by fixed stages of deductions and checkpoints
//!   (Takehome, Free Cash, Net Income, True Surplus)
//! - **Illegal State**: any running balance below zero, flagged rather than rejected
//! - **Scenario**: a batch of additive deltas previewed against the committed budget
//!   before being applied or discarded
//!
//! ## Example
//!
//! ```rust
//! use cash_flow_waterfall::*;
//!
//! let state = FinancialState::new(FinancialData::sample()).unwrap();
//!
//! let state = state.dispatch(Command::UpdateBreakdownItem {
//!     step_name: "Fixed Spend".to_string(),
//!     item_name: "Rent".to_string(),
//!     amount: 150_000,
//! });
//! assert!(!state.is_illegal());
//!
//! let state = state.preview_scenario(vec![ScenarioChange::income(
//!     600_000,
//!     Recurrence::OneTime,
//!     "Bonus",
//! )]);
//! let state = state.apply_scenario();
//! assert_eq!(state.data().monthly_income, 1_166_600);
//!
//! let state = state.undo();
//! assert_eq!(state.data().monthly_income, 566_600);
//! ```

pub mod calculator;
pub mod edits;
pub mod error;
pub mod index;
pub mod projection;
pub mod scenario;
pub mod schema;
pub mod state;
pub mod summary;
pub mod utils;

pub use calculator::{
    calculate, is_illegal, MissingSectionPolicy, PipelineStage, WaterfallCalculator,
    WATERFALL_PIPELINE,
};
pub use edits::BreakdownEdit;
pub use error::{BudgetError, Result};
pub use index::StepIndex;
pub use projection::{
    monthly_savings, project_net_worth, project_net_worth_with_rng, EventKind, NetWorthPoint,
    ProjectionConfig, ProjectionEvent, ScheduledEvent,
};
pub use scenario::{apply_changes, Recurrence, ScenarioChange, ScenarioProposal};
pub use schema::*;
pub use state::{
    BoundedHistory, Command, FinancialState, PendingScenario, ScenarioImpact, Snapshot,
    DEFAULT_HISTORY_LIMIT,
};
pub use summary::WaterfallSummary;
pub use utils::{cents_to_dollars, dollars_to_cents, format_currency};

use serde::{Deserialize, Serialize};

/// Knobs for a budgeting session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Maximum number of entries kept on each of the undo and redo stacks.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default)]
    pub missing_sections: MissingSectionPolicy,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            missing_sections: MissingSectionPolicy::default(),
        }
    }
}

impl ModelConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
