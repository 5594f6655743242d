//! The financial state machine.
//!
//! A [`FinancialState`] is either *settled* or *previewing* a what-if scenario.
//! Every transition returns a new state; the receiver is never modified.
//! Undo/redo entries hold only the budget document and the change list of any
//! preview pending at the time; the derived waterfall and preview are
//! recomputed on every transition.

use crate::calculator::{calculate, is_illegal, WaterfallCalculator};
use crate::edits::BreakdownEdit;
use crate::error::Result;
use crate::index::StepIndex;
use crate::scenario::{apply_changes, ScenarioChange};
use crate::schema::{CalculatedStep, Cents, FinancialData};
use crate::ModelConfig;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// One undo/redo entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub data: Arc<FinancialData>,
    /// Changes being previewed when the snapshot was taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_changes: Option<Vec<ScenarioChange>>,
}

/// A most-recent-first stack that drops its oldest entry beyond `limit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundedHistory {
    entries: VecDeque<Snapshot>,
    limit: usize,
}

impl BoundedHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.entries.push_front(snapshot);
        self.entries.truncate(self.limit);
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        self.entries.pop_front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Budgets from most to least recent.
    pub fn iter(&self) -> impl Iterator<Item = &FinancialData> {
        self.entries.iter().map(|snapshot| snapshot.data.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingScenario {
    pub changes: Vec<ScenarioChange>,
    pub preview_state: Box<FinancialState>,
}

/// How a previewed scenario moves the bottom line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioImpact {
    pub surplus_before: Cents,
    pub surplus_after: Cents,
    pub surplus_delta: Cents,
    pub becomes_illegal: bool,
    pub becomes_legal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialState {
    data: Arc<FinancialData>,
    calculated_steps: Vec<CalculatedStep>,
    is_illegal: bool,
    undo: BoundedHistory,
    redo: BoundedHistory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_scenario: Option<PendingScenario>,
    #[serde(skip)]
    index: Arc<StepIndex>,
}

/// Every command a presentation layer can dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    UpdateMonthlyIncome {
        amount: Cents,
    },
    UpdateBreakdownItem {
        step_name: String,
        item_name: String,
        amount: Cents,
    },
    AddBreakdownItem {
        step_name: String,
        item_name: String,
        amount: Cents,
    },
    RemoveBreakdownItem {
        step_name: String,
        item_name: String,
    },
    RenameBreakdownItem {
        step_name: String,
        old_name: String,
        new_name: String,
    },
    PreviewScenario {
        changes: Vec<ScenarioChange>,
    },
    ApplyScenario,
    ClearPreview,
    Undo,
    Redo,
}

impl Command {
    /// The committed edit this command stands for, if it is one.
    pub fn into_edit(self) -> std::result::Result<BreakdownEdit, Command> {
        match self {
            Command::UpdateMonthlyIncome { amount } => Ok(BreakdownEdit::UpdateIncome { amount }),
            Command::UpdateBreakdownItem {
                step_name,
                item_name,
                amount,
            } => Ok(BreakdownEdit::UpdateItem {
                step_name,
                item_name,
                amount,
            }),
            Command::AddBreakdownItem {
                step_name,
                item_name,
                amount,
            } => Ok(BreakdownEdit::AddItem {
                step_name,
                item_name,
                amount,
            }),
            Command::RemoveBreakdownItem {
                step_name,
                item_name,
            } => Ok(BreakdownEdit::RemoveItem {
                step_name,
                item_name,
            }),
            Command::RenameBreakdownItem {
                step_name,
                old_name,
                new_name,
            } => Ok(BreakdownEdit::RenameItem {
                step_name,
                old_name,
                new_name,
            }),
            other => Err(other),
        }
    }
}

impl FinancialState {
    /// Builds the initial settled state with the default configuration.
    pub fn new(data: FinancialData) -> Result<Self> {
        Self::with_config(data, &ModelConfig::default())
    }

    /// Validates step names, and under a strict policy checks that every
    /// waterfall section is present.
    pub fn with_config(data: FinancialData, config: &ModelConfig) -> Result<Self> {
        let index = Arc::new(StepIndex::build(&data.steps)?);
        WaterfallCalculator::new(config.missing_sections).calculate(&data)?;

        let history = BoundedHistory::new(config.history_limit);
        Ok(Self::settled(
            Arc::new(data),
            index,
            history.clone(),
            history,
        ))
    }

    fn settled(
        data: Arc<FinancialData>,
        index: Arc<StepIndex>,
        undo: BoundedHistory,
        redo: BoundedHistory,
    ) -> Self {
        let calculated_steps = calculate(&data);
        let is_illegal = is_illegal(&calculated_steps);
        if is_illegal {
            info!("Budget entered an illegal state: a running balance is negative");
        }

        Self {
            data,
            calculated_steps,
            is_illegal,
            undo,
            redo,
            pending_scenario: None,
            index,
        }
    }

    pub fn data(&self) -> &FinancialData {
        &self.data
    }

    pub fn calculated_steps(&self) -> &[CalculatedStep] {
        &self.calculated_steps
    }

    pub fn is_illegal(&self) -> bool {
        self.is_illegal
    }

    pub fn undo_history(&self) -> &BoundedHistory {
        &self.undo
    }

    pub fn redo_history(&self) -> &BoundedHistory {
        &self.redo
    }

    pub fn pending_scenario(&self) -> Option<&PendingScenario> {
        self.pending_scenario.as_ref()
    }

    pub fn step_index(&self) -> &StepIndex {
        &self.index
    }

    pub fn is_previewing(&self) -> bool {
        self.pending_scenario.is_some()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// The waterfall a presentation layer should draw: the preview while one is pending.
    pub fn displayed_steps(&self) -> &[CalculatedStep] {
        match &self.pending_scenario {
            Some(pending) => pending.preview_state.calculated_steps(),
            None => &self.calculated_steps,
        }
    }

    pub fn true_surplus(&self) -> Cents {
        self.calculated_steps
            .last()
            .map(|step| step.remaining)
            .unwrap_or(self.data.monthly_income)
    }

    pub fn dispatch(&self, command: Command) -> Self {
        match command.into_edit() {
            Ok(edit) => self.commit_edit(&edit),
            Err(Command::PreviewScenario { changes }) => self.preview_scenario(changes),
            Err(Command::ApplyScenario) => self.apply_scenario(),
            Err(Command::ClearPreview) => self.clear_preview(),
            Err(Command::Undo) => self.undo(),
            Err(Command::Redo) => self.redo(),
            Err(other) => {
                debug!("Unhandled command {:?}", other);
                self.clone()
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            data: Arc::clone(&self.data),
            pending_changes: self
                .pending_scenario
                .as_ref()
                .map(|pending| pending.changes.clone()),
        }
    }

    /// Rebuilds a state from a history entry, re-deriving its preview.
    fn restore(&self, snapshot: Snapshot, undo: BoundedHistory, redo: BoundedHistory) -> Self {
        let state = Self::settled(snapshot.data, Arc::clone(&self.index), undo, redo);
        match snapshot.pending_changes {
            Some(changes) => state.preview_scenario(changes),
            None => state,
        }
    }

    /// Applies `edit` and records the current state for undo. Any pending
    /// preview is dropped; an edit that changes nothing leaves history alone.
    pub fn commit_edit(&self, edit: &BreakdownEdit) -> Self {
        let next = edit.apply(&self.data, &self.index);
        if next == *self.data {
            debug!("Edit had no effect: {}", edit.describe());
            return self.clear_preview();
        }

        debug!("Committing edit: {}", edit.describe());
        self.commit(Arc::new(next))
    }

    fn commit(&self, data: Arc<FinancialData>) -> Self {
        let mut undo = self.undo.clone();
        undo.push(self.snapshot());

        let mut redo = self.redo.clone();
        redo.clear();

        Self::settled(data, Arc::clone(&self.index), undo, redo)
    }

    /// Computes the what-if budget without touching committed data or history.
    /// A new preview replaces any pending one.
    pub fn preview_scenario(&self, changes: Vec<ScenarioChange>) -> Self {
        let preview_data = apply_changes(&self.data, &self.index, &changes);
        let preview_state = Self::settled(
            Arc::new(preview_data),
            Arc::clone(&self.index),
            BoundedHistory::new(self.undo.limit()),
            BoundedHistory::new(self.redo.limit()),
        );
        debug!(
            "Previewing {} scenario change(s); surplus {} -> {}",
            changes.len(),
            self.true_surplus(),
            preview_state.true_surplus()
        );

        Self {
            pending_scenario: Some(PendingScenario {
                changes,
                preview_state: Box::new(preview_state),
            }),
            ..self.clone()
        }
    }

    /// Commits the pending preview. Without one, nothing changes.
    pub fn apply_scenario(&self) -> Self {
        match &self.pending_scenario {
            Some(pending) => {
                debug!("Applying {} scenario change(s)", pending.changes.len());
                self.commit(Arc::clone(&pending.preview_state.data))
            }
            None => {
                debug!("No pending scenario to apply");
                self.clone()
            }
        }
    }

    pub fn clear_preview(&self) -> Self {
        Self {
            pending_scenario: None,
            ..self.clone()
        }
    }

    pub fn scenario_impact(&self) -> Option<ScenarioImpact> {
        let preview = &self.pending_scenario.as_ref()?.preview_state;
        let surplus_before = self.true_surplus();
        let surplus_after = preview.true_surplus();
        Some(ScenarioImpact {
            surplus_before,
            surplus_after,
            surplus_delta: surplus_after.saturating_sub(surplus_before),
            becomes_illegal: !self.is_illegal && preview.is_illegal,
            becomes_legal: self.is_illegal && !preview.is_illegal,
        })
    }

    /// Steps back one commit, restoring whatever preview was pending then.
    /// The current state, preview included, moves onto the redo stack.
    pub fn undo(&self) -> Self {
        let mut undo = self.undo.clone();
        let Some(previous) = undo.pop() else {
            debug!("Nothing to undo");
            return self.clone();
        };

        let mut redo = self.redo.clone();
        redo.push(self.snapshot());

        self.restore(previous, undo, redo)
    }

    /// Re-applies the most recently undone state.
    pub fn redo(&self) -> Self {
        let mut redo = self.redo.clone();
        let Some(next) = redo.pop() else {
            debug!("Nothing to redo");
            return self.clone();
        };

        let mut undo = self.undo.clone();
        undo.push(self.snapshot());

        self.restore(next, undo, redo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BudgetError;
    use crate::schema::{FIXED_SPEND, TAKEHOME, TAXES, TRUE_SURPLUS};

    fn rent(amount: Cents) -> BreakdownEdit {
        BreakdownEdit::UpdateItem {
            step_name: FIXED_SPEND.to_string(),
            item_name: "Rent".to_string(),
            amount,
        }
    }

    #[test]
    fn test_history_drops_oldest() {
        let mut history = BoundedHistory::new(2);
        for income in [1, 2, 3] {
            history.push(Snapshot {
                data: Arc::new(FinancialData {
                    monthly_income: income,
                    ..Default::default()
                }),
                pending_changes: None,
            });
        }
        let incomes: Vec<Cents> = history.iter().map(|d| d.monthly_income).collect();
        assert_eq!(incomes, vec![3, 2]);
        assert_eq!(history.pop().unwrap().data.monthly_income, 3);
    }

    #[test]
    fn test_initial_state_is_settled() {
        let state = FinancialState::new(FinancialData::sample()).unwrap();
        assert!(!state.is_previewing());
        assert!(!state.can_undo());
        assert!(!state.can_redo());
        assert_eq!(state.calculated_steps().last().unwrap().name, TRUE_SURPLUS);
        assert!(state.is_illegal());
        assert_eq!(state.true_surplus(), -38_400);
    }

    #[test]
    fn test_commit_then_undo_then_redo() {
        let state = FinancialState::new(FinancialData::sample()).unwrap();
        let edited = state.commit_edit(&rent(150_000));
        assert_eq!(edited.true_surplus(), 11_600);
        assert!(!edited.is_illegal());
        assert_eq!(edited.undo_history().len(), 1);

        let undone = edited.undo();
        assert_eq!(undone.data(), state.data());
        assert_eq!(undone.calculated_steps(), state.calculated_steps());
        assert!(undone.can_redo());

        let redone = undone.redo();
        assert_eq!(redone, edited);
    }

    #[test]
    fn test_noop_edit_keeps_history() {
        let state = FinancialState::new(FinancialData::sample()).unwrap();
        let same = state.commit_edit(&rent(200_000));
        assert_eq!(same, state);

        let unknown = state.commit_edit(&BreakdownEdit::RemoveItem {
            step_name: TAXES.to_string(),
            item_name: "Nope".to_string(),
        });
        assert!(!unknown.can_undo());
    }

    #[test]
    fn test_undo_and_redo_underflow_are_noops() {
        let state = FinancialState::new(FinancialData::sample()).unwrap();
        assert_eq!(state.undo(), state);
        assert_eq!(state.redo(), state);
    }

    #[test]
    fn test_configured_history_limit() {
        let config = ModelConfig {
            history_limit: 3,
            ..Default::default()
        };
        let mut state = FinancialState::with_config(FinancialData::sample(), &config).unwrap();
        for amount in 1..=5 {
            state = state.commit_edit(&rent(amount));
        }
        assert_eq!(state.undo_history().len(), 3);

        let rents: Vec<Cents> = state
            .undo_history()
            .iter()
            .map(|data| {
                data.steps[TAKEHOME].outflow[FIXED_SPEND]
                    .breakdown
                    .as_ref()
                    .and_then(|b| b.get("Rent"))
                    .unwrap()
            })
            .collect();
        assert_eq!(rents, vec![4, 3, 2]);
    }

    #[test]
    fn test_duplicate_names_fail_construction() {
        let mut data = FinancialData::sample();
        let taxes = data.steps[crate::schema::TOTAL_INCOME].outflow[TAXES].clone();
        data.steps
            .get_mut(crate::schema::NET_INCOME)
            .unwrap()
            .outflow
            .insert(TAXES.to_string(), taxes);

        assert!(matches!(
            FinancialState::new(data),
            Err(BudgetError::DuplicateStepName(_))
        ));
    }

    #[test]
    fn test_preview_apply_and_clear() {
        let state = FinancialState::new(FinancialData::sample()).unwrap();
        let changes = vec![ScenarioChange::item(
            FIXED_SPEND,
            "Rent",
            -50_000,
            crate::scenario::Recurrence::Recurring,
            "Cheaper apartment",
        )];

        let previewing = state.preview_scenario(changes);
        assert!(previewing.is_previewing());
        assert_eq!(previewing.data(), state.data());
        assert_eq!(previewing.calculated_steps(), state.calculated_steps());
        assert_eq!(previewing.displayed_steps().last().unwrap().remaining, 11_600);

        let impact = previewing.scenario_impact().unwrap();
        assert_eq!(impact.surplus_delta, 50_000);
        assert!(impact.becomes_legal);
        assert!(!impact.becomes_illegal);

        assert_eq!(previewing.clear_preview(), state);

        let applied = previewing.apply_scenario();
        assert!(!applied.is_previewing());
        assert_eq!(applied.true_surplus(), 11_600);
        assert_eq!(applied.undo_history().len(), 1);
        assert_eq!(applied.undo().data(), state.data());
    }

    #[test]
    fn test_apply_without_preview_is_noop() {
        let state = FinancialState::new(FinancialData::sample()).unwrap();
        assert_eq!(state.apply_scenario(), state);
        assert!(state.scenario_impact().is_none());
    }

    #[test]
    fn test_dispatch_json_commands() {
        let state = FinancialState::new(FinancialData::sample()).unwrap();
        let command: Command =
            serde_json::from_str(r#"{"type":"UPDATE_MONTHLY_INCOME","amount":700000}"#).unwrap();
        let state = state.dispatch(command);
        assert_eq!(state.data().monthly_income, 700_000);

        let undo: Command = serde_json::from_str(r#"{"type":"UNDO"}"#).unwrap();
        let state = state.dispatch(undo);
        assert_eq!(state.data().monthly_income, 566_600);
    }

    fn rent_cut() -> Vec<ScenarioChange> {
        vec![ScenarioChange::item(
            FIXED_SPEND,
            "Rent",
            -50_000,
            crate::scenario::Recurrence::Recurring,
            "Cheaper apartment",
        )]
    }

    #[test]
    fn test_undo_redo_keeps_pending_preview() {
        let state = FinancialState::new(FinancialData::sample())
            .unwrap()
            .commit_edit(&BreakdownEdit::UpdateIncome { amount: 700_000 })
            .preview_scenario(rent_cut());

        let undone = state.undo();
        assert!(!undone.is_previewing());
        assert_eq!(undone.data().monthly_income, 566_600);
        assert_eq!(undone.redo_history().len(), 1);

        let redone = undone.redo();
        assert!(redone.is_previewing());
        assert_eq!(redone, state);
    }

    #[test]
    fn test_undo_after_apply_returns_to_preview() {
        let previewing = FinancialState::new(FinancialData::sample())
            .unwrap()
            .preview_scenario(rent_cut());
        let applied = previewing.apply_scenario();
        assert!(!applied.is_previewing());

        let undone = applied.undo();
        assert_eq!(undone.clear_preview().undo_history(), previewing.undo_history());
        assert_eq!(undone.data(), previewing.data());
        assert_eq!(undone.pending_scenario(), previewing.pending_scenario());
        assert_eq!(undone.redo(), applied);
    }

    #[test]
    fn test_every_edit_drops_pending_preview() {
        let previewing = FinancialState::new(FinancialData::sample())
            .unwrap()
            .preview_scenario(rent_cut());

        let noop = previewing.commit_edit(&rent(200_000));
        assert!(!noop.is_previewing());
        assert!(!noop.can_undo());

        let edited = previewing.commit_edit(&rent(190_000));
        assert!(!edited.is_previewing());
        assert!(edited.undo().is_previewing());
    }
}
