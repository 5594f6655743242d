use crate::edits::update_item;
use crate::error::Result;
use crate::index::StepIndex;
use crate::schema::{Cents, FinancialData, MONTHLY_INCOME, ONE_TIME_SPEND};
use log::{debug, warn};
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[schemars(description = "Applies every month (raise, rent increase, cancelled subscription)")]
    Recurring,

    #[schemars(description = "Happens once (bonus, windfall, one-off purchase)")]
    OneTime,
}

/// One proposed what-if adjustment. `delta` is always added to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioChange {
    #[schemars(
        description = "Exact name of the budget step to adjust, e.g. 'Fixed Spend', 'Variable Spend', 'Taxes'. Use 'Monthly Income' to adjust income and 'one_time_spend' for one-off expenses."
    )]
    pub step_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "Line item inside the step's breakdown, e.g. 'Rent'. Required for every step except 'Monthly Income'. Created if it does not exist."
    )]
    pub item_name: Option<String>,

    #[schemars(
        description = "Signed change in cents, added to the current amount. Negative values express cuts."
    )]
    pub delta: Cents,

    pub recurrence: Recurrence,

    #[schemars(description = "Short human-readable label for the change")]
    pub description: String,
}

impl ScenarioChange {
    pub fn income(delta: Cents, recurrence: Recurrence, description: impl Into<String>) -> Self {
        Self {
            step_name: MONTHLY_INCOME.to_string(),
            item_name: None,
            delta,
            recurrence,
            description: description.into(),
        }
    }

    pub fn item(
        step_name: impl Into<String>,
        item_name: impl Into<String>,
        delta: Cents,
        recurrence: Recurrence,
        description: impl Into<String>,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            item_name: Some(item_name.into()),
            delta,
            recurrence,
            description: description.into(),
        }
    }

    pub fn targets_income(&self) -> bool {
        self.step_name == MONTHLY_INCOME
    }
}

/// The payload an external change proposer is expected to return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioProposal {
    #[schemars(description = "Ordered list of budget adjustments described by the user")]
    pub changes: Vec<ScenarioChange>,
}

impl ScenarioProposal {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// JSON schema with every subschema inlined and no `$schema` header, suitable as
    /// a structured-output constraint for an LLM.
    pub fn response_schema() -> serde_json::Result<serde_json::Value> {
        let generator = SchemaSettings::draft07()
            .with(|settings| {
                settings.inline_subschemas = true;
                settings.meta_schema = None;
            })
            .into_generator();
        let root = generator.into_root_schema_for::<ScenarioProposal>();

        let mut value = serde_json::to_value(root)?;
        if let Some(object) = value.as_object_mut() {
            object.remove("definitions");
            object.remove("title");
        }
        Ok(value)
    }
}

/// Builds the hypothetical budget for `changes`, applied in order against one working copy.
pub fn apply_changes(
    data: &FinancialData,
    index: &StepIndex,
    changes: &[ScenarioChange],
) -> FinancialData {
    changes
        .iter()
        .fold(data.clone(), |working, change| apply_change(working, index, change))
}

fn apply_change(working: FinancialData, index: &StepIndex, change: &ScenarioChange) -> FinancialData {
    if change.targets_income() {
        debug!("Scenario: income {:+} ({})", change.delta, change.description);
        return FinancialData {
            monthly_income: working.monthly_income.saturating_add(change.delta),
            ..working
        };
    }

    let Some(item_name) = change.item_name.as_deref() else {
        warn!(
            "Scenario change '{}' names no item in '{}', skipping",
            change.description, change.step_name
        );
        return working;
    };

    let current = if change.step_name == ONE_TIME_SPEND {
        Some(working.one_time_spend.breakdown.get(item_name).unwrap_or(0))
    } else {
        index
            .resolve(&working.steps, &change.step_name)
            .and_then(|step| step.breakdown.as_ref())
            .map(|breakdown| breakdown.get(item_name).unwrap_or(0))
    };

    match current {
        Some(amount) => {
            debug!(
                "Scenario: {} / {} {:+} ({})",
                change.step_name, item_name, change.delta, change.description
            );
            update_item(
                &working,
                index,
                &change.step_name,
                item_name,
                amount.saturating_add(change.delta),
            )
        }
        None => {
            warn!(
                "Scenario change '{}' targets unknown step '{}', skipping",
                change.description, change.step_name
            );
            working
        }
    }
}
