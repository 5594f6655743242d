use crate::index::StepIndex;
use crate::schema::{Breakdown, Cents, FinancialData, ONE_TIME_SPEND};
use log::debug;
use serde::{Deserialize, Serialize};

/// A single committed edit to a budget. Every edit produces a new
/// [`FinancialData`]; the input is never touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BreakdownEdit {
    /// Set an item's amount, creating the item if needed.
    UpdateItem {
        step_name: String,
        item_name: String,
        amount: Cents,
    },

    /// Insert a new item into a step's breakdown.
    AddItem {
        step_name: String,
        item_name: String,
        amount: Cents,
    },

    RemoveItem {
        step_name: String,
        item_name: String,
    },

    /// Move an amount to a new item name within the same breakdown.
    RenameItem {
        step_name: String,
        old_name: String,
        new_name: String,
    },

    UpdateIncome { amount: Cents },
}

impl BreakdownEdit {
    pub fn apply(&self, data: &FinancialData, index: &StepIndex) -> FinancialData {
        match self {
            BreakdownEdit::UpdateItem {
                step_name,
                item_name,
                amount,
            } => update_item(data, index, step_name, item_name, *amount),
            BreakdownEdit::AddItem {
                step_name,
                item_name,
                amount,
            } => add_item(data, index, step_name, item_name, *amount),
            BreakdownEdit::RemoveItem {
                step_name,
                item_name,
            } => remove_item(data, index, step_name, item_name),
            BreakdownEdit::RenameItem {
                step_name,
                old_name,
                new_name,
            } => rename_item(data, index, step_name, old_name, new_name),
            BreakdownEdit::UpdateIncome { amount } => update_income(data, *amount),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            BreakdownEdit::UpdateItem {
                step_name,
                item_name,
                amount,
            } => format!("Set {} / {} to {}", step_name, item_name, amount),
            BreakdownEdit::AddItem {
                step_name,
                item_name,
                amount,
            } => format!("Add {} / {} at {}", step_name, item_name, amount),
            BreakdownEdit::RemoveItem {
                step_name,
                item_name,
            } => format!("Remove {} / {}", step_name, item_name),
            BreakdownEdit::RenameItem {
                step_name,
                old_name,
                new_name,
            } => format!("Rename {} / {} to {}", step_name, old_name, new_name),
            BreakdownEdit::UpdateIncome { amount } => format!("Set monthly income to {}", amount),
        }
    }
}

/// Clones `data`, runs `edit` against the breakdown owned by `step_name`, and
/// refreshes any cached total on that node. Unknown steps and steps without a
/// breakdown leave the copy unchanged.
fn with_breakdown<F>(data: &FinancialData, index: &StepIndex, step_name: &str, edit: F) -> FinancialData
where
    F: FnOnce(&mut Breakdown),
{
    let mut next = data.clone();

    if step_name == ONE_TIME_SPEND {
        edit(&mut next.one_time_spend.breakdown);
        next.one_time_spend.refresh_cached_total();
        return next;
    }

    match index.resolve_mut(&mut next.steps, step_name) {
        Some(step) => match step.breakdown.as_mut() {
            Some(breakdown) => {
                edit(breakdown);
                step.refresh_cached_total();
            }
            None => debug!("Step '{}' has no breakdown to edit", step_name),
        },
        None => debug!("Step '{}' not found, edit ignored", step_name),
    }

    next
}

pub fn update_item(
    data: &FinancialData,
    index: &StepIndex,
    step_name: &str,
    item_name: &str,
    amount: Cents,
) -> FinancialData {
    with_breakdown(data, index, step_name, |breakdown| {
        breakdown.set(item_name, amount)
    })
}

pub fn add_item(
    data: &FinancialData,
    index: &StepIndex,
    step_name: &str,
    item_name: &str,
    amount: Cents,
) -> FinancialData {
    with_breakdown(data, index, step_name, |breakdown| {
        breakdown.set(item_name, amount)
    })
}

pub fn remove_item(
    data: &FinancialData,
    index: &StepIndex,
    step_name: &str,
    item_name: &str,
) -> FinancialData {
    with_breakdown(data, index, step_name, |breakdown| {
        if breakdown.remove(item_name).is_none() {
            debug!("No item '{}' in '{}' to remove", item_name, step_name);
        }
    })
}

pub fn rename_item(
    data: &FinancialData,
    index: &StepIndex,
    step_name: &str,
    old_name: &str,
    new_name: &str,
) -> FinancialData {
    with_breakdown(data, index, step_name, |breakdown| {
        if !breakdown.rename(old_name, new_name) {
            debug!("No item '{}' in '{}' to rename", old_name, step_name);
        }
    })
}

pub fn update_income(data: &FinancialData, amount: Cents) -> FinancialData {
    FinancialData {
        monthly_income: amount,
        ..data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FlowStep, FIXED_SPEND, TAKEHOME, TAXES, TOTAL_INCOME};

    fn fixture() -> (FinancialData, StepIndex) {
        let data = FinancialData::sample();
        let index = StepIndex::build(&data.steps).unwrap();
        (data, index)
    }

    fn item(data: &FinancialData, parent: &str, child: &str, name: &str) -> Option<Cents> {
        data.steps[parent].outflow[child]
            .breakdown
            .as_ref()
            .and_then(|b| b.get(name))
    }

    #[test]
    fn test_update_item_leaves_input_untouched() {
        let (data, index) = fixture();
        let next = update_item(&data, &index, FIXED_SPEND, "Rent", 250_000);

        assert_eq!(item(&next, TAKEHOME, FIXED_SPEND, "Rent"), Some(250_000));
        assert_eq!(item(&data, TAKEHOME, FIXED_SPEND, "Rent"), Some(200_000));
    }

    #[test]
    fn test_add_and_remove_item() {
        let (data, index) = fixture();
        let added = add_item(&data, &index, TAXES, "Local", 2_500);
        assert_eq!(item(&added, TOTAL_INCOME, TAXES, "Local"), Some(2_500));

        let removed = remove_item(&added, &index, TAXES, "Local");
        assert_eq!(removed, data);

        let untouched = remove_item(&data, &index, TAXES, "Missing");
        assert_eq!(untouched, data);
    }

    #[test]
    fn test_rename_preserves_amount() {
        let (data, index) = fixture();
        let next = rename_item(&data, &index, FIXED_SPEND, "Rent", "Mortgage");
        assert_eq!(item(&next, TAKEHOME, FIXED_SPEND, "Rent"), None);
        assert_eq!(item(&next, TAKEHOME, FIXED_SPEND, "Mortgage"), Some(200_000));

        let noop = rename_item(&data, &index, FIXED_SPEND, "Boat", "Yacht");
        assert_eq!(noop, data);
    }

    #[test]
    fn test_unknown_step_or_group_node_is_noop() {
        let (data, index) = fixture();
        assert_eq!(add_item(&data, &index, "Hobbies", "Paint", 10), data);
        assert_eq!(add_item(&data, &index, TAKEHOME, "Paint", 10), data);
    }

    #[test]
    fn test_one_time_spend_total_is_refreshed() {
        let (data, index) = fixture();
        let next = add_item(&data, &index, ONE_TIME_SPEND, "Wedding", 500_000);
        assert_eq!(next.one_time_spend.breakdown.get("Wedding"), Some(500_000));
        assert_eq!(next.one_time_spend.value, Some(800_000));

        let next = remove_item(&next, &index, ONE_TIME_SPEND, "Laptop");
        assert_eq!(next.one_time_spend.value, Some(600_000));
    }

    #[test]
    fn test_cached_step_total_is_refreshed_when_present() {
        let (mut data, _) = fixture();
        let fixed = data
            .steps
            .get_mut(TAKEHOME)
            .unwrap()
            .outflow
            .get_mut(FIXED_SPEND)
            .unwrap();
        fixed.value = Some(fixed.breakdown.as_ref().unwrap().total());
        let index = StepIndex::build(&data.steps).unwrap();

        let next = update_item(&data, &index, FIXED_SPEND, "Utilities", 25_000);
        let step: &FlowStep = &next.steps[TAKEHOME].outflow[FIXED_SPEND];
        assert_eq!(step.value, Some(295_000));

        let taxes = &next.steps[TOTAL_INCOME].outflow[TAXES];
        assert_eq!(taxes.value, None);
    }

    #[test]
    fn test_update_income_keeps_steps() {
        let (data, index) = fixture();
        let edit = BreakdownEdit::UpdateIncome { amount: 700_000 };
        let next = edit.apply(&data, &index);
        assert_eq!(next.monthly_income, 700_000);
        assert_eq!(next.steps, data.steps);
    }

    #[test]
    fn test_edit_json_shape() {
        let edit: BreakdownEdit = serde_json::from_str(
            r#"{"action":"rename_item","step_name":"Taxes","old_name":"State","new_name":"County"}"#,
        )
        .unwrap();
        assert_eq!(
            edit,
            BreakdownEdit::RenameItem {
                step_name: TAXES.to_string(),
                old_name: "State".to_string(),
                new_name: "County".to_string(),
            }
        );
        assert_eq!(edit.describe(), "Rename Taxes / State to County");
    }
}
