use crate::error::{BudgetError, Result};
use crate::schema::{FlowStep, MONTHLY_INCOME, ONE_TIME_SPEND};
use log::debug;
use std::collections::BTreeMap;

/// Maps every step name in a budget tree to the chain of keys that reaches it.
///
/// Built once when a budget enters the model. Edits only touch breakdown items,
/// never step names, so an index stays valid for every state derived from that budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepIndex {
    paths: BTreeMap<String, Vec<String>>,
}

impl StepIndex {
    pub fn build(steps: &BTreeMap<String, FlowStep>) -> Result<Self> {
        let mut index = StepIndex::default();
        index.walk(steps, &[])?;
        debug!("Indexed {} budget steps", index.paths.len());
        Ok(index)
    }

    fn walk(&mut self, steps: &BTreeMap<String, FlowStep>, prefix: &[String]) -> Result<()> {
        for (name, step) in steps {
            if name == ONE_TIME_SPEND || name == MONTHLY_INCOME {
                return Err(BudgetError::ReservedStepName(name.clone()));
            }

            let mut path = prefix.to_vec();
            path.push(name.clone());

            if self.paths.insert(name.clone(), path.clone()).is_some() {
                return Err(BudgetError::DuplicateStepName(name.clone()));
            }

            self.walk(&step.outflow, &path)?;
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.paths.contains_key(name)
    }

    pub fn path(&self, name: &str) -> Option<&[String]> {
        self.paths.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn resolve<'a>(
        &self,
        steps: &'a BTreeMap<String, FlowStep>,
        name: &str,
    ) -> Option<&'a FlowStep> {
        let (first, rest) = self.path(name)?.split_first()?;
        rest.iter()
            .try_fold(steps.get(first)?, |node, key| node.outflow.get(key))
    }

    pub fn resolve_mut<'a>(
        &self,
        steps: &'a mut BTreeMap<String, FlowStep>,
        name: &str,
    ) -> Option<&'a mut FlowStep> {
        let (first, rest) = self.path(name)?.split_first()?;
        let mut node = steps.get_mut(first)?;
        for key in rest {
            node = node.outflow.get_mut(key)?;
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CategoryKind, FinancialData, FIXED_SPEND, TAKEHOME, TAXES, TOTAL_INCOME};

    #[test]
    fn test_index_sample_tree() {
        let data = FinancialData::sample();
        let index = StepIndex::build(&data.steps).unwrap();

        assert_eq!(index.len(), 10);
        assert_eq!(
            index.path(TAXES).unwrap(),
            &[TOTAL_INCOME.to_string(), TAXES.to_string()]
        );
        assert!(index.contains(TAKEHOME));

        let fixed = index.resolve(&data.steps, FIXED_SPEND).unwrap();
        assert_eq!(fixed.breakdown.as_ref().unwrap().get("Rent"), Some(200_000));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut data = FinancialData::sample();
        data.steps
            .get_mut(TAKEHOME)
            .unwrap()
            .outflow
            .insert(TAXES.to_string(), FlowStep::category(CategoryKind::Spend, [("Local", 10)]));

        let err = StepIndex::build(&data.steps).unwrap_err();
        assert!(matches!(err, BudgetError::DuplicateStepName(name) if name == TAXES));
    }

    #[test]
    fn test_reserved_names_rejected() {
        let mut steps = BTreeMap::new();
        steps.insert(
            ONE_TIME_SPEND.to_string(),
            FlowStep::category(CategoryKind::Spend, [("Trip", 10)]),
        );
        assert!(matches!(
            StepIndex::build(&steps),
            Err(BudgetError::ReservedStepName(_))
        ));
    }

    #[test]
    fn test_resolve_mut_reaches_nested_node() {
        let mut data = FinancialData::sample();
        let index = StepIndex::build(&data.steps).unwrap();

        index
            .resolve_mut(&mut data.steps, FIXED_SPEND)
            .unwrap()
            .breakdown
            .as_mut()
            .unwrap()
            .set("Rent", 1);

        let rent = data.steps[TAKEHOME].outflow[FIXED_SPEND]
            .breakdown
            .as_ref()
            .unwrap()
            .get("Rent");
        assert_eq!(rent, Some(1));
        assert!(index.resolve_mut(&mut data.steps, "Nope").is_none());
    }
}
