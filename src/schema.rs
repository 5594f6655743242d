use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Money in the smallest currency unit (cents). The only internal representation.
pub type Cents = i64;

pub const MONTHLY_INCOME: &str = "Monthly Income";
pub const ONE_TIME_SPEND: &str = "one_time_spend";

pub const TOTAL_INCOME: &str = "Total Income";
pub const TAKEHOME: &str = "Takehome";
pub const FREE_CASH: &str = "Free Cash";
pub const NET_INCOME: &str = "Net Income";
pub const TRUE_SURPLUS: &str = "True Surplus";

pub const PRE_TAX_DEDUCTIONS: &str = "Pre-Tax Deductions";
pub const TAXES: &str = "Taxes";
pub const FIXED_SPEND: &str = "Fixed Spend";
pub const VARIABLE_SPEND: &str = "Variable Spend";
pub const INVESTMENTS: &str = "Investments";
pub const EMERGENCY_FUND: &str = "Emergency Fund";

/// Named line items and their amounts. Keeps insertion order for display;
/// item names are unique within one breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakdown {
    items: Vec<(String, Cents)>,
}

impl Breakdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Cents> {
        self.items
            .iter()
            .find(|(item, _)| item == name)
            .map(|(_, amount)| *amount)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|(item, _)| item == name)
    }

    /// Sets `name` to `amount`, replacing in place or appending a new item.
    pub fn set(&mut self, name: impl Into<String>, amount: Cents) {
        let name = name.into();
        match self.items.iter_mut().find(|(item, _)| *item == name) {
            Some(slot) => slot.1 = amount,
            None => self.items.push((name, amount)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Cents> {
        let position = self.items.iter().position(|(item, _)| item == name)?;
        Some(self.items.remove(position).1)
    }

    /// Moves the amount stored under `old_name` to `new_name`.
    /// The item keeps its position; if `new_name` already exists its amount is overwritten
    /// and the old entry dropped. Returns false when `old_name` is absent.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> bool {
        let Some(position) = self.items.iter().position(|(item, _)| item == old_name) else {
            return false;
        };
        if old_name == new_name {
            return true;
        }

        if self.contains(new_name) {
            let (_, amount) = self.items.remove(position);
            self.set(new_name, amount);
        } else {
            self.items[position].0 = new_name.to_string();
        }
        true
    }

    /// Sum of all items, clamped to the `Cents` range.
    pub fn total(&self) -> Cents {
        self.items
            .iter()
            .fold(0, |total: Cents, (_, amount)| total.saturating_add(*amount))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Cents)> {
        self.items.iter().map(|(name, amount)| (name.as_str(), *amount))
    }
}

impl<K: Into<String>> FromIterator<(K, Cents)> for Breakdown {
    fn from_iter<I: IntoIterator<Item = (K, Cents)>>(iter: I) -> Self {
        let mut breakdown = Breakdown::new();
        for (name, amount) in iter {
            breakdown.set(name, amount);
        }
        breakdown
    }
}

impl<K: Into<String>, const N: usize> From<[(K, Cents); N]> for Breakdown {
    fn from(items: [(K, Cents); N]) -> Self {
        items.into_iter().collect()
    }
}

impl Serialize for Breakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.items.len()))?;
        for (name, amount) in &self.items {
            map.serialize_entry(name, amount)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Breakdown {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BreakdownVisitor;

        impl<'de> Visitor<'de> for BreakdownVisitor {
            type Value = Breakdown;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of item names to integer cent amounts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Breakdown, A::Error> {
                let mut breakdown = Breakdown::new();
                while let Some((name, amount)) = access.next_entry::<String, Cents>()? {
                    breakdown.set(name, amount);
                }
                Ok(breakdown)
            }
        }

        deserializer.deserialize_map(BreakdownVisitor)
    }
}

impl JsonSchema for Breakdown {
    fn schema_name() -> String {
        "Breakdown".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <BTreeMap<String, Cents>>::json_schema(gen)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    #[schemars(description = "Money that builds net worth (retirement, brokerage, emergency savings)")]
    Investment,

    #[default]
    #[schemars(description = "Money that is consumed (taxes, rent, groceries)")]
    Spend,
}

/// A node of the budget tree: either a group of child steps (`outflow`) or a
/// category carrying a `breakdown` of line items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlowStep {
    /// Cached total of the breakdown, refreshed by edits when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Cents>,

    #[serde(default, rename = "type")]
    pub kind: CategoryKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Breakdown>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outflow: BTreeMap<String, FlowStep>,
}

impl FlowStep {
    pub fn category(kind: CategoryKind, breakdown: impl Into<Breakdown>) -> Self {
        Self {
            value: None,
            kind,
            breakdown: Some(breakdown.into()),
            outflow: BTreeMap::new(),
        }
    }

    pub fn group<K, I>(children: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, FlowStep)>,
    {
        Self {
            value: None,
            kind: CategoryKind::Spend,
            breakdown: None,
            outflow: children
                .into_iter()
                .map(|(name, step)| (name.into(), step))
                .collect(),
        }
    }

    pub fn child(&self, name: &str) -> Option<&FlowStep> {
        self.outflow.get(name)
    }

    /// Recomputes the cached `value` if this node keeps one.
    pub(crate) fn refresh_cached_total(&mut self) {
        if self.value.is_some() {
            self.value = self.breakdown.as_ref().map(Breakdown::total);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OneTimeSpend {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Cents>,

    #[serde(default)]
    pub breakdown: Breakdown,
}

impl OneTimeSpend {
    pub fn new(breakdown: impl Into<Breakdown>) -> Self {
        let breakdown = breakdown.into();
        Self {
            value: Some(breakdown.total()),
            breakdown,
        }
    }

    pub(crate) fn refresh_cached_total(&mut self) {
        self.value = Some(self.breakdown.total());
    }
}

/// The complete budget document: income, the fixed-shape step tree, and one-time expenses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialData {
    #[schemars(description = "Gross monthly income in cents")]
    pub monthly_income: Cents,

    #[serde(default)]
    #[schemars(description = "One-off expenses that do not take part in the monthly waterfall")]
    pub one_time_spend: OneTimeSpend,

    #[schemars(
        description = "Top-level waterfall stages keyed by name: 'Total Income', 'Takehome', 'Free Cash', 'Net Income'"
    )]
    pub steps: BTreeMap<String, FlowStep>,
}

impl FinancialData {
    /// The starter budget a fresh session opens with.
    pub fn sample() -> Self {
        let steps = BTreeMap::from([
            (
                TOTAL_INCOME.to_string(),
                FlowStep::group([
                    (
                        PRE_TAX_DEDUCTIONS,
                        FlowStep::category(CategoryKind::Investment, [("Employer 401K", 50_000)]),
                    ),
                    (
                        TAXES,
                        FlowStep::category(
                            CategoryKind::Spend,
                            [("Federal", 100_000), ("State", 10_000)],
                        ),
                    ),
                ]),
            ),
            (
                TAKEHOME.to_string(),
                FlowStep::group([(
                    FIXED_SPEND,
                    FlowStep::category(
                        CategoryKind::Spend,
                        [
                            ("Rent", 200_000),
                            ("Utilities", 15_000),
                            ("Insurance", 20_000),
                            ("Car Payment", 50_000),
                        ],
                    ),
                )]),
            ),
            (
                FREE_CASH.to_string(),
                FlowStep::group([(
                    VARIABLE_SPEND,
                    FlowStep::category(
                        CategoryKind::Spend,
                        [
                            ("Groceries", 10_000),
                            ("Restaurants", 10_000),
                            ("Entertainment", 10_000),
                            ("Other", 10_000),
                        ],
                    ),
                )]),
            ),
            (
                NET_INCOME.to_string(),
                FlowStep::group([
                    (
                        INVESTMENTS,
                        FlowStep::category(
                            CategoryKind::Investment,
                            [("Long Term Taxable", 10_000), ("Roth IRA", 10_000)],
                        ),
                    ),
                    (
                        EMERGENCY_FUND,
                        FlowStep::category(
                            CategoryKind::Investment,
                            [("Emergency Fund", 100_000)],
                        ),
                    ),
                ]),
            ),
        ]);

        Self {
            monthly_income: 566_600,
            one_time_spend: OneTimeSpend::new([("Vacation", 100_000), ("Laptop", 200_000)]),
            steps,
        }
    }

    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(FinancialData)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Income,
    Deduction,
    Checkpoint,
}

/// One entry of the computed waterfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedStep {
    pub name: String,
    pub value: Cents,
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_kind: Option<CategoryKind>,
    /// 0 for the main waterfall, 1 for a deduction detail.
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Breakdown>,
    /// Running balance after this step's effect.
    pub remaining: Cents,
}

impl CalculatedStep {
    pub fn is_deduction(&self) -> bool {
        self.kind == StepKind::Deduction
    }

    pub fn is_checkpoint(&self) -> bool {
        self.kind == StepKind::Checkpoint
    }
}
