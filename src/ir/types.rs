//! Query IR
//!
//! `HealthQuery` is what the compiler produces and what every source handler
//! consumes. It holds no behaviour beyond a few convenience accessors.

use crate::ir::calendar::Timestamp;
use crate::ir::schema::{CategoryType, QuantityType, WorkoutType};
use serde::{Deserialize, Serialize};

/// Data source a query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "type")]
pub enum HealthSource {
    Quantity(QuantityType),
    Category(CategoryType),
    Workout,
    SleepSession,
}

impl HealthSource {
    /// Table name for the `sleep` session source
    pub const SLEEP_TABLE: &'static str = "sleep";

    /// Resolve a table name.
    ///
    /// Order: fixed names (`workouts`, `sleep`), quantity display names,
    /// category display names, then the camelCase form of the name matched
    /// against quantity variant names.
    pub fn from_table_name(name: &str) -> Option<Self> {
        match name {
            WorkoutType::TABLE_NAME => return Some(Self::Workout),
            Self::SLEEP_TABLE => return Some(Self::SleepSession),
            _ => {}
        }

        if let Some(quantity) = QuantityType::from_display_name(name) {
            return Some(Self::Quantity(quantity));
        }
        if let Some(category) = CategoryType::from_display_name(name) {
            return Some(Self::Category(category));
        }

        QuantityType::from_variant_name(&snake_to_camel(name)).map(Self::Quantity)
    }

    /// Table name used in query text
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Quantity(q) => q.display_name(),
            Self::Category(c) => c.display_name(),
            Self::Workout => WorkoutType::TABLE_NAME,
            Self::SleepSession => Self::SLEEP_TABLE,
        }
    }
}

impl std::fmt::Display for HealthSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// `heart_rate` → `heartRate`: first segment kept, the rest capitalised
fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, segment) in name.split('_').enumerate() {
        if i == 0 {
            out.push_str(segment);
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// A column a query can select, filter or sort on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Value,
    Date,
    EndDate,
    Source,
    Device,
    Stage,
    Severity,
    ActivityType,
    Duration,
    TotalCalories,
    Distance,
    InBedDuration,
    Rem,
    Core,
    Deep,
    Awake,
}

impl Field {
    /// Resolve a column name (case-insensitive). `count` aliases `value`,
    /// `start_date` aliases `date`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_lowercase().as_str() {
            "value" | "count" => Self::Value,
            "date" | "start_date" => Self::Date,
            "end_date" => Self::EndDate,
            "source" => Self::Source,
            "device" => Self::Device,
            "stage" => Self::Stage,
            "severity" => Self::Severity,
            "activity_type" => Self::ActivityType,
            "duration" => Self::Duration,
            "total_calories" => Self::TotalCalories,
            "distance" => Self::Distance,
            "in_bed_duration" => Self::InBedDuration,
            "rem" => Self::Rem,
            "core" => Self::Core,
            "deep" => Self::Deep,
            "awake" => Self::Awake,
            _ => return None,
        })
    }

    /// Column name in result rows
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Date => "date",
            Self::EndDate => "end_date",
            Self::Source => "source",
            Self::Device => "device",
            Self::Stage => "stage",
            Self::Severity => "severity",
            Self::ActivityType => "activity_type",
            Self::Duration => "duration",
            Self::TotalCalories => "total_calories",
            Self::Distance => "distance",
            Self::InBedDuration => "in_bed_duration",
            Self::Rem => "rem",
            Self::Core => "core",
            Self::Deep => "deep",
            Self::Awake => "awake",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl Aggregate {
    /// Column name an aggregate contributes to a statistics row
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Sum => "sum_value",
            Self::Avg => "avg_value",
            Self::Min => "min_value",
            Self::Max => "max_value",
            Self::Count => "count_value",
        }
    }
}

impl std::fmt::Display for Aggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sum => write!(f, "sum"),
            Self::Avg => write!(f, "avg"),
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
            Self::Count => write!(f, "count"),
        }
    }
}

/// One entry of the SELECT list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Field(Field),
    Aggregate(Aggregate, Field),
}

impl Selection {
    pub fn field(&self) -> Field {
        match self {
            Self::Field(field) | Self::Aggregate(_, field) => *field,
        }
    }

    pub fn aggregate(&self) -> Option<Aggregate> {
        match self {
            Self::Field(_) => None,
            Self::Aggregate(aggregate, _) => Some(*aggregate),
        }
    }
}

/// Predicate operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    IsNull,
    IsNotNull,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Between => write!(f, "BETWEEN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateValue {
    Date(Timestamp),
    Double(f64),
    Int(i64),
    String(String),
    DateRange { start: Timestamp, end: Timestamp },
    CategoryCode(i64),
    Null,
}

impl PredicateValue {
    /// The instant carried by a `Date`, or the start of a `DateRange`
    pub fn start_date(&self) -> Option<Timestamp> {
        match self {
            Self::Date(date) | Self::DateRange { start: date, .. } => Some(*date),
            _ => None,
        }
    }
}

/// `field operator value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: Field,
    pub operator: Operator,
    pub value: PredicateValue,
}

impl Predicate {
    pub fn new(field: Field, operator: Operator, value: PredicateValue) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }
}

/// Statistics bucket size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl GroupBy {
    /// Parse a period keyword (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }
}

impl std::fmt::Display for GroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hour => write!(f, "hour"),
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: Field,
    pub direction: OrderDirection,
}

impl OrderBy {
    pub fn new(field: Field, direction: OrderDirection) -> Self {
        Self { field, direction }
    }
}

/// A compiled query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthQuery {
    pub source: HealthSource,
    pub selections: Vec<Selection>,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub grouping: Option<GroupBy>,
    #[serde(default)]
    pub ordering: Option<Vec<OrderBy>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl HealthQuery {
    /// A query selecting `selections` from `source` with no other clauses
    pub fn new(source: HealthSource, selections: Vec<Selection>) -> Self {
        Self {
            source,
            selections,
            predicates: Vec::new(),
            grouping: None,
            ordering: None,
            limit: None,
        }
    }

    /// Whether any selection is an aggregate
    pub fn has_aggregate(&self) -> bool {
        self.selections.iter().any(|s| s.aggregate().is_some())
    }

    /// Distinct aggregates requested, in selection order
    pub fn aggregates(&self) -> Vec<Aggregate> {
        let mut out = Vec::new();
        for aggregate in self.selections.iter().filter_map(Selection::aggregate) {
            if !out.contains(&aggregate) {
                out.push(aggregate);
            }
        }
        out
    }

    /// Whether `field` appears as a plain (non-aggregate) selection
    pub fn selects(&self, field: Field) -> bool {
        self.selections.contains(&Selection::Field(field))
    }
}
