//! IR predicates and ordering to native store filters and sort descriptors
//!
//! Only comparisons on the `date` field become native filters. Value and
//! source predicates are accepted and dropped; nothing downstream re-applies
//! them.

use crate::ir::{Field, Operator, OrderBy, OrderDirection, Predicate, PredicateValue};
use crate::store::{DateWindow, NativeFilter, SortDescriptor, SortKey};

/// Translates IR predicates into a `NativeFilter`
#[derive(Debug, Clone, Copy, Default)]
pub struct PredicateTranslator;

impl PredicateTranslator {
    pub fn new() -> Self {
        Self
    }

    /// AND of every translatable predicate; `None` when nothing translates
    pub fn translate(&self, predicates: &[Predicate]) -> Option<NativeFilter> {
        let mut filters: Vec<NativeFilter> = predicates.iter().filter_map(translate_one).collect();

        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(NativeFilter::And(filters)),
        }
    }
}

fn translate_one(predicate: &Predicate) -> Option<NativeFilter> {
    if predicate.field != Field::Date {
        return None;
    }

    let window = match (predicate.operator, &predicate.value) {
        (Operator::GreaterThan, PredicateValue::Date(date)) => {
            DateWindow::new(Some(*date), None).strict_start()
        }
        (Operator::GreaterThanOrEqual, PredicateValue::Date(date)) => {
            DateWindow::new(Some(*date), None)
        }
        (Operator::LessThan, PredicateValue::Date(date)) => {
            DateWindow::new(None, Some(*date)).strict_end()
        }
        (Operator::LessThanOrEqual, PredicateValue::Date(date)) => {
            DateWindow::new(None, Some(*date))
        }
        (Operator::Between, PredicateValue::DateRange { start, end }) => {
            DateWindow::new(Some(*start), Some(*end))
        }
        _ => return None,
    };

    Some(NativeFilter::Window(window))
}

/// Sort descriptors for a sample fetch.
///
/// Without an explicit ordering, samples come back newest first. `key_for`
/// picks the native key for each ordered field.
pub fn sort_descriptors(
    ordering: Option<&[OrderBy]>,
    key_for: impl Fn(Field) -> SortKey,
) -> Vec<SortDescriptor> {
    match ordering {
        None => vec![SortDescriptor::new(SortKey::StartDate, false)],
        Some(ordering) => ordering
            .iter()
            .map(|order| {
                SortDescriptor::new(
                    key_for(order.field),
                    order.direction == OrderDirection::Ascending,
                )
            })
            .collect(),
    }
}

/// Keys every sample supports: start and end date
pub fn sample_sort_key(field: Field) -> SortKey {
    match field {
        Field::EndDate => SortKey::EndDate,
        _ => SortKey::StartDate,
    }
}
