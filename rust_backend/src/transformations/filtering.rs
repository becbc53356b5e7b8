use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::domain::Dataset;
use crate::core::error::PipelineResult;

/// Placeholder used when reporting null offending values.
pub const NULL_LABEL: &str = "<null>";

/// Outcome of [`filter_by_domain`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainFilterOutcome {
    pub removed: usize,
    /// column -> offending value -> occurrences, over the removed rows.
    pub offending_values: BTreeMap<String, BTreeMap<String, usize>>,
    /// Domain columns absent from the dataset.
    pub skipped_columns: Vec<String>,
}

/// Row mask that is true where `values` lies in `allowed`. Nulls map to
/// `keep_nulls`.
pub fn domain_mask(values: &StringChunked, allowed: &BTreeSet<String>, keep_nulls: bool) -> BooleanChunked {
    let keep: Vec<bool> = values
        .into_iter()
        .map(|v| v.map_or(keep_nulls, |v| allowed.contains(v)))
        .collect();
    BooleanChunked::from_slice(values.name().clone(), &keep)
}

/// Removes every row whose domain columns hold a value outside the allowed
/// set. Values are never coerced.
///
/// Nulls are outside every set, except in the columns listed in
/// `null_passthrough`, whose nulls are left for the null-handling stage.
/// Domain columns missing from the dataset are skipped and reported.
pub fn filter_by_domain(
    dataset: &mut Dataset,
    domains: &BTreeMap<String, BTreeSet<String>>,
    null_passthrough: &BTreeSet<String>,
) -> PipelineResult<DomainFilterOutcome> {
    let mut outcome = DomainFilterOutcome::default();
    let mut mask: Option<BooleanChunked> = None;

    for (column, allowed) in domains {
        let Some(values) = dataset.text(column) else {
            outcome.skipped_columns.push(column.clone());
            continue;
        };
        let in_domain = domain_mask(values, allowed, null_passthrough.contains(column));

        for (value, keep) in values.into_iter().zip((&in_domain).into_iter()) {
            if keep != Some(false) {
                continue;
            }
            *outcome
                .offending_values
                .entry(column.clone())
                .or_default()
                .entry(value.unwrap_or(NULL_LABEL).to_string())
                .or_insert(0) += 1;
        }

        mask = Some(match mask {
            Some(mask) => &mask & &in_domain,
            None => in_domain,
        });
    }

    if let Some(mask) = mask {
        outcome.removed = dataset.filter(&mask)?;
    }
    Ok(outcome)
}
