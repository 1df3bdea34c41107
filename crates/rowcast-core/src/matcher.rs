//! Column-to-field assignment by normalized name.
//!
//! Matching is generous: case, underscores, and interior whitespace are
//! ignored on both sides, so a column labeled `t_h_r_e_e` or `tHree`
//! assigns to a field named `three`. Matching is otherwise exact, with no
//! prefix, suffix, or fuzzy comparison.

use std::collections::HashMap;

use rowcast_types::Column;
use tracing::debug;

/// Per-execution assignment of result-set columns to record fields.
///
/// Slot `i` holds the field position receiving column `i`'s value, or
/// `None` for an unmatched column. Slot 0 is a permanent sentinel so that
/// slots align with 1-based column indices. Built once per query execution
/// and reused across all of its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTable {
    slots: Vec<Option<usize>>,
}

impl MatchTable {
    /// The field assigned to 1-based column `index`, if any.
    #[must_use]
    pub fn assignment(&self, index: usize) -> Option<usize> {
        self.slots.get(index).copied().flatten()
    }

    /// Iterate `(column_index, field_position)` pairs for matched columns,
    /// in column order.
    pub fn assignments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(col, slot)| slot.map(|field| (col, field)))
    }

    /// Number of slots including the index-0 sentinel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no column is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

/// Normalize a column label or field name for matching: strip every
/// whitespace character and underscore, lowercase the rest.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Build the match table for one query execution.
///
/// A column matches through its label only; a column whose label is absent
/// is never assigned, regardless of its underlying name. When two field
/// names normalize to the same key the first-declared field wins. Zero
/// columns or zero fields produce a table with no assignments.
pub fn match_columns<'a, I>(columns: &[Column], field_names: I) -> MatchTable
where
    I: IntoIterator<Item = &'a str>,
{
    let mut by_key: HashMap<String, usize> = HashMap::new();
    for (position, name) in field_names.into_iter().enumerate() {
        by_key.entry(normalize(name)).or_insert(position);
    }

    let mut slots = vec![None; columns.len() + 1];
    for column in columns {
        let Some(label) = column.label.as_deref() else {
            debug!(column = column.index, name = %column.name, "column has no label, unmatched");
            continue;
        };
        let slot = match by_key.get(&normalize(label)) {
            Some(&field) => Some(field),
            None => {
                debug!(column = column.index, label, "no field for column");
                None
            }
        };
        if column.index < slots.len() {
            slots[column.index] = slot;
        }
    }
    MatchTable { slots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rowcast_types::Column;

    const FIELDS: [&str; 3] = ["one", "two", "three"];

    fn columns(labels: &[&str]) -> Vec<Column> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| Column::new(i + 1, *label))
            .collect()
    }

    #[test]
    fn normalize_strips_noise() {
        assert_eq!(normalize("t_h_r_e_e"), "three");
        assert_eq!(normalize("  tHree "), "three");
        assert_eq!(normalize("o n e"), "one");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn mixed_case_assigns() {
        let table = match_columns(&columns(&["tHree", "One", "tWO"]), FIELDS);
        assert_eq!(table.len(), 4);
        assert_eq!(table.assignment(1), Some(2));
        assert_eq!(table.assignment(2), Some(0));
        assert_eq!(table.assignment(3), Some(1));
        assert_eq!(table.assignment(0), None);
    }

    #[test]
    fn underscores_assign() {
        let table = match_columns(&columns(&["t_h_r_e_e", "o_n_e", "t_w_o"]), FIELDS);
        assert_eq!(table.assignment(1), Some(2));
        assert_eq!(table.assignment(2), Some(0));
        assert_eq!(table.assignment(3), Some(1));
    }

    #[test]
    fn interior_spaces_assign() {
        let table = match_columns(&columns(&["th ree", "o n e", "t wo"]), FIELDS);
        assert_eq!(table.assignment(1), Some(2));
        assert_eq!(table.assignment(2), Some(0));
        assert_eq!(table.assignment(3), Some(1));
    }

    #[test]
    fn null_label_never_assigns() {
        let cols = vec![Column::unlabeled(1, "three")];
        let table = match_columns(&cols, FIELDS);
        assert_eq!(table.len(), 2);
        assert_eq!(table.assignment(1), None);
        assert!(table.is_empty());
    }

    #[test]
    fn unknown_column_is_unmatched_not_error() {
        let table = match_columns(&columns(&["juhu"]), FIELDS);
        assert_eq!(table.assignment(1), None);
    }

    #[test]
    fn empty_inputs() {
        assert!(match_columns(&[], FIELDS).is_empty());
        assert!(match_columns(&columns(&["one"]), std::iter::empty::<&str>()).is_empty());
    }

    #[test]
    fn duplicate_field_names_first_wins() {
        let table = match_columns(&columns(&["a_b"]), ["ab", "a_b"]);
        assert_eq!(table.assignment(1), Some(0));
    }

    proptest! {
        /// Inserting underscores, spaces, or case flips into a label must
        /// not change which field it matches.
        #[test]
        fn matching_is_noise_invariant(base in "[a-z]{1,8}", seed in any::<u64>()) {
            let mut noisy = String::new();
            for (i, c) in base.chars().enumerate() {
                if seed >> (i % 60) & 1 == 1 {
                    noisy.push('_');
                }
                if seed >> ((i + 7) % 60) & 1 == 1 {
                    noisy.push(' ');
                }
                if seed >> ((i + 13) % 60) & 1 == 1 {
                    noisy.extend(c.to_uppercase());
                } else {
                    noisy.push(c);
                }
            }
            let plain = match_columns(&[Column::new(1, base.as_str())], [base.as_str()]);
            let fuzzed = match_columns(&[Column::new(1, noisy.as_str())], [base.as_str()]);
            prop_assert_eq!(plain.assignment(1), fuzzed.assignment(1));
            prop_assert_eq!(fuzzed.assignment(1), Some(0));
        }
    }
}
