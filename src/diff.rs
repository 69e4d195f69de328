//! Change detection between stored and freshly scraped classes.
//!
//! Entries are compared by position: entry `j` of a fresh class is checked
//! against entry `j` of the stored class. The site only ever appends rows,
//! so this holds as long as it never reorders them. If it does, reordered
//! rows are reported as changed.

use tracing::warn;

use crate::domain::{ClassOutcome, ClassSnapshot};

/// Classes whose results changed, restricted to outcomes without error.
///
/// Each returned snapshot carries only the new or differing entries, along
/// with the class's current total and final grade.
pub fn diff(previous: &[ClassSnapshot], fresh: &[ClassOutcome]) -> Vec<ClassSnapshot> {
    let mut changed = Vec::new();

    for outcome in fresh {
        let Some(snapshot) = outcome.snapshot() else {
            continue;
        };
        let old = previous.get(outcome.class_index);

        let new_entries: Vec<_> = snapshot
            .results
            .iter()
            .enumerate()
            .filter(|(j, entry)| old.and_then(|o| o.results.get(*j)) != Some(*entry))
            .map(|(_, entry)| entry.clone())
            .collect();

        let (old_total, old_final) = match old {
            Some(o) => (o.total.as_ref(), o.final_grade.as_ref()),
            None => (None, None),
        };
        let summary_changed =
            old_total != snapshot.total.as_ref() || old_final != snapshot.final_grade.as_ref();

        if new_entries.is_empty() && !summary_changed {
            continue;
        }

        changed.push(ClassSnapshot {
            spec: old.map_or_else(|| snapshot.spec.clone(), |o| o.spec.clone()),
            results: new_entries,
            total: snapshot.total.clone(),
            final_grade: snapshot.final_grade.clone(),
        });
    }

    changed
}

/// Fold error-free outcomes into the stored classes.
///
/// Classes whose outcome carries an error keep their stored snapshot. An
/// outcome for the slot right after the last stored class is appended; one
/// further out is dropped so positions keep lining up.
pub fn merge(stored: &mut Vec<ClassSnapshot>, fresh: &[ClassOutcome]) {
    for outcome in fresh {
        let Some(snapshot) = outcome.snapshot() else {
            continue;
        };
        let len = stored.len();
        match stored.get_mut(outcome.class_index) {
            Some(class) => {
                class.results = snapshot.results.clone();
                class.total = snapshot.total.clone();
                class.final_grade = snapshot.final_grade.clone();
            }
            None if outcome.class_index == len => stored.push(snapshot.clone()),
            None => warn!(
                class_index = outcome.class_index,
                stored = len,
                "Dropping outcome past the stored classes"
            ),
        }
    }
}
