//! Reconciler: narrows untrusted candidates to updates the store may apply.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::sanitizer::PriorityCandidate;
use crate::todos::model::Priority;

/// A candidate that passed validation. Carries no owner: the store binds
/// the caller's owner identifier when applying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidatedUpdate {
    pub id: i64,
    pub priority: Priority,
}

/// Why a candidate was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotAnObject,
    IdNotWholeNumber,
    UnknownLabel(String),
}

/// Interpret a JSON value as a whole number that fits in `i64`.
///
/// Floats with no fractional part (`3.0`) count; numeric strings do not.
pub fn whole_number(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.is_u64() {
        return None;
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Check one candidate and convert it.
pub fn validate_candidate(candidate: &PriorityCandidate) -> Result<ValidatedUpdate, Rejection> {
    if !candidate.as_value().is_object() {
        return Err(Rejection::NotAnObject);
    }

    let id = candidate
        .id_field()
        .and_then(whole_number)
        .ok_or(Rejection::IdNotWholeNumber)?;

    let label = candidate.label_field();
    let priority = label
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Priority>().ok())
        .ok_or_else(|| {
            Rejection::UnknownLabel(label.map(ToString::to_string).unwrap_or_default())
        })?;

    Ok(ValidatedUpdate { id, priority })
}

/// Whether a candidate is an object with a whole-number `id` and a
/// recognized `priority` label.
pub fn is_valid_candidate(candidate: &PriorityCandidate) -> bool {
    validate_candidate(candidate).is_ok()
}

/// Keep the valid candidates, in order. Invalid ones are dropped.
pub fn reconcile(candidates: &[PriorityCandidate]) -> Vec<ValidatedUpdate> {
    let mut updates = Vec::with_capacity(candidates.len());
    let mut dropped = 0usize;

    for candidate in candidates {
        match validate_candidate(candidate) {
            Ok(update) => updates.push(update),
            Err(Rejection::UnknownLabel(label)) => {
                dropped += 1;
                warn!(label = %label, "Dropping candidate with unrecognized priority label");
            }
            Err(_) => dropped += 1,
        }
    }

    debug!(kept = updates.len(), dropped, "Reconciled classifier candidates");
    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidates(value: Value) -> Vec<PriorityCandidate> {
        value
            .as_array()
            .unwrap()
            .iter()
            .cloned()
            .map(PriorityCandidate::new)
            .collect()
    }

    #[test]
    fn keeps_integer_ids_and_drops_string_ids() {
        let input = candidates(json!([
            {"id": 1, "priority": "High"},
            {"id": "x", "priority": "Low"}
        ]));
        assert_eq!(
            reconcile(&input),
            vec![ValidatedUpdate {
                id: 1,
                priority: Priority::High
            }]
        );
    }

    #[test]
    fn output_length_counts_well_formed_entries() {
        let input = candidates(json!([
            {"id": 1, "priority": "High"},
            7,
            "text",
            null,
            [1, 2],
            {"priority": "Low"},
            {"id": 2.5, "priority": "Low"},
            {"id": "3", "priority": "Low"},
            {"id": null, "priority": "Low"},
            {"id": 4.0, "priority": "Medium"},
            {"id": -5, "priority": "low"}
        ]));
        let updates = reconcile(&input);
        let ids: Vec<i64> = updates.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 4, -5]);
        assert_eq!(updates[2].priority, Priority::Low);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let c = PriorityCandidate::new(json!({"id": 1, "priority": "Urgent"}));
        assert_eq!(
            validate_candidate(&c),
            Err(Rejection::UnknownLabel("\"Urgent\"".into()))
        );
        assert!(!is_valid_candidate(&c));

        let missing = PriorityCandidate::new(json!({"id": 1}));
        assert_eq!(
            validate_candidate(&missing),
            Err(Rejection::UnknownLabel(String::new()))
        );
    }

    #[test]
    fn predicate_checks_shape_and_id() {
        assert!(is_valid_candidate(&PriorityCandidate::new(
            json!({"id": 9, "priority": "Medium"})
        )));
        assert_eq!(
            validate_candidate(&PriorityCandidate::new(json!(["id", 9]))),
            Err(Rejection::NotAnObject)
        );
        assert_eq!(
            validate_candidate(&PriorityCandidate::new(json!({"id": 1.5, "priority": "Low"}))),
            Err(Rejection::IdNotWholeNumber)
        );
    }

    #[test]
    fn whole_number_bounds() {
        assert_eq!(whole_number(&json!(12)), Some(12));
        assert_eq!(whole_number(&json!(12.0)), Some(12));
        assert_eq!(whole_number(&json!(u64::MAX)), None);
        assert_eq!(whole_number(&json!(1e300)), None);
        assert_eq!(whole_number(&json!("12")), None);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(reconcile(&[]).is_empty());
    }
}
