//! # Status Conditions
//!
//! Upsert-by-type helpers over an ordered condition list.
//!
//! Conditions are unique by `type`. Setting a condition whose status is unchanged
//! keeps the original transition time, so re-applying the same condition is a no-op
//! as far as the transition time is concerned.

use crate::crd::Condition;

/// Set `new` in `conditions`, replacing any condition of the same type
///
/// - absent: `new` is appended, stamped with its own transition time or now
/// - present with the same status: reason and message are replaced, the
///   original transition time is kept
/// - present with a different status: replaced entirely with a fresh transition time
///
/// Entries of other types keep their position. Returns whether anything changed,
/// so callers can skip the status write.
pub fn set_condition(conditions: &mut Vec<Condition>, mut new: Condition) -> bool {
    let Some(existing) = conditions.iter_mut().find(|c| c.r#type == new.r#type) else {
        if new.last_transition_time.is_none() {
            new.last_transition_time = Some(now_rfc3339());
        }
        conditions.push(new);
        return true;
    };

    if existing.status == new.status {
        let changed = existing.reason != new.reason || existing.message != new.message;
        existing.reason = new.reason;
        existing.message = new.message;
        if existing.last_transition_time.is_none() {
            existing.last_transition_time =
                Some(new.last_transition_time.unwrap_or_else(now_rfc3339));
            return true;
        }
        return changed;
    }

    if new.last_transition_time.is_none() {
        new.last_transition_time = Some(now_rfc3339());
    }
    *existing = new;
    true
}

/// Find a condition by type
pub fn find_condition<'a>(conditions: &'a [Condition], r#type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == r#type)
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
