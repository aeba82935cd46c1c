//! Segment-criteria evaluation against contact records.

use dispatch_core::types::{Contact, MatchOp, Matcher, SegmentCriteria};

/// True when `contact` satisfies every criterion (AND semantics).
/// Empty criteria matches all contacts.
pub fn matches(contact: &Contact, criteria: &SegmentCriteria) -> bool {
    criteria.iter().all(|(field, matcher)| {
        let actual = contact.field(field);
        match matcher {
            Matcher::Exact(expected) => &actual == expected,
            Matcher::Qualified { op, value } => compare_values(&actual, *op, value),
        }
    })
}

#[allow(clippy::unnecessary_map_or)]
fn compare_values(actual: &serde_json::Value, op: MatchOp, expected: &serde_json::Value) -> bool {
    match op {
        MatchOp::Equals => actual == expected,
        MatchOp::NotEquals => actual != expected,
        MatchOp::GreaterThan => {
            numeric_cmp(actual, expected).map_or(false, |o| o == std::cmp::Ordering::Greater)
        }
        MatchOp::GreaterThanOrEqual => {
            numeric_cmp(actual, expected).map_or(false, |o| o != std::cmp::Ordering::Less)
        }
        MatchOp::LessThan => {
            numeric_cmp(actual, expected).map_or(false, |o| o == std::cmp::Ordering::Less)
        }
        MatchOp::LessThanOrEqual => {
            numeric_cmp(actual, expected).map_or(false, |o| o != std::cmp::Ordering::Greater)
        }
        MatchOp::Contains => actual
            .as_str()
            .zip(expected.as_str())
            .map_or(false, |(a, e)| a.contains(e)),
        MatchOp::StartsWith => actual
            .as_str()
            .zip(expected.as_str())
            .map_or(false, |(a, e)| a.starts_with(e)),
        MatchOp::EndsWith => actual
            .as_str()
            .zip(expected.as_str())
            .map_or(false, |(a, e)| a.ends_with(e)),
        MatchOp::InList => expected
            .as_array()
            .map_or(false, |list| list.contains(actual)),
        MatchOp::IsSet => !actual.is_null(),
        MatchOp::IsNotSet => actual.is_null(),
    }
}

fn numeric_cmp(a: &serde_json::Value, b: &serde_json::Value) -> Option<std::cmp::Ordering> {
    let a_num = a.as_f64()?;
    let b_num = b.as_f64()?;
    a_num.partial_cmp(&b_num)
}
