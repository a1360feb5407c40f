//! Order-by rule applied by the generated CRUD base.
//!
//! The same pattern text is rendered into `_gen_base.py`, so the Python
//! service and this reference implementation accept exactly the same input.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::spec::TIMESTAMP_COLUMNS;

/// Accepted order-by shape: a bare identifier, optionally followed by one
/// space and `asc`/`desc` in any case.
pub const ORDER_BY_PATTERN: &str = r"([A-Za-z_][A-Za-z0-9_]*)(?: (asc|desc))?";

static ORDER_BY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("(?i)^{ORDER_BY_PATTERN}$")).expect("order-by regex should be valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// The ordering a query ends up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ordering {
    By { column: String, direction: Direction },
    Unordered,
}

/// Resolve a user-supplied order-by string against an entity's columns.
///
/// Input that does not match [`ORDER_BY_PATTERN`] after trimming, or that
/// names a column the entity does not have, is ignored. Ignored or absent
/// input falls back to `created_at desc` when the entity has timestamps,
/// otherwise to no ordering.
pub fn resolve_order_by<S: AsRef<str>>(order_by: Option<&str>, columns: &[S]) -> Ordering {
    let has = |name: &str| columns.iter().any(|c| c.as_ref() == name);
    if let Some(caps) = order_by.and_then(|s| ORDER_BY.captures(s.trim())) {
        let column = &caps[1];
        if has(column) {
            let direction = match caps.get(2) {
                Some(d) if d.as_str().eq_ignore_ascii_case("desc") => Direction::Desc,
                _ => Direction::Asc,
            };
            return Ordering::By {
                column: column.to_string(),
                direction,
            };
        }
    }
    let created_at = TIMESTAMP_COLUMNS[0];
    if has(created_at) {
        Ordering::By {
            column: created_at.to_string(),
            direction: Direction::Desc,
        }
    } else {
        Ordering::Unordered
    }
}
