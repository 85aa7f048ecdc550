//! Helpers for building certificate file fixtures in unit tests.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::certificate::{DATA_BEGIN, DATA_END, Product};

/// Builds a [`Product`] with the given id and tags.
pub(crate) fn product(id: &str, tags: &[&str]) -> Product {
    Product {
        id: id.to_string(),
        provided_tags: tags.iter().map(ToString::to_string).collect::<BTreeSet<_>>(),
    }
}

/// Renders a certificate file without an order section.
pub(crate) fn cert_file_text(
    serial: u64,
    products: &[Product],
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> String {
    stacked_cert_file_text(serial, products, None, not_before, not_after)
}

/// Renders a certificate file, optionally carrying a stacked order.
pub(crate) fn stacked_cert_file_text(
    serial: u64,
    products: &[Product],
    stacking_id: Option<&str>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> String {
    let mut data = json!({
        "serial": serial,
        "products": products,
        "not_before": not_before.to_rfc3339(),
        "not_after": not_after.to_rfc3339(),
    });
    if let Some(stack_id) = stacking_id {
        data["order"] = json!({ "stacking_id": stack_id });
    }
    format!("{DATA_BEGIN}\n{data}\n{DATA_END}\n")
}
