//! Reference scanner: items mentioned, not defined, by data edits.
//!
//! Recipes, shops, machine rules, events, gift tastes and locations name
//! items by qualified identifier inside their string data. Those identifiers
//! are collected so items added by code (or by packages the scanner cannot
//! fully resolve) still appear in the index.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::catalog::{DiscoveredItem, ItemCatalog};
use crate::package::Package;
use crate::patch::EditDataPatch;
use crate::scanner::ScanContext;
use crate::schema::{Category, is_reference_target};

static QUALIFIED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([A-Z]+)\)([A-Za-z0-9._\-]+)").expect("qualified id pattern is valid")
});

/// Register every qualified identifier mentioned by `edit`.
///
/// `packages` is every package discovered in this pass, used to infer which
/// package owns a mentioned identifier. Returns the number added.
pub fn scan_reference_patch(
    edit: &EditDataPatch,
    ctx: &ScanContext<'_>,
    packages: &[Package],
    catalog: &mut ItemCatalog<'_>,
) -> usize {
    let mut added = 0;
    for target in edit.targets() {
        if !is_reference_target(&ctx.resolve_id(target)) {
            continue;
        }
        for value in edit.entries.values() {
            visit_strings(value, &mut |text| {
                added += register_mentions(&ctx.resolve_id(text), ctx.package, packages, catalog);
            });
        }
    }
    added
}

fn register_mentions(
    text: &str,
    scanning: &Package,
    packages: &[Package],
    catalog: &mut ItemCatalog<'_>,
) -> usize {
    let mut added = 0;
    for caps in QUALIFIED_ID.captures_iter(text) {
        let qualified_id = &caps[0];
        if catalog.is_baseline(qualified_id) || catalog.contains(qualified_id) {
            continue;
        }
        let inner_id = &caps[2];
        let owner = infer_owner(inner_id, packages).unwrap_or(scanning);
        let item = DiscoveredItem::new(inner_id, inner_id, Category::from_prefix(&caps[1]), owner);
        if catalog.register(qualified_id.to_string(), item) {
            added += 1;
        }
    }
    added
}

/// Guess which known package an inner id belongs to.
///
/// Tries `<packageId>_<rest>` first, then an exact or dot-prefixed package
/// id (longest match wins).
fn infer_owner<'p>(inner_id: &str, packages: &'p [Package]) -> Option<&'p Package> {
    if let Some((candidate, _)) = inner_id.split_once('_')
        && let Some(owner) = packages
            .iter()
            .find(|p| p.unique_id.eq_ignore_ascii_case(candidate))
    {
        return Some(owner);
    }

    let lower = inner_id.to_ascii_lowercase();
    packages
        .iter()
        .filter(|p| {
            let id = p.unique_id.to_ascii_lowercase();
            lower == id
                || lower
                    .strip_prefix(&id)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
        .max_by_key(|p| p.unique_id.len())
}

/// Call `visit` for every string leaf of a JSON value.
fn visit_strings(value: &Value, visit: &mut dyn FnMut(&str)) {
    match value {
        Value::String(s) => visit(s),
        Value::Array(items) => items.iter().for_each(|v| visit_strings(v, visit)),
        Value::Object(map) => map.values().for_each(|v| visit_strings(v, visit)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
