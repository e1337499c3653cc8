//! Patch scanner: finds items defined by data edits.
//!
//! For each edit whose target is a known item schema, every entry key is
//! resolved into an inner id and qualified with the schema's prefix. Display
//! names are extracted per [`NameStrategy`] and run through
//! [`ScanContext::resolve_name`].

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::catalog::{DiscoveredItem, ItemCatalog};
use crate::i18n::LocalizationTable;
use crate::package::Package;
use crate::patch::EditDataPatch;
use crate::schema::{ItemSchema, NameStrategy, item_schema};
use crate::tokens::{TokenTable, expand_str, has_unresolved_tokens, resolve_i18n, substitute_mod_id};

const RECORD_NAME_FIELDS: [&str; 4] = ["DisplayName", "displayName", "Name", "name"];

const NAME_SUFFIXES: [&str; 6] = [
    "_displayname",
    ".displayname",
    "_name",
    ".name",
    "displayname",
    "name",
];

static LOCALIZED_TEXT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[LocalizedText\s+([^\]]*)\]").expect("marker pattern is valid")
});

/// Per-package resolution state shared by both scanners.
pub struct ScanContext<'a> {
    pub package: &'a Package,
    pub dynamic_tokens: &'a TokenTable,
    pub localization: &'a LocalizationTable,
}

impl ScanContext<'_> {
    /// Expand dynamic tokens, then the identity placeholder.
    pub fn resolve_id(&self, raw: &str) -> String {
        substitute_mod_id(&expand_str(raw, self.dynamic_tokens), &self.package.unique_id)
    }

    /// Full display-name pipeline: tokens, identity, localization, readability.
    pub fn resolve_name(&self, raw: &str) -> String {
        humanize_name(&resolve_i18n(&self.resolve_id(raw), self.localization))
    }
}

/// Register every item defined by `edit`. Returns the number added.
pub fn scan_item_patch(
    edit: &EditDataPatch,
    ctx: &ScanContext<'_>,
    catalog: &mut ItemCatalog<'_>,
) -> usize {
    let mut added = 0;
    for target in edit.targets() {
        let Some(schema) = item_schema(&ctx.resolve_id(target)) else {
            continue;
        };
        for (key, value) in &edit.entries {
            if !value.is_null() {
                added += scan_entry(schema, key, value, ctx, catalog);
            }
        }
    }
    added
}

fn scan_entry(
    schema: &ItemSchema,
    key: &str,
    value: &Value,
    ctx: &ScanContext<'_>,
    catalog: &mut ItemCatalog<'_>,
) -> usize {
    let inner_id = ctx.resolve_id(key).trim().to_string();
    if inner_id.is_empty() || has_unresolved_tokens(&inner_id) {
        return 0;
    }
    let qualified_id = schema.category.qualify(&inner_id);
    if catalog.is_baseline(&qualified_id) {
        return 0;
    }

    let declared = match schema.names {
        NameStrategy::Record { .. } => record_name(value),
        NameStrategy::Delimited { display_field } => delimited_name(value, display_field),
    };
    let display_name = ctx.resolve_name(declared.unwrap_or(inner_id.as_str()));

    let mut added = 0;
    let item = DiscoveredItem::new(&inner_id, &display_name, schema.category, ctx.package);
    if catalog.register(qualified_id, item) {
        added += 1;
    }

    let aliased = matches!(schema.names, NameStrategy::Record { alias: true });
    if aliased
        && declared.is_some()
        && !display_name.is_empty()
        && display_name != inner_id
        && !has_unresolved_tokens(&display_name)
    {
        let alias = DiscoveredItem::new(&display_name, &display_name, schema.category, ctx.package);
        if catalog.register(schema.category.qualify(&display_name), alias) {
            added += 1;
        }
    }
    added
}

fn record_name(value: &Value) -> Option<&str> {
    RECORD_NAME_FIELDS
        .iter()
        .filter_map(|field| value.get(*field).and_then(Value::as_str))
        .find(|name| !name.trim().is_empty())
}

fn delimited_name(value: &Value, display_field: usize) -> Option<&str> {
    let fields: Vec<&str> = value.as_str()?.split('/').collect();
    [display_field, 0]
        .into_iter()
        .filter_map(|i| fields.get(i).copied())
        .find(|name| !name.trim().is_empty())
}

/// Make a resolved name readable.
///
/// Rewrites `[LocalizedText Asset:Key]` markers into words derived from the
/// key and collapses whitespace.
pub fn humanize_name(name: &str) -> String {
    let rewritten = LOCALIZED_TEXT_MARKER.replace_all(name, |caps: &Captures| {
        let reference = caps[1].split_whitespace().next().unwrap_or_default();
        let key = reference.rsplit(':').next().unwrap_or(reference);
        split_camel_case(strip_name_suffix(key)).replace('_', " ")
    });
    rewritten.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_name_suffix(key: &str) -> &str {
    let lower = key.to_ascii_lowercase();
    NAME_SUFFIXES
        .iter()
        .find(|suffix| lower.ends_with(*suffix) && lower.len() > suffix.len())
        .map_or(key, |suffix| &key[..key.len() - suffix.len()])
}

fn split_camel_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::BaselineIds;
    use crate::patch::Patch;
    use crate::schema::Category;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;

    struct Fixture {
        package: Package,
        tokens: TokenTable,
        localization: LocalizationTable,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                package: Package {
                    unique_id: "Author.Mod".to_string(),
                    name: "Author's Mod".to_string(),
                    root_dir: PathBuf::from("/mods/Author.Mod"),
                },
                tokens: TokenTable::new(),
                localization: LocalizationTable::new(),
            }
        }

        fn ctx(&self) -> ScanContext<'_> {
            ScanContext {
                package: &self.package,
                dynamic_tokens: &self.tokens,
                localization: &self.localization,
            }
        }
    }

    fn edit(value: serde_json::Value) -> EditDataPatch {
        match Patch::from_value(&value) {
            Patch::EditData(edit) => edit,
            other => panic!("expected EditData, got {other:?}"),
        }
    }

    #[test]
    fn test_record_entry_with_localized_name() {
        let mut fx = Fixture::new();
        fx.localization.insert("item.name", "Magic Bean");
        let baseline = BaselineIds::new();
        let mut catalog = ItemCatalog::new(&baseline);

        let patch = edit(json!({
            "Action": "EditData",
            "Target": "Data/Objects",
            "Entries": {"MyItem": {"Name": "MyItem", "DisplayName": "{{i18n:item.name}}"}}
        }));
        scan_item_patch(&patch, &fx.ctx(), &mut catalog);

        let item = catalog.get("(O)MyItem").unwrap();
        assert_eq!(item.display_name, "Magic Bean");
        assert_eq!(item.package_id, "Author.Mod");
        assert_eq!(item.category, Category::Objects);
    }

    #[test]
    fn test_objects_alias_registration() {
        let fx = Fixture::new();
        let baseline = BaselineIds::new();
        let mut catalog = ItemCatalog::new(&baseline);

        let patch = edit(json!({
            "Action": "EditData",
            "Target": "Data/Objects",
            "Entries": {"flax_seeds": {"DisplayName": "Premium Flax"}}
        }));
        assert_eq!(scan_item_patch(&patch, &fx.ctx(), &mut catalog), 2);
        assert_eq!(catalog.get("(O)flax_seeds").unwrap().display_name, "Premium Flax");
        let alias = catalog.get("(O)Premium Flax").unwrap();
        assert_eq!(alias.display_name, "Premium Flax");
        assert_eq!(alias.inner_id, "Premium Flax");
    }

    #[test]
    fn test_alias_skipped_for_baseline_and_other_schemas() {
        let fx = Fixture::new();
        let baseline: BaselineIds = ["(O)Premium Flax"].into_iter().collect();
        let mut catalog = ItemCatalog::new(&baseline);

        let objects = edit(json!({
            "Action": "EditData",
            "Target": "Data/Objects",
            "Entries": {"flax_seeds": {"DisplayName": "Premium Flax"}}
        }));
        let craftables = edit(json!({
            "Action": "EditData",
            "Target": "Data/BigCraftables",
            "Entries": {"keg_two": {"DisplayName": "Keg Two"}}
        }));
        scan_item_patch(&objects, &fx.ctx(), &mut catalog);
        scan_item_patch(&craftables, &fx.ctx(), &mut catalog);

        assert!(catalog.contains("(O)flax_seeds"));
        assert!(!catalog.contains("(O)Premium Flax"));
        assert!(catalog.contains("(BC)keg_two"));
        assert!(!catalog.contains("(BC)Keg Two"));
    }

    #[test]
    fn test_baseline_entry_skipped_entirely() {
        let fx = Fixture::new();
        let baseline: BaselineIds = ["(O)388"].into_iter().collect();
        let mut catalog = ItemCatalog::new(&baseline);
        let patch = edit(json!({
            "Action": "EditData",
            "Target": "Data/Objects",
            "Entries": {"388": {"DisplayName": "Better Wood"}}
        }));
        assert_eq!(scan_item_patch(&patch, &fx.ctx(), &mut catalog), 0);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_delimited_entries_use_display_field_then_internal_name() {
        let fx = Fixture::new();
        let baseline = BaselineIds::new();
        let mut catalog = ItemCatalog::new(&baseline);
        let patch = edit(json!({
            "Action": "EditData",
            "Target": "Data/Hats",
            "Entries": {
                "{{ModId}}_Cap": "Cap/A cap/false/true//Shiny Cap/0/Mods/x",
                "{{ModId}}_Bare": "Bare Hat/desc/false/true//",
                "{{ModId}}_Empty": ""
            }
        }));
        scan_item_patch(&patch, &fx.ctx(), &mut catalog);

        assert_eq!(catalog.get("(H)Author.Mod_Cap").unwrap().display_name, "Shiny Cap");
        assert_eq!(catalog.get("(H)Author.Mod_Bare").unwrap().display_name, "Bare Hat");
        assert_eq!(
            catalog.get("(H)Author.Mod_Empty").unwrap().display_name,
            "Author.Mod_Empty"
        );
    }

    #[test]
    fn test_dynamic_tokens_in_keys_and_target() {
        let mut fx = Fixture::new();
        fx.tokens.insert("Kind", "Furniture");
        fx.tokens.insert("Prefix", "jane");
        let baseline = BaselineIds::new();
        let mut catalog = ItemCatalog::new(&baseline);
        let patch = edit(json!({
            "Action": "EditData",
            "Target": "Data/{{Kind}}",
            "Entries": {
                "{{Prefix}}_Chair": "Chair/chair/1 2/1 1/4/500/-1/{{Prefix}}'s  Chair",
                "{{Unknown}}_Sofa": "Sofa/couch/1 2/1 1/4/500/-1/Sofa"
            }
        }));
        assert_eq!(scan_item_patch(&patch, &fx.ctx(), &mut catalog), 1);
        assert_eq!(catalog.get("(F)jane_Chair").unwrap().display_name, "jane's Chair");
    }

    #[test]
    fn test_null_entries_are_ignored() {
        let fx = Fixture::new();
        let baseline = BaselineIds::new();
        let mut catalog = ItemCatalog::new(&baseline);
        let patch = edit(json!({
            "Action": "EditData",
            "Target": "Data/Weapons",
            "Entries": {"Removed": null}
        }));
        assert_eq!(scan_item_patch(&patch, &fx.ctx(), &mut catalog), 0);
    }

    #[test]
    fn test_humanize_localized_text_marker() {
        assert_eq!(
            humanize_name("[LocalizedText Strings\\Objects:PremiumFlax_Name]"),
            "Premium Flax"
        );
        assert_eq!(
            humanize_name("[LocalizedText Strings/Tools:golden_scythe.DisplayName 2]"),
            "golden scythe"
        );
        assert_eq!(humanize_name("  Plain   Name "), "Plain Name");
        assert_eq!(humanize_name("[LocalizedText Strings:Name]"), "Name");
    }
}
