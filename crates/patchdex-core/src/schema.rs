//! Target schema descriptors.
//!
//! Maps a patch target to what the indexer does with it: item-defining
//! schemas carry a [`Category`] and a display-name strategy; reference
//! schemas only mention items in their data.

use serde::Serialize;

/// Output bucket for an indexed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Objects,
    BigCraftables,
    Weapons,
    Furniture,
    Boots,
    Hats,
    Shirts,
    Pants,
    Tools,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Objects,
        Category::BigCraftables,
        Category::Weapons,
        Category::Furniture,
        Category::Boots,
        Category::Hats,
        Category::Shirts,
        Category::Pants,
        Category::Tools,
    ];

    /// Key of this category's array in the index document.
    pub fn key(self) -> &'static str {
        match self {
            Category::Objects => "objects",
            Category::BigCraftables => "bigCraftables",
            Category::Weapons => "weapons",
            Category::Furniture => "furniture",
            Category::Boots => "boots",
            Category::Hats => "hats",
            Category::Shirts => "shirts",
            Category::Pants => "pants",
            Category::Tools => "tools",
        }
    }

    /// Bare type code, e.g. `BC`.
    pub fn prefix(self) -> &'static str {
        match self {
            Category::Objects => "O",
            Category::BigCraftables => "BC",
            Category::Weapons => "W",
            Category::Furniture => "F",
            Category::Boots => "B",
            Category::Hats => "H",
            Category::Shirts => "S",
            Category::Pants => "P",
            Category::Tools => "T",
        }
    }

    /// Category for a type code; unrecognized codes land in objects.
    pub fn from_prefix(prefix: &str) -> Category {
        Category::ALL
            .into_iter()
            .find(|c| c.prefix() == prefix)
            .unwrap_or(Category::Objects)
    }

    /// Build `(PREFIX)inner`.
    pub fn qualify(self, inner_id: &str) -> String {
        format!("({}){inner_id}", self.prefix())
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// How the display name of an entry is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStrategy {
    /// Structured record with a declared name field. `alias` registers the
    /// resolved name as a second identifier.
    Record { alias: bool },
    /// Slash-delimited positional record with the display name at a fixed
    /// field; field 0 is the internal name.
    Delimited { display_field: usize },
}

/// An item-defining target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSchema {
    pub target: &'static str,
    pub category: Category,
    pub names: NameStrategy,
}

const ITEM_SCHEMAS: [ItemSchema; 9] = [
    ItemSchema {
        target: "data/objects",
        category: Category::Objects,
        names: NameStrategy::Record { alias: true },
    },
    ItemSchema {
        target: "data/bigcraftables",
        category: Category::BigCraftables,
        names: NameStrategy::Record { alias: false },
    },
    ItemSchema {
        target: "data/weapons",
        category: Category::Weapons,
        names: NameStrategy::Record { alias: false },
    },
    ItemSchema {
        target: "data/furniture",
        category: Category::Furniture,
        names: NameStrategy::Delimited { display_field: 7 },
    },
    ItemSchema {
        target: "data/boots",
        category: Category::Boots,
        names: NameStrategy::Delimited { display_field: 6 },
    },
    ItemSchema {
        target: "data/hats",
        category: Category::Hats,
        names: NameStrategy::Delimited { display_field: 5 },
    },
    ItemSchema {
        target: "data/shirts",
        category: Category::Shirts,
        names: NameStrategy::Record { alias: false },
    },
    ItemSchema {
        target: "data/pants",
        category: Category::Pants,
        names: NameStrategy::Record { alias: false },
    },
    ItemSchema {
        target: "data/tools",
        category: Category::Tools,
        names: NameStrategy::Record { alias: false },
    },
];

const REFERENCE_TARGETS: [&str; 6] = [
    "data/craftingrecipes",
    "data/cookingrecipes",
    "data/shops",
    "data/machines",
    "data/npcgifttastes",
    "data/locations",
];

const REFERENCE_TARGET_PREFIXES: [&str; 1] = ["data/events/"];

/// Normalize an asset name for comparison.
pub fn normalize_target(target: &str) -> String {
    target.trim().replace('\\', "/").to_ascii_lowercase()
}

/// Look up the item schema for a target.
pub fn item_schema(target: &str) -> Option<&'static ItemSchema> {
    let target = normalize_target(target);
    ITEM_SCHEMAS.iter().find(|s| s.target == target)
}

/// Whether a target mentions items without defining them.
pub fn is_reference_target(target: &str) -> bool {
    let target = normalize_target(target);
    REFERENCE_TARGETS.contains(&target.as_str())
        || REFERENCE_TARGET_PREFIXES
            .iter()
            .any(|p| target.starts_with(p))
}
