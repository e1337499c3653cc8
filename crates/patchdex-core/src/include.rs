//! Include expansion.
//!
//! An `Include` operation is treated as a textual macro: each referenced
//! document is loaded, token-expanded, and its `Changes` are spliced into the
//! operation list in place of the include. References that cannot be
//! resolved yet are left in the list as single-file includes:
//!
//! - unresolved tokens remaining in the path → deferred (debug log only);
//! - file missing, unparseable, or already being expanded higher up the
//!   include chain → warning, once per distinct path per pass.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::content::CONTENT_FILE;
use crate::jsonc;
use crate::package::Package;
use crate::patch::{IncludePatch, Patch, parse_changes};
use crate::tokens::{TokenTable, expand_str, expand_value, has_unresolved_tokens, substitute_mod_id};
use crate::warnings::{ScanWarning, WarningLog};

/// Expand every include in `patches`, recursively.
pub fn expand_includes(
    patches: Vec<Patch>,
    package: &Package,
    dynamic_tokens: &TokenTable,
    warnings: &mut WarningLog,
) -> Vec<Patch> {
    // The root document counts as being expanded, so including it again is a cycle.
    let root_document = package.root_dir.join(CONTENT_FILE);
    let root_identity = std::fs::canonicalize(&root_document).unwrap_or(root_document);
    let mut expander = IncludeExpander {
        package,
        warnings,
        active: vec![root_identity],
    };
    expander.expand_list(patches, dynamic_tokens)
}

struct IncludeExpander<'a> {
    package: &'a Package,
    warnings: &'a mut WarningLog,
    /// Documents currently being expanded, outermost first.
    active: Vec<PathBuf>,
}

impl IncludeExpander<'_> {
    fn expand_list(&mut self, patches: Vec<Patch>, tokens: &TokenTable) -> Vec<Patch> {
        let mut out = Vec::with_capacity(patches.len());
        for patch in patches {
            match patch {
                Patch::Include(include) => self.expand_include(include, tokens, &mut out),
                other => out.push(other),
            }
        }
        out
    }

    fn expand_include(
        &mut self,
        include: IncludePatch,
        inherited: &TokenTable,
        out: &mut Vec<Patch>,
    ) {
        let tokens = inherited.with_overrides(&include.local_tokens);

        for reference in &include.from_file {
            match self.load_reference(reference, &tokens) {
                Some((path, mut children)) => {
                    if let Some(when) = &include.when {
                        for child in &mut children {
                            child.inherit_guard(when);
                        }
                    }
                    self.active.push(path);
                    let expanded = self.expand_list(children, &tokens);
                    self.active.pop();
                    out.extend(expanded);
                }
                None => out.push(Patch::Include(IncludePatch {
                    from_file: vec![reference.clone()],
                    local_tokens: include.local_tokens.clone(),
                    when: include.when.clone(),
                })),
            }
        }
    }

    /// Resolve and load one file reference, returning its token-expanded
    /// operations, or `None` if the include must stay unexpanded.
    fn load_reference(
        &mut self,
        reference: &str,
        tokens: &TokenTable,
    ) -> Option<(PathBuf, Vec<Patch>)> {
        let resolved = substitute_mod_id(&expand_str(reference, tokens), &self.package.unique_id);
        if has_unresolved_tokens(&resolved) {
            self.warnings.record(ScanWarning::DeferredInclude { from_file: resolved });
            return None;
        }

        let path = resolve_path(&self.package.root_dir, &resolved);
        if !path.is_file() {
            self.warnings.record(ScanWarning::MissingInclude { path });
            return None;
        }

        let identity = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if self.active.contains(&identity) {
            self.warnings.record(ScanWarning::CyclicInclude { path });
            return None;
        }

        let document = match jsonc::read_document(&path) {
            Ok(document) => document,
            Err(err) => {
                self.warnings.record(ScanWarning::IncludeParse {
                    path,
                    message: err.to_string(),
                });
                return None;
            }
        };

        let children = parse_changes(&expand_value(&document, tokens));
        trace!(path = %path.display(), count = children.len(), "Expanded include");
        Some((identity, children))
    }
}

fn resolve_path(root: &Path, reference: &str) -> PathBuf {
    root.join(reference.trim().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn package(tmp: &TempDir) -> Package {
        Package {
            unique_id: "Author.Mod".to_string(),
            name: "Mod".to_string(),
            root_dir: tmp.path().to_path_buf(),
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn include(value: serde_json::Value) -> Vec<Patch> {
        vec![Patch::from_value(&value)]
    }

    fn edit_targets(patches: &[Patch]) -> Vec<String> {
        patches
            .iter()
            .filter_map(|p| match p {
                Patch::EditData(e) => Some(e.target.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_include_splices_children_in_place() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "data/items.json",
            r#"{"Changes": [
                {"Action": "EditData", "Target": "Data/Objects"},
                {"Action": "EditData", "Target": "Data/Hats"}
            ]}"#,
        );
        let patches = vec![
            Patch::from_value(&json!({"Action": "EditData", "Target": "First"})),
            Patch::from_value(&json!({"Action": "Include", "FromFile": "data/items.json"})),
            Patch::from_value(&json!({"Action": "EditData", "Target": "Last"})),
        ];
        let mut warnings = WarningLog::new();
        let out = expand_includes(patches, &package(&tmp), &TokenTable::new(), &mut warnings);
        assert_eq!(edit_targets(&out), vec!["First", "Data/Objects", "Data/Hats", "Last"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_local_tokens_override_dynamic_tokens() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "data/blue.json",
            r#"{"Changes": [{"Action": "EditData", "Target": "Data/{{Kind}}"}]}"#,
        );
        let mut dynamic = TokenTable::new();
        dynamic.insert("Color", "red");
        dynamic.insert("Kind", "Objects");

        let patches = include(json!({
            "Action": "Include",
            "FromFile": "data/{{Color}}.json",
            "LocalTokens": {"Color": "blue"}
        }));
        let mut warnings = WarningLog::new();
        let out = expand_includes(patches, &package(&tmp), &dynamic, &mut warnings);
        assert_eq!(edit_targets(&out), vec!["Data/Objects"]);
    }

    #[test_log::test]
    fn test_unresolved_token_defers_without_missing_warning() {
        let tmp = TempDir::new().unwrap();
        let patches = include(json!({"Action": "Include", "FromFile": "data/{{Color}}.json"}));
        let mut warnings = WarningLog::new();
        let out = expand_includes(
            patches.clone(),
            &package(&tmp),
            &TokenTable::new(),
            &mut warnings,
        );

        assert_eq!(out, patches);
        assert_eq!(
            warnings.warnings(),
            &[ScanWarning::DeferredInclude {
                from_file: "data/{{Color}}.json".to_string()
            }]
        );
    }

    #[test_log::test]
    fn test_missing_file_left_unexpanded_and_warned_once() {
        let tmp = TempDir::new().unwrap();
        let patches = vec![
            Patch::from_value(&json!({"Action": "Include", "FromFile": "gone.json"})),
            Patch::from_value(&json!({"Action": "Include", "FromFile": "gone.json"})),
        ];
        let mut warnings = WarningLog::new();
        let out = expand_includes(patches, &package(&tmp), &TokenTable::new(), &mut warnings);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| matches!(p, Patch::Include(_))));
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings.warnings()[0], ScanWarning::MissingInclude { .. }));
    }

    #[test_log::test]
    fn test_parse_failure_left_unexpanded() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "broken.json", "{ nope");
        let patches = include(json!({"Action": "Include", "FromFile": "broken.json"}));
        let mut warnings = WarningLog::new();
        let out = expand_includes(patches, &package(&tmp), &TokenTable::new(), &mut warnings);
        assert!(matches!(out[0], Patch::Include(_)));
        assert!(matches!(warnings.warnings()[0], ScanWarning::IncludeParse { .. }));
    }

    #[test]
    fn test_guard_propagates_to_unguarded_children() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "child.json",
            r#"{"Changes": [
                {"Action": "EditData", "Target": "A"},
                {"Action": "EditData", "Target": "B", "When": {"Day": 3}}
            ]}"#,
        );
        let patches = include(json!({
            "Action": "Include",
            "FromFile": "child.json",
            "When": {"Season": "spring"}
        }));
        let mut warnings = WarningLog::new();
        let out = expand_includes(patches, &package(&tmp), &TokenTable::new(), &mut warnings);
        assert_eq!(out[0].when(), Some(&json!({"Season": "spring"})));
        assert_eq!(out[1].when(), Some(&json!({"Day": 3})));
    }

    #[test]
    fn test_nested_includes_and_partial_list() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "outer.json",
            r#"{"Changes": [{"Action": "Include", "FromFile": "inner.json"}]}"#,
        );
        write(
            tmp.path(),
            "inner.json",
            r#"{"Changes": [
                {"Action": "EditData", "Target": "Deep", "Entries": {"{{ModId}}_x": {}}}
            ]}"#,
        );
        let patches = include(json!({"Action": "Include", "FromFile": "outer.json, missing.json"}));
        let mut warnings = WarningLog::new();
        let out = expand_includes(patches, &package(&tmp), &TokenTable::new(), &mut warnings);

        assert_eq!(edit_targets(&out), vec!["Deep"]);
        let Patch::Include(left) = &out[1] else {
            panic!("expected the missing reference to stay an include");
        };
        assert_eq!(left.from_file, vec!["missing.json"]);
        let Patch::EditData(edit) = &out[0] else {
            panic!("expected EditData");
        };
        assert!(edit.entries.contains_key("{{ModId}}_x"));
    }

    #[test_log::test]
    fn test_self_include_is_cut_off() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "loop.json",
            r#"{"Changes": [
                {"Action": "EditData", "Target": "Once"},
                {"Action": "Include", "FromFile": "loop.json"}
            ]}"#,
        );
        let patches = include(json!({"Action": "Include", "FromFile": "loop.json"}));
        let mut warnings = WarningLog::new();
        let out = expand_includes(patches, &package(&tmp), &TokenTable::new(), &mut warnings);

        assert_eq!(edit_targets(&out), vec!["Once"]);
        assert!(matches!(out[1], Patch::Include(_)));
        assert!(matches!(warnings.warnings()[0], ScanWarning::CyclicInclude { .. }));
    }

    #[test_log::test]
    fn test_include_of_root_document_is_cut_off() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "content.json",
            r#"{"Changes": [
                {"Action": "EditData", "Target": "Root"},
                {"Action": "Include", "FromFile": "content.json"}
            ]}"#,
        );
        let patches = vec![
            Patch::from_value(&json!({"Action": "EditData", "Target": "Root"})),
            Patch::from_value(&json!({"Action": "Include", "FromFile": "content.json"})),
        ];
        let mut warnings = WarningLog::new();
        let out = expand_includes(patches, &package(&tmp), &TokenTable::new(), &mut warnings);

        assert_eq!(edit_targets(&out), vec!["Root"]);
        assert!(matches!(out[1], Patch::Include(_)));
        assert!(matches!(warnings.warnings()[0], ScanWarning::CyclicInclude { .. }));
    }
}
