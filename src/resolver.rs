//! Alias resolution.
//!
//! Determines the alias other projects currently use to import a project.
//! An explicit `compilerOptions.paths` entry pointing into the project's
//! source root wins; otherwise the alias is computed from the project root
//! and the workspace scope.

use crate::error::{RelocateError, Result};
use crate::tsconfig::TsConfigDocument;
use crate::workspace::{ProjectRef, WorkspaceLayout};
use serde::Serialize;
use serde_json::{Map, Value};

/// Old and new public import identifiers of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasPair {
    pub from: String,
    pub to: String,
}

impl AliasPair {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// True if the pair actually changes the alias.
    pub fn is_rename(&self) -> bool {
        self.from != self.to
    }
}

/// Builds the conventional `@scope/<dir>` alias for a project root.
///
/// The library directory prefix and a single leading separator are stripped
/// from `root`; backslashes become forward slashes. Without a scope the bare
/// directory is returned.
pub fn computed_alias(layout: &WorkspaceLayout, root: &str) -> String {
    let rest = match root.strip_prefix(layout.libs_dir.as_str()) {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => rest,
        _ => root,
    };
    let rest = rest.strip_prefix(['/', '\\']).unwrap_or(rest);
    let rest = rest.replace('\\', "/");

    match layout.npm_scope.as_deref() {
        Some(scope) if !scope.is_empty() => format!("@{}/{}", scope, rest),
        _ => rest,
    }
}

/// Returns the first alias whose candidate paths include one under `source_root`.
pub fn find_mapped_alias(paths: &Map<String, Value>, source_root: &str) -> Option<String> {
    paths
        .iter()
        .find(|(_, candidates)| {
            candidates.as_array().is_some_and(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .any(|candidate| candidate.starts_with(source_root))
            })
        })
        .map(|(alias, _)| alias.clone())
}

/// Resolves the alias a project is currently imported by.
///
/// With no root TypeScript configuration the computed alias is used. A
/// configuration without `compilerOptions.paths` is an error rather than a
/// reason to fall back.
pub fn resolve_from_alias(
    config: Option<&TsConfigDocument>,
    layout: &WorkspaceLayout,
    project: &ProjectRef,
) -> Result<String> {
    let computed = computed_alias(layout, &project.root);

    let Some(config) = config else {
        return Ok(computed);
    };

    let paths = config
        .paths()
        .ok_or_else(|| RelocateError::MissingPathsTable {
            alias: computed.clone(),
            config: config.path().to_string(),
        })?;

    Ok(find_mapped_alias(paths, &project.source_root).unwrap_or(computed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::ProjectType;
    use serde_json::json;

    fn layout(scope: Option<&str>) -> WorkspaceLayout {
        WorkspaceLayout {
            npm_scope: scope.map(str::to_string),
            libs_dir: "libs".to_string(),
        }
    }

    fn project(root: &str) -> ProjectRef {
        ProjectRef {
            name: "my-lib".to_string(),
            root: root.to_string(),
            source_root: format!("{}/src", root),
            project_type: ProjectType::Library,
        }
    }

    fn document(value: Value) -> TsConfigDocument {
        TsConfigDocument::new("tsconfig.base.json", value)
    }

    #[test]
    fn computes_scoped_alias_from_root() {
        assert_eq!(computed_alias(&layout(Some("proj")), "libs/shared/util"), "@proj/shared/util");
        assert_eq!(computed_alias(&layout(None), "libs/shared/util"), "shared/util");
    }

    #[test]
    fn computed_alias_normalizes_backslashes() {
        assert_eq!(computed_alias(&layout(Some("proj")), "libs\\shared\\util"), "@proj/shared/util");
    }

    #[test]
    fn computed_alias_keeps_roots_outside_libs_dir() {
        assert_eq!(computed_alias(&layout(Some("proj")), "packages/ui"), "@proj/packages/ui");
        assert_eq!(computed_alias(&layout(Some("proj")), "libsx/ui"), "@proj/libsx/ui");
    }

    #[test]
    fn prefers_explicit_mapping_into_source_root() {
        let config = document(json!({
            "compilerOptions": {
                "paths": {
                    "@other/thing": ["libs/other/src/index.ts"],
                    "custom-name": ["libs/my-lib/src/index.ts"]
                }
            }
        }));
        let alias = resolve_from_alias(Some(&config), &layout(Some("proj")), &project("libs/my-lib"));
        assert_eq!(alias.unwrap(), "custom-name");
    }

    #[test]
    fn first_matching_key_wins() {
        let paths = json!({
            "a": ["libs/my-lib/src/index.ts"],
            "b": ["libs/my-lib/src/testing.ts"]
        });
        let found = find_mapped_alias(paths.as_object().unwrap(), "libs/my-lib/src");
        assert_eq!(found.as_deref(), Some("a"));
    }

    #[test]
    fn falls_back_to_computed_alias_when_unmapped() {
        let config = document(json!({
            "compilerOptions": { "paths": { "@proj/other": ["libs/other/src/index.ts"] } }
        }));
        let alias = resolve_from_alias(Some(&config), &layout(Some("proj")), &project("libs/my-lib"));
        assert_eq!(alias.unwrap(), "@proj/my-lib");
    }

    #[test]
    fn falls_back_to_computed_alias_without_config() {
        let alias = resolve_from_alias(None, &layout(Some("proj")), &project("libs/my-lib"));
        assert_eq!(alias.unwrap(), "@proj/my-lib");
    }

    #[test]
    fn missing_paths_table_is_an_error() {
        let config = document(json!({ "compilerOptions": { "strict": true } }));
        let err = resolve_from_alias(Some(&config), &layout(Some("proj")), &project("libs/my-lib"))
            .unwrap_err();
        assert!(err.is_configuration_inconsistency());
        let message = err.to_string();
        assert!(message.contains("@proj/my-lib"));
        assert!(message.contains("tsconfig.base.json"));
    }

    #[test]
    fn alias_pair_rename_detection() {
        assert!(AliasPair::new("@x/a", "@x/b").is_rename());
        assert!(!AliasPair::new("@x/a", "@x/a").is_rename());
    }
}
