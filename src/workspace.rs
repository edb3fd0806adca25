//! Workspace access: file trees, project registry, and layout.
//!
//! All paths handed to and returned from a [`Tree`] are relative to the
//! workspace root and use `/` separators. [`FsTree`] buffers writes until
//! [`FsTree::commit`], so nothing reaches disk unless a whole operation
//! succeeded.

use crate::error::{RelocateError, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Minimal file-tree interface the relocation runs against.
pub trait Tree {
    fn exists(&self, path: &str) -> bool;
    fn read(&self, path: &str) -> Result<String>;
    fn write(&mut self, path: &str, content: String);
    /// Every non-ignored file under `root`, sorted.
    fn files_under(&self, root: &str) -> Result<Vec<String>>;
}

/// Which entries a traversal skips.
#[derive(Debug, Clone)]
pub struct FileFilter {
    excludes: Vec<Pattern>,
    default_excludes: bool,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            excludes: Vec::new(),
            default_excludes: true,
        }
    }
}

impl FileFilter {
    /// Builds a filter from glob patterns. With `default_excludes`, hidden
    /// entries and `node_modules` are skipped as well.
    pub fn new(patterns: &[String], default_excludes: bool) -> Result<Self> {
        let excludes = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| RelocateError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            excludes,
            default_excludes,
        })
    }

    /// True if the entry `name` at workspace-relative `path` is skipped.
    pub fn is_excluded(&self, name: &str, path: &str) -> bool {
        if self.default_excludes && (name.starts_with('.') || name == "node_modules") {
            return true;
        }
        self.excludes
            .iter()
            .any(|p| p.matches(name) || p.matches(path))
    }

    /// True if any segment of `path` is skipped.
    fn excludes_any_segment(&self, path: &str) -> bool {
        let mut prefix = String::new();
        for segment in path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            if self.is_excluded(segment, &prefix) {
                return true;
            }
        }
        false
    }
}

fn is_under(path: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    root.is_empty()
        || root == "."
        || path == root
        || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

/// In-memory tree, used by tests and by embedders that already hold the
/// workspace contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    files: BTreeMap<String, String>,
    written: BTreeSet<String>,
    filter: FileFilter,
}

impl MemoryTree {
    pub fn from_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        Self {
            files: files
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Paths written since the tree was created.
    pub fn written(&self) -> impl Iterator<Item = &str> {
        self.written.iter().map(String::as_str)
    }
}

impl Tree for MemoryTree {
    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &str) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| RelocateError::Read {
                path: path.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }

    fn write(&mut self, path: &str, content: String) {
        self.written.insert(path.to_string());
        self.files.insert(path.to_string(), content);
    }

    fn files_under(&self, root: &str) -> Result<Vec<String>> {
        Ok(self
            .files
            .keys()
            .filter(|path| is_under(path, root) && !self.filter.excludes_any_segment(path))
            .cloned()
            .collect())
    }
}

/// Disk-backed tree rooted at a workspace directory.
#[derive(Debug)]
pub struct FsTree {
    root: PathBuf,
    filter: FileFilter,
    pending: BTreeMap<String, String>,
}

impl FsTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            filter: FileFilter::default(),
            pending: BTreeMap::new(),
        }
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Buffered writes as `(path, new content)`, sorted by path.
    pub fn changes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pending.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Flushes buffered writes to disk, returning how many files were written.
    pub fn commit(&mut self) -> Result<usize> {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();

        for (path, content) in pending {
            let full = self.root.join(&path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).map_err(|source| RelocateError::Write {
                    path: path.clone(),
                    source,
                })?;
            }
            std::fs::write(&full, content)
                .map_err(|source| RelocateError::Write { path: path.clone(), source })?;
            tracing::debug!(file = %path, "wrote file");
        }

        Ok(count)
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

impl Tree for FsTree {
    fn exists(&self, path: &str) -> bool {
        self.pending.contains_key(path) || self.root.join(path).exists()
    }

    fn read(&self, path: &str) -> Result<String> {
        if let Some(content) = self.pending.get(path) {
            return Ok(content.clone());
        }
        std::fs::read_to_string(self.root.join(path)).map_err(|source| RelocateError::Read {
            path: path.to_string(),
            source,
        })
    }

    fn write(&mut self, path: &str, content: String) {
        self.pending.insert(path.to_string(), content);
    }

    fn files_under(&self, root: &str) -> Result<Vec<String>> {
        let start = self.root.join(root);
        let mut files = BTreeSet::new();

        if start.exists() {
            for entry in WalkDir::new(&start).into_iter().filter_entry(|e| {
                e.depth() == 0
                    || !self.filter.is_excluded(
                        &e.file_name().to_string_lossy(),
                        &self.relative(e.path()).unwrap_or_default(),
                    )
            }) {
                let entry = entry.map_err(|source| RelocateError::Walk {
                    path: root.to_string(),
                    source,
                })?;
                if entry.file_type().is_file()
                    && let Some(path) = self.relative(entry.path())
                {
                    files.insert(path);
                }
            }
        }

        files.extend(
            self.pending
                .keys()
                .filter(|path| is_under(path, root) && !self.filter.excludes_any_segment(path))
                .cloned(),
        );

        Ok(files.into_iter().collect())
    }
}

/// Application vs. library. Applications are never imported by other projects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Application,
    #[default]
    Library,
}

/// A workspace project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRef {
    pub name: String,
    pub root: String,
    pub source_root: String,
    pub project_type: ProjectType,
}

/// Where libraries live and which scope their aliases use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceLayout {
    pub npm_scope: Option<String>,
    pub libs_dir: String,
}

impl Default for WorkspaceLayout {
    fn default() -> Self {
        Self {
            npm_scope: None,
            libs_dir: "libs".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectConfig {
    name: Option<String>,
    root: Option<String>,
    source_root: Option<String>,
    project_type: Option<ProjectType>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProjectEntry {
    Root(String),
    Inline(ProjectConfig),
}

#[derive(Debug, Deserialize)]
struct WorkspaceConfig {
    #[serde(default)]
    projects: BTreeMap<String, ProjectEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NxConfig {
    npm_scope: Option<String>,
    workspace_layout: Option<NxWorkspaceLayout>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NxWorkspaceLayout {
    libs_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    name: Option<String>,
}

fn read_json<T, D>(tree: &T, path: &str) -> Result<D>
where
    T: Tree + ?Sized,
    D: serde::de::DeserializeOwned,
{
    let text = tree.read(path)?;
    serde_json::from_str(&text).map_err(|source| RelocateError::Json {
        path: path.to_string(),
        source,
    })
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => ".",
    }
}

/// Registry and layout of a workspace.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub layout: WorkspaceLayout,
    pub projects: BTreeMap<String, ProjectRef>,
}

impl Workspace {
    /// Reads `nx.json`, `package.json`, and the project registry from `tree`.
    pub fn load<T: Tree + ?Sized>(tree: &T) -> Result<Self> {
        let workspace = Self {
            layout: read_layout(tree)?,
            projects: read_projects(tree)?,
        };
        tracing::debug!(
            projects = workspace.projects.len(),
            libs_dir = %workspace.layout.libs_dir,
            "loaded workspace"
        );
        Ok(workspace)
    }

    pub fn project(&self, name: &str) -> Result<&ProjectRef> {
        self.projects
            .get(name)
            .ok_or_else(|| RelocateError::UnknownProject(name.to_string()))
    }
}

/// Reads the workspace layout from `nx.json`, taking the scope from the root
/// `package.json` name when `nx.json` does not set one.
pub fn read_layout<T: Tree + ?Sized>(tree: &T) -> Result<WorkspaceLayout> {
    let nx: NxConfig = if tree.exists("nx.json") {
        read_json(tree, "nx.json")?
    } else {
        NxConfig::default()
    };

    let npm_scope = match nx.npm_scope {
        Some(scope) => Some(scope.trim_start_matches('@').to_string()),
        None if tree.exists("package.json") => {
            let package: PackageJson = read_json(tree, "package.json")?;
            package
                .name
                .as_deref()
                .and_then(|name| name.strip_prefix('@'))
                .and_then(|name| name.split_once('/'))
                .map(|(scope, _)| scope.to_string())
        }
        None => None,
    };

    let libs_dir = nx
        .workspace_layout
        .and_then(|layout| layout.libs_dir)
        .unwrap_or_else(|| WorkspaceLayout::default().libs_dir);

    Ok(WorkspaceLayout { npm_scope, libs_dir })
}

fn project_ref(name: String, root: String, config: ProjectConfig) -> ProjectRef {
    let root = config.root.unwrap_or(root);
    ProjectRef {
        name,
        source_root: config.source_root.unwrap_or_else(|| root.clone()),
        root,
        project_type: config.project_type.unwrap_or_default(),
    }
}

/// Reads the project registry.
///
/// `workspace.json` wins when present; its entries are either a root path
/// (details then come from `<root>/project.json`) or an inline configuration.
/// Otherwise every `project.json` in the tree defines a project rooted at its
/// directory.
pub fn read_projects<T: Tree + ?Sized>(tree: &T) -> Result<BTreeMap<String, ProjectRef>> {
    let mut projects = BTreeMap::new();

    if tree.exists("workspace.json") {
        let workspace: WorkspaceConfig = read_json(tree, "workspace.json")?;
        for (name, entry) in workspace.projects {
            let project = match entry {
                ProjectEntry::Root(root) => {
                    let config_path = format!("{}/project.json", root);
                    let config = if tree.exists(&config_path) {
                        read_json(tree, &config_path)?
                    } else {
                        ProjectConfig::default()
                    };
                    project_ref(name.clone(), root, config)
                }
                ProjectEntry::Inline(config) => {
                    let root = config.root.clone().unwrap_or_default();
                    project_ref(name.clone(), root, config)
                }
            };
            projects.insert(name, project);
        }
        return Ok(projects);
    }

    for path in tree.files_under("")? {
        if path != "project.json" && !path.ends_with("/project.json") {
            continue;
        }
        let config: ProjectConfig = read_json(tree, &path)?;
        let root = parent_dir(&path).to_string();
        let name = config.name.clone().unwrap_or_else(|| {
            root.rsplit('/').next().unwrap_or(root.as_str()).to_string()
        });
        projects.insert(name.clone(), project_ref(name, root, config));
    }

    Ok(projects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_tree_lists_files_under_root() {
        let tree = MemoryTree::from_files([
            ("libs/a/src/index.ts", ""),
            ("libs/ab/src/index.ts", ""),
            ("libs/a/node_modules/x/index.js", ""),
            ("libs/a/.cache/data.js", ""),
            ("apps/web/main.ts", ""),
        ]);
        assert_eq!(tree.files_under("libs/a").unwrap(), vec!["libs/a/src/index.ts"]);
        assert_eq!(tree.files_under("").unwrap().len(), 3);
    }

    #[test]
    fn exclude_patterns_match_names_and_paths() {
        let filter = FileFilter::new(&["*.spec.ts".to_string(), "libs/a/generated".to_string()], true)
            .unwrap();
        let tree = MemoryTree::from_files([
            ("libs/a/src/index.ts", ""),
            ("libs/a/src/index.spec.ts", ""),
            ("libs/a/generated/api.ts", ""),
        ])
        .with_filter(filter);
        assert_eq!(tree.files_under("libs/a").unwrap(), vec!["libs/a/src/index.ts"]);
    }

    #[test]
    fn invalid_exclude_pattern_is_reported() {
        let err = FileFilter::new(&["[".to_string()], true).unwrap_err();
        assert!(matches!(err, RelocateError::Pattern { .. }));
    }

    #[test]
    fn fs_tree_buffers_writes_until_commit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("libs/a/src")).unwrap();
        std::fs::create_dir_all(dir.path().join("libs/a/node_modules/dep")).unwrap();
        std::fs::write(dir.path().join("libs/a/src/index.ts"), "old").unwrap();
        std::fs::write(dir.path().join("libs/a/node_modules/dep/index.js"), "").unwrap();

        let mut tree = FsTree::new(dir.path());
        assert_eq!(tree.files_under("libs/a").unwrap(), vec!["libs/a/src/index.ts"]);

        tree.write("libs/a/src/index.ts", "new".to_string());
        tree.write("libs/a/src/added.ts", "added".to_string());
        assert_eq!(tree.read("libs/a/src/index.ts").unwrap(), "new");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("libs/a/src/index.ts")).unwrap(),
            "old"
        );
        assert_eq!(
            tree.files_under("libs/a").unwrap(),
            vec!["libs/a/src/added.ts", "libs/a/src/index.ts"]
        );

        assert_eq!(tree.commit().unwrap(), 2);
        assert_eq!(tree.changes().count(), 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("libs/a/src/index.ts")).unwrap(),
            "new"
        );
        assert!(dir.path().join("libs/a/src/added.ts").exists());
    }

    #[test]
    fn fs_tree_missing_root_has_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let tree = FsTree::new(dir.path());
        assert!(tree.files_under("libs/missing").unwrap().is_empty());
        assert!(tree.read("libs/missing/a.ts").is_err());
    }

    #[test]
    fn reads_layout_from_nx_json() {
        let tree = MemoryTree::from_files([(
            "nx.json",
            r#"{ "npmScope": "proj", "workspaceLayout": { "libsDir": "packages" } }"#,
        )]);
        let layout = read_layout(&tree).unwrap();
        assert_eq!(layout.npm_scope.as_deref(), Some("proj"));
        assert_eq!(layout.libs_dir, "packages");
    }

    #[test]
    fn layout_scope_falls_back_to_package_name() {
        let tree = MemoryTree::from_files([
            ("nx.json", "{}"),
            ("package.json", r#"{ "name": "@acme/source" }"#),
        ]);
        let layout = read_layout(&tree).unwrap();
        assert_eq!(layout.npm_scope.as_deref(), Some("acme"));
        assert_eq!(layout.libs_dir, "libs");

        let tree = MemoryTree::from_files([("package.json", r#"{ "name": "plain" }"#)]);
        assert_eq!(read_layout(&tree).unwrap().npm_scope, None);
    }

    #[test]
    fn reads_projects_from_workspace_json() {
        let tree = MemoryTree::from_files([
            (
                "workspace.json",
                r#"{
                    "version": 2,
                    "projects": {
                        "web": { "root": "apps/web", "sourceRoot": "apps/web/src", "projectType": "application" },
                        "util": "libs/util"
                    }
                }"#,
            ),
            ("libs/util/project.json", r#"{ "sourceRoot": "libs/util/src", "projectType": "library" }"#),
        ]);
        let projects = read_projects(&tree).unwrap();
        assert_eq!(projects["web"].project_type, ProjectType::Application);
        assert_eq!(projects["web"].source_root, "apps/web/src");
        assert_eq!(projects["util"].root, "libs/util");
        assert_eq!(projects["util"].source_root, "libs/util/src");
    }

    #[test]
    fn discovers_project_json_files() {
        let tree = MemoryTree::from_files([
            ("libs/util/project.json", r#"{ "name": "util", "sourceRoot": "libs/util/src" }"#),
            ("apps/web/project.json", r#"{ "projectType": "application" }"#),
            ("node_modules/pkg/project.json", r#"{ "name": "ignored" }"#),
        ]);
        let projects = read_projects(&tree).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects["util"].root, "libs/util");
        assert_eq!(projects["util"].project_type, ProjectType::Library);
        assert_eq!(projects["web"].root, "apps/web");
        assert_eq!(projects["web"].source_root, "apps/web");
    }

    #[test]
    fn unknown_project_is_an_error() {
        let workspace = Workspace::default();
        let err = workspace.project("nope").unwrap_err();
        assert_eq!(err.to_string(), "project 'nope' not found in workspace");
    }
}
