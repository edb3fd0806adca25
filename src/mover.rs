//! Import relocation for a moved project.
//!
//! Ties the pieces together: resolve the old and new alias, re-base the
//! project's entry in the root path mapping table, and rewrite references in
//! every other project. The mapping update is computed before any file is
//! touched, so a configuration inconsistency aborts with the tree unchanged.

use crate::error::Result;
use crate::resolver::{AliasPair, computed_alias, resolve_from_alias};
use crate::rewriter::{AliasRewriter, ReplaceStrategy, SpecifierChange};
use crate::scanner::Scanner;
use crate::tsconfig::{TsConfigDocument, root_tsconfig_path};
use crate::workspace::{ProjectRef, ProjectType, Tree, Workspace, WorkspaceLayout};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What the caller wants done with the moved project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub project_name: String,
    /// New project root, relative to the workspace root.
    pub destination: String,
    /// New alias. Computed from `destination` when absent.
    pub import_path: Option<String>,
    /// Whether the alias changes, or only the root moves.
    pub update_import_path: bool,
}

impl MoveRequest {
    /// The alias the project should be imported by after the move.
    pub fn target_alias(&self, layout: &WorkspaceLayout) -> String {
        self.import_path
            .clone()
            .unwrap_or_else(|| computed_alias(layout, &self.destination))
    }
}

/// Rewritten specifiers in one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub changes: Vec<SpecifierChange>,
}

/// Outcome of [`Relocator::update_imports`].
#[derive(Debug, Default, Serialize)]
pub struct MoveReport {
    /// `None` when the project is an application and nothing was done.
    pub alias: Option<AliasPair>,
    pub renamed: bool,
    pub files_visited: usize,
    pub files_parsed: usize,
    pub files: Vec<FileReport>,
    /// Path of the root configuration whose mapping was updated.
    pub path_mapping: Option<String>,
}

/// Runs relocations with a shared scanner and replacement strategy.
#[derive(Debug, Clone, Default)]
pub struct Relocator {
    scanner: Scanner,
    strategy: ReplaceStrategy,
}

impl Relocator {
    pub fn new(scanner: Scanner, strategy: ReplaceStrategy) -> Self {
        Self { scanner, strategy }
    }

    /// Files of every project other than `project`, deduplicated, in the
    /// order they would be scanned.
    pub fn candidate_files<T: Tree + ?Sized>(
        &self,
        tree: &T,
        workspace: &Workspace,
        project: &ProjectRef,
    ) -> Result<Vec<String>> {
        let mut seen = BTreeSet::new();
        let mut files = Vec::new();

        for (name, other) in &workspace.projects {
            if *name == project.name {
                continue;
            }
            for file in tree.files_under(&other.root)? {
                if seen.insert(file.clone()) {
                    files.push(file);
                }
            }
        }

        Ok(files)
    }

    /// Resolves the alias pair for `project` and rewrites the workspace.
    ///
    /// Applications are skipped entirely. When the request renames the
    /// alias, every candidate file mentioning the old alias is parsed and
    /// its matching import, dynamic import, and `require` specifiers are
    /// rewritten; files with no matching site are not written. The root
    /// path mapping entry is re-based under the destination either way.
    pub fn update_imports<T: Tree + ?Sized>(
        &self,
        tree: &mut T,
        workspace: &Workspace,
        request: &MoveRequest,
        project: &ProjectRef,
    ) -> Result<MoveReport> {
        let mut report = MoveReport::default();

        if project.project_type == ProjectType::Application {
            tracing::info!(project = %project.name, "skipping application");
            return Ok(report);
        }

        let mut config = match root_tsconfig_path(&*tree) {
            Some(path) => Some(TsConfigDocument::load(&*tree, path)?),
            None => None,
        };

        let from = resolve_from_alias(config.as_ref(), &workspace.layout, project)?;
        let to = if request.update_import_path {
            request.target_alias(&workspace.layout)
        } else {
            from.clone()
        };
        let pair = AliasPair::new(from, to);
        let rename = request.update_import_path && pair.is_rename();

        tracing::info!(
            project = %project.name,
            from = %pair.from,
            to = %pair.to,
            destination = %request.destination,
            "resolved alias"
        );

        if let Some(config) = config.as_mut() {
            config.update_path_mapping(&pair, rename, &project.root, &request.destination)?;
        }

        if rename {
            let rewriter = AliasRewriter::new(pair.clone(), self.strategy)?;

            for file in self.candidate_files(&*tree, workspace, project)? {
                report.files_visited += 1;

                let contents = tree.read(&file)?;
                if !rewriter.mentions_alias(&contents) || !self.scanner.supports(&file) {
                    continue;
                }

                report.files_parsed += 1;
                tracing::debug!(file = %file, "scanning");

                if let Some(rewrite) = rewriter.rewrite_source(&self.scanner, &file, &contents)? {
                    tracing::debug!(file = %file, sites = rewrite.changes.len(), "rewrote");
                    tree.write(&file, rewrite.content);
                    report.files.push(FileReport {
                        path: file,
                        changes: rewrite.changes,
                    });
                }
            }
        }

        if let Some(config) = config {
            config.save(tree)?;
            report.path_mapping = Some(config.path().to_string());
        }

        tracing::info!(
            visited = report.files_visited,
            rewritten = report.files.len(),
            "updated imports"
        );

        report.alias = Some(pair);
        report.renamed = rename;
        Ok(report)
    }
}

/// Loads the workspace from `tree` and relocates `project` with defaults.
pub fn update_imports<T: Tree + ?Sized>(
    tree: &mut T,
    request: &MoveRequest,
    project: &ProjectRef,
) -> Result<MoveReport> {
    let workspace = Workspace::load(&*tree)?;
    Relocator::default().update_imports(tree, &workspace, request, project)
}
