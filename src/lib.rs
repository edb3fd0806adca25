//! relocate-imports library for rewriting import aliases of a moved project.
//!
//! When a library moves to a new root, and possibly a new alias, everything
//! that imports it has to follow. The workflow has four phases:
//!
//! 1. **Resolution**: find the alias the project is imported by today, from the
//!    root tsconfig `paths` table or the workspace scope
//! 2. **Mapping**: re-base the project's `paths` entry under the new root,
//!    renaming the key if the alias changes
//! 3. **Scanning**: parse files of every other project that mention the alias
//!    and collect `import`, `import()`, and `require()` specifiers
//! 4. **Rewriting**: turn matching specifiers into offset-based edits and apply
//!    them against the original text
//!
//! # Example
//!
//! ```no_run
//! use relocate_imports::{FsTree, MoveRequest, Relocator, Workspace};
//!
//! let mut tree = FsTree::new(".");
//! let workspace = Workspace::load(&tree).unwrap();
//! let project = workspace.project("my-lib").unwrap().clone();
//!
//! let request = MoveRequest {
//!     project_name: "my-lib".to_string(),
//!     destination: "libs/shared/my-lib".to_string(),
//!     import_path: Some("@proj/shared/my-lib".to_string()),
//!     update_import_path: true,
//! };
//! let report = Relocator::default()
//!     .update_imports(&mut tree, &workspace, &request, &project)
//!     .unwrap();
//!
//! println!("Rewrote {} files", report.files.len());
//! tree.commit().unwrap();
//! ```

pub mod edit;
pub mod error;
pub mod jsonc;
pub mod mover;
pub mod resolver;
pub mod rewriter;
pub mod scanner;
pub mod tsconfig;
pub mod workspace;

// Re-export commonly used types at crate root
pub use edit::{TextEdit, apply_changes};
pub use error::{RelocateError, Result};
pub use mover::{FileReport, MoveReport, MoveRequest, Relocator, update_imports};
pub use resolver::AliasPair;
pub use rewriter::{AliasRewriter, ReplaceStrategy};
pub use scanner::{ReferenceSite, Scanner, SiteKind};
pub use tsconfig::TsConfigDocument;
pub use workspace::{
    FileFilter, FsTree, MemoryTree, ProjectRef, ProjectType, Tree, Workspace, WorkspaceLayout,
};
