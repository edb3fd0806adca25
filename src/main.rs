//! relocate-imports: rewrite import aliases when a workspace project moves.
//!
//! Resolves the alias other projects import the moved project by, rewrites
//! matching `import`, `import()`, and `require()` specifiers across the
//! workspace, and re-bases the project's entry in the root tsconfig `paths`.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Commands};
use colored::Colorize;
use dialoguer::Confirm;
use relocate_imports::{
    FileFilter, FsTree, MoveReport, MoveRequest, Relocator, ReplaceStrategy, Scanner,
    TsConfigDocument, Workspace, tsconfig::root_tsconfig_path,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::UpdateImports {
            workspace,
            project,
            destination,
            import_path,
            keep_import_path,
            replace_everywhere,
            exclude,
            no_default_excludes,
            write,
            interactive,
            json,
        } => {
            let request = MoveRequest {
                project_name: project,
                destination,
                import_path,
                update_import_path: !keep_import_path,
            };
            let strategy = if replace_everywhere {
                ReplaceStrategy::Everywhere
            } else {
                ReplaceStrategy::Prefix
            };
            let filter = FileFilter::new(&exclude, !no_default_excludes)?;
            cmd_update_imports(workspace, filter, &request, strategy, write, interactive, json)
        }
        Commands::Aliases { workspace } => cmd_aliases(workspace),
        Commands::Scan {
            workspace,
            project,
            exclude,
            no_default_excludes,
        } => {
            let filter = FileFilter::new(&exclude, !no_default_excludes)?;
            cmd_scan(workspace, filter, &project)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .init();
}

fn cmd_update_imports(
    root: PathBuf,
    filter: FileFilter,
    request: &MoveRequest,
    strategy: ReplaceStrategy,
    write: bool,
    interactive: bool,
    json_output: bool,
) -> Result<()> {
    let mut tree = FsTree::new(&root).with_filter(filter);
    let workspace = Workspace::load(&tree)
        .with_context(|| format!("Failed to load workspace at {}", root.display()))?;
    let project = workspace.project(&request.project_name)?.clone();

    let relocator = Relocator::new(Scanner::new(), strategy);
    let report = relocator.update_imports(&mut tree, &workspace, request, &project)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, write || interactive);
    }

    if tree.changes().count() == 0 {
        return Ok(());
    }

    let confirmed = if interactive {
        Confirm::new()
            .with_prompt(format!("Write {} file(s)?", tree.changes().count()))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?
    } else {
        write
    };

    if confirmed {
        let count = tree.commit()?;
        if !json_output {
            println!("{} Wrote {} file(s)", "ok:".green().bold(), count);
        }
    } else if !json_output && !interactive {
        println!("\n{} Use --write to apply changes", "hint:".cyan().bold());
    }

    Ok(())
}

fn print_report(report: &MoveReport, writing: bool) {
    let Some(alias) = &report.alias else {
        println!(
            "{} Project is an application; nothing imports it",
            "info:".blue().bold()
        );
        return;
    };

    if report.renamed {
        println!(
            "{} {} -> {}",
            "Alias:".bold(),
            alias.from.red(),
            alias.to.green()
        );
    } else {
        println!("{} {} (unchanged)", "Alias:".bold(), alias.from);
    }

    let verb = if writing { "Updating:" } else { "Would update:" };

    for file in &report.files {
        println!("\n{} {}", verb.yellow().bold(), file.path);
        for change in &file.changes {
            println!("  {} -> {}", change.before.red(), change.after.green());
        }
    }

    if let Some(config) = &report.path_mapping {
        println!("\n{} {} (compilerOptions.paths)", verb.yellow().bold(), config);
    }

    if report.renamed {
        println!(
            "\n{} Visited {} file(s), parsed {}, rewrote {}",
            "info:".blue().bold(),
            report.files_visited,
            report.files_parsed,
            report.files.len()
        );
    }
}

fn cmd_aliases(root: PathBuf) -> Result<()> {
    let tree = FsTree::new(&root);
    let Some(path) = root_tsconfig_path(&tree) else {
        println!("{} No tsconfig.base.json or tsconfig.json found", "info:".blue().bold());
        return Ok(());
    };

    let config = TsConfigDocument::load(&tree, path)?;
    let Some(paths) = config.paths() else {
        println!("{} {} has no compilerOptions.paths", "info:".blue().bold(), path);
        return Ok(());
    };

    for (alias, candidates) in paths {
        println!("{}", alias);
        for candidate in candidates.as_array().into_iter().flatten() {
            println!("  {}", candidate.as_str().unwrap_or_default().dimmed());
        }
    }

    Ok(())
}

fn cmd_scan(root: PathBuf, filter: FileFilter, project_name: &str) -> Result<()> {
    let tree = FsTree::new(&root).with_filter(filter);
    let workspace = Workspace::load(&tree)?;
    let project = workspace.project(project_name)?;

    let scanner = Scanner::new();
    let files = Relocator::default().candidate_files(&tree, &workspace, project)?;

    println!("Would scan {} files:", files.len());
    for file in files {
        if scanner.supports(&file) {
            println!("  {}", file);
        } else {
            println!("  {}", file.dimmed());
        }
    }

    Ok(())
}
