use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use chatflow::config::EditorConfig;
use chatflow::editor::palette_entry;
use chatflow::integrity::{IntegrityWarning, LintIssue, Severity, lint, sanitize};
use chatflow::model::{BlockType, Graph, Handle, Position, WorkflowDoc};
use chatflow::store::FsStore;
use chatflow::{graph, rules};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(author, version, about = "Check, inspect and edit chatbot workflow graphs", long_about = None)]
struct Cli {
    /// Editor configuration file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<Utf8PathBuf>,

    /// Raise log level (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sanitize and lint a workflow file or every `*.json` in a directory
    Check {
        #[arg(value_name = "PATH")]
        path: Utf8PathBuf,
    },
    /// Print a summary of a workflow file
    Show {
        #[arg(value_name = "FILE")]
        file: Utf8PathBuf,
    },
    /// Create a new workflow with a start and an end block
    New {
        #[arg(value_name = "DIR")]
        dir: Utf8PathBuf,
        #[arg(value_name = "ID")]
        id: String,
        /// Display name (defaults to the id)
        #[arg(long)]
        name: Option<String>,
    },
    /// Open a workflow in the interactive editor
    #[cfg(feature = "egui")]
    Edit {
        #[arg(value_name = "DIR")]
        dir: Utf8PathBuf,
        #[arg(value_name = "ID")]
        id: String,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    #[cfg_attr(not(feature = "egui"), allow(unused_variables))]
    let config = EditorConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Check { path } => check(&path),
        Command::Show { file } => show(&file).map(|_| ExitCode::SUCCESS),
        Command::New { dir, id, name } => new_workflow(&dir, &id, name).map(|_| ExitCode::SUCCESS),
        #[cfg(feature = "egui")]
        Command::Edit { dir, id } => edit(&dir, &id, config).map(|_| ExitCode::SUCCESS),
    }
}

/// Result of checking one file.
struct Report {
    path: Utf8PathBuf,
    warnings: Vec<IntegrityWarning>,
    issues: Vec<LintIssue>,
    error: Option<anyhow::Error>,
}

impl Report {
    fn has_errors(&self) -> bool {
        self.error.is_some() || self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}

fn check_file(path: &Utf8Path) -> Report {
    match WorkflowDoc::load_from_json(path).with_context(|| format!("Failed to load {}", path)) {
        Ok(mut doc) => {
            let warnings = sanitize(&mut doc.graph);
            let issues = lint(&doc.graph);
            debug!(%path, warnings = warnings.len(), issues = issues.len(), "checked workflow");
            Report {
                path: path.to_path_buf(),
                warnings,
                issues,
                error: None,
            }
        }
        Err(e) => Report {
            path: path.to_path_buf(),
            warnings: Vec::new(),
            issues: Vec::new(),
            error: Some(e),
        },
    }
}

fn workflow_files(path: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("{} is neither a file nor a directory", path);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Read dir {}", path))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(file) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            continue;
        };
        if file.extension() == Some("json") {
            files.push(file);
        }
    }
    Ok(files)
}

fn check(path: &Utf8Path) -> Result<ExitCode> {
    let files = workflow_files(path)?;
    let reports: Vec<Report> = files.par_iter().map(|f| check_file(f)).collect();

    let mut failed = 0usize;
    for report in &reports {
        if let Some(e) = &report.error {
            println!("{}: {:#}", report.path, e);
        } else if report.warnings.is_empty() && report.issues.is_empty() {
            println!("{}: ok", report.path);
        } else {
            println!("{}:", report.path);
            for w in &report.warnings {
                println!("  repaired: {w}");
            }
            for i in &report.issues {
                println!("  {i}");
            }
        }
        if report.has_errors() {
            failed += 1;
        }
    }
    println!("{} file(s) checked, {} with errors", reports.len(), failed);
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn show(file: &Utf8Path) -> Result<()> {
    let doc = WorkflowDoc::load_from_json(file).with_context(|| format!("Failed to load {}", file))?;
    let g = &doc.graph;
    let title = if doc.name.is_empty() { doc.id.as_str() } else { doc.name.as_str() };
    println!("{title} ({} blocks, {} connections)", g.blocks.len(), g.connections.len());

    for b in &g.blocks {
        println!("  [{}] {} \"{}\" at ({}, {})", b.block_type, b.id, b.name, b.position.x, b.position.y);
        for (i, opt) in b.options.iter().enumerate() {
            println!("      {i}: {opt}");
        }
        if let Some(cid) = &b.condition_id {
            let sel = b.selected_condition.as_deref().unwrap_or("-");
            println!("      condition on {cid}: {sel}");
        }
    }
    println!("Connections:");
    for c in &g.connections {
        match c.from_option_index {
            Some(i) => println!("  {}[{}] -> {}", c.from, i, c.to),
            None => println!("  {} -> {}", c.from, c.to),
        }
    }
    Ok(())
}

/// A start block wired to an end block.
fn starter_graph() -> Result<Graph> {
    let mut g = Graph::new();
    let mut place = |t: BlockType, pos: Position| -> String {
        let block = match palette_entry(t) {
            Some(entry) => entry.create(pos),
            None => chatflow::model::Block::new(t, t.as_str(), pos),
        };
        let id = block.id.clone();
        graph::add_block(&mut g, block);
        id
    };
    let start = place(BlockType::Start, Position::new(100.0, 100.0));
    let end = place(BlockType::End, Position::new(400.0, 100.0));
    let conn = rules::can_connect(&g, &Handle::output(&start), &Handle::input(&end))?;
    graph::connect(&mut g, conn);
    Ok(g)
}

fn new_workflow(dir: &Utf8Path, id: &str, name: Option<String>) -> Result<()> {
    let store = FsStore::new(dir);
    let path = store.path_for(id)?;
    if path.exists() {
        bail!("{} already exists", path);
    }
    let doc = WorkflowDoc {
        id: id.to_string(),
        name: name.unwrap_or_else(|| id.to_string()),
        graph: starter_graph()?,
    };
    store.save_doc(&doc)?;
    println!("Created {}", path);
    Ok(())
}

#[cfg(feature = "egui")]
fn edit(dir: &Utf8Path, id: &str, config: EditorConfig) -> Result<()> {
    use chatflow::editor::{EditorApp, EditorState};
    use eframe::egui;

    let mut store = FsStore::new(dir);
    let state = EditorState::load_from(&mut store, id, config)?;
    for w in &state.load_warnings {
        println!("repaired: {w}");
    }
    println!(
        "Opened {}: {} blocks, {} connections",
        id,
        state.graph().blocks.len(),
        state.graph().connections.len()
    );
    println!("Keyboard shortcuts:");
    println!("  Ctrl+S   — Save");
    println!("  Delete   — Delete selected block");
    println!("  Escape   — Cancel pending connection / clear selection");

    let app = EditorApp::new(state, Some(store));
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_maximized(true),
        ..Default::default()
    };
    eframe::run_native(
        "chatflow workflow editor",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_graph_is_clean() {
        let mut g = starter_graph().unwrap();
        assert_eq!(g.blocks.len(), 2);
        assert_eq!(g.connections.len(), 1);
        assert!(sanitize(&mut g).is_empty());
        assert!(lint(&g).iter().all(|i| i.severity != Severity::Error));
    }

    #[test]
    fn check_reports_lint_errors() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        new_workflow(dir, "good", None).unwrap();
        let bad = WorkflowDoc {
            id: "bad".into(),
            name: String::new(),
            graph: Graph::new(),
        };
        bad.save_to_json(dir.join("bad.json")).unwrap();

        let files = workflow_files(dir).unwrap();
        assert_eq!(files.len(), 2);
        let reports: Vec<Report> = files.iter().map(|f| check_file(f)).collect();
        let failing: Vec<_> = reports.iter().filter(|r| r.has_errors()).map(|r| r.path.file_stem()).collect();
        assert_eq!(failing, vec![Some("bad")]);
        assert!(new_workflow(dir, "good", None).is_err());
    }
}
