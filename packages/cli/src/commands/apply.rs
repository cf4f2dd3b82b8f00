use crate::script::{parse_script, run_script};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use scribe_editor::{Document, EditSession, EditorConfig};
use scribe_workspace::HttpReplicator;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Document markup, optionally with caret markers
    pub file: PathBuf,

    /// Edit script to run against the document
    #[arg(short, long)]
    pub script: PathBuf,

    /// Fail unless the history mirror matches the edited document
    #[arg(long)]
    pub verify: bool,

    /// Print plain markup without caret markers
    #[arg(long)]
    pub html: bool,

    /// Print the committed steps as JSON instead of the document
    #[arg(long, conflicts_with = "html")]
    pub steps: bool,
}

pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let output = render(&args, cwd)?;
    println!("{}", output);
    Ok(())
}

/// Run the script and return what `apply` prints
pub fn render(args: &ApplyArgs, cwd: &str) -> Result<String> {
    let config = EditorConfig::load(cwd)?;

    let file = Path::new(cwd).join(&args.file);
    let document = Document::load(&file, config.clone())
        .with_context(|| format!("Failed to load {}", file.display()))?;

    let script_path = Path::new(cwd).join(&args.script);
    let source = fs::read_to_string(&script_path)
        .with_context(|| format!("Failed to read {}", script_path.display()))?;
    let actions = parse_script(&source)?;

    let mut session = EditSession::new("scribe-cli", document);
    if let Some(endpoint) = &config.history_endpoint {
        session = session.with_replicator(Box::new(HttpReplicator::new(endpoint.as_str())?));
        session.sync();
    }

    let report = run_script(&mut session, &actions)?;
    session.commit_step();
    if session.is_replicating() {
        session.sync();
    }
    tracing::info!(
        applied = report.applied,
        rolled_back = report.rolled_back,
        steps = session.document.history_len(),
        "script finished"
    );

    if args.verify {
        if !session.document.mirror_matches_live() {
            anyhow::bail!("History mirror diverged from the edited document");
        }
        eprintln!("{} history mirror matches", "✓".green());
    }

    let output = if args.steps {
        serde_json::to_string_pretty(session.document.history().steps())?
    } else if args.html {
        session.document.to_html()
    } else {
        session.document.to_fixture_string()
    };
    Ok(output)
}
