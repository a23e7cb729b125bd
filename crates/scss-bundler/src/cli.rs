//! Command-line interface for the `scss-bundler` binary.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::bundler::Bundler;
use crate::app::export::{output_path, render_tree, to_json, write_bundle};
use crate::domain::model::BundleStats;
use crate::infra::config::{BundleSettings, Config, concat_unique};
use crate::infra::fs::absolutize;

#[derive(Parser, Debug)]
#[command(
    name = "scss-bundler",
    author,
    version,
    about = "Inline SCSS @import directives into a single file",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[command(flatten)]
    bundle: BundleArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print shell completions to stdout
    Completions { shell: Shell },
}

#[derive(Args, Debug, Default)]
struct BundleArgs {
    /// Entry files to bundle
    entries: Vec<PathBuf>,
    /// Output file (one entry) or directory (several entries); stdout when omitted
    #[arg(short = 'o', long)]
    dest: Option<PathBuf>,
    /// Configuration file instead of ./scss-bundle.toml
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
    /// Project directory for entry files and `~` imports
    #[arg(short = 'p', long = "project")]
    project_directory: Option<PathBuf>,
    /// Glob of files to inline at most once
    #[arg(long = "dedupe")]
    dedupe_globs: Vec<String>,
    /// Fallback directory for imports, tried in order
    #[arg(short = 'I', long = "include-path")]
    include_paths: Vec<PathBuf>,
    /// Regular expression of import names to leave untouched
    #[arg(long = "ignore-import")]
    ignored_imports: Vec<String>,
    /// Print the import tree instead of the bundled text
    #[arg(long, conflicts_with = "json")]
    tree: bool,
    /// Print the bundle result as JSON instead of the bundled text
    #[arg(long)]
    json: bool,
    /// Log filter, e.g. `debug` (RUST_LOG wins)
    #[arg(long)]
    log_level: Option<String>,
}

impl BundleArgs {
    fn apply(&mut self, config: &mut Config) {
        let bundle = &mut config.bundle;
        if !self.entries.is_empty() {
            bundle.entries = std::mem::take(&mut self.entries);
        }
        if let Some(dest) = self.dest.take() {
            bundle.dest = Some(dest);
        }
        if let Some(project) = self.project_directory.take() {
            bundle.project_directory = Some(project);
        }
        bundle.dedupe_globs = concat_unique(
            std::mem::take(&mut bundle.dedupe_globs),
            std::mem::take(&mut self.dedupe_globs),
        );
        bundle.include_paths = concat_unique(
            std::mem::take(&mut bundle.include_paths),
            std::mem::take(&mut self.include_paths),
        );
        bundle.ignored_imports = concat_unique(
            std::mem::take(&mut bundle.ignored_imports),
            std::mem::take(&mut self.ignored_imports),
        );
        if let Some(level) = self.log_level.take() {
            config.logging.set_level(level);
        }
    }

    fn report(&self) -> Report {
        match (self.tree, self.json) {
            (true, _) => Report::Tree,
            (_, true) => Report::Json,
            _ => Report::Content,
        }
    }
}

/// What goes to stdout for each bundled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Report {
    Content,
    Tree,
    Json,
}

/// Parse arguments, load configuration, and bundle every entry.
pub fn run() -> Result<ExitCode> {
    let mut cli = Cli::parse();
    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "scss-bundler", &mut io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = Config::load(cli.bundle.config.as_deref())?;
    cli.bundle.apply(&mut config);
    crate::init(Some(config.logging.level()));

    execute(&config.bundle, cli.bundle.report())
}

fn execute(settings: &BundleSettings, report: Report) -> Result<ExitCode> {
    if settings.entries.is_empty() {
        bail!("no entry files given; pass ENTRY or set bundle.entries in scss-bundle.toml");
    }

    let mut bundler = Bundler::new(settings.project_directory.clone());
    let results = bundler.bundle_all_with(
        &settings.entries,
        &settings.dedupe_globs,
        &settings.include_paths,
        &settings.ignored_imports,
    );

    let display_base = bundler
        .project_directory()
        .map(PathBuf::from)
        .unwrap_or_else(|| absolutize("."));
    let mut stdout = io::stdout().lock();
    let mut failed = false;

    for (entry, result) in settings.entries.iter().zip(&results) {
        if !result.found {
            tracing::error!(entry = %entry.display(), "entry file not found");
            failed = true;
            continue;
        }

        let stats = BundleStats::collect(result);
        tracing::info!(
            entry = %result.file_path.display(),
            files = stats.files,
            imports = stats.imports,
            not_found = stats.not_found,
            deduped = stats.deduped,
            ignored = stats.ignored,
            "bundled"
        );

        if let Some(dest) = &settings.dest {
            let target = output_path(dest, entry, settings.entries.len());
            write_bundle(result, &target)
                .with_context(|| format!("failed to write bundle for {}", entry.display()))?;
            tracing::info!(dest = %target.display(), "bundle written");
        }

        match report {
            Report::Tree => {
                let tree = render_tree(result, Some(display_base.as_path()));
                write!(stdout, "{tree}")?
            }
            Report::Json => writeln!(stdout, "{}", to_json(result)?)?,
            Report::Content if settings.dest.is_none() => {
                write!(stdout, "{}", result.bundled_content.as_deref().unwrap_or_default())?
            }
            Report::Content => {}
        }
    }
    stdout.flush()?;

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
