use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use theme_patcher::config::{load_from_path, ThemeConfig};
use theme_patcher::{
    parse_file, run, to_pretty_string, ErrorPolicy, FieldChange, RunEvent, RunOptions,
    RunSummary,
};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "THEME_PATCHER_CONFIG";
const LOCAL_CONFIG: &str = "theme-patcher.toml";

#[derive(Parser)]
#[command(name = "theme-patcher")]
#[command(about = "Force child-element values onto XML theme files", long_about = None)]
#[command(version)]
struct Cli {
    /// Log diagnostics at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TargetArgs {
    /// Theme directory to scan (defaults to meta.root of the config)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Rule configuration file (otherwise $THEME_PATCHER_CONFIG, ./theme-patcher.toml, or built-in rules)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Markup file extension to pick up
    #[arg(short, long)]
    extension: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch every theme file and render the last one to the output file
    Apply {
        #[command(flatten)]
        target: TargetArgs,

        /// Output file for the last processed tree
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip files that fail to parse instead of aborting
        #[arg(short, long)]
        keep_going: bool,

        /// Also rewrite each patched file over its source
        #[arg(long)]
        in_place: bool,

        /// Dry run - show what would be changed without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of each file's canonical form before and after
        #[arg(short, long)]
        diff: bool,
    },

    /// Report what apply would change, without writing
    Check {
        #[command(flatten)]
        target: TargetArgs,

        /// Show unified diff of each file's canonical form before and after
        #[arg(short, long)]
        diff: bool,
    },

    /// List the configured rules
    Rules {
        /// Rule configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the canonical form of a single markup file
    Render {
        /// File to render
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            target,
            output,
            keep_going,
            in_place,
            dry_run,
            diff,
        } => {
            let (config, mut options) = resolve_target(&target)?;
            if let Some(output) = output {
                options.output = Some(output);
            }
            if keep_going {
                options.policy = ErrorPolicy::Continue;
            }
            options.in_place = in_place;
            options.dry_run = dry_run;
            options.diffs = diff;
            cmd_apply(&config, &options)
        }

        Commands::Check { target, diff } => {
            let (config, mut options) = resolve_target(&target)?;
            options.dry_run = true;
            options.diffs = diff;
            cmd_apply(&config, &options)
        }

        Commands::Rules { config } => cmd_rules(config),

        Commands::Render { file } => cmd_render(&file),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve the rule configuration.
///
/// Priority order:
/// 1. Explicit --config flag
/// 2. THEME_PATCHER_CONFIG environment variable
/// 3. ./theme-patcher.toml in the current directory
/// 4. Built-in rule table
fn resolve_config(cli_config: Option<&Path>) -> Result<(ThemeConfig, String)> {
    // 1. Explicit flag (highest priority)
    if let Some(path) = cli_config {
        let config = load_from_path(path)?;
        return Ok((config, path.display().to_string()));
    }

    // 2. Environment variable
    if let Ok(env_path) = env::var(CONFIG_ENV) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            let config = load_from_path(&path)?;
            return Ok((config, env_path));
        }
        eprintln!(
            "{}",
            format!(
                "Warning: {} is set but path doesn't exist: {}",
                CONFIG_ENV, env_path
            )
            .yellow()
        );
    }

    // 3. Local config file
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        let config = load_from_path(&local)?;
        return Ok((config, LOCAL_CONFIG.to_string()));
    }

    // 4. Built-in rules
    Ok((ThemeConfig::builtin(), "built-in rules".to_string()))
}

fn resolve_target(target: &TargetArgs) -> Result<(ThemeConfig, RunOptions)> {
    let (config, source) = resolve_config(target.config.as_deref())?;
    println!("{}", format!("Rules: {}", source).dimmed());

    let mut options = RunOptions::from_config(&config);
    if let Some(root) = &target.root {
        options.root = root.clone();
    }
    if let Some(extension) = &target.extension {
        options.extension = extension.trim_start_matches('.').to_string();
    }
    Ok((config, options))
}

/// Helper: Show unified diff between original and patched renders
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => continue,
        };
        print!("{}", sign);
        if change.missing_newline() {
            println!();
        }
    }
}

fn print_change(change: &FieldChange) {
    match change {
        FieldChange::Inserted { .. } => println!("{}", change.to_string().green()),
        _ if change.is_noop() => println!("{}", change.to_string().dimmed()),
        _ => println!("{}", change),
    }
}

fn cmd_apply(config: &ThemeConfig, options: &RunOptions) -> Result<()> {
    let rules = config.rules()?;

    println!("Theme directory: {}", options.root.display());
    if options.dry_run {
        println!("{}", "[DRY RUN - nothing will be written]".cyan());
    }
    println!();

    let summary = run(&rules, options, |event| match event {
        RunEvent::Fixing { path } => println!("fixing: {}", path.display()),
        RunEvent::Change { change, .. } => print_change(change),
        RunEvent::Diff {
            path,
            before,
            after,
        } => display_diff(path, before, after),
        RunEvent::Rewrote { path } => {
            println!("{} rewrote {}", "✓".green(), path.display())
        }
        RunEvent::Skipped { error } => {
            eprintln!("{} {}", "✗".red(), error);
        }
        RunEvent::Done => println!("done"),
        RunEvent::Wrote { path, dry_run } => {
            if dry_run {
                println!("{} would write {}", "⊙".yellow(), path.display());
            } else {
                println!("{} wrote {}", "✓".green(), path.display());
            }
        }
    })
    .context("theme patching aborted")?;

    print_summary(&summary);

    if summary.files_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  {} files processed",
        format!("{}", summary.files_processed).green()
    );
    println!(
        "  {} changes ({} inserted)",
        format!("{}", summary.changes).green(),
        summary.inserted
    );
    if summary.files_rewritten > 0 {
        println!(
            "  {} files rewritten",
            format!("{}", summary.files_rewritten).cyan()
        );
    }
    println!(
        "  {} failed",
        format!("{}", summary.files_failed).red()
    );
    if let Some(last) = &summary.last_file {
        println!("  last file: {}", last.display());
    }
}

fn cmd_rules(config: Option<PathBuf>) -> Result<()> {
    let (config, source) = resolve_config(config.as_deref())?;
    let rules = config.rules()?;

    println!("{}", "Configured Rules".bold());
    println!("Source: {}", source);
    if !config.meta.name.is_empty() {
        println!("Name: {}", config.meta.name);
    }
    if let Some(desc) = &config.meta.description {
        println!("Description: {}", desc);
    }
    println!();

    for (definition, rule) in config.rules.iter().zip(&rules) {
        match &definition.id {
            Some(id) => println!("{} {}", id.bold(), rule.query),
            None => println!("{}", rule.query),
        }
        for (field, value) in &rule.fields {
            println!("  <{field}>{value}</{field}>");
        }
    }

    Ok(())
}

fn cmd_render(file: &Path) -> Result<()> {
    let document = parse_file(file)?;
    println!("{}", to_pretty_string(&document));
    Ok(())
}
