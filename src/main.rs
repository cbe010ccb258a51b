use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use page_patcher::config::{
    apply_recipe, load_from_path, resolve_target, Mode, PatchResult, Recipe, RunReport,
};
use page_patcher::{logging, PatchError, Stage};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "page-patcher")]
#[command(about = "Marker-based patching for generated page sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a recipe to its target file
    Apply {
        #[command(flatten)]
        target: TargetArgs,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report which patches of a recipe would apply
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Check that every patch of a recipe is already applied
    Verify {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// List recipe files and their patches
    List {
        /// Directory holding recipe files
        #[arg(short, long, default_value = "patches")]
        dir: PathBuf,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Recipe file (TOML)
    #[arg(short, long)]
    recipe: PathBuf,

    /// Target file, overriding the recipe's `target`
    #[arg(short, long)]
    target: Option<PathBuf>,

    /// Project root that relative targets resolve against
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

impl TargetArgs {
    fn load(&self) -> Result<(Recipe, PathBuf)> {
        let recipe = load_from_path(&self.recipe)?;
        let file = resolve_target(&recipe, self.target.as_deref(), &self.root)?;
        Ok((recipe, file))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}", format!("Warning: logging disabled: {e}").yellow());
    }

    match cli.command {
        Commands::Apply {
            target,
            dry_run,
            diff,
        } => cmd_apply(&target, dry_run, diff),

        Commands::Status { target } => cmd_status(&target),

        Commands::Verify { target } => cmd_verify(&target),

        Commands::List { dir } => cmd_list(&dir),
    }
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        println!("{}", hunk.header().to_string().cyan());
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => format!("-{}", change).red(),
                ChangeTag::Insert => format!("+{}", change).green(),
                ChangeTag::Equal => format!(" {}", change).normal(),
            };
            print!("{}", sign);
        }
    }
}

/// Helper: Explain a locate failure in terms of what probably changed.
fn explain_failure(err: &PatchError) {
    match err {
        PatchError::MarkerNotFound { .. } | PatchError::PatternNotMatched { .. } => {
            eprintln!("  {}", "CONFLICT: marker matched no locations".red());
            eprintln!("  Possible causes:");
            eprintln!("    - The block was edited by hand since the recipe was written");
            eprintln!("    - The recipe was already applied with different text");
        }
        PatchError::AmbiguousMarker { count, .. } => {
            eprintln!(
                "  {}",
                format!("CONFLICT: marker matched {} locations (expected 1)", count).red()
            );
            eprintln!("  Action: lengthen the marker, or set policy = \"first\" in the recipe");
        }
        PatchError::RegionOrderInvalid { .. } => {
            eprintln!("  {}", "CONFLICT: blocks are not in the expected order".red());
            eprintln!("  The target may already have been rearranged");
        }
        _ => {}
    }
}

fn print_header(recipe: &Recipe, file: &Path) {
    let name = if recipe.meta.name.is_empty() {
        "(unnamed)"
    } else {
        recipe.meta.name.as_str()
    };
    println!("Recipe: {}", name);
    println!("Target: {}", file.display());
    println!();
}

fn cmd_apply(args: &TargetArgs, dry_run: bool, show_diff: bool) -> Result<()> {
    let (recipe, file) = args.load()?;
    print_header(&recipe, &file);

    let mode = if dry_run {
        println!("{}", "[DRY RUN - nothing will be written]".cyan());
        Mode::DryRun
    } else {
        Mode::Write
    };

    let report = apply_recipe(&recipe, &file, mode)?;

    let mut total_applied = 0;
    let mut total_already_applied = 0;
    let mut total_failed = 0;

    for (patch_id, result) in &report.results {
        match result {
            Ok(PatchResult::Applied { file }) => {
                let verb = if dry_run { "Would apply to" } else { "Applied to" };
                println!("{} {}: {} {}", "✓".green(), patch_id, verb, file.display());
                total_applied += 1;
            }
            Ok(PatchResult::AlreadyApplied { file }) => {
                println!(
                    "{} {}: Already applied to {}",
                    "⊙".yellow(),
                    patch_id,
                    file.display()
                );
                total_already_applied += 1;
            }
            Err(e) => {
                eprintln!("{} {}: Failed - {}", "✗".red(), patch_id, e);
                explain_failure(e);
                total_failed += 1;
            }
        }
    }

    if show_diff && report.changed() {
        display_diff(&report.file, &report.before, &report.after);
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", total_applied).green());
    println!(
        "  {} already applied",
        format!("{}", total_already_applied).yellow()
    );
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        eprintln!(
            "{}",
            format!("No changes written (run stopped at {}).", report.stage).red()
        );
        std::process::exit(1);
    }

    if report.stage == Stage::Written {
        println!("{}", format!("Successfully patched {}.", file.display()).green());
    } else if !report.changed() {
        println!("{}", "Nothing to do.".dimmed());
    }

    Ok(())
}

fn dry_report(args: &TargetArgs) -> Result<(Recipe, RunReport)> {
    let (recipe, file) = args.load()?;
    let report = apply_recipe(&recipe, &file, Mode::DryRun)?;
    Ok((recipe, report))
}

fn cmd_status(args: &TargetArgs) -> Result<()> {
    let (recipe, report) = dry_report(args)?;

    println!("{}", "Patch Status Report".bold());
    print_header(&recipe, &report.file);

    let mut applied = Vec::new();
    let mut pending = Vec::new();
    let mut failing = Vec::new();

    for (patch_id, result) in &report.results {
        match result {
            Ok(PatchResult::AlreadyApplied { .. }) => applied.push(patch_id.as_str()),
            Ok(PatchResult::Applied { .. }) => pending.push(patch_id.as_str()),
            Err(e) => failing.push((patch_id.as_str(), e.to_string())),
        }
    }

    // Patches after the first failure were never evaluated.
    let not_evaluated: Vec<&str> = recipe
        .patches
        .iter()
        .skip(report.results.len())
        .map(|p| p.id.as_str())
        .collect();

    if !applied.is_empty() {
        println!(
            "{} {} ({} patches)",
            "✓".green(),
            "APPLIED".green().bold(),
            applied.len()
        );
        for id in &applied {
            println!("  - {}", id);
        }
        println!();
    }

    if !pending.is_empty() {
        println!(
            "{} {} ({} patches)",
            "⊙".yellow(),
            "NOT APPLIED".yellow().bold(),
            pending.len()
        );
        for id in &pending {
            println!("  - {}", id);
        }
        println!();
    }

    if !failing.is_empty() {
        println!(
            "{} {} ({} patches)",
            "✗".red(),
            "FAILING".red().bold(),
            failing.len()
        );
        for (id, reason) in &failing {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    if !not_evaluated.is_empty() {
        println!(
            "{} {} ({} patches)",
            "⊘".cyan(),
            "NOT EVALUATED".cyan().bold(),
            not_evaluated.len()
        );
        for id in &not_evaluated {
            println!("  - {}", id);
        }
        println!();
    }

    Ok(())
}

fn cmd_verify(args: &TargetArgs) -> Result<()> {
    let (recipe, report) = dry_report(args)?;

    println!("{}", "Verifying recipe...".bold());
    print_header(&recipe, &report.file);

    let mut verified = 0;
    let mut mismatch = 0;

    for (patch_id, result) in &report.results {
        match result {
            Ok(PatchResult::AlreadyApplied { .. }) => {
                println!("{} {}: Verified (already applied)", "✓".green(), patch_id);
                verified += 1;
            }
            Ok(PatchResult::Applied { file }) => {
                eprintln!("{} {}: MISMATCH", "✗".red(), patch_id);
                eprintln!("  Expected: patch already applied");
                eprintln!("  Found: patch not yet applied");
                eprintln!("  Location: {}", file.display());
                mismatch += 1;
            }
            Err(e) => {
                eprintln!("{} {}: MISMATCH", "✗".red(), patch_id);
                eprintln!("  Error: {}", e);
                mismatch += 1;
            }
        }
    }
    mismatch += recipe.patches.len() - report.results.len();

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} verified", format!("{}", verified).green());
    println!("  {} mismatch", format!("{}", mismatch).red());

    if mismatch > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Recipe directory not found: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        println!("{}", format!("No recipes in {}", dir.display()).yellow());
        return Ok(());
    }

    for path in files {
        match load_from_path(&path) {
            Ok(recipe) => {
                println!("{}", path.display().to_string().bold());
                if !recipe.meta.name.is_empty() {
                    println!("  name: {}", recipe.meta.name);
                }
                if let Some(description) = &recipe.meta.description {
                    println!("  {}", description.trim().dimmed());
                }
                if let Some(target) = &recipe.meta.target {
                    println!("  target: {}", target);
                }
                for patch in &recipe.patches {
                    println!("  - {}", patch.id);
                }
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), path.display(), e);
            }
        }
        println!();
    }

    Ok(())
}
