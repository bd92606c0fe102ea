use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use dotwright::adapters::fs::{Filesystem, OsFilesystem};
use dotwright::adapters::logger::TracingLogger;
use dotwright::cancel::Context as CancelContext;
use dotwright::config::DotConfig;
use dotwright::manifest::ManifestStore;
use dotwright::path::{PackagePath, TargetPath};
use dotwright::pipeline::{self, Pipeline};
use dotwright::plan::ConflictPolicy;
use dotwright::scan::prompt::{Batch, Interactive, LargeFileDecision};
use dotwright::services;

#[derive(Parser)]
#[command(name = "dot", about = "Symlink farm manager for dotfiles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Alternate target directory (defaults to $HOME)
    #[arg(long, global = true)]
    target: Option<PathBuf>,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Answer every large-file prompt automatically
    #[arg(long, global = true)]
    yes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the target tree with one or more packages
    Manage {
        /// Package directories to manage
        #[arg(required = true)]
        packages: Vec<PathBuf>,

        /// How to handle a pre-existing entry at a target path
        #[arg(long, value_enum, default_value = "fail")]
        on_conflict: ConflictArg,
    },
    /// Remove a package's links and forget it
    Unmanage {
        /// Name the package was recorded under
        package: String,
        /// Rename backed-up files back to their original paths
        #[arg(long)]
        restore_backups: bool,
    },
    /// Re-run `manage` for every package whose content changed
    Remanage,
    /// Move an existing file into a package and link it back
    Adopt {
        /// Package to adopt the file into
        package: PathBuf,
        /// Existing file under the target tree
        path: PathBuf,
    },
    /// Check manifest links for drift and report orphans
    Doctor {
        /// Stop after this many issues (0 = unbounded)
        #[arg(long, default_value_t = 0)]
        max_issues: usize,
    },
    /// Manage every package a bootstrap profile lists
    Bootstrap {
        /// Path to the bootstrap YAML file
        file: PathBuf,
        /// Profile name to apply
        profile: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ConflictArg {
    Fail,
    Backup,
    Overwrite,
    Skip,
}

impl From<ConflictArg> for ConflictPolicy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Fail => ConflictPolicy::Fail,
            ConflictArg::Backup => ConflictPolicy::Backup,
            ConflictArg::Overwrite => ConflictPolicy::Overwrite,
            ConflictArg::Skip => ConflictPolicy::Skip,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = DotConfig::load(cli.config.as_deref()).context("failed to load config")?;

    let target_root = TargetPath::new(cli.target.unwrap_or(config.general.target_dir.clone())).context("invalid target directory")?;

    let fs = OsFilesystem;
    let logger = TracingLogger;
    let prompter: Box<dyn dotwright::scan::prompt::LargeFilePrompter> =
        if cli.yes { Box::new(Batch(LargeFileDecision::Include)) } else { Box::new(Interactive::new()) };
    let pipeline = Pipeline::new(&fs, &logger, config.scan.large_file_threshold, prompter);
    let store = ManifestStore::new(&config.general.manifest_dir);
    let ctx = CancelContext::new();

    match cli.command {
        Commands::Manage { packages, on_conflict } => {
            for path in packages {
                let package = PackagePath::new(path).context("invalid package path")?;
                let outcome = pipeline.manage(&package, &target_root, on_conflict.into(), &ctx).context("manage failed")?;
                let name = pipeline::package_name(&package);
                pipeline.record(&store, &package, &outcome).context("failed to update manifest")?;
                println!("{name}: {} operations applied, {} skipped", outcome.applied.len(), outcome.skipped.len());
                for warning in &outcome.warnings {
                    println!("  warning: {warning}");
                }
            }
        }
        Commands::Unmanage { package, restore_backups } => {
            let report = services::unmanage(&fs, &logger, &store, &package, restore_backups).context("unmanage failed")?;
            println!("{package}: removed {} links, {} left in place (drifted)", report.removed, report.skipped_drifted.len());
        }
        Commands::Remanage => {
            let manifest = store.load().context("failed to load manifest")?;
            let packages: Vec<(String, PackagePath)> = manifest
                .packages
                .keys()
                .filter_map(|name| PackagePath::new(config.general.package_dir.join(name)).ok().map(|p| (name.clone(), p)))
                .collect();
            let report = services::remanage_all(&pipeline, &store, &packages, &target_root, config.conflict.default_policy, &ctx)
                .context("remanage failed")?;
            println!("reconciled: {:?}, unchanged: {:?}", report.reconciled, report.unchanged);
        }
        Commands::Adopt { package, path } => {
            let package = PackagePath::new(package).context("invalid package path")?;
            let existing = TargetPath::new(path).context("invalid target path")?;
            let record = services::adopt(&fs, &package, &target_root, &existing).context("adopt failed")?;
            println!("adopted into {}", record.source.display());
        }
        Commands::Doctor { max_issues } => {
            let manifest = store.load().context("failed to load manifest")?;
            let doctor = dotwright::doctor::Doctor::new(&fs);
            let issues = doctor.check_manifest(&manifest, max_issues);
            for issue in &issues {
                println!("{}: {:?}", issue.target.display(), issue.kind);
            }
            if issues.is_empty() {
                println!("no issues found");
            }
        }
        Commands::Bootstrap { file, profile } => {
            let bootstrap = services::bootstrap::load(&file).context("failed to load bootstrap file")?;
            services::bootstrap::validate(&bootstrap).context("invalid bootstrap file")?;
            let selected =
                services::bootstrap::select_packages(&bootstrap, &profile, config.conflict.default_policy).context("failed to select profile")?;
            for package in selected {
                let dir = config.general.package_dir.join(&package.name);
                if fs.kind_of(&dir)? == dotwright::adapters::fs::EntryKind::Missing {
                    if package.required {
                        anyhow::bail!("required package '{}' not found at {}", package.name, dir.display());
                    }
                    println!("{}: skipped (not present)", package.name);
                    continue;
                }
                let package_path = PackagePath::new(dir).context("invalid package path")?;
                let outcome = pipeline.manage(&package_path, &target_root, package.on_conflict, &ctx).context("manage failed")?;
                pipeline.record(&store, &package_path, &outcome).context("failed to update manifest")?;
                println!("{}: {} operations applied", package.name, outcome.applied.len());
            }
        }
    }

    Ok(())
}
