use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use veneer_packages::NodeResolver;
use veneer_rewrite::{OverlayPackage, OverlayResolver, RewriteIndex};

#[derive(Parser)]
#[command(
    name = "veneer",
    version,
    about = "Inspect an application's packages as seen through rewritten-package overlays"
)]
struct Cli {
    /// Application root (defaults to current directory)
    #[arg(long, global = true, default_value = ".")]
    app: PathBuf,
    /// Emit JSON suitable for CI
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the rewrite index (original -> rewritten roots and extra resolutions)
    Index,
    /// Resolve a dependency name from a package
    Resolve(ResolveArgs),
    /// Print the package that owns a file
    Owner(OwnerArgs),
    /// List every package reachable from a package
    Descendants(PackageArgs),
    /// Print where a rewritten package lived before it was rewritten
    Original(PackageArgs),
}

#[derive(Args)]
struct ResolveArgs {
    /// Package name, e.g. `lodash` or `@scope/pkg`
    name: String,
    /// Package directory to resolve from (defaults to the application root)
    #[arg(long)]
    from: Option<PathBuf>,
}

#[derive(Args)]
struct OwnerArgs {
    /// File to look up
    file: PathBuf,
}

#[derive(Args)]
struct PackageArgs {
    /// Package root directory
    dir: PathBuf,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PackageReport {
    name: String,
    version: Option<String>,
    root: PathBuf,
    moved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_root: Option<PathBuf>,
}

impl From<&OverlayPackage> for PackageReport {
    fn from(pkg: &OverlayPackage) -> Self {
        Self {
            name: pkg.name().to_string(),
            version: pkg.version().map(str::to_string),
            root: pkg.root().to_path_buf(),
            moved: pkg.is_moved(),
            original_root: pkg
                .as_moved()
                .map(|moved| moved.original_root().to_path_buf()),
        }
    }
}

impl PackageReport {
    fn line(&self) -> String {
        let mut line = match &self.version {
            Some(version) => format!("{}@{} {}", self.name, version, self.root.display()),
            None => format!("{} {}", self.name, self.root.display()),
        };
        if let Some(original) = &self.original_root {
            line.push_str(&format!(" (rewritten from {})", original.display()));
        }
        line
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexReport {
    index_path: PathBuf,
    packages: Vec<RewrittenEntry>,
    extra_resolutions: Vec<ExtraResolutionEntry>,
}

#[derive(Serialize)]
struct RewrittenEntry {
    original: PathBuf,
    rewritten: PathBuf,
}

#[derive(Serialize)]
struct ExtraResolutionEntry {
    from: PathBuf,
    targets: Vec<PathBuf>,
}

impl IndexReport {
    fn new(index_path: PathBuf, index: &RewriteIndex) -> Self {
        Self {
            index_path,
            packages: index
                .packages()
                .map(|(original, rewritten)| RewrittenEntry {
                    original: original.to_path_buf(),
                    rewritten: rewritten.to_path_buf(),
                })
                .collect(),
            extra_resolutions: index
                .all_extra_resolutions()
                .map(|(from, targets)| ExtraResolutionEntry {
                    from: from.to_path_buf(),
                    targets: targets.to_vec(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct DescendantsReport {
    package: PackageReport,
    descendants: Vec<PackageReport>,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let app = canonical(&cli.app)
        .with_context(|| format!("application root {} is not accessible", cli.app.display()))?;
    let (config, config_path) = veneer_config::load_for_app(&app)?;
    veneer_config::init_tracing(&config.logging);
    tracing::debug!(
        target: "veneer.cli",
        app = %app.display(),
        config = ?config_path,
        "starting"
    );

    let resolver = OverlayResolver::with_config(Arc::new(NodeResolver::new(&app)), &config.rewrite)?;

    match cli.command {
        Command::Index => {
            let index_path = RewriteIndex::index_path(&config.rewrite.working_dir(&app));
            let report = IndexReport::new(index_path, resolver.index());
            print_output(&report, cli.json)?;
            Ok(0)
        }
        Command::Resolve(args) => {
            let from_dir = match &args.from {
                Some(dir) => canonical(dir)?,
                None => app.clone(),
            };
            let from = resolver.get(&from_dir)?;
            match resolver.resolve(&args.name, &from) {
                Ok(pkg) => {
                    print_output(&PackageReport::from(&pkg), cli.json)?;
                    Ok(0)
                }
                Err(err) if err.is_not_found() => {
                    eprintln!("{err}");
                    Ok(1)
                }
                Err(err) => Err(err.into()),
            }
        }
        Command::Owner(args) => {
            let file = canonical(&args.file)?;
            match resolver.owner_of_file(&file)? {
                Some(owner) => {
                    print_output(&PackageReport::from(&owner), cli.json)?;
                    Ok(0)
                }
                None => {
                    eprintln!("no package owns {}", file.display());
                    Ok(1)
                }
            }
        }
        Command::Descendants(args) => {
            let pkg = resolver.get(&canonical(&args.dir)?)?;
            let descendants = resolver.find_descendants(&pkg)?;
            let report = DescendantsReport {
                package: PackageReport::from(&pkg),
                descendants: descendants.iter().map(PackageReport::from).collect(),
            };
            print_output(&report, cli.json)?;
            Ok(0)
        }
        Command::Original(args) => {
            let pkg = resolver.get(&canonical(&args.dir)?)?;
            match resolver.original(&pkg)? {
                Some(original) => {
                    print_output(&PackageReport::from(&original), cli.json)?;
                    Ok(0)
                }
                None => {
                    eprintln!("{} was not rewritten", pkg.root().display());
                    Ok(1)
                }
            }
        }
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    dunce::canonicalize(path).with_context(|| format!("failed to resolve {}", path.display()))
}

fn print_output<T: Serialize + 'static>(value: &T, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(value)?;
        println!("{out}");
        return Ok(());
    }

    let any = value as &dyn Any;
    if let Some(report) = any.downcast_ref::<IndexReport>() {
        println!("index: {}", report.index_path.display());
        for entry in &report.packages {
            println!(
                "  {} -> {}",
                entry.original.display(),
                entry.rewritten.display()
            );
        }
        for entry in &report.extra_resolutions {
            for target in &entry.targets {
                println!("  {} +> {}", entry.from.display(), target.display());
            }
        }
        println!(
            "summary: {} rewritten, {} with extra resolutions",
            report.packages.len(),
            report.extra_resolutions.len()
        );
    } else if let Some(report) = any.downcast_ref::<PackageReport>() {
        println!("{}", report.line());
    } else if let Some(report) = any.downcast_ref::<DescendantsReport>() {
        println!("{}", report.package.line());
        for dep in &report.descendants {
            println!("  {}", dep.line());
        }
    } else {
        let out = serde_json::to_string_pretty(value)?;
        println!("{out}");
    }
    Ok(())
}
