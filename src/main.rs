use chrono::Local;
use clap::{Parser, Subcommand};
use simple_blog::builder::{self, BuildOptions, BuildOutcome};
use simple_blog::{config, fingerprint, output};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::Level;

#[derive(Parser)]
#[command(name = "simple-blog")]
#[command(about = "Incremental static blog generator for a folder of Markdown posts")]
#[command(long_about = "\
Incremental static blog generator for a folder of Markdown posts

Project structure:

  project/
  ├── site.toml            # Site config (optional; run 'simple-blog gen-config')
  ├── build.lock.json      # Previous build snapshot (written by the build)
  ├── posts/               # One .md file per post, with optional front matter
  │   └── hello-world.md
  ├── pages/about.md       # Standalone about page (optional)
  ├── templates/base.html  # Page layout with {{placeholders}}
  └── static/              # Copied into the output root as-is

Only what changed since the previous build is regenerated. A build with no
changes is skipped entirely.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (default: <root>/site.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Remove the output directory before a full rebuild
    #[arg(long)]
    clean: bool,

    /// Ignore the lock file and rebuild everything
    #[arg(long)]
    no_incremental: bool,

    /// Worker threads (0 = all cores)
    #[arg(long)]
    workers: Option<usize>,

    /// Output directory, relative to the project root
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site, regenerating only what changed
    Build(BuildArgs),
    /// Parse all posts and report what the next build would do
    Check,
    /// Print a stock site.toml with all options documented
    GenConfig,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn options(cli: &Cli) -> Result<BuildOptions, Box<dyn std::error::Error>> {
    let mut opts = BuildOptions::new(
        &cli.root,
        fingerprint::generator_fingerprint()?,
        Local::now().naive_local(),
    );
    if let Some(path) = &cli.config {
        opts.config_path = path.clone();
    }
    Ok(opts)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Command::Build(args) => {
            let started = Instant::now();
            let mut opts = options(&cli)?;
            opts.clean = args.clean;
            opts.incremental = args.no_incremental.then_some(false);
            opts.workers = args.workers;
            opts.output = args.output.clone();
            match builder::build_site(&opts)? {
                BuildOutcome::Skipped => output::print_skipped(started.elapsed()),
                BuildOutcome::Built(report) => {
                    output::print_build_report(&report, started.elapsed())
                }
            }
        }
        Command::Check => {
            let report = builder::check_site(&options(&cli)?)?;
            output::print_check(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
