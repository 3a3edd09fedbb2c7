mod logging;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use month_folders_core::{
    photos_root_from_env, watch, CancellationToken, Organizer, OrganizerConfig, Schedule,
    TimestampPolicy,
};

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Modification time only
    Modified,
    /// Earlier of creation and modification time
    Earliest,
}

impl From<PolicyArg> for TimestampPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Modified => TimestampPolicy::Modified,
            PolicyArg::Earliest => TimestampPolicy::Earliest,
        }
    }
}

#[derive(Parser)]
#[command(name = "month-folders", version, about = "Move camera roll photos into year/month folders")]
struct Cli {
    /// Photos root containing "Camera Roll" (default: $OneDrive/Pictures)
    photos_root: Option<PathBuf>,

    /// Folder to scan instead of <photos_root>/Camera Roll
    #[arg(long)]
    scan_dir: Option<PathBuf>,

    /// Destination root instead of <photos_root>
    #[arg(long)]
    target: Option<PathBuf>,

    /// JSON config file; command line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recognized media extensions, comma separated
    #[arg(long, value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Filename prefix that is always dated from metadata (repeatable)
    #[arg(long = "vendor-prefix")]
    vendor_prefixes: Vec<String>,

    /// Do not fall back to file timestamps when no filename rule matches
    #[arg(long)]
    strict: bool,

    /// Which file timestamp to use when falling back to metadata
    #[arg(long, value_enum)]
    timestamp_policy: Option<PolicyArg>,

    /// Ask the `mediainfo` tool for embedded dates first
    #[arg(long)]
    mediainfo: bool,

    /// Report what would be moved without moving anything
    #[arg(long)]
    dry_run: bool,

    /// Run a single scan and exit
    #[arg(long)]
    once: bool,

    /// Seconds to sleep between scans
    #[arg(long, default_value_t = 15 * 60)]
    interval: u64,

    /// Number of progress ticks per sleep
    #[arg(long, default_value_t = 60)]
    ticks: u32,

    /// Debug output (DEBUG accepts 1/0, true/false, yes/no, on/off)
    #[arg(
        long,
        env = "DEBUG",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    debug: bool,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn organizer_config(&self) -> anyhow::Result<OrganizerConfig> {
        let mut config = match &self.config {
            Some(path) => OrganizerConfig::load(path)?,
            None => OrganizerConfig::default(),
        };

        if self.config.is_none() || self.photos_root.is_some() {
            let root = self
                .photos_root
                .clone()
                .unwrap_or_else(|| photos_root_from_env(|k| std::env::var(k).ok()));
            let defaults = OrganizerConfig::for_photos_root(root);
            config.scan_dir = defaults.scan_dir;
            config.target_root = defaults.target_root;
        }

        if let Some(dir) = &self.scan_dir {
            config.scan_dir = dir.clone();
        }
        if let Some(dir) = &self.target {
            config.target_root = dir.clone();
        }
        if let Some(extensions) = &self.extensions {
            config.extensions = extensions.clone();
        }
        if !self.vendor_prefixes.is_empty() {
            config.vendor_prefixes = self.vendor_prefixes.clone();
        }
        if self.strict {
            config.metadata_fallback = false;
        }
        if let Some(policy) = self.timestamp_policy {
            config.timestamp_policy = policy.into();
        }
        config.mediainfo |= self.mediainfo;
        config.dry_run |= self.dry_run;
        Ok(config)
    }

    fn schedule(&self) -> Schedule {
        Schedule {
            interval: Duration::from_secs(self.interval),
            ticks: self.ticks.max(1),
            once: self.once,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.debug, cli.verbose);

    let config = cli.organizer_config()?;
    let schedule = cli.schedule();
    debug!("Configuration: {:#?}", config);

    let organizer = Organizer::new(config).context("Invalid filename rules")?;

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, finishing current file...");
        handler_token.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;

    let style = ProgressStyle::default_bar()
        .template("[{bar:60}] next scan in {eta}")?
        .progress_chars(".. ");
    let mut bar: Option<ProgressBar> = None;

    let cycles = watch::run(&organizer, &schedule, &token, |i, total| {
        let pb = bar.get_or_insert_with(|| {
            let pb = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stdout());
            pb.set_style(style.clone());
            pb
        });
        pb.set_position(i as u64 + 1);
        if i + 1 >= total {
            pb.finish_and_clear();
            bar = None;
        }
    });

    if let Some(pb) = bar.take() {
        pb.finish_and_clear();
    }
    info!("Stopped after {} cycle(s)", cycles);
    Ok(())
}
