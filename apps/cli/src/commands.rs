//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::info;

use linkpost_core::{BasePath, PipelineConfig, PublishReport, Publisher};
use linkpost_feed::{DropmarkFeed, FeedOptions};
use linkpost_link::{HttpLinkResolver, LinkOptions};
use linkpost_shared::{AppConfig, init_config, load_config};

use crate::settings::{PublishArgs, PublishSettings};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// linkpost: publish bookmark collections as static-site content.
#[derive(Parser)]
#[command(
    name = "linkpost",
    version,
    about = "Publish Dropmark bookmark collections as Hugo Markdown content.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Publish a Dropmark collection as Markdown documents.
    Publish(PublishArgs),

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "linkpost=info",
        1 => "linkpost=debug",
        _ => "linkpost=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Publish(args) => cmd_publish(&args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

async fn cmd_publish(args: &PublishArgs) -> Result<()> {
    let app_config: AppConfig = load_config()?;
    let settings = Arc::new(PublishSettings::merge(args, &app_config)?);

    let resolver = Arc::new(HttpLinkResolver::new(&LinkOptions::from(&app_config.links))?);
    let feed = Arc::new(DropmarkFeed::new(&FeedOptions {
        timeout_secs: app_config.feed.timeout_secs,
    })?);

    let base = BasePath::new(&settings.base_dir);
    let config = PipelineConfig::resolve(settings.mode, resolver, &base, &settings.options())?;

    info!(
        endpoint = %args.endpoint,
        content_dir = %config.content_dir().display(),
        mode = ?settings.mode,
        "publishing collection"
    );

    let publisher = Publisher::new(config, feed).with_item_error_policy(settings.item_errors);
    let report = publisher.publish(&args.endpoint).await?;

    print_summary(&report, publisher.config());
    Ok(())
}

fn print_summary(report: &PublishReport, config: &PipelineConfig) {
    println!();
    println!("  Collection published");
    println!("  Run:       {}", report.run_id);
    println!("  Items:     {}", report.total);
    println!("  Visited:   {}", report.visited);
    println!("  Published: {}", report.published);
    println!("  Skipped:   {}", report.skipped);
    println!("  Failed:    {}", report.failed);
    println!("  Content:   {}", config.content_dir().display());
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkpost_core::ExecutionMode;

    #[test]
    fn parses_publish_flags() {
        let cli = Cli::try_parse_from([
            "linkpost",
            "-v",
            "publish",
            "https://shah.dropmark.com/616548.json",
            "--base-dir",
            "site",
            "--sequential",
            "--limit",
            "10",
            "--simulate-scores",
            "--reporter",
            "summary",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Command::Publish(args) = cli.command else {
            panic!("expected publish");
        };
        assert_eq!(args.endpoint, "https://shah.dropmark.com/616548.json");
        assert!(args.sequential);
        assert_eq!(args.limit, Some(10));

        let settings = PublishSettings::merge(&args, &AppConfig::default()).unwrap();
        assert_eq!(settings.mode, ExecutionMode::Sequential);
        assert_eq!(settings.base_dir, std::path::PathBuf::from("site"));
    }

    #[test]
    fn image_flags_travel_together() {
        let result = Cli::try_parse_from([
            "linkpost",
            "publish",
            "https://shah.dropmark.com/1.json",
            "--image-path",
            "static/thumbs",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn sequential_conflicts_with_concurrency() {
        let result = Cli::try_parse_from([
            "linkpost",
            "publish",
            "https://shah.dropmark.com/1.json",
            "--sequential",
            "--concurrency",
            "4",
        ]);
        assert!(result.is_err());
    }
}
