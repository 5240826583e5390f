//! terabox_link CLI - Resolve and download TeraBox share links.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use terabox_link::downloader::ProgressFn;
use terabox_link::logging::init_logging;
use terabox_link::models::format_size;
use terabox_link::{
    CancellationToken, Downloader, HttpDownloader, LinkResolver, Resolution, ResolverConfig,
};

/// CLI tool for resolving TeraBox share links.
#[derive(Parser)]
#[command(name = "terabox_link")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file overriding endpoints and limits.
    #[arg(long, env = "TERABOX_CONFIG")]
    config: Option<PathBuf>,

    /// Account cookie used by the authenticated strategy.
    #[arg(long, env = "TERABOX_COOKIE", hide_env_values = true)]
    cookie: Option<String>,

    /// Enable debug logging.
    #[arg(long, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a share link to direct download link(s).
    Resolve {
        /// Share URL.
        url: String,

        /// Print the resolution as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the files of a share.
    List {
        /// Share URL.
        url: String,
    },

    /// Resolve a share link and download its files.
    Download {
        /// Share URL.
        url: String,

        /// Local destination directory.
        #[arg(long, short = 't', default_value = ".")]
        to: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => ResolverConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => ResolverConfig::default(),
    };
    let user_agent = config.user_agent.clone();
    let resolver = LinkResolver::new(config).context("Failed to create resolver")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let cookie = cli.cookie.as_deref();

    match cli.command {
        Commands::Resolve { url, json } => {
            let resolution = resolver
                .resolve_with_cancel(&url, cookie, &cancel)
                .await
                .with_context(|| format!("Failed to resolve: {}", url))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&resolution)?);
            } else {
                print_resolution(&resolution);
            }
        }

        Commands::List { url } => {
            let files = resolver
                .list(&url)
                .await
                .with_context(|| format!("Failed to list share: {}", url))?;

            if files.is_empty() {
                println!("No files found.");
            } else {
                println!("{:>10} {}", "SIZE", "PATH");
                println!("{}", "-".repeat(80));
                for file in files {
                    let size = file.size_bytes.map(format_size).unwrap_or_else(|| "-".to_string());
                    println!("{:>10} {}", size, file.path);
                }
            }
        }

        Commands::Download { url, to } => {
            std::fs::create_dir_all(&to)
                .with_context(|| format!("Failed to create directory: {:?}", to))?;

            let resolution = resolver
                .resolve_with_cancel(&url, cookie, &cancel)
                .await
                .with_context(|| format!("Failed to resolve: {}", url))?;

            let downloader = HttpDownloader::new(&user_agent)?;
            let files = resolution.files();
            let progress: ProgressFn = &|written: u64, total: Option<u64>| {
                let total = total.map(format_size).unwrap_or_else(|| "?".to_string());
                eprint!("\r  {} / {}   ", format_size(written), total);
                let _ = std::io::stderr().flush();
            };

            for (idx, file) in files.iter().enumerate() {
                if cancel.is_cancelled() {
                    anyhow::bail!("Cancelled");
                }
                println!("[{}/{}] Downloading {}...", idx + 1, files.len(), file.filename);

                match downloader.download(file, &to, Some(progress)).await {
                    Ok(report) => {
                        eprintln!();
                        println!("  OK -> {:?}", report.path);
                    }
                    Err(e) => {
                        eprintln!();
                        println!("  FAILED");
                        eprintln!("  Error: {}", e);
                    }
                }
            }

            println!("Done.");
        }
    }

    Ok(())
}

fn print_resolution(resolution: &Resolution) {
    match resolution {
        Resolution::Single(file) => println!("{}", file),
        Resolution::Folder { files, skipped } => {
            for file in files {
                println!("{}", file);
            }
            for skip in skipped {
                eprintln!("Skipped {}: {}", skip.path, skip.reason);
            }
        }
    }
}
