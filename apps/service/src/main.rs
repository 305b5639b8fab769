#![warn(clippy::all)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sitewatch::{CheckOutcome, Config, MonitorEvent, SiteMonitor};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

mod console;

use console::{Command, HELP};

#[derive(Debug, Parser)]
#[command(name = "sitewatch", version, about = "Watch sites and report when they go up or down")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/sitewatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_tracing();
    let cli = Cli::parse();

    let config = Config::from_config(cli.config.as_ref()).context("Failed to load configuration")?;
    if cli.show_config {
        print!("{config}");
        return Ok(());
    }

    let mut monitor = SiteMonitor::from_config(&config).context("Failed to start site monitor")?;
    let printer = monitor.notifier().on_event(print_event);

    let seeded = monitor.register_configured_sites(&config).await;
    info!(seeded, "sitewatch ready, type `help` for commands");

    run_console(&mut monitor).await;

    monitor.shutdown().await;
    printer.abort();
    Ok(())
}

fn print_event(event: MonitorEvent) {
    if let Some(message) = event.message() {
        println!("{message}");
    }
}

/// Read commands until EOF, `quit` or Ctrl-C
async fn run_console(monitor: &mut SiteMonitor) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Shutdown signal received");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<Command>() {
                        Ok(Command::Quit) => break,
                        Ok(command) => {
                            // add may wait on a first check for up to the timeout
                            tokio::select! {
                                biased;
                                _ = &mut ctrl_c => {
                                    info!("Shutdown signal received");
                                    break;
                                }
                                result = execute(monitor, command) => {
                                    if let Err(e) = result {
                                        println!("error: {e:#}");
                                    }
                                }
                            }
                        }
                        Err(e) => println!("error: {e:#}"),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Failed to read from stdin");
                    break;
                }
            },
        }
    }
}

async fn execute(monitor: &mut SiteMonitor, command: Command) -> Result<()> {
    match command {
        Command::Add { name, url, cadence } => {
            let site = monitor.add_site(name, url, cadence).await?;
            println!("Monitoring {} ({}) every {}", site.name(), site.url(), site.cadence());
        }
        Command::Remove(url) => {
            let site = monitor.remove_site(&url).await?;
            println!("Removed {}", site.name());
        }
        Command::Stop(url) => {
            let site = monitor.stop_monitoring(&url).await?;
            println!("Stopped monitoring {}", site.name());
        }
        Command::Check(url) => {
            // The status line itself arrives through the event printer
            if let CheckOutcome::Online { latency_ms } = monitor.check_now(&url).await? {
                println!("{url} answered in {latency_ms} ms");
            }
        }
        Command::List => {
            let sites = monitor.sites().await;
            if sites.is_empty() {
                println!("No sites are being monitored.");
            }
            for site in &sites {
                println!("{}", serde_json::to_string(site).context("Failed to encode site")?);
            }
        }
        Command::Help => print!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}
