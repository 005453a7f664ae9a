//! Warden CLI.
//!
//! `cycle` runs one full monitoring cycle; `health` is the deep health check
//! the controller spawns as an isolated subprocess (also usable standalone);
//! `scan` runs just the browser scan for debugging.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use warden::config::WardenConfig;
use warden::cycle::run_cycle;
use warden::exit_codes;
use warden::health::{SubprocessHealthRunner, run_health_check};
use warden::io::browser::{ChromeScanner, ScanRequest, Scanner};
use warden::io::http::ReqwestProbe;
use warden::io::service::restart_service;
use warden::logging;

#[derive(Parser)]
#[command(
    name = "warden",
    version,
    about = "Autonomous site warden: scan, health-check, guarded self-replication"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one full cycle: scan, optional replication, health check, report.
    Cycle,
    /// Run the deep health check and print a JSON summary.
    Health,
    /// Scan configured pages with a headless browser and print the results.
    Scan,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::UNHEALTHY
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let cfg = WardenConfig::from_env()?;
    match cli.command {
        Command::Cycle => cmd_cycle(&cfg),
        Command::Health => cmd_health(&cfg),
        Command::Scan => cmd_scan(&cfg),
    }
}

fn cmd_cycle(cfg: &WardenConfig) -> Result<i32> {
    let scanner = ChromeScanner;
    let health = SubprocessHealthRunner::from_config(cfg);
    let report = run_cycle(cfg, &scanner, &health)?;

    // Machine-parseable summary for log scraping.
    println!("{}", serde_json::to_string_pretty(&report.outcome)?);
    Ok(report.exit_code)
}

fn cmd_health(cfg: &WardenConfig) -> Result<i32> {
    let summary = run_health_check(cfg, &ReqwestProbe);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !summary.passed && cfg.enable_restart {
        if let Err(e) = restart_service(&cfg.restart_service) {
            warn!(err = %e, "service restart failed");
        }
    }

    if summary.passed {
        Ok(exit_codes::OK)
    } else {
        eprintln!("health check failed: one or more checks did not pass");
        Ok(exit_codes::UNHEALTHY)
    }
}

fn cmd_scan(cfg: &WardenConfig) -> Result<i32> {
    let scanner = ChromeScanner;
    let request = ScanRequest {
        urls: cfg.scan_paths.iter().map(|path| cfg.url_for(path)).collect(),
        timeout: cfg.nav_timeout,
        screenshot_path: Some(cfg.logs_dir().join("current_state.png")),
    };
    let results = scanner.scan(&request)?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cycle() {
        let cli = Cli::parse_from(["warden", "cycle"]);
        assert!(matches!(cli.command, Command::Cycle));
    }

    #[test]
    fn parse_health() {
        let cli = Cli::parse_from(["warden", "health"]);
        assert!(matches!(cli.command, Command::Health));
    }
}
