//! siper - Site blocking through the system hosts file
//!
//! Usage:
//!   siper                       Show blocking status
//!   siper add <SITE>...         Add sites to the block-list
//!   siper category social       Add a built-in category
//!   siper enable                Block every listed site
//!   siper disable               Unblock
//!   siper focus 25              Block for 25 minutes
//!   siper stats                 Show focus statistics

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use siper_core::{Paths, ThemeMode};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use siper::elevate;
use siper::{BlockingController, Category, Event, Reconciliation};

/// S.I.P.E.R. - Block distracting sites through the hosts file
#[derive(Parser)]
#[command(name = "siper")]
#[command(about = "Block distracting sites through the hosts file, with timed focus sessions")]
#[command(version)]
#[command(after_help = r#"HOW IT WORKS:
    Blocked sites resolve to 127.0.0.1 through entries in /etc/hosts.
    Each entry is tagged '# siper'; other lines are never touched.
    Changing the hosts file asks for administrator rights (pkexec).

EXAMPLES:
    siper add youtube.com reddit.com   # Add sites (URLs are fine too)
    siper category social              # Add a built-in category
    siper enable                       # Start blocking
    siper focus 25                     # Block for 25 minutes, Ctrl-C to stop
    siper disable                      # Stop blocking
    siper export sites.json            # Save the list as a JSON array

ALIASES:
    siper ls    # list
    siper rm    # remove
    siper on    # enable
    siper off   # disable
"#)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show blocking status
    #[command(alias = "st")]
    Status,

    /// List blocked sites
    #[command(alias = "ls")]
    List,

    /// Add sites to the block-list
    Add {
        /// Domains or URLs
        #[arg(required = true, value_name = "SITE")]
        sites: Vec<String>,
    },

    /// Remove a site from the block-list
    #[command(alias = "rm")]
    Remove {
        #[arg(value_name = "SITE")]
        site: String,
    },

    /// Remove every site from the block-list
    Clear,

    /// Add a built-in category, or list them
    #[command(alias = "cat")]
    Category {
        /// Category name (omit to list)
        name: Option<String>,
    },

    /// Block every listed site
    #[command(alias = "on")]
    Enable,

    /// Remove all blocking entries
    #[command(alias = "off")]
    Disable,

    /// Block for a number of minutes, then unblock
    Focus {
        #[arg(value_name = "MINUTES", allow_negative_numbers = true)]
        minutes: i64,
    },

    /// Check the hosts file against the saved state
    Sync,

    /// Show focus statistics
    Stats,

    /// Write the block-list as a JSON array
    Export {
        /// Output file (default: stdout)
        file: Option<PathBuf>,
    },

    /// Add sites from a JSON array file
    Import { file: PathBuf },

    /// Set the theme, or cycle it when no mode is given
    Theme {
        /// auto, light or dark
        mode: Option<String>,
    },

    /// Set the interface language
    Language { name: String },
}

// ANSI color codes
const RED: &str = "\x1b[0;31m";
const GREEN: &str = "\x1b[0;32m";
const YELLOW: &str = "\x1b[0;33m";
const CYAN: &str = "\x1b[0;36m";
const MAGENTA: &str = "\x1b[0;35m";
const BOLD: &str = "\x1b[1m";
const NC: &str = "\x1b[0m";

/// Check if stdout is a TTY and colors should be used
fn use_colors() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

/// Conditionally apply color
fn color(code: &str, text: &str) -> String {
    if use_colors() {
        format!("{}{}{}", code, text, NC)
    } else {
        text.to_string()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli.command.unwrap_or(Commands::Status)))
}

async fn run(command: Commands) -> Result<()> {
    let paths = Paths::new();
    let elevator = elevate::detect();
    debug!(elevator = elevator.name(), "selected elevation back-end");
    let mut controller =
        BlockingController::open(&paths, elevator).context("Failed to load siper state")?;

    let startup = match controller.sync().await {
        Ok(r) => {
            if r.drifted {
                report_drift(&r);
            }
            Some(r)
        }
        Err(e) => {
            warn!(error = %e, "could not check the hosts file");
            None
        }
    };

    let result = match command {
        Commands::Status => cmd_status(&controller),
        Commands::List => cmd_list(&controller),
        Commands::Add { sites } => cmd_add(&mut controller, &sites),
        Commands::Remove { site } => cmd_remove(&mut controller, &site),
        Commands::Clear => cmd_clear(&mut controller),
        Commands::Category { name } => cmd_category(&mut controller, name.as_deref()),
        Commands::Enable => cmd_enable(&mut controller).await,
        Commands::Disable => cmd_disable(&mut controller).await,
        Commands::Focus { minutes } => cmd_focus(&mut controller, minutes).await,
        Commands::Sync => cmd_sync(startup),
        Commands::Stats => cmd_stats(&controller),
        Commands::Export { file } => cmd_export(&controller, file),
        Commands::Import { file } => cmd_import(&mut controller, &file),
        Commands::Theme { mode } => cmd_theme(&mut controller, mode.as_deref()),
        Commands::Language { name } => cmd_language(&mut controller, &name),
    };

    controller.flush().await.context("Failed to save siper state")?;
    result
}

fn report_drift(r: &Reconciliation) {
    let state = if r.active { "active" } else { "inactive" };
    println!(
        "{} Hosts file changed outside siper; blocking is now {}",
        color(YELLOW, "[sync]"),
        state
    );
}

/// Wait for the result of the operation just started
async fn settle(controller: &mut BlockingController) -> Result<Event> {
    let event = controller
        .next_event()
        .await
        .context("blocking controller stopped")?;
    if let Event::Failed { op, error } = event {
        return Err(anyhow!(error)).with_context(|| format!("Failed to {}", op));
    }
    Ok(event)
}

fn local(time: DateTime<Utc>) -> String {
    let time: DateTime<Local> = time.into();
    time.format("%H:%M").to_string()
}

/// Show blocking status
fn cmd_status(controller: &BlockingController) -> Result<()> {
    let state = controller.state();

    if state.active {
        println!("{}", color(&format!("{}{}", BOLD, GREEN), "BLOCKING ACTIVE"));
    } else {
        println!("{}", color(BOLD, "Blocking inactive"));
    }
    println!();
    println!("  {}     {}", color(CYAN, "Sites:"), controller.site_count());
    println!("  {}     {}", color(CYAN, "Hosts:"), controller.hosts_path().display());
    if let Some(session) = state.focus_session {
        println!(
            "  {}     {} of {} minutes left (ends {})",
            color(CYAN, "Focus:"),
            session.remaining_minutes(),
            session.duration_minutes,
            local(session.ends_at())
        );
    }
    println!("  {}     {}", color(CYAN, "Theme:"), controller.theme());
    println!("  {}  {}", color(CYAN, "Language:"), controller.language());
    println!();

    if controller.site_count() == 0 {
        println!("Add sites with: siper add <SITE>");
    } else if state.active {
        println!("Run 'siper disable' to unblock");
    } else {
        println!("Run 'siper enable' to block, or 'siper focus 25' for a timed session");
    }

    Ok(())
}

/// List blocked sites
fn cmd_list(controller: &BlockingController) -> Result<()> {
    if controller.site_count() == 0 {
        println!("No blocked sites");
        return Ok(());
    }
    println!("{}Blocked sites ({}){}", BOLD, controller.site_count(), NC);
    for site in controller.sites() {
        println!("  {}", site);
    }
    Ok(())
}

/// Add sites, reporting each one
fn cmd_add(controller: &mut BlockingController, sites: &[String]) -> Result<()> {
    let mut rejected = 0;
    for raw in sites {
        match controller.add_site(raw) {
            Ok(_) => println!("{} Added {}", color(GREEN, "[ok]"), raw),
            Err(e) if e.is_benign() => println!("{} {}", color(CYAN, "[info]"), e),
            Err(e) => {
                rejected += 1;
                println!("{} {}", color(RED, "[error]"), e);
            }
        }
    }

    if controller.state().active {
        println!();
        println!("Run 'siper enable' to apply the new list");
    }
    if rejected > 0 {
        bail!("{} of {} sites rejected", rejected, sites.len());
    }
    Ok(())
}

/// Remove one site
fn cmd_remove(controller: &mut BlockingController, site: &str) -> Result<()> {
    if controller.remove_site(site) {
        println!("{} Removed {}", color(GREEN, "[ok]"), site);
    } else {
        println!("{} {} was not blocked", color(CYAN, "[info]"), site);
    }
    Ok(())
}

/// Empty the block-list
fn cmd_clear(controller: &mut BlockingController) -> Result<()> {
    let removed = controller.clear_all();
    println!("{} Removed {} sites", color(GREEN, "[ok]"), removed);
    Ok(())
}

/// Add a category, or list the built-in ones
fn cmd_category(controller: &mut BlockingController, name: Option<&str>) -> Result<()> {
    let Some(name) = name else {
        println!("{}Categories{}", BOLD, NC);
        for category in Category::ALL {
            println!("  {:<10} {} sites", category.as_str(), category.sites().len());
        }
        return Ok(());
    };

    let category = match Category::from_str(name) {
        Some(c) => c,
        None => {
            let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
            bail!("Unknown category '{}'. Available: {}", name, names.join(", "));
        }
    };

    let report = controller.add_category(category);
    if report.added == 0 {
        println!(
            "{} Every site in '{}' is already blocked",
            color(CYAN, "[info]"),
            report.source
        );
    } else {
        println!(
            "{} Added {} sites from '{}' ({} already blocked)",
            color(GREEN, "[ok]"),
            report.added,
            report.source,
            report.skipped
        );
    }
    Ok(())
}

/// Block every listed site
async fn cmd_enable(controller: &mut BlockingController) -> Result<()> {
    controller.enable()?;
    if let Event::Enabled { sites } = settle(controller).await? {
        println!("{} Blocking {} sites", color(GREEN, "[ok]"), sites);
    }
    Ok(())
}

/// Remove every blocking entry
async fn cmd_disable(controller: &mut BlockingController) -> Result<()> {
    controller.disable()?;
    if let Event::Disabled { .. } = settle(controller).await? {
        println!("{} Blocking disabled", color(GREEN, "[ok]"));
    }
    Ok(())
}

/// Block for `minutes`, staying in the foreground until the session ends
async fn cmd_focus(controller: &mut BlockingController, minutes: i64) -> Result<()> {
    controller.start_focus(minutes)?;
    if let Event::FocusStarted { minutes, ends_at } = settle(controller).await? {
        println!("{} Focus session started", color(GREEN, "[ok]"));
        println!();
        println!("{}", color(&format!("{}{}", BOLD, MAGENTA), "FOCUS MODE"));
        println!();
        println!("  {}  {} minutes", color(CYAN, "Duration:"), minutes);
        println!("  {}     {}", color(CYAN, "Sites:"), controller.site_count());
        println!("  {}   {}", color(CYAN, "Ends at:"), local(ends_at));
        println!();
        println!("Press Ctrl-C to end early");
    }

    loop {
        tokio::select! {
            event = controller.next_event() => match event {
                Some(Event::FocusEnded { minutes }) => {
                    println!("{} Focus session complete ({} minutes)", color(GREEN, "[ok]"), minutes);
                    return Ok(());
                }
                Some(Event::Failed { op, error }) => {
                    return Err(anyhow!(error)).with_context(|| format!("Failed to {}", op));
                }
                Some(other) => debug!(event = ?other, "ignoring event during focus"),
                None => bail!("blocking controller stopped"),
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                println!();
                // The countdown may have ended just before Ctrl-C
                match controller.finish_pending().await {
                    Some(Event::FocusEnded { minutes }) => {
                        println!("{} Focus session complete ({} minutes)", color(GREEN, "[ok]"), minutes);
                        return Ok(());
                    }
                    Some(Event::Failed { op, error }) => {
                        return Err(anyhow!(error)).with_context(|| format!("Failed to {}", op));
                    }
                    _ => {}
                }
                controller.disable()?;
                match settle(controller).await {
                    Ok(_) => {
                        println!("{} Focus session ended early, blocking disabled", color(GREEN, "[ok]"));
                        return Ok(());
                    }
                    // Session is re-armed; keep waiting
                    Err(e) => println!("{} {:#}", color(RED, "[error]"), e),
                }
            }
        }
    }
}

/// Report the startup reconciliation
fn cmd_sync(startup: Option<Reconciliation>) -> Result<()> {
    let r = startup.context("Could not read the hosts file")?;
    if !r.drifted {
        let state = if r.active { "active" } else { "inactive" };
        println!("{} In sync, blocking {}", color(GREEN, "[ok]"), state);
    }
    Ok(())
}

/// Show focus statistics
fn cmd_stats(controller: &BlockingController) -> Result<()> {
    let stats = controller.stats();
    let (hours, mins) = stats.total_time();
    let (week_hours, week_mins) = stats.week_time();

    println!("{}Focus Statistics{}", BOLD, NC);
    println!();
    println!("  {}  {}", color(CYAN, "Total Sessions:"), stats.total_sessions);
    println!("  {}      {}h {}m", color(CYAN, "Total Time:"), hours, mins);
    println!(
        "  {}       {}h {}m ({} sessions)",
        color(CYAN, "This Week:"),
        week_hours,
        week_mins,
        stats.week_sessions
    );
    Ok(())
}

/// Write the list as JSON to a file or stdout
fn cmd_export(controller: &BlockingController, file: Option<PathBuf>) -> Result<()> {
    let json = controller.export_json()?;
    match file {
        Some(path) => {
            fs::write(&path, format!("{}\n", json))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} Exported {} sites to {}",
                color(GREEN, "[ok]"),
                controller.site_count(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Add sites from a JSON array file
fn cmd_import(controller: &mut BlockingController, file: &Path) -> Result<()> {
    let json = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let report = controller
        .import_json(&json)
        .with_context(|| format!("Failed to import {}", file.display()))?;
    println!(
        "{} Imported {} sites ({} skipped)",
        color(GREEN, "[ok]"),
        report.added,
        report.skipped
    );
    Ok(())
}

/// Set or cycle the theme
fn cmd_theme(controller: &mut BlockingController, mode: Option<&str>) -> Result<()> {
    let theme = match mode {
        None => controller.cycle_theme(),
        Some(name) => {
            let theme = ThemeMode::from_str(name)
                .with_context(|| format!("Unknown theme '{}'. Use auto, light or dark", name))?;
            controller.set_theme(theme);
            theme
        }
    };
    println!("{} Theme: {}", color(GREEN, "[ok]"), theme);
    Ok(())
}

/// Set the interface language
fn cmd_language(controller: &mut BlockingController, name: &str) -> Result<()> {
    controller.set_language(name)?;
    println!("{} Language: {}", color(GREEN, "[ok]"), controller.language());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_status() {
        let cli = Cli::try_parse_from(["siper"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_focus_accepts_negative_minutes() {
        let cli = Cli::try_parse_from(["siper", "focus", "-5"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Focus { minutes: -5 })));
    }

    #[test]
    fn test_add_requires_a_site() {
        assert!(Cli::try_parse_from(["siper", "add"]).is_err());
    }

    #[test]
    fn test_color_keeps_text() {
        let result = color(RED, "test");
        assert!(result.contains("test"));
    }
}
