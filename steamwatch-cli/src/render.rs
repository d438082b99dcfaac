//! Text rendering for `ls`, `report`, `recent` and fetch summaries.
//!
//! Two layouts per view: a rounded `tabled` table (`tab`) and an indented
//! tree (`tree`). Every function returns the text; commands print it.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use steamwatch_core::{format_amount, AppRecord, FieldValue, HistoryEntry, PackageRecord, Subject};
use steamwatch_sync::{AppReport, EntityOutcome, EntityReport, RecentChange, RunReport, WatchedApp};

const BRANCH: &str = "├╴";
const LAST: &str = "└╴";
const PIPE: &str = "│ ";
const BLANK: &str = "  ";

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Plain text for a field value; amounts in major units without currency.
pub fn value_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Amount(minor) => format_amount(*minor, None),
        other => other.to_string(),
    }
}

fn change_text(entry: &HistoryEntry) -> String {
    let current = value_text(&entry.current);
    let text = match &entry.previous {
        Some(previous) => format!("{} → {current}", value_text(previous)),
        None => format!("→ {current}"),
    };
    match (&entry.previous, &entry.current) {
        (Some(FieldValue::Amount(old)), FieldValue::Amount(new)) if new < old => text.green().to_string(),
        (Some(FieldValue::Amount(old)), FieldValue::Amount(new)) if new > old => text.red().to_string(),
        _ => text,
    }
}

fn when(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    }
}

fn price(package: &PackageRecord) -> String {
    match package.price {
        Some(minor) => format_amount(minor, package.currency.as_deref()),
        None => "-".to_string(),
    }
}

fn app_heading(app: &AppRecord) -> String {
    let heading = format!("{} ({})", app.display_name().bold(), app.id);
    if app.enabled {
        heading
    } else {
        format!("{heading} {}", "[disabled]".bright_black())
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize JSON output")?
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// ls
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct AppRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "type")]
    kind: String,
    #[tabled(rename = "packages")]
    packages: usize,
    #[tabled(rename = "lowest price")]
    lowest: String,
    #[tabled(rename = "threshold")]
    threshold: String,
    #[tabled(rename = "release")]
    release: String,
    #[tabled(rename = "linux")]
    linux: &'static str,
    #[tabled(rename = "enabled")]
    enabled: &'static str,
}

pub fn apps_table(apps: &[WatchedApp]) -> String {
    if apps.is_empty() {
        return "No apps watched.".to_string();
    }
    let rows: Vec<AppRow> = apps
        .iter()
        .map(|watched| {
            let app = &watched.app;
            let lowest = watched
                .packages
                .iter()
                .filter(|p| p.price.is_some())
                .min_by_key(|p| p.price)
                .map(price)
                .unwrap_or_else(|| "-".to_string());
            AppRow {
                id: app.id.to_string(),
                name: app.display_name(),
                kind: app.kind.clone(),
                packages: watched.packages.len(),
                lowest,
                threshold: app
                    .threshold
                    .map(|t| format_amount(t, None))
                    .unwrap_or_else(|| "-".to_string()),
                release: match (app.coming_soon, &app.release_date) {
                    (Some(true), Some(date)) => format!("{date} (soon)"),
                    (_, Some(date)) => date.clone(),
                    (_, None) => "-".to_string(),
                },
                linux: flag(app.supports_linux),
                enabled: if app.enabled { "yes" } else { "no" },
            }
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

pub fn apps_tree(apps: &[WatchedApp]) -> String {
    if apps.is_empty() {
        return "No apps watched.".to_string();
    }
    let mut out = Vec::new();
    for watched in apps {
        out.push(app_heading(&watched.app));
        let count = watched.packages.len();
        for (i, package) in watched.packages.iter().enumerate() {
            let branch = if i + 1 == count { LAST } else { BRANCH };
            let mut line = format!("{branch}{}  {}  {}", package.id, package.display_name(), price(package));
            if package.supports_linux == Some(true) {
                line.push_str("  linux");
            }
            if package.coming_soon == Some(true) {
                line.push_str("  coming soon");
            }
            out.push(line);
        }
    }
    out.join("\n")
}

// ---------------------------------------------------------------------------
// report
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "when")]
    when: String,
    #[tabled(rename = "app")]
    app: String,
    #[tabled(rename = "package")]
    package: String,
    #[tabled(rename = "field")]
    field: String,
    #[tabled(rename = "change")]
    change: String,
}

pub fn reports_table(reports: &[AppReport]) -> String {
    let mut rows = Vec::new();
    for report in reports {
        let app = report.app.display_name();
        for entry in &report.history {
            rows.push(history_row(entry, app.clone(), "-".to_string()));
        }
        for package in &report.packages {
            for entry in &package.history {
                rows.push(history_row(entry, app.clone(), package.package.display_name()));
            }
        }
    }
    if rows.is_empty() {
        return "No changes recorded.".to_string();
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

fn history_row(entry: &HistoryEntry, app: String, package: String) -> HistoryRow {
    HistoryRow {
        when: when(entry.recorded_at),
        app,
        package,
        field: entry.field.to_string(),
        change: change_text(entry),
    }
}

pub fn reports_tree(reports: &[AppReport]) -> String {
    if reports.is_empty() {
        return "No apps watched.".to_string();
    }
    let mut out = Vec::new();
    for report in reports {
        out.push(app_heading(&report.app));
        let rest = if report.packages.is_empty() { BLANK } else { PIPE };
        for entry in &report.history {
            out.push(format!("{rest}{}", entry_line(entry)));
        }
        let count = report.packages.len();
        for (i, package) in report.packages.iter().enumerate() {
            let (branch, indent) = if i + 1 == count { (LAST, BLANK) } else { (BRANCH, PIPE) };
            out.push(format!(
                "{branch}{} ({})  {}",
                package.package.display_name(),
                package.package.id,
                price(&package.package)
            ));
            for entry in &package.history {
                out.push(format!("{indent}{}", entry_line(entry)));
            }
        }
    }
    out.join("\n")
}

fn entry_line(entry: &HistoryEntry) -> String {
    format!(
        "  {}  {:<14} {}",
        when(entry.recorded_at).bright_black(),
        entry.field.as_str(),
        change_text(entry)
    )
}

// ---------------------------------------------------------------------------
// recent
// ---------------------------------------------------------------------------

fn recent_names(change: &RecentChange) -> (String, String) {
    let app = change
        .app_name
        .clone()
        .unwrap_or_else(|| format!("app {}", change.entry.app_id));
    let package = match change.entry.subject {
        Subject::App(_) => "-".to_string(),
        Subject::Package(id) => change
            .package_name
            .clone()
            .unwrap_or_else(|| format!("package {id}")),
    };
    (app, package)
}

pub fn recent_table(changes: &[RecentChange]) -> String {
    if changes.is_empty() {
        return "No changes recorded.".to_string();
    }
    let rows: Vec<HistoryRow> = changes
        .iter()
        .map(|change| {
            let (app, package) = recent_names(change);
            history_row(&change.entry, app, package)
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

/// One line per change, newest first, prefixed with where it happened.
pub fn recent_tree(changes: &[RecentChange]) -> String {
    if changes.is_empty() {
        return "No changes recorded.".to_string();
    }
    let count = changes.len();
    changes
        .iter()
        .enumerate()
        .map(|(i, change)| {
            let (app, package) = recent_names(change);
            let branch = if i + 1 == count { LAST } else { BRANCH };
            let place = match change.entry.subject {
                Subject::App(_) => app.bold().to_string(),
                Subject::Package(_) => format!("{} / {package}", app.bold()),
            };
            format!("{branch}{place}{}", entry_line(&change.entry))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// fetch summaries
// ---------------------------------------------------------------------------

pub fn entity_line(report: &EntityReport) -> String {
    let name = report
        .name
        .clone()
        .unwrap_or_else(|| format!("app {}", report.app_id));
    match &report.outcome {
        EntityOutcome::Done => format!(
            "{} {name} ({}): {} change(s), {} event(s)",
            "✓".green().bold(),
            report.app_id,
            report.recorded,
            report.published
        ),
        EntityOutcome::Skipped { reason } => {
            format!("{} {name} ({}): skipped, {reason}", "-".bright_black(), report.app_id)
        }
        EntityOutcome::Failed { stage, error } => format!(
            "{} {name} ({}): failed while {stage}: {error}",
            "✗".red().bold(),
            report.app_id
        ),
    }
}

pub fn run_summary(report: &RunReport) -> String {
    let mut lines: Vec<String> = report.entities.iter().map(entity_line).collect();
    let failed = report.failed().count();
    lines.push(format!(
        "{} app(s) fetched, {} failed, {} event(s) published",
        report.entities.len(),
        failed,
        report.published()
    ));
    lines.join("\n")
}
