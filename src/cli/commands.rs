use crate::api::server::{ApiConfig, AppState};
use crate::db::Db;
use crate::error::{GrubError, GrubResult};
use crate::import;
use crate::types::DishRecord;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// The original upload name carries the date fragments; when parsing a file
/// straight from disk it is normally just the file's own name.
fn effective_filename(file: &Path, explicit: Option<String>) -> GrubResult<String> {
    if let Some(name) = explicit {
        return Ok(name);
    }
    file.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| GrubError::AnchorDateMissing(file.display().to_string()))
}

fn print_records(records: &[DishRecord]) {
    let mut current_date = None;
    for rec in records {
        if current_date != Some(rec.date) {
            current_date = Some(rec.date);
            println!("\n   📅 {}", rec.date.to_string().bright_blue().bold());
        }
        let featured = if rec.featured { " ★" } else { "" };
        println!(
            "      {:<9} {:<12} {}{}  ¥{}",
            rec.meal.as_str().cyan(),
            rec.category,
            rec.name,
            featured.bright_yellow(),
            rec.price
        );
    }
    if !records.is_empty() {
        println!();
    }
}

/// Execute the parse command: dry-run extraction, nothing persisted.
pub fn parse(file: PathBuf, filename: Option<String>, verbose: bool) -> GrubResult<()> {
    println!("{}", "🍚 GrubPeek - Parsing menu spreadsheet".bold().green());
    println!("   File: {}", file.display());
    println!();

    let name = effective_filename(&file, filename)?;
    let extraction = import::parse_menu_file(&file, &name)?;

    if verbose {
        print_records(&extraction.records);
    }

    let dates = import::distinct_dates(&extraction.records);
    println!("{}", "✅ Extraction complete".bold().green());
    println!("   Records: {}", extraction.records.len().to_string().bold());
    println!("   Dates: {}", dates.len());
    if extraction.rows_skipped > 0 {
        println!(
            "{}",
            format!(
                "⚠️  {} row(s) matched no meal section - layout may have drifted",
                extraction.rows_skipped
            )
            .yellow()
        );
    }
    if extraction.records.is_empty() {
        println!(
            "{}",
            "⚠️  0 records extracted from a non-empty sheet usually means the layout is unsupported"
                .yellow()
        );
    }
    Ok(())
}

/// Execute the import command: parse, conflict-check, persist.
pub async fn import(
    file: PathBuf,
    db_path: PathBuf,
    filename: Option<String>,
    force: bool,
) -> GrubResult<()> {
    println!("{}", "🍚 GrubPeek - Importing menu spreadsheet".bold().green());
    println!("   File: {}", file.display());
    println!("   Database: {}", db_path.display());
    println!();

    let name = effective_filename(&file, filename)?;
    let extraction = import::parse_menu_file(&file, &name)?;

    let db = Db::connect(&db_path).await?;

    if !force {
        let conflicts = import::check_conflicts(&db, &extraction.records).await?;
        if !conflicts.is_empty() {
            println!("{}", "⚠️  These dates already have data:".yellow().bold());
            for date in &conflicts {
                println!("      {date}");
            }
            println!();
            return Err(GrubError::Validation(
                "refusing to overwrite existing dates (use --force)".to_string(),
            ));
        }
    }

    let report = import::import_records(&db, &extraction.records).await?;

    println!("{}", "✅ Import complete".bold().green());
    println!("   Records: {}", report.count.to_string().bold());
    println!(
        "   Dates replaced: {}",
        report
            .dates
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if extraction.rows_skipped > 0 {
        println!(
            "{}",
            format!("⚠️  {} row(s) matched no meal section", extraction.rows_skipped).yellow()
        );
    }
    Ok(())
}

/// Execute the serve command: run the HTTP API.
pub async fn serve(
    host: String,
    port: u16,
    db_path: PathBuf,
    menu_dir: PathBuf,
) -> GrubResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grubpeek=info,tower_http=info".into()),
        )
        .init();

    let db = Db::connect(&db_path).await?;
    let state = AppState {
        db,
        menu_dir,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let config = ApiConfig { host, port };

    crate::api::run_api_server(config, state)
        .await
        .map_err(|e| GrubError::Server(e.to_string()))
}
