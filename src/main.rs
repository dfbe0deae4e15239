use clap::{Parser, Subcommand};
use grubpeek::cli;
use grubpeek::error::GrubResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "grubpeek")]
#[command(about = "Canteen menu publishing: parse weekly menu spreadsheets, store them, serve them.")]
#[command(long_about = "GrubPeek - canteen menu publishing service

Staff upload weekly menu spreadsheets whose filenames carry a Chinese date
fragment (e.g. 菜单：2026年1月4日-9日.xlsx). GrubPeek anchors the week on
that date, maps weekday header columns to concrete dates, extracts every
dish, and stores them for calendar browsing.

COMMANDS:
  parse    - Dry-run extraction; print the records a file would produce
  import   - Extract and persist, transactionally replacing affected dates
  serve    - Run the HTTP JSON API (upload, import, calendar queries, auth)

EXAMPLES:
  grubpeek parse 菜单2026年1月4日-9日.xlsx -v
  grubpeek import 菜单2026年1月4日-9日.xlsx --db grubpeek.db --force
  grubpeek serve --port 8080 --menu-dir ./menu")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Parse a menu spreadsheet without touching the database.

The anchor date comes from the filename; pass --filename when the on-disk
name no longer carries the original date fragment (e.g. a renamed temp
file). Prints the record count, the affected dates, and a diagnostic count
of rows that matched no meal section.")]
    /// Dry-run extraction; nothing is persisted
    Parse {
        /// Path to the spreadsheet (.xlsx/.xls/.ods)
        file: PathBuf,

        /// Original filename to take the anchor date from (defaults to the
        /// file's own name)
        #[arg(long)]
        filename: Option<String>,

        /// Print every extracted record
        #[arg(short, long)]
        verbose: bool,
    },

    #[command(long_about = "Extract a menu spreadsheet and persist the records.

All rows for the affected calendar dates are replaced inside one
transaction. Without --force the command refuses to touch dates that
already hold data and lists them instead.")]
    /// Extract and persist, replacing affected dates
    Import {
        /// Path to the spreadsheet (.xlsx/.xls/.ods)
        file: PathBuf,

        /// SQLite database file
        #[arg(long, env = "GRUBPEEK_DB", default_value = "grubpeek.db")]
        db: PathBuf,

        /// Original filename to take the anchor date from
        #[arg(long)]
        filename: Option<String>,

        /// Overwrite dates that already have data
        #[arg(short, long)]
        force: bool,
    },

    /// Run the HTTP JSON API server
    Serve {
        /// Host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// SQLite database file
        #[arg(long, env = "GRUBPEEK_DB", default_value = "grubpeek.db")]
        db: PathBuf,

        /// Directory holding uploaded spreadsheet files
        #[arg(long, env = "GRUBPEEK_MENU_DIR", default_value = "menu")]
        menu_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> GrubResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            file,
            filename,
            verbose,
        } => cli::parse(file, filename, verbose),

        Commands::Import {
            file,
            db,
            filename,
            force,
        } => cli::import(file, db, filename, force).await,

        Commands::Serve {
            host,
            port,
            db,
            menu_dir,
        } => cli::serve(host, port, db, menu_dir).await,
    }
}
