// Entry point and high-level CLI flow.
//
// - `ingest` parses a raw payload, aggregates it and appends one summary.
// - `dashboard` prints the current snapshot, nationality table and trend.
// - `export` writes the current snapshot to CSV/JSON.
// - With no subcommand, a small interactive menu offers ingest/dashboard and
//   lets the user go back to the menu or exit.
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use marriage_stats::output;
use marriage_stats::util::{format_int, format_number};
use marriage_stats::{AppConfig, DashboardView, Ingestor, JsonlSummaryStore, Result};

#[derive(Debug, Parser)]
#[command(
    name = "marriage-stats",
    about = "Aggregate marriage registration statistics into dashboard summaries"
)]
struct Cli {
    /// JSON config file (defaults apply when omitted).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Summary log path, overrides the config.
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Country mapping file, overrides the config.
    #[arg(long, global = true)]
    mapping: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest one raw payload file.
    Ingest {
        payload: PathBuf,
        /// Source identifier (defaults to the file name).
        #[arg(long)]
        source: Option<String>,
    },
    /// Show the current snapshot and trend.
    Dashboard {
        /// Number of summaries in the trend.
        #[arg(long)]
        points: Option<usize>,
    },
    /// Write the current snapshot to files.
    Export {
        /// CSV file for the per-region table.
        #[arg(long)]
        regions: PathBuf,
        /// JSON file for the latest full summary.
        #[arg(long)]
        summary: Option<PathBuf>,
    },
}

struct App {
    config: AppConfig,
    ingestor: Ingestor,
    store: JsonlSummaryStore,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = AppConfig::load(cli.config.as_deref())?;
        if let Some(store) = &cli.store {
            config.store_path = store.clone();
        }
        if let Some(mapping) = &cli.mapping {
            config.mapping_file = Some(mapping.clone());
        }
        config.validate()?;
        let ingestor = Ingestor::from_config(&config);
        let store = JsonlSummaryStore::new(&config.store_path);
        Ok(Self {
            config,
            ingestor,
            store,
        })
    }

    fn ingest(&mut self, path: &Path, source: Option<&str>) -> Result<()> {
        let entry = self
            .ingestor
            .ingest_file(&mut self.store, path, source, Utc::now())?;
        let s = &entry.summary;
        println!(
            "Ingested {} ({} regions, {} nationalities)",
            s.source,
            format_int(s.by_region.len() as u64),
            format_int(s.nationality_breakdown.len() as u64)
        );
        println!(
            "Total: {}  Same: {}  Different: {}\n",
            format_int(s.total),
            format_int(s.total_same_gender_pairing),
            format_int(s.total_different_gender_pairing)
        );
        Ok(())
    }

    fn dashboard(&self, points: Option<usize>) -> Result<()> {
        let points = points.unwrap_or(self.config.trend_points).max(1);
        let view = DashboardView::from_store(&self.store, points)?;
        if view.is_empty() {
            println!("No summaries stored yet. Ingest a payload first.\n");
            return Ok(());
        }

        let snapshot = view.build_snapshot();
        println!("Current snapshot");
        println!(
            "Total: {}  Same: {}  Different: {}  Change: {}%\n",
            format_int(snapshot.total),
            format_int(snapshot.total_same_gender_pairing),
            format_int(snapshot.total_different_gender_pairing),
            format_number(view.percent_change(), 2)
        );
        output::preview_table_rows(&output::region_rows(&snapshot), usize::MAX);

        let nationalities = view.build_nationality_snapshot();
        println!("Nationality breakdown");
        output::preview_table_rows(&output::nationality_rows(&nationalities), 15);

        println!("Trend (last {} ingestions)", view.len());
        output::preview_table_rows(&output::trend_rows(&view.build_trend(points)), points);
        Ok(())
    }

    fn export(&self, regions: &Path, summary: Option<&Path>) -> Result<()> {
        let view = DashboardView::from_store(&self.store, 1)?;
        output::write_csv(regions, &output::region_rows(&view.build_snapshot()))?;
        println!("(Region table exported to {})", regions.display());
        if let Some(path) = summary {
            match view.latest() {
                Some(latest) => {
                    output::write_json(path, &latest.summary)?;
                    println!("(Latest summary exported to {})", path.display());
                }
                None => println!("No summaries stored yet; {} not written.", path.display()),
            }
        }
        Ok(())
    }
}

/// Read a single line of input after printing `prompt`.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn interactive(app: &mut App) {
    loop {
        println!("Marriage statistics");
        println!("[1] Ingest payload");
        println!("[2] Show dashboard\n");
        match read_line("Enter choice: ").as_str() {
            "1" => {
                let path = read_line("Payload path: ");
                if path.is_empty() {
                    println!("No path given.\n");
                    continue;
                }
                if let Err(e) = app.ingest(Path::new(&path), None) {
                    eprintln!("Ingestion failed: {}\n", e);
                }
            }
            "2" => {
                println!();
                if let Err(e) = app.dashboard(None) {
                    eprintln!("Dashboard failed: {}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut app = App::new(&cli)?;
    match cli.command {
        Some(Command::Ingest { payload, source }) => app.ingest(&payload, source.as_deref()),
        Some(Command::Dashboard { points }) => app.dashboard(points),
        Some(Command::Export { regions, summary }) => app.export(&regions, summary.as_deref()),
        None => {
            interactive(&mut app);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
