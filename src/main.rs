use box_office_explorer::display::{
    format_bar_chart, format_dollars, format_metadata, format_rankings, format_record_table, render_html_table,
};
use box_office_explorer::{
    BoxOffice, BoxOfficeError, Config, GENRES, GenreSelection, LookupOutcome, ProgressEvent,
    Quarter, TOP_RANKING_LIMIT,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Explore quarterly box-office rankings and the movies behind them
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Response cache file (defaults to the user cache directory)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// SQLite database file (defaults to the user data directory)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Access key for the OMDb metadata service
    #[arg(long, env = "OMDB_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Pause before every uncached request, in milliseconds
    #[arg(long, default_value_t = 1000, global = true)]
    delay_ms: u64,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scrape all quarters and look up metadata for every ranked title
    Ingest {
        /// Rebuild even if the database already holds rankings
        #[arg(long)]
        refresh: bool,
    },

    /// Show the highest grossing titles
    Top {
        #[arg(long, default_value_t = TOP_RANKING_LIMIT)]
        limit: usize,

        /// Draw a bar chart instead of a list
        #[arg(long)]
        chart: bool,
    },

    /// List every ranking row
    Rankings,

    /// List every movie with metadata
    Movies,

    /// Show details for one movie, looking it up online if necessary
    Info {
        /// Movie title
        title: String,
    },

    /// Print the detail-page link of a year's ranking
    Link {
        year: i32,

        #[arg(long, default_value = "q1")]
        quarter: Quarter,
    },

    /// List movies matching any of the given genres (all movies if none given)
    Filter {
        /// Genre to include; may be repeated
        #[arg(short, long = "genre", value_parser = clap::builder::PossibleValuesParser::new(GENRES.iter().copied()))]
        genres: Vec<String>,

        /// Render an HTML table
        #[arg(long)]
        html: bool,
    },
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::FetchingQuarter { quarter, url } => {
            println!("{}", "-".repeat(50));
            println!("{} Historical Box Office ({})", quarter.label().to_uppercase(), url);
            println!("{}", "-".repeat(50));
        }
        ProgressEvent::QuarterParsed { quarter, records } => {
            for record in records {
                println!(
                    "The #1 release of {} {} is {}",
                    record.year, quarter, record.title
                );
            }
        }
        ProgressEvent::RankingsSaved { count } => {
            println!("\nSaved {} ranking row(s).\n", count);
        }
        ProgressEvent::LookingUp {
            index,
            total,
            title,
        } => {
            println!("[{}/{}] Looking up: {}", index + 1, total, title);
        }
        ProgressEvent::MetadataNotFound { title } => {
            println!("  Sorry, no valid data for {}", title);
        }
        ProgressEvent::MetadataSaved { count } => {
            println!("\nSaved metadata for {} movie(s).", count);
        }
    }
}

fn build_config(cli: &Cli) -> Result<Config, BoxOfficeError> {
    let mut config = Config::from_project_dirs()?;

    if let Some(cache) = &cli.cache {
        config.cache_path = cache.clone();
    }
    if let Some(database) = &cli.database {
        config.database_path = database.clone();
    }
    config.api_key = cli.api_key.clone().filter(|key| !key.is_empty());
    config.request_delay = Duration::from_millis(cli.delay_ms);

    Ok(config)
}

fn run(cli: Cli) -> Result<(), BoxOfficeError> {
    let config = build_config(&cli)?;
    let mut office = BoxOffice::open(&config)?;

    match cli.command {
        Command::Ingest { refresh } => {
            if office.is_populated()? && !refresh {
                println!(
                    "Database {} already populated; use --refresh to rebuild.",
                    config.database_path.display()
                );
                return Ok(());
            }
            if config.api_key.is_none() {
                return Err(BoxOfficeError::MissingApiKey);
            }
            office.build(handle_progress_event)?;
        }
        Command::Top { limit, chart } => {
            let rows = office.top_rankings(limit)?;
            if chart {
                print!("{}", format_bar_chart(&rows, 60));
            } else {
                for (index, row) in rows.iter().enumerate() {
                    println!(
                        "{:>2}. {} ({}) {}",
                        index + 1,
                        row.title,
                        row.year,
                        format_dollars(row.cumulative_gross)
                    );
                }
            }
        }
        Command::Rankings => {
            print!("{}", format_rankings(&office.all_rankings()?));
        }
        Command::Movies => {
            let records = office.all_metadata()?;
            print!("{}", format_metadata(&records.iter().collect::<Vec<_>>()));
        }
        Command::Info { title } => match office.movie_info(&title)? {
            LookupOutcome::Found(record) => {
                println!("{}", format_record_table(&record.display_pairs()));
            }
            LookupOutcome::NotFound { title } => {
                println!("Sorry, no valid data for {}", title);
            }
        },
        Command::Link { year, quarter } => match office.ranking_link(year, quarter)? {
            Some(link) => println!("{}", link),
            None => println!("No ranking stored for {} {}", year, quarter),
        },
        Command::Filter { genres, html } => {
            let selection: GenreSelection = genres.into_iter().collect();
            let records = office.metadata_by_genres(&selection)?;
            let refs: Vec<_> = records.iter().collect();
            if html {
                print!("{}", render_html_table(&refs));
            } else {
                print!("{}", format_metadata(&refs));
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
