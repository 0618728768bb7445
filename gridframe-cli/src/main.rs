use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// DTED gridding and MSG frame decoding tool
#[derive(Parser)]
#[command(name = "gridframe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding DTED cells
    #[arg(short, long, env = "GRIDFRAME_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Maximum decoded strips in cache
    #[arg(
        short,
        long,
        env = "GRIDFRAME_CACHE_SIZE",
        default_value = "32",
        global = true
    )]
    cache_size: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grid points from a CSV file into DTED cells
    Grid {
        /// Input CSV file
        input: PathBuf,

        /// DTED level (0, 1 or 2)
        #[arg(short, long, default_value = "0")]
        level: u8,

        /// Column name for longitude
        #[arg(long, default_value = "lon")]
        lon_col: String,

        /// Column name for latitude
        #[arg(long, default_value = "lat")]
        lat_col: String,

        /// Column name for elevation
        #[arg(long, default_value = "elevation")]
        elev_col: String,

        /// Fill voids from known posts within this many posts
        #[arg(long)]
        fill: Option<usize>,

        /// Delete cells that only received points along their borders
        #[arg(long)]
        trim: bool,

        /// Header metadata as CODE=VALUE (e.g. DTED_Producer=USGS)
        #[arg(long = "meta")]
        metadata: Vec<String>,
    },

    /// Query elevation for a single coordinate
    Query {
        /// Latitude in decimal degrees
        #[arg(long)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long)]
        lon: f64,

        /// DTED level of the cell to read
        #[arg(short, long, default_value = "0")]
        level: u8,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Display information about a DTED cell
    Info {
        /// Path to a DTED cell, or a cell name (e.g. e010n045.dt0)
        tile: String,
    },

    /// List DTED cells in the data directory
    List,

    /// Decode one channel of an MSG frame
    Decode {
        /// Frame command, e.g. "MSG(/data/msg,200501181200,9,N,T)"
        command: String,

        /// Channel to decode (defaults to the first channel of the command)
        #[arg(long)]
        channel: Option<String>,

        /// Repeat cycle to decode
        #[arg(long, default_value = "0")]
        cycle: usize,

        /// Raster output file (little-endian f64, row-major)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output the summary as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridframe=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Grid {
            input,
            level,
            lon_col,
            lat_col,
            elev_col,
            fill,
            trim,
            metadata,
        } => commands::grid::run(
            cli.data_dir,
            input,
            level,
            commands::grid::Columns {
                lon: lon_col,
                lat: lat_col,
                elevation: elev_col,
            },
            fill,
            trim,
            metadata,
        ),
        Commands::Query {
            lat,
            lon,
            level,
            json,
        } => commands::query::run(cli.data_dir, lat, lon, level, json),
        Commands::Info { tile } => commands::info::run(cli.data_dir, tile),
        Commands::List => commands::list::run(cli.data_dir),
        Commands::Decode {
            command,
            channel,
            cycle,
            output,
            json,
        } => commands::decode::run(cli.cache_size, command, channel, cycle, output, json),
    }
}
