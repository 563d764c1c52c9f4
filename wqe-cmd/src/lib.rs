//! Command implementations for the water-quality explorer CLI.
//!
//! Every subcommand loads the sample table once, runs one query through a
//! fresh [`wqe_data::Session`] and prints the result as JSON.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use wqe_data::{Granularity, PlaybackMode};
use wqe_store::{SampleStore, ShapeKind};

pub mod play;
pub mod query;
pub mod settings;

pub use settings::Settings;

/// Where the sample table and settings come from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Path to the samples CSV
    #[arg(short = 'd', long)]
    pub data: PathBuf,

    /// Optional JSON settings file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

/// Sample filters shared by most subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Test type to keep (repeatable); none keeps every test type
    #[arg(short = 't', long = "test-type")]
    pub test_types: Vec<String>,

    /// Minimum location sample count
    #[arg(long, default_value_t = 0)]
    pub min_samples: u32,

    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// Drop samples flagged as anomalous for the metric
    #[arg(long)]
    pub exclude_anomalies: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum GranularityArg {
    #[default]
    Raw,
    Month,
    Year,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Raw => Granularity::Raw,
            GranularityArg::Month => Granularity::Month,
            GranularityArg::Year => Granularity::Year,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum ModeArg {
    #[default]
    Year,
    Month,
}

impl From<ModeArg> for PlaybackMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Year => PlaybackMode::Year,
            ModeArg::Month => PlaybackMode::Month,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum ShapeArg {
    #[default]
    Yearly,
    OverTime,
}

impl From<ShapeArg> for ShapeKind {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Yearly => ShapeKind::Yearly,
            ShapeArg::OverTime => ShapeKind::OverTime,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List locations passing the location-level filters
    Locations {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Aggregate the filtered samples of a metric into a time series
    Aggregate {
        #[arg(short = 'm', long)]
        metric: String,

        #[arg(short = 'g', long, value_enum, default_value_t = GranularityArg::Year)]
        granularity: GranularityArg,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Compare a metric across a focal location and others
    Compare {
        /// Focal location id
        #[arg(short = 'l', long)]
        location: String,

        /// Other location ids to overlay (repeatable)
        #[arg(short = 'o', long = "other")]
        others: Vec<String>,

        #[arg(short = 'm', long)]
        metric: String,

        #[arg(short = 'g', long, value_enum, default_value_t = GranularityArg::Raw)]
        granularity: GranularityArg,

        /// Drop flagged samples from points and trend
        #[arg(long)]
        exclude_anomalies: bool,

        /// Hide the raw point layer
        #[arg(long)]
        no_raw: bool,

        /// Hide the smoothed trend layer
        #[arg(long)]
        no_smoothed: bool,

        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// Rank the locations closest to a focal location
    Nearest {
        #[arg(short = 'l', long)]
        location: String,

        /// How many neighbours to list (defaults to the settings value)
        #[arg(short = 'k', long)]
        k: Option<usize>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Stable color domain of a metric over the whole table
    Domain {
        #[arg(short = 'm', long)]
        metric: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Map markers for one playback position
    Map {
        #[arg(short = 'm', long)]
        metric: String,

        #[arg(long, value_enum, default_value_t = ModeArg::Year)]
        mode: ModeArg,

        /// Cursor position on the year or month axis
        #[arg(short = 'i', long, default_value_t = 0)]
        index: usize,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Animate the map cursor, emitting one frame per tick
    Play {
        #[arg(short = 'm', long)]
        metric: String,

        #[arg(long, value_enum, default_value_t = ModeArg::Year)]
        mode: ModeArg,

        /// Number of frames to emit
        #[arg(short = 'n', long, default_value_t = 5)]
        frames: usize,

        /// Milliseconds between frames (defaults to the settings value)
        #[arg(long)]
        interval_ms: Option<u64>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Mean of a metric at one location for one playback position
    Snapshot {
        #[arg(short = 'l', long)]
        location: String,

        #[arg(short = 'm', long)]
        metric: String,

        #[arg(long, value_enum, default_value_t = ModeArg::Year)]
        mode: ModeArg,

        #[arg(short = 'i', long, default_value_t = 0)]
        index: usize,
    },

    /// Valid and flagged counts per metric at one location
    Summary {
        #[arg(short = 'l', long)]
        location: String,
    },

    /// Sample count, top metrics, last sample and sampling gaps at one location
    Detail {
        #[arg(short = 'l', long)]
        location: String,
    },

    /// Test types in the table, most frequent first
    TestTypes,

    /// Precomputed trend shape of a metric at one location
    Shape {
        #[arg(short = 'l', long)]
        location: String,

        #[arg(short = 'm', long)]
        metric: String,

        #[arg(long, value_enum, default_value_t = ShapeArg::Yearly)]
        kind: ShapeArg,
    },

    /// Shape clusters across locations sharing the focal test types
    Clusters {
        #[arg(short = 'l', long)]
        location: String,

        #[arg(short = 'm', long)]
        metric: String,

        #[arg(long, value_enum, default_value_t = ShapeArg::Yearly)]
        kind: ShapeArg,
    },

    /// Resolve a `?id=` deep link to its location
    Open {
        link: String,
    },
}

/// Load the table, install it process-wide and run `command`.
pub async fn run(source: SourceArgs, command: Command) -> anyhow::Result<()> {
    let settings = Settings::load(source.config.as_deref())?;
    let store = SampleStore::load_path(&source.data, &settings.metrics)?;
    let store = wqe_store::install(store)?;
    let output = execute(store, &settings, command).await?;
    println!("{}", output);
    Ok(())
}

/// Run one command against an already-loaded table and return its JSON output.
pub async fn execute(
    store: Arc<SampleStore>,
    settings: &Settings,
    command: Command,
) -> anyhow::Result<String> {
    match command {
        Command::Play {
            metric,
            mode,
            frames,
            interval_ms,
            filter,
        } => {
            let interval = interval_ms.unwrap_or(settings.tick_interval_ms);
            play::run_play(store, settings, &metric, mode.into(), frames, interval, &filter).await
        }
        other => query::run_query(store, settings, other),
    }
}
