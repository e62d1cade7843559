//! This program measures which bigrams are over-represented in positive and
//! negative reviews of one business category, compared to general language
//! usage as recorded by the Google Books Ngram dataset
//! (<https://books.google.com/ngrams>).
//!
//! It works in two stages which communicate through files in a working
//! directory: `extract` joins the business and review datasets and splits the
//! reviews of the chosen category by rating, and `analyze` counts bigrams in
//! each class, fetches reference frequencies and renders the charts.

mod bigram;
mod chart;
mod config;
mod error;
mod pipeline;
mod progress;
mod reference;
mod salience;
mod sink;
mod source;
mod store;

use crate::{config::Config, progress::ProgressReport, store::Thresholds};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::{num::NonZeroU32, path::PathBuf};

/// Bigram salience analysis of business reviews
#[derive(Parser, Debug)]
#[command(version, author)]
struct Args {
    /// Directory where intermediate files and charts are read and written
    #[arg(short, long, default_value = ".", global = true)]
    work_dir: PathBuf,

    /// Pipeline stage to be run
    #[command(subcommand)]
    stage: Stage,
}

/// Pipeline stages that can be run from the command line
#[derive(Subcommand, Debug)]
enum Stage {
    /// Join the datasets and split the category's reviews into classes
    Extract(ExtractArgs),

    /// Count bigrams in each class and compare them to the reference corpus
    Analyze(AnalyzeArgs),

    /// Run the extraction stage, then the analysis stage
    Run {
        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        analyze: AnalyzeArgs,
    },
}

/// Settings of the extraction stage
#[derive(clap::Args, Debug)]
struct ExtractArgs {
    /// Business dataset, one JSON object per line
    #[arg(long, default_value = "yelp_academic_dataset_business.json")]
    business: PathBuf,

    /// Review dataset, one JSON object per line
    #[arg(long, default_value = "yelp_academic_dataset_review.json")]
    reviews: PathBuf,

    /// Business category whose reviews should be analyzed
    ///
    /// Must exactly match one of the entries of a business' category list.
    #[arg(short, long, default_value = "Bars")]
    category: Box<str>,

    /// SQLite database used to join the datasets
    ///
    /// Defaults to "reviews.db" inside of the working directory. Its tables
    /// are recreated on every run.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Star rating that a review must have to be considered positive
    #[arg(long, default_value_t = Thresholds::default().positive)]
    positive_stars: f64,

    /// Star rating that a review must not exceed to be considered negative
    #[arg(long, default_value_t = Thresholds::default().negative)]
    negative_stars: f64,
}

/// Settings of the analysis stage
#[derive(clap::Args, Debug)]
struct AnalyzeArgs {
    /// First year of the reference corpus query
    ///
    /// The reference probability of each phrase is the one measured on this
    /// year, after smoothing.
    #[arg(long, default_value_t = 2007)]
    start_year: Year,

    /// Last year of the reference corpus query
    #[arg(long, default_value_t = 2008)]
    end_year: Year,

    /// Ngram Viewer corpus identifier
    #[arg(long, default_value = "en-US-2012")]
    corpus: Box<str>,

    /// Ngram Viewer smoothing window, in years
    #[arg(long, default_value_t = 3)]
    smoothing: u32,

    /// Make reference corpus queries case-sensitive
    #[arg(long, default_value_t = false)]
    case_sensitive: bool,

    /// Never query the network, only use reference data already saved in
    /// the working directory
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Ngram Viewer JSON endpoint
    #[arg(long, default_value = "https://books.google.com/ngrams/json")]
    ngram_url: Box<str>,

    /// Reference corpus query timeout, in seconds
    #[arg(long, default_value = "30")]
    timeout: NonZeroU32,

    /// Candidate bigrams for the positive chart (comma-separated)
    #[arg(long, value_delimiter = ',', default_values = config::POSITIVE_PHRASES)]
    positive_phrases: Vec<Box<str>>,

    /// Candidate bigrams for the negative chart (comma-separated)
    #[arg(long, value_delimiter = ',', default_values = config::NEGATIVE_PHRASES)]
    negative_phrases: Vec<Box<str>>,
}
//
impl Args {
    /// Decode and validate CLI arguments
    pub fn parse_and_check() -> Result<Self> {
        let args = Args::parse();
        match &args.stage {
            Stage::Extract(extract) => extract.check()?,
            Stage::Analyze(analyze) => analyze.check()?,
            Stage::Run { extract, analyze } => {
                extract.check()?;
                analyze.check()?;
            }
        }
        Ok(args)
    }
}
//
impl ExtractArgs {
    /// Check extraction settings for basic sanity
    fn check(&self) -> Result<()> {
        anyhow::ensure!(
            self.negative_stars < self.positive_stars,
            "negative rating threshold ({}) must be below the positive one ({})",
            self.negative_stars,
            self.positive_stars
        );
        anyhow::ensure!(
            !self.category.trim().is_empty(),
            "target business category should not be empty"
        );
        Ok(())
    }
}
//
impl AnalyzeArgs {
    /// Check analysis settings for basic sanity
    fn check(&self) -> Result<()> {
        anyhow::ensure!(
            self.start_year <= self.end_year,
            "reference corpus query starts ({}) after it ends ({})",
            self.start_year,
            self.end_year
        );
        for (class, phrases) in [
            ("positive", &self.positive_phrases),
            ("negative", &self.negative_phrases),
        ] {
            anyhow::ensure!(!phrases.is_empty(), "no {class} candidate phrase");
            for phrase in phrases {
                anyhow::ensure!(
                    bigram::is_bigram(phrase),
                    "{class} candidate {phrase:?} is not a bigram of two words"
                );
            }
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Set up logging
    setup_logging();

    // Decode CLI arguments
    let args = Args::parse_and_check()?;
    let config = Config::new(args);

    // Set up progress reporting
    let report = ProgressReport::new();

    // Run the requested stages
    if let Some(extract) = &config.extract {
        pipeline::extract(extract, &report)?;
    }
    if let Some(analyze) = &config.analyze {
        pipeline::analyze(analyze, &report).await?;
    }
    Ok(())
}

/// Use anyhow for Result type erasure
pub use anyhow::Result;

/// Year of Gregorian Calendar
pub type Year = i16;

/// Set up logging
///
/// Syslog is not reachable in every environment where this batch job may run
/// (containers, CI), so failing to reach it only disables logging.
fn setup_logging() {
    let level = if cfg!(feature = "log-trace") {
        LevelFilter::Trace
    } else if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = syslog::init(syslog::Facility::LOG_USER, level, None) {
        eprintln!("Logging disabled, could not connect to syslog: {e}");
    }
}
