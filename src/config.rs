//! Processing pipeline configuration

use crate::{
    reference::Query, store::Thresholds, AnalyzeArgs, Args, ExtractArgs, Stage,
};
use std::{num::NonZeroU32, path::Path, path::PathBuf, time::Duration};

/// Default candidate bigrams for the positive chart
pub const POSITIVE_PHRASES: [&str; 10] = [
    "the best",
    "the food",
    "the bar",
    "i love",
    "my favorite",
    "the service",
    "the menu",
    "happy hour",
    "the staff",
    "great place",
];

/// Default candidate bigrams for the negative chart
pub const NEGATIVE_PHRASES: [&str; 10] = [
    "the food",
    "the bar",
    "the service",
    "no one",
    "the manager",
    "the waitress",
    "the bartender",
    "my husband",
    "it took",
    "the drinks",
];

/// Final process configuration
///
/// This is the result of combining digested [`Args`] with the file layout of
/// the working directory. A stage is configured if and only if it should run.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Extraction stage configuration
    pub extract: Option<ExtractConfig>,

    /// Analysis stage configuration
    pub analyze: Option<AnalyzeConfig>,
}
//
impl Config {
    /// Determine process configuration from CLI arguments
    pub(crate) fn new(args: Args) -> Self {
        let Args { work_dir, stage } = args;
        let paths = Paths::new(&work_dir);
        let (extract, analyze) = match stage {
            Stage::Extract(extract) => (Some(extract), None),
            Stage::Analyze(analyze) => (None, Some(analyze)),
            Stage::Run { extract, analyze } => (Some(extract), Some(analyze)),
        };
        Self {
            extract: extract.map(|args| ExtractConfig::new(args, &work_dir, paths.clone())),
            analyze: analyze.map(|args| AnalyzeConfig::new(args, &work_dir, paths.clone())),
        }
    }
}

/// Location of the files that the stages exchange or produce
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Paths {
    pub positive_reviews: PathBuf,
    pub negative_reviews: PathBuf,
    pub positive_stats: PathBuf,
    pub negative_stats: PathBuf,
    pub positive_chart: PathBuf,
    pub negative_chart: PathBuf,
}
//
impl Paths {
    /// Standard file layout within a working directory
    pub fn new(work_dir: &Path) -> Self {
        Self {
            positive_reviews: work_dir.join("pos_reviews.txt"),
            negative_reviews: work_dir.join("neg_reviews.txt"),
            positive_stats: work_dir.join("pos_bgs_cts_probs.txt"),
            negative_stats: work_dir.join("neg_bgs_cts_probs.txt"),
            positive_chart: work_dir.join("pos_probs_chart.svg"),
            negative_chart: work_dir.join("neg_probs_chart.svg"),
        }
    }
}

/// Extraction stage configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractConfig {
    /// Business dataset (JSON lines)
    pub business: PathBuf,

    /// Review dataset (JSON lines)
    pub reviews: PathBuf,

    /// Business category of interest
    pub category: Box<str>,

    /// SQLite database used for joining
    pub database: PathBuf,

    /// Rating thresholds of the review classes
    pub thresholds: Thresholds,

    /// Intermediate and output files
    pub paths: Paths,
}
//
impl ExtractConfig {
    fn new(args: ExtractArgs, work_dir: &Path, paths: Paths) -> Self {
        let ExtractArgs {
            business,
            reviews,
            category,
            database,
            positive_stars,
            negative_stars,
        } = args;
        Self {
            business,
            reviews,
            category: category.trim().into(),
            database: database.unwrap_or_else(|| work_dir.join("reviews.db")),
            thresholds: Thresholds {
                positive: positive_stars,
                negative: negative_stars,
            },
            paths,
        }
    }
}

/// Analysis stage configuration
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzeConfig {
    /// Reference corpus query for the positive class
    pub positive_query: Query,

    /// Reference corpus query for the negative class
    pub negative_query: Query,

    /// Reference corpus access settings
    pub reference: ReferenceConfig,

    /// Intermediate and output files
    pub paths: Paths,
}
//
impl AnalyzeConfig {
    fn new(args: AnalyzeArgs, work_dir: &Path, paths: Paths) -> Self {
        let AnalyzeArgs {
            start_year,
            end_year,
            corpus,
            smoothing,
            case_sensitive,
            offline,
            ngram_url,
            timeout,
            positive_phrases,
            negative_phrases,
        } = args;
        let make_query = |phrases: Vec<Box<str>>| Query {
            phrases: phrases.iter().map(|p| normalize_phrase(p)).collect(),
            start_year,
            end_year,
            corpus: corpus.clone(),
            smoothing,
            case_insensitive: !case_sensitive,
        };
        Self {
            positive_query: make_query(positive_phrases),
            negative_query: make_query(negative_phrases),
            reference: ReferenceConfig {
                url: ngram_url,
                timeout: timeout_duration(timeout),
                offline,
                artifact_dir: work_dir.to_owned(),
            },
            paths,
        }
    }
}

/// Reference corpus access settings
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ReferenceConfig {
    /// Ngram Viewer JSON endpoint
    pub url: Box<str>,

    /// Maximal duration of a query
    pub timeout: Duration,

    /// Truth that only previously saved artifacts may be used
    pub offline: bool,

    /// Directory where query results are saved and looked up
    pub artifact_dir: PathBuf,
}

/// Bring a user-specified phrase to the form that bigram extraction produces
fn normalize_phrase(phrase: &str) -> Box<str> {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
        .into()
}

fn timeout_duration(seconds: NonZeroU32) -> Duration {
    Duration::from_secs(seconds.get().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrases_are_normalized() {
        assert_eq!(&*normalize_phrase("  The   Best "), "the best");
        assert_eq!(&*normalize_phrase("happy hour"), "happy hour");
    }

    #[test]
    fn work_dir_layout() {
        let paths = Paths::new(Path::new("out"));
        assert_eq!(paths.positive_reviews, Path::new("out/pos_reviews.txt"));
        assert_eq!(paths.negative_stats, Path::new("out/neg_bgs_cts_probs.txt"));
        assert_eq!(paths.positive_chart, Path::new("out/pos_probs_chart.svg"));
    }

    #[test]
    fn run_configures_both_stages() {
        use clap::Parser;
        let args = Args::parse_from([
            "review-salience",
            "--work-dir",
            "out",
            "run",
            "--category",
            " Pubs ",
            "--positive-phrases",
            "Great Beer,the tap",
        ]);
        let config = Config::new(args);
        let extract = config.extract.expect("extraction should be configured");
        assert_eq!(&*extract.category, "Pubs");
        assert_eq!(extract.database, Path::new("out/reviews.db"));
        assert_eq!(extract.thresholds.positive, 5.0);
        let analyze = config.analyze.expect("analysis should be configured");
        assert_eq!(
            analyze.positive_query.phrases,
            vec![Box::from("great beer"), Box::from("the tap")]
        );
        assert_eq!(analyze.negative_query.phrases.len(), NEGATIVE_PHRASES.len());
        assert!(analyze.positive_query.case_insensitive);
        assert_eq!(analyze.reference.timeout, Duration::from_secs(30));
    }
}
