//! General-language reference frequencies from the Google Books Ngram Viewer
//!
//! Query results are saved as a CSV file in the working directory, with one
//! header row (`year` followed by the queried phrases) and one row per queried
//! year. The file name is derived from the query, so that an existing file is
//! reused instead of querying the Ngram Viewer again. The reference
//! probability of a phrase is the one of the first queried year.

use crate::{config::ReferenceConfig, error::Failure, Result, Year};
use anyhow::Context;
use csv_async::{AsyncReaderBuilder, AsyncWriterBuilder, StringRecord};
use futures::{StreamExt, TryStreamExt};
use reqwest::Response;
use serde::Deserialize;
use std::path::Path;
use unicase::UniCase;

/// Reference corpus query
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Query {
    /// Phrases whose usage frequency is requested
    pub phrases: Vec<Box<str>>,

    /// First year of interest
    pub start_year: Year,

    /// Last year of interest
    pub end_year: Year,

    /// Ngram Viewer corpus identifier
    pub corpus: Box<str>,

    /// Smoothing window, in years
    pub smoothing: u32,

    /// Truth that all casings of a phrase should be aggregated
    pub case_insensitive: bool,
}
//
impl Query {
    /// Name of the file where the results of this query are saved
    pub fn artifact_name(&self) -> String {
        let phrases = self
            .phrases
            .iter()
            .map(|phrase| phrase.replace(' ', ""))
            .collect::<Vec<_>>()
            .join("_");
        format!(
            "{phrases}-{}-{}-{}-{}{}.csv",
            self.corpus,
            self.start_year,
            self.end_year,
            self.smoothing,
            if self.case_insensitive {
                "-caseInsensitive"
            } else {
                ""
            }
        )
    }

    /// Number of years covered by the query
    fn num_years(&self) -> usize {
        let span = i32::from(self.end_year) - i32::from(self.start_year);
        usize::try_from(span).map_or(0, |span| span + 1)
    }
}

/// Usage probability of each phrase of a query in the reference corpus
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceFrequencies {
    /// (phrase, probability) pairs in query order
    entries: Vec<(Box<str>, f64)>,

    /// Truth that phrases should be compared without regard to case
    case_insensitive: bool,
}
//
impl ReferenceFrequencies {
    /// Reference probability of a phrase, if it was part of the query
    pub fn get(&self, phrase: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(label, _)| {
                if self.case_insensitive {
                    UniCase::new(&**label) == UniCase::new(phrase)
                } else {
                    **label == *phrase
                }
            })
            .map(|&(_, probability)| probability)
    }

    /// (phrase, probability) pairs in query order
    pub fn entries(&self) -> &[(Box<str>, f64)] {
        &self.entries
    }

    /// Build from known (phrase, probability) pairs
    #[cfg(test)]
    pub fn from_entries(entries: Vec<(Box<str>, f64)>, case_insensitive: bool) -> Self {
        Self {
            entries,
            case_insensitive,
        }
    }
}

/// Client of the reference corpus
pub struct ReferenceCorpusClient {
    /// Access settings
    config: ReferenceConfig,

    /// HTTP client, with the query timeout applied
    http: reqwest::Client,
}
//
impl ReferenceCorpusClient {
    /// Set up the client
    pub fn new(config: ReferenceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("setting up the HTTP client")?;
        Ok(Self { config, http })
    }

    /// Reference probabilities of the phrases of a query
    ///
    /// Fails if the reference corpus cannot be reached or lacks one of the
    /// phrases: no default probability is ever substituted.
    pub async fn frequencies(&self, query: &Query) -> Result<ReferenceFrequencies> {
        self.fetch(query)
            .await
            .with_context(|| Failure::external(&query.phrases))
    }

    async fn fetch(&self, query: &Query) -> Result<ReferenceFrequencies> {
        let path = self.config.artifact_dir.join(query.artifact_name());
        if path.exists() {
            log::info!("Reusing reference frequencies from {}", path.display());
        } else {
            anyhow::ensure!(
                !self.config.offline,
                "no saved reference frequencies at {} and network access is disabled",
                path.display()
            );
            let table = self.download(query).await?;
            table.save(&path).await?;
            log::info!("Saved reference frequencies to {}", path.display());
        }
        let frequencies = load_frequencies(&path, query.case_insensitive).await?;
        for phrase in &query.phrases {
            anyhow::ensure!(
                frequencies.get(phrase).is_some(),
                "{} has no reference probability for {phrase:?}",
                path.display()
            );
        }
        Ok(frequencies)
    }

    /// Query the Ngram Viewer
    async fn download(&self, query: &Query) -> Result<YearTable> {
        let context = || format!("querying {}", self.config.url);
        log::info!("Querying the Ngram Viewer for {} phrases", query.phrases.len());
        let response = self
            .http
            .get(&*self.config.url)
            .query(&[
                ("content", query.phrases.join(",")),
                ("year_start", query.start_year.to_string()),
                ("year_end", query.end_year.to_string()),
                ("corpus", query.corpus.to_string()),
                ("smoothing", query.smoothing.to_string()),
                ("case_insensitive", query.case_insensitive.to_string()),
            ])
            .send()
            .await
            .and_then(Response::error_for_status)
            .with_context(context)?;
        let series = response
            .json::<Vec<Series>>()
            .await
            .with_context(context)?;
        YearTable::from_series(query, &series)
    }
}

/// Time series from an Ngram Viewer JSON response
#[derive(Clone, Debug, Deserialize, PartialEq)]
struct Series {
    /// Phrase, with a " (All)" suffix for case-insensitive aggregates
    ngram: Box<str>,

    /// Kind of series (NGRAM, CASE_INSENSITIVE, EXPANSION...)
    #[serde(rename = "type", default)]
    kind: Option<Box<str>>,

    /// One probability per queried year
    timeseries: Vec<f64>,
}
//
impl Series {
    /// Truth that this series is for a given phrase
    fn is_for(&self, phrase: &str, case_insensitive: bool) -> bool {
        let label = self.label();
        if case_insensitive {
            UniCase::new(label) == UniCase::new(phrase)
        } else {
            label == phrase
        }
    }

    /// Phrase this series was measured for
    fn label(&self) -> &str {
        self.ngram.strip_suffix(" (All)").unwrap_or(&*self.ngram).trim()
    }

    /// Truth that this series aggregates all casings of a phrase
    fn is_aggregate(&self) -> bool {
        self.kind.as_deref() == Some("CASE_INSENSITIVE")
    }
}

/// Query results, as saved on disk
#[derive(Clone, Debug, PartialEq)]
struct YearTable {
    /// Queried phrases
    phrases: Vec<Box<str>>,

    /// Probability of each phrase, for each year
    rows: Vec<(Year, Vec<f64>)>,
}
//
impl YearTable {
    /// Pick the series of each queried phrase from an Ngram Viewer response
    ///
    /// When several series match a phrase, the all-casings aggregate wins,
    /// then the series spelled exactly like the phrase, then the first one in
    /// response order.
    fn from_series(query: &Query, series: &[Series]) -> Result<Self> {
        anyhow::ensure!(!series.is_empty(), "the Ngram Viewer returned no data");
        let mut columns = Vec::with_capacity(query.phrases.len());
        for phrase in &query.phrases {
            let phrase_series = series
                .iter()
                .filter(|s| s.is_for(phrase, query.case_insensitive))
                .min_by_key(|s| (!s.is_aggregate(), s.label() != &**phrase))
                .with_context(|| format!("the Ngram Viewer returned no data for {phrase:?}"))?;
            anyhow::ensure!(
                phrase_series.timeseries.len() == query.num_years(),
                "expected {} years of data for {phrase:?}, got {}",
                query.num_years(),
                phrase_series.timeseries.len()
            );
            columns.push(&phrase_series.timeseries);
        }
        let rows = (query.start_year..=query.end_year)
            .enumerate()
            .map(|(idx, year)| (year, columns.iter().map(|column| column[idx]).collect()))
            .collect();
        Ok(Self {
            phrases: query.phrases.clone(),
            rows,
        })
    }

    /// Save as CSV
    async fn save(&self, path: &Path) -> Result<()> {
        let context = || Failure::output(path);
        let file = tokio::fs::File::create(path).await.with_context(context)?;
        let mut csv = AsyncWriterBuilder::new().create_writer(file);
        let header = std::iter::once("year").chain(self.phrases.iter().map(|p| &**p));
        csv.write_record(header).await.with_context(context)?;
        for (year, probabilities) in &self.rows {
            let row = std::iter::once(year.to_string())
                .chain(probabilities.iter().map(f64::to_string));
            csv.write_record(row).await.with_context(context)?;
        }
        csv.flush().await.with_context(context)?;
        Ok(())
    }
}

/// Load the first year of a saved query result
///
/// Row 0 holds the phrases and row 1 their probabilities, the first column of
/// both rows being skipped.
async fn load_frequencies(path: &Path, case_insensitive: bool) -> Result<ReferenceFrequencies> {
    let context = || format!("reading reference frequencies from {}", path.display());
    let file = tokio::fs::File::open(path).await.with_context(context)?;
    let mut csv = AsyncReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .create_reader(file);
    let rows: Vec<StringRecord> = csv
        .records()
        .take(2)
        .try_collect()
        .await
        .with_context(context)?;
    let [phrases, probabilities] = &rows[..] else {
        anyhow::bail!("{} lacks a phrase or a probability row", path.display());
    };
    anyhow::ensure!(
        phrases.len() == probabilities.len(),
        "{} has {} phrases but {} probabilities",
        path.display(),
        phrases.len().saturating_sub(1),
        probabilities.len().saturating_sub(1)
    );
    let entries = phrases
        .iter()
        .zip(probabilities.iter())
        .skip(1)
        .map(|(phrase, probability)| -> Result<(Box<str>, f64)> {
            let probability = probability
                .trim()
                .parse::<f64>()
                .with_context(|| format!("invalid probability {probability:?} for {phrase:?}"))?;
            Ok((phrase.trim().into(), probability))
        })
        .collect::<Result<Vec<_>>>()
        .with_context(context)?;
    Ok(ReferenceFrequencies {
        entries,
        case_insensitive,
    })
}
