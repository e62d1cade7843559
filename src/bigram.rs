//! Bigram extraction and usage statistics

use crate::{
    error::Failure,
    progress::{ProgressReport, Work},
    Result,
};
use anyhow::Context;
use csv_async::AsyncWriterBuilder;
use regex::Regex;
use std::{
    collections::{hash_map, HashMap},
    num::NonZeroU64,
    path::Path,
    sync::OnceLock,
};

/// Pair of consecutive lowercase words, separated by a single space
pub type Bigram = Box<str>;

/// Iterate over the bigrams of a text, in order of appearance
///
/// Words are maximal runs of alphanumeric characters and underscores. Any
/// other character separates words without being part of one.
pub fn bigrams(text: &str) -> impl Iterator<Item = Bigram> + '_ {
    let mut words = word_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase());
    let mut previous = words.next();
    std::iter::from_fn(move || {
        let first = previous.take()?;
        let second = words.next()?;
        let bigram = format!("{first} {second}").into_boxed_str();
        previous = Some(second);
        Some(bigram)
    })
}

/// Truth that a phrase is made of exactly two words, so that it can match a
/// bigram extracted from review text
pub fn is_bigram(phrase: &str) -> bool {
    let is_word = |candidate: &str| {
        word_pattern()
            .find(candidate)
            .is_some_and(|m| m.start() == 0 && m.end() == candidate.len())
    };
    let words = phrase.split_whitespace().collect::<Vec<_>>();
    words.len() == 2 && words.into_iter().all(is_word)
}

/// Pattern matching a single word
fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w+").expect("word pattern should be valid"))
}

/// Usage statistics of one bigram within a review class
#[derive(Clone, Debug, PartialEq)]
pub struct BigramRecord {
    /// Bigram of interest
    pub bigram: Bigram,

    /// Number of occurences across all reviews of the class
    pub count: NonZeroU64,

    /// Fraction of all bigram occurences of the class that this bigram
    /// accounts for
    pub probability: f64,
}

/// Bigram usage statistics of a review class
///
/// Records are sorted by decreasing count, then by increasing bigram in
/// lexicographic order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BigramStats {
    /// Sorted records
    records: Box<[BigramRecord]>,

    /// Position of each bigram in `records`
    index: HashMap<Bigram, usize>,

    /// Total number of bigram occurences
    total: u64,
}
//
impl BigramStats {
    /// Count the bigrams of a set of reviews
    pub fn from_reviews(reviews: &[Box<str>], report: &ProgressReport) -> Self {
        let progress = report.add("Counting bigrams", Work::Steps(reviews.len()));
        let mut counts = HashMap::<Bigram, NonZeroU64>::new();
        for review in reviews {
            for bigram in bigrams(review) {
                match counts.entry(bigram) {
                    hash_map::Entry::Occupied(o) => {
                        let count = o.into_mut();
                        *count = count.saturating_add(1);
                    }
                    hash_map::Entry::Vacant(v) => {
                        v.insert(NonZeroU64::MIN);
                    }
                }
            }
            progress.make_progress(1);
        }
        progress.finish();
        Self::from_counts(counts)
    }

    /// Derive sorted statistics from raw occurence counts
    fn from_counts(counts: HashMap<Bigram, NonZeroU64>) -> Self {
        let total = counts.values().map(|c| c.get()).sum::<u64>();
        let mut records = counts
            .into_iter()
            .map(|(bigram, count)| BigramRecord {
                bigram,
                count,
                probability: count.get() as f64 / total as f64,
            })
            .collect::<Vec<_>>();
        records.sort_unstable_by(|r1, r2| {
            r2.count
                .cmp(&r1.count)
                .then_with(|| r1.bigram.cmp(&r2.bigram))
        });
        let index = records
            .iter()
            .enumerate()
            .map(|(pos, record)| (record.bigram.clone(), pos))
            .collect();
        Self {
            records: records.into(),
            index,
            total,
        }
    }

    /// Sorted records
    pub fn records(&self) -> &[BigramRecord] {
        &self.records
    }

    /// Statistics of a specific bigram, if it was seen
    pub fn get(&self, bigram: &str) -> Option<&BigramRecord> {
        self.index.get(bigram).map(|&pos| &self.records[pos])
    }

    /// Total number of bigram occurences
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Save as tab-separated (bigram, count, probability) rows
    pub async fn save(&self, path: &Path) -> Result<()> {
        let context = || Failure::output(path);
        let file = tokio::fs::File::create(path).await.with_context(context)?;
        let mut rows = AsyncWriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .create_serializer(file);
        for record in self.records.iter() {
            rows.serialize((&*record.bigram, record.count.get(), record.probability))
                .await
                .with_context(context)?;
        }
        rows.flush().await.with_context(context)?;
        log::debug!("Wrote {} bigrams to {}", self.records.len(), path.display());
        Ok(())
    }
}
