//! Sequencing of the pipeline stages
//!
//! Each stage only communicates with the other through the files listed in
//! [`Paths`](crate::config::Paths), so that they can be run separately.

use crate::{
    bigram::BigramStats,
    chart,
    config::{AnalyzeConfig, ExtractConfig},
    error::Failure,
    progress::{ProgressReport, Work},
    reference::ReferenceCorpusClient,
    salience, sink,
    source::{self, BusinessRecord, JsonLines, ReviewRecord},
    store::{ReviewClass, ReviewStore},
    Result,
};
use anyhow::Context;
use std::path::Path;

/// Join the datasets and save the review texts of each class
pub fn extract(config: &ExtractConfig, report: &ProgressReport) -> Result<()> {
    let mut store = ReviewStore::open(&config.database)?;

    let businesses = JsonLines::<BusinessRecord>::open(&config.business)?
        .with_progress(report.add("Loading businesses", file_size(&config.business)?));
    let num_businesses =
        store.load_businesses(source::filter_businesses(businesses, &config.category))?;
    log::info!(
        "Loaded {num_businesses} businesses listed under {:?}",
        config.category
    );

    let reviews = JsonLines::<ReviewRecord>::open(&config.reviews)?
        .with_progress(report.add("Loading reviews", file_size(&config.reviews)?));
    let num_reviews = store.load_reviews(reviews)?;
    log::info!("Loaded {num_reviews} reviews");

    store.create_indices()?;
    let partitions = store.partition(config.thresholds, report)?;
    for (class, path) in [
        (ReviewClass::Positive, &config.paths.positive_reviews),
        (ReviewClass::Negative, &config.paths.negative_reviews),
    ] {
        sink::write_reviews(path, partitions.class(class))?;
    }
    Ok(())
}

/// Compute bigram statistics and salience scores, then chart them
pub async fn analyze(config: &AnalyzeConfig, report: &ProgressReport) -> Result<()> {
    let client = ReferenceCorpusClient::new(config.reference.clone())?;
    let paths = &config.paths;
    for (class, query, reviews, stats_path, chart_path) in [
        (
            ReviewClass::Positive,
            &config.positive_query,
            &paths.positive_reviews,
            &paths.positive_stats,
            &paths.positive_chart,
        ),
        (
            ReviewClass::Negative,
            &config.negative_query,
            &paths.negative_reviews,
            &paths.negative_stats,
            &paths.negative_chart,
        ),
    ] {
        let reviews = sink::read_reviews(reviews)?;
        log::info!("Analyzing {} {} reviews", reviews.len(), class.name());
        let stats = BigramStats::from_reviews(&reviews, report);
        log::info!(
            "Found {} distinct {} bigrams out of {}",
            stats.records().len(),
            class.name(),
            stats.total()
        );
        stats.save(stats_path).await?;

        let reference = client.frequencies(query).await?;
        for (phrase, probability) in reference.entries() {
            log::debug!("Reference probability of {phrase:?} is {probability}");
        }
        let scores = salience::log_ratios(class, &query.phrases, &stats, &reference);
        chart::render(chart_path, class, &scores)?;
    }
    Ok(())
}

/// Size of an input file, for progress tracking
fn file_size(path: &Path) -> Result<Work> {
    let metadata = std::fs::metadata(path).with_context(|| Failure::source_file(path))?;
    Ok(Work::Bytes(metadata.len()))
}
