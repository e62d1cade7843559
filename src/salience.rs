//! Over-representation of candidate bigrams with respect to general language

use crate::{bigram::BigramStats, reference::ReferenceFrequencies, store::ReviewClass};

/// Salience of a phrase within a review class
#[derive(Clone, Debug, PartialEq)]
pub struct SalienceScore {
    /// Candidate phrase
    pub phrase: Box<str>,

    /// log(probability in the review class / probability in the reference)
    pub log_ratio: f64,
}

/// Compute the salience of each candidate phrase of a review class
///
/// Scores come out in candidate order. Candidates which were never seen in the
/// class' reviews, or which have no nonzero reference probability, get no
/// score, so there may be fewer scores than candidates. Each such exclusion is
/// logged as a warning.
pub fn log_ratios(
    class: ReviewClass,
    candidates: &[Box<str>],
    empirical: &BigramStats,
    reference: &ReferenceFrequencies,
) -> Vec<SalienceScore> {
    let scores = candidates
        .iter()
        .filter_map(|phrase| {
            let Some(record) = empirical.get(phrase) else {
                log::warn!("No {} review contains {phrase:?}, it will not be charted", class.name());
                return None;
            };
            let baseline = match reference.get(phrase) {
                Some(probability) if probability > 0.0 => probability,
                _ => {
                    log::warn!("{phrase:?} is absent from the reference corpus, it will not be charted");
                    return None;
                }
            };
            Some(SalienceScore {
                phrase: phrase.clone(),
                log_ratio: (record.probability / baseline).ln(),
            })
        })
        .collect::<Vec<_>>();
    log::info!(
        "Scored {}/{} {} candidate phrases",
        scores.len(),
        candidates.len(),
        class.name()
    );
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressReport;

    fn stats(reviews: &[&str]) -> BigramStats {
        let reviews = reviews.iter().map(|&r| Box::from(r)).collect::<Vec<_>>();
        BigramStats::from_reviews(&reviews, &ProgressReport::new())
    }

    fn reference(entries: &[(&str, f64)]) -> ReferenceFrequencies {
        ReferenceFrequencies::from_entries(
            entries.iter().map(|&(phrase, p)| (phrase.into(), p)).collect(),
            true,
        )
    }

    fn candidates(phrases: &[&str]) -> Vec<Box<str>> {
        phrases.iter().map(|&p| Box::from(p)).collect()
    }

    #[test]
    fn ratio_of_probabilities() {
        let empirical = stats(&["the bar is great", "the bar is great", "the food is bad"]);
        let reference = reference(&[("the food", 1.0 / 90.0), ("the bar", 2.0 / 9.0)]);
        let scores = log_ratios(
            ReviewClass::Positive,
            &candidates(&["the bar", "the food"]),
            &empirical,
            &reference,
        );
        assert_eq!(scores.len(), 2);
        assert_eq!(&*scores[0].phrase, "the bar");
        assert!(scores[0].log_ratio.abs() < 1e-12);
        assert_eq!(&*scores[1].phrase, "the food");
        assert!((scores[1].log_ratio - 10f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn absent_phrases_are_excluded() {
        let empirical = stats(&["the bar is great"]);
        let reference = reference(&[("the bar", 0.01), ("no one", 0.02), ("is great", 0.0)]);
        let scores = log_ratios(
            ReviewClass::Negative,
            &candidates(&["no one", "the bar", "happy hour", "is great"]),
            &empirical,
            &reference,
        );
        assert_eq!(
            scores.iter().map(|s| &*s.phrase).collect::<Vec<_>>(),
            ["the bar"]
        );
    }

    #[test]
    fn classes_use_their_own_bigrams() {
        let positive = stats(&["the staff was lovely"]);
        let negative = stats(&["the manager was rude"]);
        let reference = reference(&[("the manager", 0.001)]);
        let phrases = candidates(&["the manager"]);
        assert!(log_ratios(ReviewClass::Positive, &phrases, &positive, &reference).is_empty());
        assert_eq!(
            log_ratios(ReviewClass::Negative, &phrases, &negative, &reference).len(),
            1
        );
    }
}
