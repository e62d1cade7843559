//! SQLite-backed join of the business and review datasets
//!
//! Businesses of the target category and all reviews are bulk-loaded into two
//! tables indexed by business id. The inner join of both tables then yields
//! the reviews of the target category, which are split into classes by rating.
//! Reviews of businesses that are not in the business table are dropped
//! silently, and a business id that appears several times in the business
//! table matches its reviews once per appearance.

use crate::{
    error::Failure,
    progress::{ProgressReport, Work},
    source::ReviewRecord,
    Result,
};
use anyhow::Context;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// Class of a review, derived from its star rating
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ReviewClass {
    /// Top rating
    Positive,

    /// Rating at or below the negative threshold
    Negative,
}
//
impl ReviewClass {
    /// Classify a review by rating, or exclude it
    pub fn classify(rating: f64, thresholds: Thresholds) -> Option<Self> {
        if rating == thresholds.positive {
            Some(Self::Positive)
        } else if rating <= thresholds.negative {
            Some(Self::Negative)
        } else {
            None
        }
    }

    /// Lowercase name, for logs and chart titles
    pub fn name(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

/// Star rating thresholds of the review classes
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Thresholds {
    /// Exact rating of positive reviews
    pub positive: f64,

    /// Maximal rating of negative reviews
    pub negative: f64,
}
//
impl Default for Thresholds {
    fn default() -> Self {
        Self {
            positive: 5.0,
            negative: 2.0,
        }
    }
}

/// Review texts of the target category, split by class
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Partitions {
    /// Texts of positive reviews, in dataset order
    pub positive: Vec<Box<str>>,

    /// Texts of negative reviews, in dataset order
    pub negative: Vec<Box<str>>,
}
//
impl Partitions {
    /// Texts of one class
    pub fn class(&self, class: ReviewClass) -> &[Box<str>] {
        match class {
            ReviewClass::Positive => &self.positive,
            ReviewClass::Negative => &self.negative,
        }
    }
}

/// Relational store used to join the datasets
pub struct ReviewStore {
    /// Database connection
    conn: Connection,

    /// Database location, for error reporting
    path: PathBuf,
}
//
impl ReviewStore {
    /// Open (or create) a database file and reset its tables
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| Failure::output(path))?;
        Self::with_connection(conn, path.to_owned())
    }

    /// Set up a throwaway in-memory database
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, path: PathBuf) -> Result<Self> {
        let store = Self { conn, path };
        store
            .conn
            .execute_batch(
                "DROP TABLE IF EXISTS business;
                 CREATE TABLE business(id TEXT, star_rating REAL);
                 DROP TABLE IF EXISTS reviews;
                 CREATE TABLE reviews(id TEXT, stars REAL, review TEXT);",
            )
            .with_context(|| store.failure())?;
        Ok(store)
    }

    /// Failure to use the database file
    fn failure(&self) -> Failure {
        Failure::output(&self.path)
    }

    /// Bulk-load (id, rating) pairs of the businesses of interest
    ///
    /// Returns the number of businesses that were loaded.
    pub fn load_businesses(
        &mut self,
        businesses: impl Iterator<Item = Result<(Box<str>, f64)>>,
    ) -> Result<usize> {
        let failure = Failure::output(&self.path);
        let context = || failure.clone();
        let tx = self.conn.transaction().with_context(context)?;
        let mut count = 0;
        {
            let mut insert = tx
                .prepare("INSERT INTO business VALUES(?1, ?2)")
                .with_context(context)?;
            for business in businesses {
                let (id, rating) = business?;
                insert
                    .execute(params![&*id, rating])
                    .with_context(context)?;
                count += 1;
            }
        }
        tx.commit().with_context(context)?;
        Ok(count)
    }

    /// Bulk-load all reviews
    ///
    /// Returns the number of reviews that were loaded.
    pub fn load_reviews(
        &mut self,
        reviews: impl Iterator<Item = Result<ReviewRecord>>,
    ) -> Result<usize> {
        let failure = Failure::output(&self.path);
        let context = || failure.clone();
        let tx = self.conn.transaction().with_context(context)?;
        let mut count = 0;
        {
            let mut insert = tx
                .prepare("INSERT INTO reviews VALUES(?1, ?2, ?3)")
                .with_context(context)?;
            for review in reviews {
                let ReviewRecord {
                    business_id,
                    rating,
                    text,
                } = review?;
                insert
                    .execute(params![&*business_id, rating, &*text])
                    .with_context(context)?;
                count += 1;
            }
        }
        tx.commit().with_context(context)?;
        Ok(count)
    }

    /// Index both tables by business id
    pub fn create_indices(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE INDEX IF NOT EXISTS index_business_id ON business(id);
                 CREATE INDEX IF NOT EXISTS index_reviews_id ON reviews(id);",
            )
            .with_context(|| self.failure())
    }

    /// Join reviews to the businesses of interest and split them by class
    pub fn partition(&self, thresholds: Thresholds, report: &ProgressReport) -> Result<Partitions> {
        let context = || self.failure();
        let num_joined: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM reviews AS r JOIN business AS b ON (r.id = b.id)",
                [],
                |row| row.get(0),
            )
            .with_context(context)?;
        log::info!("Found {num_joined} reviews of businesses in the target category");
        let progress = report.add("Classifying reviews", Work::Steps(num_joined as usize));

        let mut query = self
            .conn
            .prepare(
                "SELECT r.stars, r.review
                 FROM reviews AS r JOIN business AS b ON (r.id = b.id)
                 ORDER BY r.rowid, b.rowid",
            )
            .with_context(context)?;
        let mut rows = query.query([]).with_context(context)?;
        let mut partitions = Partitions::default();
        while let Some(row) = rows.next().with_context(context)? {
            let rating: f64 = row.get(0).with_context(context)?;
            let class = match ReviewClass::classify(rating, thresholds) {
                Some(ReviewClass::Positive) => &mut partitions.positive,
                Some(ReviewClass::Negative) => &mut partitions.negative,
                None => {
                    progress.make_progress(1);
                    continue;
                }
            };
            class.push(row.get::<_, String>(1).with_context(context)?.into());
            progress.make_progress(1);
        }
        progress.finish();
        log::info!(
            "Kept {} positive and {} negative reviews",
            partitions.positive.len(),
            partitions.negative.len()
        );
        Ok(partitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{filter_businesses, BusinessRecord};

    fn business(id: &str, category: &str) -> Result<BusinessRecord> {
        Ok(BusinessRecord {
            id: id.into(),
            category_set: [category.into()].into_iter().collect(),
            rating: 4.0,
        })
    }

    fn review(business_id: &str, rating: f64, text: &str) -> Result<ReviewRecord> {
        Ok(ReviewRecord {
            business_id: business_id.into(),
            rating,
            text: text.into(),
        })
    }

    fn join(
        businesses: Vec<Result<BusinessRecord>>,
        reviews: Vec<Result<ReviewRecord>>,
    ) -> Partitions {
        let mut store = ReviewStore::in_memory().unwrap();
        store
            .load_businesses(filter_businesses(businesses.into_iter(), "Bars"))
            .unwrap();
        store.load_reviews(reviews.into_iter()).unwrap();
        store.create_indices().unwrap();
        store
            .partition(Thresholds::default(), &ProgressReport::new())
            .unwrap()
    }

    #[test]
    fn join_keeps_target_category() {
        let partitions = join(
            vec![business("b1", "Bars"), business("b2", "Cafe")],
            vec![review("b1", 5.0, "x"), review("b2", 5.0, "y")],
        );
        assert_eq!(partitions.positive, vec![Box::from("x")]);
        assert!(partitions.negative.is_empty());
    }

    #[test]
    fn unmatched_reviews_are_dropped() {
        let partitions = join(
            vec![business("b1", "Bars")],
            vec![review("b9", 1.0, "orphan"), review("B1", 1.0, "wrong case")],
        );
        assert_eq!(partitions, Partitions::default());
    }

    #[test]
    fn duplicate_businesses_fan_out() {
        let partitions = join(
            vec![business("b1", "Bars"), business("b1", "Bars")],
            vec![review("b1", 1.0, "twice")],
        );
        assert_eq!(partitions.negative, vec![Box::from("twice"), Box::from("twice")]);
    }

    #[test]
    fn partitions_follow_review_order() {
        let partitions = join(
            vec![business("b2", "Bars"), business("b1", "Bars")],
            vec![
                review("b1", 5.0, "first"),
                review("b2", 2.0, "second"),
                review("b2", 5.0, "third"),
                review("b1", 1.5, "fourth"),
                review("b1", 3.0, "neutral"),
            ],
        );
        assert_eq!(partitions.positive, vec![Box::from("first"), Box::from("third")]);
        assert_eq!(partitions.negative, vec![Box::from("second"), Box::from("fourth")]);
        assert_eq!(partitions.class(ReviewClass::Negative).len(), 2);
    }

    #[test]
    fn load_aborts_on_source_error() {
        let mut store = ReviewStore::in_memory().unwrap();
        let reviews = vec![
            review("b1", 5.0, "ok"),
            Err(anyhow::format_err!("malformed record")),
        ];
        assert!(store.load_reviews(reviews.into_iter()).is_err());
    }

    #[test]
    fn classification_boundaries() {
        let thresholds = Thresholds::default();
        assert_eq!(ReviewClass::classify(5.0, thresholds), Some(ReviewClass::Positive));
        assert_eq!(ReviewClass::classify(4.99, thresholds), None);
        assert_eq!(ReviewClass::classify(3.0, thresholds), None);
        assert_eq!(ReviewClass::classify(2.0, thresholds), Some(ReviewClass::Negative));
        assert_eq!(ReviewClass::classify(1.0, thresholds), Some(ReviewClass::Negative));
    }

    #[test]
    fn reopening_resets_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.db");
        {
            let mut store = ReviewStore::open(&path).unwrap();
            store
                .load_businesses(std::iter::once(Ok(("b1".into(), 4.0))))
                .unwrap();
            store.load_reviews(std::iter::once(review("b1", 5.0, "old"))).unwrap();
        }
        let store = ReviewStore::open(&path).unwrap();
        let partitions = store
            .partition(Thresholds::default(), &ProgressReport::new())
            .unwrap();
        assert_eq!(partitions, Partitions::default());
    }

    #[test]
    fn corrupt_database_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.db");
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();
        let Err(error) = ReviewStore::open(&path) else {
            panic!("opening a corrupt database should fail");
        };
        assert_eq!(error.downcast_ref::<Failure>(), Some(&Failure::output(&path)));
        assert!(format!("{error:#}").contains("reviews.db"));
    }
}
