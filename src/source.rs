//! Streaming of the JSON-lines business and review datasets

use crate::{error::Failure, progress::ProgressTracker, Result};
use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use std::{
    collections::BTreeSet,
    fs::File,
    io::{BufRead, BufReader},
    marker::PhantomData,
    path::{Path, PathBuf},
};

/// Business listing from the business dataset
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BusinessRecord {
    /// Unique business identifier
    #[serde(rename = "business_id")]
    pub id: Box<str>,

    /// Categories this business is listed under
    #[serde(rename = "categories", deserialize_with = "deserialize_categories")]
    pub category_set: BTreeSet<Box<str>>,

    /// Average star rating of the business
    #[serde(rename = "stars")]
    pub rating: f64,
}

/// User review from the review dataset
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ReviewRecord {
    /// Identifier of the reviewed business
    pub business_id: Box<str>,

    /// Star rating given by the reviewer
    #[serde(rename = "stars")]
    pub rating: f64,

    /// Review body
    pub text: Box<str>,
}

/// Business category list, as it appears across releases of the dataset
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCategories {
    List(Vec<Box<str>>),
    Joined(Box<str>),
    Null(()),
}

/// Accept `["Bars", "Nightlife"]`, `"Bars, Nightlife"` and `null`
fn deserialize_categories<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeSet<Box<str>>, D::Error> {
    let categories = match RawCategories::deserialize(deserializer)? {
        RawCategories::List(list) => list.iter().map(|c| c.trim().into()).collect(),
        RawCategories::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(Box::from)
            .collect(),
        RawCategories::Null(()) => BTreeSet::new(),
    };
    Ok(categories)
}

/// Lazy sequence of records from a JSON-lines source
///
/// Each line is parsed independently. Parsing stops at the first malformed
/// line, which is reported along with its location.
pub struct JsonLines<T, R = BufReader<File>> {
    /// Underlying line source
    reader: R,

    /// Origin of the data, for error reporting
    origin: PathBuf,

    /// Number of lines read so far
    line: usize,

    /// Reusable line buffer
    ///
    /// Lines are kept as raw bytes, so that invalid UTF-8 is reported as a
    /// malformed record rather than as an unreadable file.
    buffer: Vec<u8>,

    /// Byte progress tracking
    progress: Option<ProgressTracker>,

    /// Set once the source is exhausted or broken
    done: bool,

    record: PhantomData<fn() -> T>,
}
//
impl<T: DeserializeOwned> JsonLines<T> {
    /// Open a JSON-lines file
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| Failure::source_file(path))?;
        Ok(Self::new(BufReader::new(file), path))
    }
}
//
impl<T: DeserializeOwned, R: BufRead> JsonLines<T, R> {
    /// Parse JSON lines from an arbitrary source
    pub fn new(reader: R, origin: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            origin: origin.into(),
            line: 0,
            buffer: Vec::new(),
            progress: None,
            done: false,
            record: PhantomData,
        }
    }

    /// Report the number of bytes consumed to a progress tracker
    pub fn with_progress(self, progress: ProgressTracker) -> Self {
        Self {
            progress: Some(progress),
            ..self
        }
    }

    /// Read and parse the next non-blank line
    fn next_record(&mut self) -> Result<Option<T>> {
        loop {
            self.buffer.clear();
            let num_bytes = self
                .reader
                .read_until(b'\n', &mut self.buffer)
                .with_context(|| Failure::source_file(&self.origin))?;
            if num_bytes == 0 {
                return Ok(None);
            }
            self.line += 1;
            if let Some(progress) = &self.progress {
                progress.make_progress(num_bytes as u64);
            }
            if self.buffer.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let record = serde_json::from_slice(&self.buffer)
                .with_context(|| Failure::source_line(&self.origin, self.line))?;
            return Ok(Some(record));
        }
    }
}
//
impl<T: DeserializeOwned, R: BufRead> Iterator for JsonLines<T, R> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.next_record().transpose();
        if !matches!(result, Some(Ok(_))) {
            self.done = true;
            if let Some(progress) = self.progress.take() {
                progress.finish();
            }
        }
        result
    }
}

/// Keep the businesses listed under a category, as (id, rating) pairs
///
/// Errors are passed through so that the consumer aborts on them.
pub fn filter_businesses<'a>(
    businesses: impl Iterator<Item = Result<BusinessRecord>> + 'a,
    category: &'a str,
) -> impl Iterator<Item = Result<(Box<str>, f64)>> + 'a {
    businesses.filter_map(move |business| match business {
        Ok(business) if business.category_set.contains(category) => {
            Some(Ok((business.id, business.rating)))
        }
        Ok(business) => {
            log::trace!("Skipped business {} which is not in {category:?}", business.id);
            None
        }
        Err(e) => Some(Err(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse<T: DeserializeOwned>(data: &str) -> Vec<Result<T>> {
        JsonLines::new(Cursor::new(data.to_owned()), "test.json").collect()
    }

    #[test]
    fn categories_in_all_formats() {
        let data = r#"{"business_id": "a", "categories": ["Bars", "Nightlife"], "stars": 4.5}
{"business_id": "b", "categories": "Cafes, Bars ", "stars": 3}

{"business_id": "c", "categories": null, "stars": 1.0, "name": "Ignored"}
"#;
        let businesses = parse::<BusinessRecord>(data)
            .into_iter()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(businesses.len(), 3);
        assert!(businesses[0].category_set.contains("Nightlife"));
        assert!(businesses[1].category_set.contains("Bars"));
        assert!(businesses[1].category_set.contains("Cafes"));
        assert_eq!(businesses[1].rating, 3.0);
        assert!(businesses[2].category_set.is_empty());
    }

    #[test]
    fn category_membership_is_exact() {
        let data = r#"{"business_id": "b1", "categories": ["Bars"], "stars": 4.0}
{"business_id": "b2", "categories": ["Cafe"], "stars": 4.0}
{"business_id": "b3", "categories": ["Wine Bars"], "stars": 4.0}
"#;
        let kept = filter_businesses(parse::<BusinessRecord>(data).into_iter(), "Bars")
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(kept, vec![(Box::from("b1"), 4.0)]);
    }

    #[test]
    fn missing_field_reports_location() {
        let data = r#"{"business_id": "r1", "stars": 5, "text": "fine"}
{"business_id": "r2", "stars": 5}
{"business_id": "r3", "stars": 5, "text": "never reached"}
"#;
        let results = parse::<ReviewRecord>(data);
        assert_eq!(results.len(), 2);
        assert_eq!(&*results[0].as_ref().unwrap().text, "fine");
        let error = results[1].as_ref().unwrap_err();
        assert_eq!(
            error.downcast_ref::<Failure>(),
            Some(&Failure::source_line(Path::new("test.json"), 2))
        );
        assert!(format!("{error:#}").contains("missing field `text`"));
    }

    #[test]
    fn malformed_line_is_fatal() {
        let results = parse::<ReviewRecord>("{\"business_id\": \n");
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn missing_file_is_a_source_error() {
        let Err(error) = JsonLines::<ReviewRecord>::open(Path::new("/nonexistent/reviews.json"))
        else {
            panic!("opening a missing file should fail");
        };
        assert!(matches!(
            error.downcast_ref::<Failure>(),
            Some(Failure::SourceData { line: None, .. })
        ));
    }

    #[test]
    fn invalid_utf8_reports_location() {
        let mut data = b"{\"business_id\": \"r1\", \"stars\": 5, \"text\": \"fine\"}\n".to_vec();
        data.extend_from_slice(b"{\"business_id\": \"r2\", \"stars\": 5, \"text\": \"caf\xff\"}\n");
        let results = JsonLines::<ReviewRecord, _>::new(Cursor::new(data), "reviews.json")
            .collect::<Vec<_>>();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        let error = results[1].as_ref().unwrap_err();
        assert_eq!(
            error.downcast_ref::<Failure>(),
            Some(&Failure::source_line(Path::new("reviews.json"), 2))
        );
    }
}
