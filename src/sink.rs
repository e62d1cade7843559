//! Line-based storage of review texts
//!
//! Each review is stored on its own line. Newlines inside of a review are
//! replaced with the two-character marker `\s`, which is not reverted on
//! reading. A review that already contains the marker thus cannot be told
//! apart from one that contained a newline.

use crate::{error::Failure, Result};
use anyhow::Context;
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

/// Replacement for newlines inside of a review
pub const NEWLINE_MARKER: &str = "\\s";

/// Write review texts, one per line
pub fn write_reviews(path: &Path, reviews: &[Box<str>]) -> Result<()> {
    let context = || Failure::output(path);
    let mut out = BufWriter::new(File::create(path).with_context(context)?);
    for review in reviews {
        out.write_all(review.replace('\n', NEWLINE_MARKER).as_bytes())
            .with_context(context)?;
        out.write_all(b"\n").with_context(context)?;
    }
    out.flush().with_context(context)?;
    log::debug!("Wrote {} reviews to {}", reviews.len(), path.display());
    Ok(())
}

/// Read back review texts written by [`write_reviews()`]
///
/// Lines are only split at `\n`, every other byte is preserved.
pub fn read_reviews(path: &Path) -> Result<Vec<Box<str>>> {
    let context = || Failure::source_file(path);
    let file = File::open(path).with_context(context)?;
    BufReader::new(file)
        .split(b'\n')
        .map(|line| -> Result<Box<str>> {
            let line = line.with_context(context)?;
            let text = String::from_utf8(line).with_context(context)?;
            Ok(text.into_boxed_str())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(reviews: &[&str]) -> Vec<Box<str>> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.txt");
        let reviews = reviews.iter().map(|&r| Box::from(r)).collect::<Vec<_>>();
        write_reviews(&path, &reviews).unwrap();
        read_reviews(&path).unwrap()
    }

    #[test]
    fn newlines_are_escaped() {
        let read = round_trip(&["Great bar.\nWill come back!", "Meh", "a\n\nb"]);
        assert_eq!(
            read,
            vec![
                Box::from("Great bar.\\sWill come back!"),
                Box::from("Meh"),
                Box::from("a\\s\\sb"),
            ]
        );
    }

    #[test]
    fn other_bytes_are_preserved() {
        let read = round_trip(&["tabs\tand\rcarriage returns\r", "  ünïcödé  ", ""]);
        assert_eq!(
            read,
            vec![
                Box::from("tabs\tand\rcarriage returns\r"),
                Box::from("  ünïcödé  "),
                Box::from(""),
            ]
        );
    }

    #[test]
    fn existing_marker_is_ambiguous() {
        let read = round_trip(&["already \\s escaped", "already \n escaped"]);
        assert_eq!(read[0], read[1]);
    }

    #[test]
    fn empty_partition_gives_empty_file() {
        assert!(round_trip(&[]).is_empty());
    }

    #[test]
    fn unwritable_output_is_reported() {
        let error = write_reviews(Path::new("/nonexistent/dir/pos_reviews.txt"), &[]).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<Failure>(),
            Some(Failure::OutputWrite { .. })
        ));
    }
}
