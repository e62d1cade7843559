//! Bar charts of salience scores

use crate::{error::Failure, salience::SalienceScore, store::ReviewClass, Result};
use anyhow::Context;
use plotters::prelude::*;
use std::{ops::Range, path::Path};

/// Chart dimensions in pixels
const SIZE: (u32, u32) = (960, 540);

/// Render the salience scores of a review class as an SVG bar chart
///
/// Bars come in the order of `scores`, each labeled with its phrase. A black
/// line marks the zero log-ratio, where a phrase is as frequent in reviews as
/// in the reference corpus.
pub fn render(path: &Path, class: ReviewClass, scores: &[SalienceScore]) -> Result<()> {
    draw(path, class, scores).with_context(|| Failure::output(path))?;
    log::info!("Rendered {} chart to {}", class.name(), path.display());
    Ok(())
}

fn draw(path: &Path, class: ReviewClass, scores: &[SalienceScore]) -> Result<()> {
    let (title, color) = match class {
        ReviewClass::Positive => ("Log of Prob(Pos Rev)/Prob(Eng Lang)", RED),
        ReviewClass::Negative => ("Log of Prob(Neg Rev)/Prob(Eng Lang)", BLUE),
    };
    if scores.is_empty() {
        log::warn!("No {} phrase could be scored, the chart will be empty", class.name());
    }
    let num_bars = scores.len().max(1) as u32;

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(56)
        .build_cartesian_2d((0..num_bars).into_segmented(), value_range(scores))?;

    let label = |x: &SegmentValue<u32>| match x {
        SegmentValue::CenterOf(idx) => scores
            .get(*idx as usize)
            .map(|score| score.phrase.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(num_bars as usize)
        .x_label_formatter(&label)
        .y_desc("log ratio")
        .draw()?;

    chart.draw_series(scores.iter().zip(0..).map(|(score, idx)| {
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(idx), 0.0),
                (SegmentValue::Exact(idx + 1), score.log_ratio),
            ],
            color.mix(0.4).filled(),
        );
        bar.set_margin(0, 0, 12, 12);
        bar
    }))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![
            (SegmentValue::Exact(0), 0.0),
            (SegmentValue::Exact(num_bars), 0.0),
        ],
        BLACK.stroke_width(2),
    )))?;
    root.present()?;
    Ok(())
}

/// Vertical axis range, always including zero
fn value_range(scores: &[SalienceScore]) -> Range<f64> {
    let (low, high) = scores.iter().fold((0.0f64, 0.0f64), |(low, high), score| {
        (low.min(score.log_ratio), high.max(score.log_ratio))
    });
    let padding = ((high - low) * 0.1).max(0.5);
    (low - padding)..(high + padding)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(phrase: &str, log_ratio: f64) -> SalienceScore {
        SalienceScore {
            phrase: phrase.into(),
            log_ratio,
        }
    }

    #[test]
    fn range_includes_zero() {
        let range = value_range(&[score("a b", 2.0), score("c d", 4.0)]);
        assert!(range.start < 0.0 && range.end > 4.0);
        let range = value_range(&[score("a b", -3.0)]);
        assert!(range.start < -3.0 && range.end > 0.0);
        let range = value_range(&[]);
        assert!(range.start < 0.0 && range.end > 0.0);
    }

    #[test]
    fn renders_labeled_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pos_probs_chart.svg");
        render(
            &path,
            ReviewClass::Positive,
            &[score("the bar", 1.5), score("happy hour", -0.25)],
        )
        .unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Prob(Pos Rev)"));
        assert!(svg.contains("the bar"));
        assert!(svg.contains("happy hour"));
    }

    #[test]
    fn renders_empty_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neg_probs_chart.svg");
        render(&path, ReviewClass::Negative, &[]).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("Prob(Neg Rev)"));
    }
}
