use crate::error::MeasureError;
use crate::measure::TextMeasurer;
use crate::types::Pt;

/// One output line of [`wrap_text`] with its measured width.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedLine {
    pub text: String,
    pub width: Pt,
}

impl FittedLine {
    fn blank() -> Self {
        Self {
            text: String::new(),
            width: Pt::ZERO,
        }
    }
}

/// Font and size a text run is measured with.
#[derive(Debug, Clone, Copy)]
pub struct FontRef<'a> {
    pub name: &'a str,
    pub size: Pt,
}

/// Greedy word wrap.
///
/// Explicit newlines split the input first and every segment wraps on its own;
/// an empty (or all-whitespace) segment yields one blank line. Inside a segment
/// words are joined by single spaces while the measured candidate still fits
/// `max_width`. A word that is wider than `max_width` on its own is emitted alone
/// and allowed to overflow; words are never split.
///
/// The result is never empty.
pub fn wrap_text(
    text: &str,
    max_width: Pt,
    measurer: &dyn TextMeasurer,
    font: FontRef<'_>,
) -> Result<Vec<FittedLine>, MeasureError> {
    let mut lines = Vec::new();
    for segment in text.split('\n') {
        let segment = segment.strip_suffix('\r').unwrap_or(segment);
        wrap_segment(segment, max_width, measurer, font, &mut lines)?;
    }
    if lines.is_empty() {
        lines.push(FittedLine::blank());
    }
    Ok(lines)
}

fn wrap_segment(
    segment: &str,
    max_width: Pt,
    measurer: &dyn TextMeasurer,
    font: FontRef<'_>,
    out: &mut Vec<FittedLine>,
) -> Result<(), MeasureError> {
    let mut current = String::new();
    let mut current_width = Pt::ZERO;
    let mut candidate = String::new();
    for word in segment.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            current_width = measurer.text_width(&current, font.name, font.size)?;
            continue;
        }
        candidate.clear();
        candidate.push_str(&current);
        candidate.push(' ');
        candidate.push_str(word);
        let candidate_width = measurer.text_width(&candidate, font.name, font.size)?;
        if candidate_width <= max_width {
            std::mem::swap(&mut current, &mut candidate);
            current_width = candidate_width;
        } else {
            out.push(FittedLine {
                text: std::mem::take(&mut current),
                width: current_width,
            });
            current.push_str(word);
            current_width = measurer.text_width(&current, font.name, font.size)?;
        }
    }
    if current.is_empty() {
        out.push(FittedLine::blank());
    } else {
        out.push(FittedLine {
            text: current,
            width: current_width,
        });
    }
    Ok(())
}
