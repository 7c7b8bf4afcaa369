use std::fmt;

/// Failure reported by a [`crate::TextMeasurer`].
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureError {
    UnknownFont(String),
    UnsupportedGlyph { font: String, ch: char },
}

impl fmt::Display for MeasureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureError::UnknownFont(name) => write!(f, "no metrics for font '{}'", name),
            MeasureError::UnsupportedGlyph { font, ch } => {
                write!(f, "font '{}' cannot size glyph {:?}", font, ch)
            }
        }
    }
}

impl std::error::Error for MeasureError {}

#[derive(Debug)]
pub enum RenderError {
    Measurement {
        block_index: usize,
        stage: &'static str,
        source: MeasureError,
    },
    InvalidGeometry(String),
    InvalidConfiguration(String),
    Asset(String),
    Io(std::io::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Measurement {
                block_index,
                stage,
                source,
            } => write!(
                f,
                "text measurement failed at block {} ({}): {}",
                block_index, stage, source
            ),
            RenderError::InvalidGeometry(message) => write!(f, "invalid geometry: {}", message),
            RenderError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            RenderError::Asset(message) => write!(f, "asset error: {}", message),
            RenderError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Measurement { source, .. } => Some(source),
            RenderError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(value: std::io::Error) -> Self {
        RenderError::Io(value)
    }
}

impl RenderError {
    pub(crate) fn measurement(block_index: usize, stage: &'static str, source: MeasureError) -> Self {
        RenderError::Measurement {
            block_index,
            stage,
            source,
        }
    }
}
