use crate::style::TextRole;

/// One unit of document body, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
        role: TextRole,
    },
    /// Fixes column widths (pt) for the following rows until the next
    /// `TableColumns`. Rows without it split the content width evenly.
    TableColumns {
        widths: Vec<f32>,
    },
    /// Atomic: a row never straddles a page break.
    TableRow {
        cells: Vec<String>,
        header: bool,
    },
    /// Atomic. A handle the image resolver cannot serve becomes a placeholder
    /// line: `fallback` when set, the renderer's placeholder otherwise.
    Image {
        handle: String,
        width: f32,
        height: f32,
        fallback: Option<String>,
    },
    /// Where the compliance dial goes; skipped when the render has no gauge.
    Gauge {
        width: f32,
        height: f32,
    },
    Spacer {
        height: f32,
    },
    /// Starts a fresh page unless the current one is still empty.
    PageBreak,
}

impl ContentBlock {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        ContentBlock::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        ContentBlock::Paragraph {
            text: text.into(),
            role: TextRole::Body,
        }
    }

    pub fn styled_paragraph(text: impl Into<String>, role: TextRole) -> Self {
        ContentBlock::Paragraph {
            text: text.into(),
            role,
        }
    }

    pub fn columns(widths: &[f32]) -> Self {
        ContentBlock::TableColumns {
            widths: widths.to_vec(),
        }
    }

    pub fn row<S: AsRef<str>>(cells: &[S]) -> Self {
        ContentBlock::TableRow {
            cells: cells.iter().map(|c| c.as_ref().to_string()).collect(),
            header: false,
        }
    }

    pub fn header_row<S: AsRef<str>>(cells: &[S]) -> Self {
        ContentBlock::TableRow {
            cells: cells.iter().map(|c| c.as_ref().to_string()).collect(),
            header: true,
        }
    }

    pub fn image(handle: impl Into<String>, width: f32, height: f32) -> Self {
        ContentBlock::Image {
            handle: handle.into(),
            width,
            height,
            fallback: None,
        }
    }

    pub fn image_or(
        handle: impl Into<String>,
        width: f32,
        height: f32,
        fallback: impl Into<String>,
    ) -> Self {
        ContentBlock::Image {
            handle: handle.into(),
            width,
            height,
            fallback: Some(fallback.into()),
        }
    }

    pub fn spacer(height: f32) -> Self {
        ContentBlock::Spacer { height }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Heading { .. } => "heading",
            ContentBlock::Paragraph { .. } => "paragraph",
            ContentBlock::TableColumns { .. } => "table_columns",
            ContentBlock::TableRow { .. } => "table_row",
            ContentBlock::Image { .. } => "image",
            ContentBlock::Gauge { .. } => "gauge",
            ContentBlock::Spacer { .. } => "spacer",
            ContentBlock::PageBreak => "page_break",
        }
    }
}
