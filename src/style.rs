use crate::error::RenderError;
use crate::types::{Color, Pt};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_name: Arc<str>,
    pub font_size: Pt,
    // Leading: vertical advance per wrapped line.
    pub line_height: Pt,
    pub color: Color,
    pub align: TextAlign,
    // Extra space after the block, not counted as a line.
    pub space_after: Pt,
}

impl TextStyle {
    pub fn new(font_name: &str, font_size: f32, line_height: f32) -> Self {
        Self {
            font_name: Arc::from(font_name),
            font_size: Pt::from_f32(font_size),
            line_height: Pt::from_f32(line_height),
            color: Color::BLACK,
            align: TextAlign::Left,
            space_after: Pt::ZERO,
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_space_after(mut self, space: f32) -> Self {
        self.space_after = Pt::from_f32(space);
        self
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new("Helvetica", 10.0, 12.0)
    }
}

/// Paragraph role; picks a style from the [`Stylesheet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Body,
    Emphasis,
    Small,
}

/// Text styles per block kind. Defaults follow the printed audit report.
#[derive(Debug, Clone, PartialEq)]
pub struct Stylesheet {
    pub title: TextStyle,
    pub heading: TextStyle,
    pub subheading: TextStyle,
    pub body: TextStyle,
    pub emphasis: TextStyle,
    pub small: TextStyle,
    pub table_cell: TextStyle,
    pub table_header: TextStyle,
    pub cell_padding: Pt,
    pub rule_width: Pt,
    pub rule_color: Color,
    pub header_fill: Color,
}

impl Default for Stylesheet {
    fn default() -> Self {
        Self {
            title: TextStyle::new("Helvetica-Bold", 16.0, 20.0)
                .with_align(TextAlign::Center)
                .with_space_after(12.0),
            heading: TextStyle::new("Helvetica-Bold", 12.0, 14.0).with_space_after(6.0),
            subheading: TextStyle::new("Helvetica-Bold", 11.0, 13.0).with_space_after(4.0),
            body: TextStyle::new("Helvetica", 10.0, 12.0),
            emphasis: TextStyle::new("Helvetica-Bold", 11.0, 14.0).with_space_after(6.0),
            small: TextStyle::new("Helvetica", 9.0, 11.0),
            table_cell: TextStyle::new("Helvetica", 9.0, 11.0),
            table_header: TextStyle::new("Helvetica-Bold", 9.0, 11.0),
            cell_padding: Pt::from_f32(3.0),
            rule_width: Pt::from_f32(0.5),
            rule_color: Color::GREY,
            header_fill: Color::LIGHT_GREY,
        }
    }
}

impl Stylesheet {
    /// Level 1 is the document title; 2 a section heading; deeper levels share
    /// the subheading style.
    pub fn heading(&self, level: u8) -> &TextStyle {
        match level {
            0 | 1 => &self.title,
            2 => &self.heading,
            _ => &self.subheading,
        }
    }

    pub fn paragraph(&self, role: TextRole) -> &TextStyle {
        match role {
            TextRole::Body => &self.body,
            TextRole::Emphasis => &self.emphasis,
            TextRole::Small => &self.small,
        }
    }

    pub(crate) fn named_styles(&self) -> [(&'static str, &TextStyle); 8] {
        [
            ("title", &self.title),
            ("heading", &self.heading),
            ("subheading", &self.subheading),
            ("body", &self.body),
            ("emphasis", &self.emphasis),
            ("small", &self.small),
            ("table_cell", &self.table_cell),
            ("table_header", &self.table_header),
        ]
    }

    pub(crate) fn validate(&self) -> Result<(), RenderError> {
        for (name, style) in self.named_styles() {
            if style.line_height <= Pt::ZERO || style.font_size <= Pt::ZERO {
                return Err(RenderError::InvalidConfiguration(format!(
                    "style '{name}' needs a positive font size and line height"
                )));
            }
            if style.space_after < Pt::ZERO {
                return Err(RenderError::InvalidConfiguration(format!(
                    "style '{name}' has negative space_after"
                )));
            }
        }
        if self.cell_padding < Pt::ZERO {
            return Err(RenderError::InvalidConfiguration(
                "cell_padding must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
