use crate::metrics::DocumentMetrics;
use crate::types::{Color, Pt, Size};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

/// Page-local draw command. Coordinates have their origin at the top-left
/// corner of the page with y growing downwards; text `y` is the top of the
/// line box. Encoders flip to their own space.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFont {
        name: Arc<str>,
        size: Pt,
    },
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Pt),
    DrawText {
        x: Pt,
        y: Pt,
        text: String,
    },
    // A rule stroked with the current stroke color and line width.
    DrawLine {
        x1: Pt,
        y1: Pt,
        x2: Pt,
        y2: Pt,
    },
    // Filled with the current fill color.
    DrawRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    MoveTo {
        x: Pt,
        y: Pt,
    },
    LineTo {
        x: Pt,
        y: Pt,
    },
    ClosePath,
    Fill,
    Stroke,
    DrawImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: String,
    },
    // Vector group drawn later with DrawForm; coordinates inside are form-local.
    DefineForm {
        resource_id: String,
        width: Pt,
        height: Pt,
        commands: Vec<Command>,
    },
    DrawForm {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: String,
    },
    // Non-rendered metadata (degradations, block markers). Ignored by encoders.
    Meta {
        key: String,
        value: String,
    },
    PageBreak,
}

#[derive(Debug, Clone, PartialEq)]
struct GraphicsState {
    fill_color: Color,
    stroke_color: Color,
    line_width: Pt,
    font: Option<(Arc<str>, Pt)>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: Pt::from_i32(1),
            font: None,
        }
    }
}

/// Append-only command sink for one render.
///
/// State setters are dropped when they would not change the current state.
/// State resets at every page break so each page stands on its own.
pub struct Canvas {
    page_size: Size,
    commands: Vec<Command>,
    state: GraphicsState,
    page_start: usize,
    page_count: usize,
    defined_forms: HashSet<String>,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            commands: Vec::new(),
            state: GraphicsState::default(),
            page_start: 0,
            page_count: 1,
            defined_forms: HashSet::new(),
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn set_font(&mut self, name: &Arc<str>, size: Pt) {
        if let Some((current, current_size)) = &self.state.font {
            if current == name && *current_size == size {
                return;
            }
        }
        self.state.font = Some((name.clone(), size));
        self.commands.push(Command::SetFont {
            name: name.clone(),
            size,
        });
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.state.fill_color == color {
            return;
        }
        self.state.fill_color = color;
        self.commands.push(Command::SetFillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        if self.state.stroke_color == color {
            return;
        }
        self.state.stroke_color = color;
        self.commands.push(Command::SetStrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        let width = width.max(Pt::ZERO);
        if self.state.line_width == width {
            return;
        }
        self.state.line_width = width;
        self.commands.push(Command::SetLineWidth(width));
    }

    pub fn draw_text(&mut self, x: Pt, y: Pt, text: impl Into<String>) {
        self.commands.push(Command::DrawText {
            x,
            y,
            text: text.into(),
        });
    }

    pub fn draw_line(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt) {
        self.commands.push(Command::DrawLine { x1, y1, x2, y2 });
    }

    pub fn draw_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.commands.push(Command::DrawRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn draw_image(&mut self, x: Pt, y: Pt, width: Pt, height: Pt, resource_id: &str) {
        self.commands.push(Command::DrawImage {
            x,
            y,
            width,
            height,
            resource_id: resource_id.to_string(),
        });
    }

    /// Defines the form on first use, then draws it.
    pub fn draw_form_with(
        &mut self,
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: &str,
        build: impl FnOnce() -> Vec<Command>,
    ) {
        if self.defined_forms.insert(resource_id.to_string()) {
            self.commands.push(Command::DefineForm {
                resource_id: resource_id.to_string(),
                width,
                height,
                commands: build(),
            });
        }
        self.commands.push(Command::DrawForm {
            x,
            y,
            width,
            height,
            resource_id: resource_id.to_string(),
        });
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.commands.push(Command::Meta {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Closes the current page with a [`Command::PageBreak`] marker.
    pub fn show_page(&mut self) {
        self.commands.push(Command::PageBreak);
        self.state = GraphicsState::default();
        self.page_start = self.commands.len();
        self.page_count += 1;
    }

    pub fn current_command_count(&self) -> usize {
        self.commands.len() - self.page_start
    }

    pub fn finish(self, metrics: DocumentMetrics) -> Document {
        Document {
            page_size: self.page_size,
            commands: self.commands,
            metrics,
        }
    }
}

/// Finished, paginated draw-command stream.
#[derive(Debug, Clone)]
pub struct Document {
    pub page_size: Size,
    pub commands: Vec<Command>,
    pub metrics: DocumentMetrics,
}

impl Document {
    pub fn page_count(&self) -> usize {
        1 + self
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::PageBreak))
            .count()
    }

    /// Commands of each page, page-break markers excluded.
    pub fn pages(&self) -> Vec<&[Command]> {
        self.commands
            .split(|cmd| matches!(cmd, Command::PageBreak))
            .collect()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::DrawText { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// SHA-256 over the canonical text form of the command stream.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}\n", self.page_size).as_bytes());
        for cmd in &self.commands {
            hasher.update(format!("{:?}\n", cmd).as_bytes());
        }
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            use std::fmt::Write;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}
