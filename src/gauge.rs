//! Semicircular compliance dial.
//!
//! Geometry lives in a unit space centred on the dial hub: the outer arc has
//! radius 1, x grows right and y grows up. Angles are degrees, counter-clockwise
//! from the positive x axis, so 0% sits at 180° (left) and 100% at 0° (right).
//! Bands, ticks and needle all go through [`value_to_angle`]; nothing else maps
//! values to angles.

use crate::canvas::Command;
use crate::error::MeasureError;
use crate::measure::TextMeasurer;
use crate::types::{Color, Pt};
use std::sync::Arc;

pub const INNER_RADIUS: f64 = 0.25;
pub const OUTER_RADIUS: f64 = 1.0;
pub const TICK_LABEL_OFFSET: f64 = 0.12;
pub const TICK_VALUES: [u32; 5] = [0, 25, 50, 75, 100];

const BANDS: [(f64, f64, &str); 5] = [
    (0.0, 20.0, "#e53935"),
    (20.0, 40.0, "#fb8c00"),
    (40.0, 60.0, "#fdd835"),
    (60.0, 80.0, "#c6e48b"),
    (80.0, 100.0, "#2e8b57"),
];
const NEEDLE_COLOR: &str = "#0b3d91";
const HUB_RADIUS: f64 = 0.06;
const TITLE_Y: f64 = 1.05;

// Unit-space viewport of the dial, title and hub included.
const VIEW_MIN_X: f64 = -1.1;
const VIEW_MAX_X: f64 = 1.1;
const VIEW_MIN_Y: f64 = -(HUB_RADIUS + 0.02);
const VIEW_MAX_Y: f64 = 1.2;

const ARC_STEPS_PER_BAND: usize = 12;

pub fn value_to_angle(value: f64) -> f64 {
    180.0 - (value / 100.0) * 180.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArcSegment {
    pub min_value: f64,
    pub max_value: f64,
    pub start_angle_deg: f64,
    pub end_angle_deg: f64,
    pub color: Color,
}

impl ArcSegment {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min_value && value <= self.max_value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickLabel {
    pub value: u32,
    pub angle_deg: f64,
    pub text: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Needle {
    pub angle_deg: f64,
    pub length: f64,
    pub tip_x: f64,
    pub tip_y: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSpec {
    pub value: f64,
    pub title: Option<String>,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub arc_segments: Vec<ArcSegment>,
    pub tick_labels: Vec<TickLabel>,
    pub needle: Needle,
}

fn polar(angle_deg: f64, radius: f64) -> (f64, f64) {
    let rad = angle_deg.to_radians();
    (libm::cos(rad) * radius, libm::sin(rad) * radius)
}

/// Builds the dial for `pct`. Values outside 0..=100 are clamped, NaN reads as 0.
pub fn build_gauge(pct: f64, title: Option<&str>) -> GaugeSpec {
    let value = if pct.is_nan() { 0.0 } else { pct.clamp(0.0, 100.0) };

    let arc_segments = BANDS
        .iter()
        .map(|(lo, hi, color)| ArcSegment {
            min_value: *lo,
            max_value: *hi,
            start_angle_deg: value_to_angle(*lo),
            end_angle_deg: value_to_angle(*hi),
            color: Color::from_hex(color),
        })
        .collect();

    let label_radius = OUTER_RADIUS + TICK_LABEL_OFFSET;
    let tick_labels = TICK_VALUES
        .iter()
        .map(|v| {
            let angle_deg = value_to_angle(*v as f64);
            let (x, y) = polar(angle_deg, label_radius);
            TickLabel {
                value: *v,
                angle_deg,
                text: v.to_string(),
                x,
                y,
            }
        })
        .collect();

    let angle_deg = value_to_angle(value);
    let length = (INNER_RADIUS + OUTER_RADIUS) / 2.0;
    let (tip_x, tip_y) = polar(angle_deg, length);

    GaugeSpec {
        value,
        title: title.map(|t| t.to_string()).filter(|t| !t.trim().is_empty()),
        inner_radius: INNER_RADIUS,
        outer_radius: OUTER_RADIUS,
        arc_segments,
        tick_labels,
        needle: Needle {
            angle_deg,
            length,
            tip_x,
            tip_y,
            color: Color::from_hex(NEEDLE_COLOR),
        },
    }
}

impl GaugeSpec {
    pub fn segment_for(&self, value: f64) -> Option<&ArcSegment> {
        self.arc_segments.iter().find(|segment| segment.contains(value))
    }
}

/// Maps unit space into a `width` x `height` box (y down), keeping the dial round.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GaugeViewport {
    scale: f64,
    origin_x: f64,
    origin_y: f64,
}

impl GaugeViewport {
    pub(crate) fn fit(width: f64, height: f64) -> Self {
        let view_w = VIEW_MAX_X - VIEW_MIN_X;
        let view_h = VIEW_MAX_Y - VIEW_MIN_Y;
        let scale = (width / view_w).min(height / view_h).max(0.0);
        Self {
            scale,
            origin_x: (width - view_w * scale) / 2.0,
            origin_y: (height - view_h * scale) / 2.0,
        }
    }

    pub(crate) fn map(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.origin_x + (x - VIEW_MIN_X) * self.scale,
            self.origin_y + (VIEW_MAX_Y - y) * self.scale,
        )
    }

    pub(crate) fn scale(&self) -> f64 {
        self.scale
    }
}

/// Outline of one band: outer arc from start to end, inner arc back.
pub(crate) fn band_outline(segment: &ArcSegment, inner: f64, outer: f64) -> Vec<(f64, f64)> {
    let steps = ARC_STEPS_PER_BAND;
    let span = segment.end_angle_deg - segment.start_angle_deg;
    let mut points = Vec::with_capacity(2 * (steps + 1));
    for i in 0..=steps {
        let angle = segment.start_angle_deg + span * (i as f64 / steps as f64);
        points.push(polar(angle, outer));
    }
    for i in (0..=steps).rev() {
        let angle = segment.start_angle_deg + span * (i as f64 / steps as f64);
        points.push(polar(angle, inner));
    }
    points
}

pub(crate) fn hub_outline() -> Vec<(f64, f64)> {
    (0..24)
        .map(|i| polar(i as f64 * 15.0, HUB_RADIUS))
        .collect()
}

fn pt(v: f64) -> Pt {
    Pt::from_f32(v as f32)
}

/// Vector form of the dial, in form-local coordinates of a `width` x `height` box.
pub fn gauge_form_commands(
    spec: &GaugeSpec,
    width: Pt,
    height: Pt,
    measurer: &dyn TextMeasurer,
    font_name: &Arc<str>,
) -> Result<Vec<Command>, MeasureError> {
    let view = GaugeViewport::fit(width.to_f32() as f64, height.to_f32() as f64);
    let mut out = Vec::new();

    for segment in &spec.arc_segments {
        out.push(Command::SetFillColor(segment.color));
        let outline = band_outline(segment, spec.inner_radius, spec.outer_radius);
        push_polygon(&mut out, &view, &outline);
        out.push(Command::Fill);
    }

    let label_size = pt(8.0_f64.max(view.scale() * 0.08));
    out.push(Command::SetFillColor(Color::BLACK));
    out.push(Command::SetFont {
        name: font_name.clone(),
        size: label_size,
    });
    for tick in &spec.tick_labels {
        let (x, y) = view.map(tick.x, tick.y);
        let text_w = measurer.text_width(&tick.text, font_name, label_size)?;
        out.push(Command::DrawText {
            x: pt(x) - text_w / 2,
            y: pt(y) - label_size / 2,
            text: tick.text.clone(),
        });
    }

    let (hub_x, hub_y) = view.map(0.0, 0.0);
    let (tip_x, tip_y) = view.map(spec.needle.tip_x, spec.needle.tip_y);
    out.push(Command::SetStrokeColor(spec.needle.color));
    out.push(Command::SetLineWidth(pt(4.0)));
    out.push(Command::DrawLine {
        x1: pt(hub_x),
        y1: pt(hub_y),
        x2: pt(tip_x),
        y2: pt(tip_y),
    });
    out.push(Command::SetFillColor(spec.needle.color));
    push_polygon(&mut out, &view, &hub_outline());
    out.push(Command::Fill);

    if let Some(title) = &spec.title {
        let title_size = pt(12.0);
        let (x, y) = view.map(0.0, TITLE_Y);
        let text_w = measurer.text_width(title, font_name, title_size)?;
        out.push(Command::SetFillColor(Color::BLACK));
        out.push(Command::SetFont {
            name: font_name.clone(),
            size: title_size,
        });
        out.push(Command::DrawText {
            x: pt(x) - text_w / 2,
            y: pt(y) - title_size,
            text: title.clone(),
        });
    }
    Ok(out)
}

fn push_polygon(out: &mut Vec<Command>, view: &GaugeViewport, points: &[(f64, f64)]) {
    for (idx, (ux, uy)) in points.iter().enumerate() {
        let (x, y) = view.map(*ux, *uy);
        if idx == 0 {
            out.push(Command::MoveTo { x: pt(x), y: pt(y) });
        } else {
            out.push(Command::LineTo { x: pt(x), y: pt(y) });
        }
    }
    out.push(Command::ClosePath);
}
