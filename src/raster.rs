//! PNG rendering of the compliance dial for sinks that embed pictures rather
//! than vector forms.

use crate::error::RenderError;
use crate::gauge::{GaugeSpec, GaugeViewport, TICK_LABEL_OFFSET, band_outline, hub_outline};
use crate::types::Color;
use tiny_skia::{FillRule, LineCap, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

fn to_sk_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba(
        color.r.clamp(0.0, 1.0),
        color.g.clamp(0.0, 1.0),
        color.b.clamp(0.0, 1.0),
        1.0,
    )
    .unwrap_or_else(|| tiny_skia::Color::from_rgba8(0, 0, 0, 255))
}

fn paint_for(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_sk_color(color));
    paint.anti_alias = true;
    paint
}

fn polygon(view: &GaugeViewport, points: &[(f64, f64)]) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for (idx, (ux, uy)) in points.iter().enumerate() {
        let (x, y) = view.map(*ux, *uy);
        if idx == 0 {
            pb.move_to(x as f32, y as f32);
        } else {
            pb.line_to(x as f32, y as f32);
        }
    }
    pb.close();
    pb.finish()
}

fn segment(view: &GaugeViewport, from: (f64, f64), to: (f64, f64)) -> Option<Path> {
    let (x1, y1) = view.map(from.0, from.1);
    let (x2, y2) = view.map(to.0, to.1);
    let mut pb = PathBuilder::new();
    pb.move_to(x1 as f32, y1 as f32);
    pb.line_to(x2 as f32, y2 as f32);
    pb.finish()
}

/// Paints the dial into a `width_px` x `height_px` PNG on a white background.
///
/// Bands, needle and hub are drawn; tick values are marked with short radial
/// strokes since tiny-skia has no text. Titles belong to the surrounding
/// document.
pub fn rasterize_gauge(spec: &GaugeSpec, width_px: u32, height_px: u32) -> Result<Vec<u8>, RenderError> {
    let mut pixmap = Pixmap::new(width_px, height_px).ok_or_else(|| {
        RenderError::InvalidConfiguration(format!(
            "invalid gauge raster size {}x{}",
            width_px, height_px
        ))
    })?;
    pixmap.fill(tiny_skia::Color::from_rgba8(255, 255, 255, 255));
    let view = GaugeViewport::fit(width_px as f64, height_px as f64);

    for band in &spec.arc_segments {
        let outline = band_outline(band, spec.inner_radius, spec.outer_radius);
        if let Some(path) = polygon(&view, &outline) {
            pixmap.fill_path(&path, &paint_for(band.color), FillRule::Winding, Transform::identity(), None);
        }
    }

    let tick_stroke = Stroke {
        width: (view.scale() * 0.01).max(1.0) as f32,
        ..Stroke::default()
    };
    let tick_paint = paint_for(Color::GREY);
    for tick in &spec.tick_labels {
        let rad = tick.angle_deg.to_radians();
        let (dx, dy) = (libm::cos(rad), libm::sin(rad));
        let inner = spec.outer_radius + TICK_LABEL_OFFSET * 0.2;
        let outer = spec.outer_radius + TICK_LABEL_OFFSET * 0.6;
        if let Some(path) = segment(&view, (dx * inner, dy * inner), (dx * outer, dy * outer)) {
            pixmap.stroke_path(&path, &tick_paint, &tick_stroke, Transform::identity(), None);
        }
    }

    let needle_stroke = Stroke {
        width: (view.scale() * 0.03).max(1.5) as f32,
        line_cap: LineCap::Round,
        ..Stroke::default()
    };
    let needle_paint = paint_for(spec.needle.color);
    if let Some(path) = segment(&view, (0.0, 0.0), (spec.needle.tip_x, spec.needle.tip_y)) {
        pixmap.stroke_path(&path, &needle_paint, &needle_stroke, Transform::identity(), None);
    }
    if let Some(path) = polygon(&view, &hub_outline()) {
        pixmap.fill_path(&path, &needle_paint, FillRule::Winding, Transform::identity(), None);
    }

    pixmap
        .encode_png()
        .map_err(|e| RenderError::Asset(format!("png encode failed: {e}")))
}
