use crate::assets::{ImageInfo, ImageResolver};
use crate::block::ContentBlock;
use crate::canvas::{Canvas, Document};
use crate::cursor::PageCursor;
use crate::debug::{BreakReason, Counters, DebugLogger};
use crate::error::RenderError;
use crate::gauge::{GaugeSpec, gauge_form_commands};
use crate::measure::TextMeasurer;
use crate::metrics::DocumentMetrics;
use crate::perf::PerfLogger;
use crate::style::{Stylesheet, TextAlign, TextStyle};
use crate::types::{PageGeometry, Pt};
use crate::wrap::{FittedLine, FontRef, wrap_text};
use std::time::Instant;

pub const DEFAULT_IMAGE_PLACEHOLDER: &str = "(image unavailable)";

const GAUGE_RESOURCE_ID: &str = "gauge";

fn layout_debug_enabled() -> bool {
    static ENABLED: std::sync::OnceLock<bool> = std::sync::OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var("AUDITPRESS_LAYOUT_DEBUG")
            .ok()
            .map(|v| {
                let v = v.trim();
                v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
            })
            .unwrap_or(false)
    })
}

/// Lays an ordered block list onto pages.
///
/// One call to [`DocumentRenderer::render`] owns one [`PageCursor`] and one
/// [`Canvas`]; blocks are placed strictly in order. Headings and paragraphs may
/// break between wrapped lines, while table rows, images and the gauge are
/// atomic. A failed render returns the error and nothing else.
pub struct DocumentRenderer<'a> {
    stylesheet: &'a Stylesheet,
    measurer: &'a dyn TextMeasurer,
    images: &'a dyn ImageResolver,
    placeholder: &'a str,
    repeat_header: bool,
    debug: Option<&'a DebugLogger>,
    perf: Option<&'a PerfLogger>,
    job: Option<usize>,
}

impl<'a> DocumentRenderer<'a> {
    pub fn new(
        stylesheet: &'a Stylesheet,
        measurer: &'a dyn TextMeasurer,
        images: &'a dyn ImageResolver,
    ) -> Self {
        Self {
            stylesheet,
            measurer,
            images,
            placeholder: DEFAULT_IMAGE_PLACEHOLDER,
            repeat_header: true,
            debug: None,
            perf: None,
            job: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Whether the last header row is drawn again above a row pushed to a new page.
    pub fn with_repeated_header(mut self, repeat: bool) -> Self {
        self.repeat_header = repeat;
        self
    }

    pub(crate) fn with_logs(
        mut self,
        debug: Option<&'a DebugLogger>,
        perf: Option<&'a PerfLogger>,
        job: Option<usize>,
    ) -> Self {
        self.debug = debug;
        self.perf = perf;
        self.job = job;
        self
    }

    pub fn render(
        &self,
        blocks: &[ContentBlock],
        geometry: PageGeometry,
        gauge: Option<&GaugeSpec>,
    ) -> Result<Document, RenderError> {
        let started = Instant::now();
        let cursor = PageCursor::new(geometry)?;
        let mut pass = Pass {
            renderer: self,
            cursor,
            canvas: Canvas::new(geometry.size),
            columns: None,
            last_header: None,
            degraded: 0,
            gauge,
            counters: Counters::default(),
        };
        for (idx, block) in blocks.iter().enumerate() {
            if let Err(err) = pass.place(idx, block) {
                if let Some(logger) = self.debug {
                    logger.log_render_failed(self.job, idx, &err.to_string());
                    logger.emit_summary(self.job, "render", &pass.counters);
                    logger.flush();
                }
                return Err(err);
            }
        }
        Ok(pass.finish(started))
    }
}

/// A wrapped table row ready to paint.
struct RowLayout {
    cells: Vec<Vec<FittedLine>>,
    widths: Vec<Pt>,
    height: Pt,
    header: bool,
}

struct Pass<'r, 'a> {
    renderer: &'r DocumentRenderer<'a>,
    cursor: PageCursor,
    canvas: Canvas,
    columns: Option<Vec<Pt>>,
    last_header: Option<RowLayout>,
    degraded: usize,
    gauge: Option<&'r GaugeSpec>,
    counters: Counters,
}

impl Pass<'_, '_> {
    fn place(&mut self, idx: usize, block: &ContentBlock) -> Result<(), RenderError> {
        let sheet = self.renderer.stylesheet;
        if !matches!(block, ContentBlock::TableRow { .. } | ContentBlock::TableColumns { .. }) {
            self.last_header = None;
        }
        match block {
            ContentBlock::Heading { level, text } => {
                self.place_text(idx, block.kind(), text, sheet.heading(*level))?
            }
            ContentBlock::Paragraph { text, role } => {
                self.place_text(idx, block.kind(), text, sheet.paragraph(*role))?
            }
            ContentBlock::TableColumns { widths } => self.set_columns(idx, widths)?,
            ContentBlock::TableRow { cells, header } => self.place_row(idx, cells, *header)?,
            ContentBlock::Image {
                handle,
                width,
                height,
                fallback,
            } => self.place_image(idx, handle, *width, *height, fallback.as_deref()),
            ContentBlock::Gauge { width, height } => self.place_gauge(idx, *width, *height)?,
            ContentBlock::Spacer { height } => {
                self.cursor.advance_saturating(Pt::from_f32(*height));
            }
            ContentBlock::PageBreak => {
                if !self.cursor.is_page_empty() {
                    let from_page = self.cursor.page_index() + 1;
                    self.cursor.break_page(&mut self.canvas);
                    self.note_break(BreakReason::Explicit, from_page, idx, block.kind());
                }
            }
        }
        if !matches!(
            block,
            ContentBlock::TableColumns { .. } | ContentBlock::Spacer { .. } | ContentBlock::PageBreak
        ) {
            self.cursor.note_block();
        }
        if self.renderer.debug.is_some() {
            self.counters.bump(&format!("render.block.{}", block.kind()));
        }
        Ok(())
    }

    /// `ensure_space` plus break bookkeeping.
    fn ensure(&mut self, idx: usize, kind: &str, height: Pt) -> bool {
        let from_page = self.cursor.page_index() + 1;
        let broke = self.cursor.ensure_space(height, &mut self.canvas);
        if broke {
            self.note_break(BreakReason::Overflow, from_page, idx, kind);
        }
        broke
    }

    fn note_break(&mut self, reason: BreakReason, from_page: usize, idx: usize, kind: &str) {
        if layout_debug_enabled() {
            let state = self.cursor.state();
            eprintln!(
                "[auditpress] page break ({}) {} -> {} at block {} ({}), y={}",
                reason.as_str(),
                from_page,
                state.page_index + 1,
                idx,
                kind,
                state.cursor_y
            );
        }
        if let Some(logger) = self.renderer.debug {
            logger.log_page_break(self.renderer.job, reason, from_page, idx, kind);
            self.counters.bump(&format!("layout.page_break.{}", reason.as_str()));
        }
    }

    fn place_text(
        &mut self,
        idx: usize,
        stage: &'static str,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), RenderError> {
        let width = self.cursor.content_width();
        let font = FontRef {
            name: &style.font_name,
            size: style.font_size,
        };
        let lines = wrap_text(text, width, self.renderer.measurer, font)
            .map_err(|err| RenderError::measurement(idx, stage, err))?;
        for line in lines {
            self.ensure(idx, stage, style.line_height);
            let offset = match style.align {
                TextAlign::Left => Pt::ZERO,
                TextAlign::Center => ((width - line.width) / 2).max(Pt::ZERO),
            };
            if !line.text.is_empty() {
                self.canvas.set_fill_color(style.color);
                self.canvas.set_font(&style.font_name, style.font_size);
                self.canvas
                    .draw_text(self.cursor.left() + offset, self.cursor.y(), line.text);
            }
            self.cursor.advance(style.line_height);
        }
        self.cursor.advance_saturating(style.space_after);
        Ok(())
    }

    fn set_columns(&mut self, idx: usize, widths: &[f32]) -> Result<(), RenderError> {
        if widths.is_empty() || widths.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(RenderError::InvalidConfiguration(format!(
                "block {idx}: table columns need positive widths"
            )));
        }
        self.columns = Some(widths.iter().map(|w| Pt::from_f32(*w)).collect());
        self.last_header = None;
        Ok(())
    }

    fn column_widths(&self, idx: usize, count: usize) -> Result<Vec<Pt>, RenderError> {
        match &self.columns {
            Some(widths) if widths.len() == count => Ok(widths.clone()),
            Some(widths) => Err(RenderError::InvalidConfiguration(format!(
                "block {idx}: table row has {count} cells but {} columns are set",
                widths.len()
            ))),
            None if count == 0 => Ok(Vec::new()),
            None => {
                let each = self.cursor.content_width() / count as i32;
                Ok(vec![each; count])
            }
        }
    }

    fn layout_row(
        &self,
        idx: usize,
        cells: &[String],
        widths: Vec<Pt>,
        header: bool,
    ) -> Result<RowLayout, RenderError> {
        let sheet = self.renderer.stylesheet;
        let style = if header {
            &sheet.table_header
        } else {
            &sheet.table_cell
        };
        let font = FontRef {
            name: &style.font_name,
            size: style.font_size,
        };
        let pad = sheet.cell_padding;
        let mut wrapped = Vec::with_capacity(cells.len());
        for (cell, width) in cells.iter().zip(&widths) {
            let inner = (*width - pad * 2).max(Pt::ZERO);
            let lines = wrap_text(cell, inner, self.renderer.measurer, font)
                .map_err(|err| RenderError::measurement(idx, "table_row", err))?;
            wrapped.push(lines);
        }
        let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
        Ok(RowLayout {
            cells: wrapped,
            widths,
            height: style.line_height * line_count as i32,
            header,
        })
    }

    fn place_row(&mut self, idx: usize, cells: &[String], header: bool) -> Result<(), RenderError> {
        let widths = self.column_widths(idx, cells.len())?;
        let row = self.layout_row(idx, cells, widths, header)?;
        let broke = self.ensure(idx, "table_row", row.height);
        if broke && !header && self.renderer.repeat_header {
            // The repeat goes on the fresh page only if the row still fits under it.
            if let Some(head) = self.last_header.take() {
                if head.height + row.height <= self.cursor.usable_height() {
                    self.paint_row(&head);
                }
                self.last_header = Some(head);
            }
        }
        self.paint_row(&row);
        if header {
            self.last_header = Some(row);
        }
        Ok(())
    }

    fn paint_row(&mut self, row: &RowLayout) {
        let sheet = self.renderer.stylesheet;
        let style = if row.header {
            &sheet.table_header
        } else {
            &sheet.table_cell
        };
        let left = self.cursor.left();
        let top = self.cursor.y();
        let bottom = top + row.height;
        let total: Pt = if row.widths.is_empty() {
            self.cursor.content_width()
        } else {
            row.widths.iter().copied().sum()
        };

        if row.header {
            self.canvas.set_fill_color(sheet.header_fill);
            self.canvas.draw_rect(left, top, total, row.height);
        }
        self.canvas.set_stroke_color(sheet.rule_color);
        self.canvas.set_line_width(sheet.rule_width);
        self.canvas.draw_line(left, top, left + total, top);
        self.canvas.draw_line(left, bottom, left + total, bottom);
        let mut x = left;
        self.canvas.draw_line(x, top, x, bottom);
        for width in &row.widths {
            x += *width;
            self.canvas.draw_line(x, top, x, bottom);
        }

        self.canvas.set_fill_color(style.color);
        self.canvas.set_font(&style.font_name, style.font_size);
        let mut x = left;
        for (lines, width) in row.cells.iter().zip(&row.widths) {
            for (line_no, line) in lines.iter().enumerate() {
                if line.text.is_empty() {
                    continue;
                }
                let y = top + style.line_height * line_no as i32;
                self.canvas
                    .draw_text(x + sheet.cell_padding, y, line.text.clone());
            }
            x += *width;
        }
        self.cursor.advance(row.height);
    }

    fn place_image(
        &mut self,
        idx: usize,
        handle: &str,
        width: f32,
        height: f32,
        fallback: Option<&str>,
    ) {
        match self.renderer.images.resolve(handle) {
            Ok(info) => {
                let (w, h) = image_box(width, height, info);
                self.ensure(idx, "image", h);
                self.canvas
                    .draw_image(self.cursor.left(), self.cursor.y(), w, h, handle);
                self.cursor.advance(h);
            }
            Err(err) => {
                self.degraded += 1;
                if let Some(logger) = self.renderer.debug {
                    logger.log_image_unavailable(self.renderer.job, idx, handle, &err.to_string());
                    self.counters.bump("render.image_unavailable");
                }
                let sheet = self.renderer.stylesheet;
                let style = &sheet.body;
                self.ensure(idx, "image", style.line_height);
                self.canvas.meta("image_unavailable", handle);
                self.canvas.set_fill_color(style.color);
                self.canvas.set_font(&style.font_name, style.font_size);
                self.canvas.draw_text(
                    self.cursor.left(),
                    self.cursor.y(),
                    fallback.unwrap_or(self.renderer.placeholder),
                );
                self.cursor.advance(style.line_height);
            }
        }
    }

    fn place_gauge(&mut self, idx: usize, width: f32, height: f32) -> Result<(), RenderError> {
        let Some(spec) = self.gauge else {
            if self.renderer.debug.is_some() {
                self.counters.bump("render.gauge.skipped");
            }
            return Ok(());
        };
        let (w, h) = (Pt::from_f32(width), Pt::from_f32(height));
        if w <= Pt::ZERO || h <= Pt::ZERO {
            return Err(RenderError::InvalidConfiguration(format!(
                "block {idx}: gauge needs a positive size"
            )));
        }
        let sheet = self.renderer.stylesheet;
        let font_name = &sheet.body.font_name;
        let commands = gauge_form_commands(spec, w, h, self.renderer.measurer, font_name)
            .map_err(|err| RenderError::measurement(idx, "gauge", err))?;
        self.ensure(idx, "gauge", h);
        let x = self.cursor.left() + ((self.cursor.content_width() - w) / 2).max(Pt::ZERO);
        self.canvas
            .draw_form_with(x, self.cursor.y(), w, h, GAUGE_RESOURCE_ID, move || commands);
        self.cursor.advance(h);
        Ok(())
    }

    fn finish(self, started: Instant) -> Document {
        let Pass {
            renderer,
            cursor,
            canvas,
            degraded,
            counters,
            ..
        } = self;
        let (pages, placed) = cursor.finish(&canvas);
        let render_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(perf) = renderer.perf {
            perf.log_span_ms("render.layout", renderer.job, render_ms);
            perf.log_counts(
                "render.doc",
                renderer.job,
                &[
                    ("pages", pages.len() as u64),
                    ("commands", pages.iter().map(|p| p.command_count as u64).sum()),
                    ("degraded", degraded as u64),
                ],
            );
        }
        if let Some(logger) = renderer.debug {
            logger.emit_summary(renderer.job, "render", &counters);
            logger.flush();
        }
        canvas.finish(DocumentMetrics {
            pages,
            total_placed_height: placed,
            degraded_blocks: degraded,
            render_ms,
        })
    }
}

/// Box for an image; a missing dimension follows the pixel aspect ratio and a
/// missing pair falls back to one point per pixel.
fn image_box(width: f32, height: f32, info: ImageInfo) -> (Pt, Pt) {
    let (px_w, px_h) = (info.width_px as f32, info.height_px as f32);
    let (w, h) = match (width > 0.0, height > 0.0) {
        (true, true) => (width, height),
        (true, false) => (width, width * px_h / px_w),
        (false, true) => (height * px_w / px_h, height),
        (false, false) => (px_w, px_h),
    };
    (Pt::from_f32(w), Pt::from_f32(h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetBundle, NoImages};
    use crate::canvas::Command;
    use crate::error::MeasureError;
    use crate::gauge::build_gauge;
    use crate::measure::FixedAdvanceMeasurer;
    use crate::types::{Margins, Size};

    // 80pt usable height, 180pt content width.
    fn small_page() -> PageGeometry {
        PageGeometry::new(Size::new(200.0, 100.0), Margins::all(10.0))
    }

    fn render_with(
        sheet: &Stylesheet,
        blocks: &[ContentBlock],
        gauge: Option<&GaugeSpec>,
    ) -> Result<Document, RenderError> {
        let measurer = FixedAdvanceMeasurer::default();
        DocumentRenderer::new(sheet, &measurer, &NoImages).render(blocks, small_page(), gauge)
    }

    fn text_positions(page: &[Command]) -> Vec<(Pt, Pt, String)> {
        page.iter()
            .filter_map(|cmd| match cmd {
                Command::DrawText { x, y, text } => Some((*x, *y, text.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn paragraphs_break_between_lines_and_conserve_height() {
        let mut sheet = Stylesheet::default();
        sheet.body = TextStyle::new("Helvetica", 8.0, 10.0);
        let text: Vec<String> = (0..20).map(|i| format!("line{i}")).collect();
        let doc = render_with(&sheet, &[ContentBlock::paragraph(text.join("\n"))], None).unwrap();

        assert_eq!(doc.page_count(), 3);
        let metrics = &doc.metrics;
        assert_eq!(metrics.page_count(), 3);
        assert_eq!(metrics.last_page_used_height(), Pt::from_i32(40));
        let usable = small_page().usable_height();
        assert_eq!(
            metrics.total_placed_height,
            usable * (metrics.page_count() as i32 - 1) + metrics.last_page_used_height()
        );
        let first = text_positions(doc.pages()[1]);
        assert_eq!(first[0].1, Pt::from_i32(10));
        assert_eq!(first[0].2, "line8");
    }

    #[test]
    fn table_rows_never_straddle_a_page() {
        let sheet = Stylesheet::default();
        let mut blocks = vec![ContentBlock::columns(&[60.0, 120.0])];
        for i in 0..5 {
            blocks.push(ContentBlock::row(&[format!("{i}"), "a\nb\nc".to_string()]));
        }
        let doc = render_with(&sheet, &blocks, None).unwrap();
        // 33pt rows, two per 80pt page.
        assert_eq!(doc.page_count(), 3);
        let line_height = sheet.table_cell.line_height;
        for page in doc.pages() {
            for (_, y, _) in text_positions(page) {
                assert!(y >= Pt::from_i32(10));
                assert!(y + line_height <= Pt::from_i32(90));
            }
        }
        let used: Vec<Pt> = doc.metrics.pages.iter().map(|p| p.used_height).collect();
        assert_eq!(used, vec![Pt::from_i32(66), Pt::from_i32(66), Pt::from_i32(33)]);
    }

    #[test]
    fn header_row_repeats_after_an_overflow_break() {
        let sheet = Stylesheet::default();
        let mut blocks = vec![ContentBlock::header_row(&["Pregunta"])];
        for i in 0..10 {
            blocks.push(ContentBlock::row(&[format!("fila {i}")]));
        }
        let doc = render_with(&sheet, &blocks, None).unwrap();
        assert_eq!(doc.page_count(), 2);
        let second = text_positions(doc.pages()[1]);
        assert_eq!(second[0].2, "Pregunta");
        assert_eq!(second[1].2, "fila 6");
        assert!(second[1].1 > second[0].1);

        let measurer = FixedAdvanceMeasurer::default();
        let doc = DocumentRenderer::new(&sheet, &measurer, &NoImages)
            .with_repeated_header(false)
            .render(&blocks, small_page(), None)
            .unwrap();
        let second = text_positions(doc.pages()[1]);
        assert_eq!(second[0].2, "fila 6");
    }

    #[test]
    fn header_is_not_repeated_when_it_would_push_the_row_off_the_page() {
        let sheet = Stylesheet::default();
        // 7 lines at 11pt: 77pt rows on an 80pt page, no room for the header too.
        let tall = "a\nb\nc\nd\ne\nf\ng";
        let blocks = [
            ContentBlock::header_row(&["H"]),
            ContentBlock::row(&[tall]),
            ContentBlock::row(&[tall]),
        ];
        let doc = render_with(&sheet, &blocks, None).unwrap();
        assert_eq!(doc.page_count(), 3);
        let firsts: Vec<String> = doc
            .pages()
            .iter()
            .map(|page| text_positions(page)[0].2.clone())
            .collect();
        assert_eq!(firsts, vec!["H", "a", "a"]);
        let used: Vec<Pt> = doc.metrics.pages.iter().map(|p| p.used_height).collect();
        assert_eq!(used, vec![Pt::from_i32(11), Pt::from_i32(77), Pt::from_i32(77)]);
    }

    #[test]
    fn rows_split_the_width_evenly_without_columns() {
        let sheet = Stylesheet::default();
        let doc = render_with(&sheet, &[ContentBlock::row(&["a", "b", "c"])], None).unwrap();
        let xs: Vec<Pt> = text_positions(&doc.commands).iter().map(|t| t.0).collect();
        let pad = sheet.cell_padding;
        assert_eq!(
            xs,
            vec![Pt::from_i32(10) + pad, Pt::from_i32(70) + pad, Pt::from_i32(130) + pad]
        );
    }

    #[test]
    fn column_count_mismatch_is_a_configuration_error() {
        let sheet = Stylesheet::default();
        let blocks = [ContentBlock::columns(&[90.0, 90.0]), ContentBlock::row(&["solo"])];
        let err = render_with(&sheet, &blocks, None).unwrap_err();
        assert!(matches!(err, RenderError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("block 1"));
    }

    #[test]
    fn missing_image_degrades_to_placeholder() {
        let sheet = Stylesheet::default();
        let blocks = [
            ContentBlock::paragraph("Firma"),
            ContentBlock::image("firma_auditor", 200.0, 50.0),
        ];
        let doc = render_with(&sheet, &blocks, None).unwrap();
        assert_eq!(doc.texts().collect::<Vec<_>>(), vec!["Firma", DEFAULT_IMAGE_PLACEHOLDER]);
        assert!(doc.commands.contains(&Command::Meta {
            key: "image_unavailable".to_string(),
            value: "firma_auditor".to_string(),
        }));
        assert_eq!(doc.metrics.degraded_blocks, 1);

        let blocks = [ContentBlock::image_or("firma_empresa", 200.0, 50.0, "(sin firma)")];
        let doc = render_with(&sheet, &blocks, None).unwrap();
        assert_eq!(doc.texts().collect::<Vec<_>>(), vec!["(sin firma)"]);
    }

    #[test]
    fn resolved_image_is_atomic_and_keeps_aspect() {
        let sheet = Stylesheet::default();
        let mut bundle = AssetBundle::new();
        bundle.add_image("sig", crate::assets::tests::png_bytes(40, 10));
        let measurer = FixedAdvanceMeasurer::default();
        let blocks = [
            ContentBlock::spacer(60.0),
            ContentBlock::image("sig", 100.0, 0.0),
        ];
        let doc = DocumentRenderer::new(&sheet, &measurer, &bundle)
            .render(&blocks, small_page(), None)
            .unwrap();
        // 25pt image does not fit below the 60pt spacer.
        assert_eq!(doc.page_count(), 2);
        assert_eq!(
            doc.pages()[1].to_vec(),
            vec![Command::DrawImage {
                x: Pt::from_i32(10),
                y: Pt::from_i32(10),
                width: Pt::from_i32(100),
                height: Pt::from_i32(25),
                resource_id: "sig".to_string(),
            }]
        );
    }

    struct RejectChar(char);

    impl TextMeasurer for RejectChar {
        fn text_width(&self, text: &str, font_name: &str, font_size: Pt) -> Result<Pt, MeasureError> {
            if text.contains(self.0) {
                return Err(MeasureError::UnsupportedGlyph {
                    font: font_name.to_string(),
                    ch: self.0,
                });
            }
            FixedAdvanceMeasurer::default().text_width(text, font_name, font_size)
        }
    }

    #[test]
    fn measurement_failure_names_block_and_stage() {
        let sheet = Stylesheet::default();
        let measurer = RejectChar('☃');
        let blocks = [
            ContentBlock::heading(1, "Informe"),
            ContentBlock::paragraph("bien"),
            ContentBlock::row(&["ok", "mal ☃"]),
        ];
        let err = DocumentRenderer::new(&sheet, &measurer, &NoImages)
            .render(&blocks, small_page(), None)
            .unwrap_err();
        match err {
            RenderError::Measurement {
                block_index, stage, ..
            } => {
                assert_eq!(block_index, 2);
                assert_eq!(stage, "table_row");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn gauge_is_drawn_as_a_centred_form_or_skipped() {
        let sheet = Stylesheet::default();
        let blocks = [ContentBlock::Gauge {
            width: 100.0,
            height: 50.0,
        }];
        let skipped = render_with(&sheet, &blocks, None).unwrap();
        assert!(skipped.commands.is_empty());

        let spec = build_gauge(72.5, Some("Cumplimiento: 72.5%"));
        let doc = render_with(&sheet, &blocks, Some(&spec)).unwrap();
        assert!(matches!(doc.commands[0], Command::DefineForm { .. }));
        assert_eq!(
            doc.commands[1],
            Command::DrawForm {
                x: Pt::from_i32(50),
                y: Pt::from_i32(10),
                width: Pt::from_i32(100),
                height: Pt::from_i32(50),
                resource_id: GAUGE_RESOURCE_ID.to_string(),
            }
        );
        assert_eq!(doc.metrics.total_placed_height, Pt::from_i32(50));
    }

    #[test]
    fn explicit_break_only_leaves_a_page_with_content() {
        let sheet = Stylesheet::default();
        let blocks = [
            ContentBlock::PageBreak,
            ContentBlock::paragraph("uno"),
            ContentBlock::PageBreak,
            ContentBlock::PageBreak,
            ContentBlock::paragraph("dos"),
        ];
        let doc = render_with(&sheet, &blocks, None).unwrap();
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn centred_title_uses_measured_width() {
        let sheet = Stylesheet::default();
        let doc = render_with(&sheet, &[ContentBlock::heading(1, "Informe")], None).unwrap();
        let (x, _, _) = text_positions(&doc.commands)[0].clone();
        // 7 chars at 0.6 * 16pt.
        let text_width = Pt::from_f32(7.0 * 9.6);
        assert_eq!(x, Pt::from_i32(10) + (Pt::from_i32(180) - text_width) / 2);
    }

    #[test]
    fn invalid_geometry_fails_before_output() {
        let sheet = Stylesheet::default();
        let measurer = FixedAdvanceMeasurer::default();
        let geometry = PageGeometry::new(Size::new(60.0, 60.0), Margins::all(40.0));
        let err = DocumentRenderer::new(&sheet, &measurer, &NoImages)
            .render(&[ContentBlock::paragraph("x")], geometry, None)
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidGeometry(_)));
    }
}
