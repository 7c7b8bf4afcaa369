mod assets;
mod block;
mod canvas;
mod cursor;
mod debug;
mod error;
mod font;
mod gauge;
mod measure;
mod metrics;
mod perf;
mod raster;
mod render;
mod report;
mod score;
mod style;
mod types;
mod wrap;

pub use assets::{AssetBundle, DirImageResolver, ImageInfo, ImageResolver, NoImages};
pub use block::ContentBlock;
pub use canvas::{Canvas, Command, Document};
pub use cursor::{LayoutState, PageCursor};
use debug::DebugLogger;
pub use error::{MeasureError, RenderError};
pub use font::FontRegistry;
pub use gauge::{
    ArcSegment, GaugeSpec, Needle, TickLabel, build_gauge, gauge_form_commands, value_to_angle,
};
pub use measure::{FixedAdvanceMeasurer, TextMeasurer};
pub use metrics::{DocumentMetrics, PageMetrics};
use perf::PerfLogger;
pub use raster::rasterize_gauge;
pub use render::{DEFAULT_IMAGE_PLACEHOLDER, DocumentRenderer};
pub use report::{AuditRecord, QuestionRecord, ReportBlocks, build_report, indicator_text};
pub use score::{
    COMPLIANT_THRESHOLD, ComplianceResult, ComplianceStatus, Outcome, OutcomeTally,
    PARTIAL_THRESHOLD, format_percentage, score,
};
use std::path::PathBuf;
use std::sync::Arc;
pub use style::{Stylesheet, TextAlign, TextRole, TextStyle};
pub use types::{Color, Margins, PageGeometry, Pt, Size};
pub use wrap::{FittedLine, FontRef, wrap_text};

/// Configured renderer. Cheap to share across threads; every render owns its
/// own cursor and canvas.
pub struct ReportEngine {
    geometry: PageGeometry,
    stylesheet: Stylesheet,
    measurer: Arc<dyn TextMeasurer>,
    images: Arc<dyn ImageResolver>,
    image_placeholder: String,
    table_repeat_header: bool,
    debug: Option<Arc<DebugLogger>>,
    perf: Option<Arc<PerfLogger>>,
}

/// One entry of a batch render.
#[derive(Debug, Clone, Default)]
pub struct RenderJob {
    pub blocks: Vec<ContentBlock>,
    pub gauge: Option<GaugeSpec>,
}

impl From<ReportBlocks> for RenderJob {
    fn from(report: ReportBlocks) -> Self {
        Self {
            blocks: report.blocks,
            gauge: Some(report.gauge),
        }
    }
}

impl ReportEngine {
    pub fn builder() -> ReportEngineBuilder {
        ReportEngineBuilder::default()
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    pub fn measurer(&self) -> &dyn TextMeasurer {
        self.measurer.as_ref()
    }

    fn renderer(&self, job: Option<usize>) -> DocumentRenderer<'_> {
        DocumentRenderer::new(&self.stylesheet, self.measurer.as_ref(), self.images.as_ref())
            .with_placeholder(&self.image_placeholder)
            .with_repeated_header(self.table_repeat_header)
            .with_logs(self.debug.as_deref(), self.perf.as_deref(), job)
    }

    pub fn render(
        &self,
        blocks: &[ContentBlock],
        gauge: Option<&GaugeSpec>,
    ) -> Result<Document, RenderError> {
        self.renderer(None).render(blocks, self.geometry, gauge)
    }

    /// Scores and lays out one audit, returning the assembled blocks alongside
    /// the rendered document.
    pub fn render_report(
        &self,
        audit: &AuditRecord,
        questions: &[QuestionRecord],
    ) -> Result<(ReportBlocks, Document), RenderError> {
        let report = build_report(audit, questions);
        let document = self.render(&report.blocks, Some(&report.gauge))?;
        Ok((report, document))
    }

    // Independent renders in parallel; results come back in input order.
    pub fn render_many(&self, jobs: &[RenderJob]) -> Vec<Result<Document, RenderError>> {
        use rayon::prelude::*;

        let batch_span = self.perf.as_deref().map(|perf| perf.span("render.batch", None));
        let mut results: Vec<(usize, Result<Document, RenderError>)> = jobs
            .par_iter()
            .enumerate()
            .map(|(idx, job)| {
                let res = self
                    .renderer(Some(idx))
                    .render(&job.blocks, self.geometry, job.gauge.as_ref());
                (idx, res)
            })
            .collect();
        results.sort_by_key(|(idx, _)| *idx);
        drop(batch_span);
        if let Some(perf) = &self.perf {
            perf.flush();
        }
        results.into_iter().map(|(_, res)| res).collect()
    }
}

pub struct ReportEngineBuilder {
    page_size: Size,
    margins: Margins,
    stylesheet: Stylesheet,
    font_dirs: Vec<PathBuf>,
    font_files: Vec<PathBuf>,
    unicode_metrics: bool,
    image_placeholder: String,
    table_repeat_header: bool,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
    measurer: Option<Arc<dyn TextMeasurer>>,
    image_resolver: Option<Arc<dyn ImageResolver>>,
}

impl Default for ReportEngineBuilder {
    fn default() -> Self {
        let geometry = PageGeometry::default();
        Self {
            page_size: geometry.size,
            margins: geometry.margins,
            stylesheet: Stylesheet::default(),
            font_dirs: Vec::new(),
            font_files: Vec::new(),
            unicode_metrics: true,
            image_placeholder: DEFAULT_IMAGE_PLACEHOLDER.to_string(),
            table_repeat_header: true,
            debug_path: None,
            perf_path: None,
            measurer: None,
            image_resolver: None,
        }
    }
}

impl ReportEngineBuilder {
    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn margin_all(mut self, value: f32) -> Self {
        self.margins = Margins::all(value);
        self
    }

    pub fn stylesheet(mut self, stylesheet: Stylesheet) -> Self {
        self.stylesheet = stylesheet;
        self
    }

    pub fn register_font_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(path.into());
        self
    }

    pub fn register_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_files.push(path.into());
        self
    }

    // Shape non-Latin-1 text with rustybuzz instead of per-char advances.
    pub fn unicode_metrics(mut self, enabled: bool) -> Self {
        self.unicode_metrics = enabled;
        self
    }

    pub fn image_placeholder(mut self, text: impl Into<String>) -> Self {
        self.image_placeholder = text.into();
        self
    }

    pub fn table_repeat_header(mut self, enabled: bool) -> Self {
        self.table_repeat_header = enabled;
        self
    }

    // JSONL page-break and degradation events.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    // JSONL timings, plus a ranked `_hot.log` next to it.
    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    /// Replaces the font registry. Cannot be combined with font registration.
    pub fn measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.measurer = Some(measurer);
        self
    }

    pub fn image_resolver(mut self, resolver: Arc<dyn ImageResolver>) -> Self {
        self.image_resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<ReportEngine, RenderError> {
        let geometry = PageGeometry::new(self.page_size, self.margins);
        geometry.validate()?;
        self.stylesheet.validate()?;
        if self.image_placeholder.trim().is_empty() {
            return Err(RenderError::InvalidConfiguration(
                "image placeholder must not be blank".to_string(),
            ));
        }

        let measurer: Arc<dyn TextMeasurer> = match self.measurer {
            Some(measurer) => {
                if !self.font_dirs.is_empty() || !self.font_files.is_empty() {
                    return Err(RenderError::InvalidConfiguration(
                        "font registration needs the built-in font registry, not a custom measurer"
                            .to_string(),
                    ));
                }
                measurer
            }
            None => {
                let mut registry = FontRegistry::new();
                registry.set_use_full_unicode_metrics(self.unicode_metrics);
                for dir in &self.font_dirs {
                    registry.register_dir(dir);
                }
                for file in &self.font_files {
                    registry.register_file(file)?;
                }
                Arc::new(registry)
            }
        };
        for (name, style) in self.stylesheet.named_styles() {
            if let Err(err) = measurer.text_width("", &style.font_name, style.font_size) {
                return Err(RenderError::InvalidConfiguration(format!(
                    "style '{name}': {err}"
                )));
            }
        }

        let debug = match self.debug_path {
            Some(path) => Some(Arc::new(DebugLogger::new(path)?)),
            None => None,
        };
        let perf = match self.perf_path {
            Some(path) => Some(Arc::new(PerfLogger::new(path)?)),
            None => None,
        };

        Ok(ReportEngine {
            geometry,
            stylesheet: self.stylesheet,
            measurer,
            images: self
                .image_resolver
                .unwrap_or_else(|| Arc::new(NoImages) as Arc<dyn ImageResolver>),
            image_placeholder: self.image_placeholder,
            table_repeat_header: self.table_repeat_header,
            debug,
            perf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ReportEngine {
        ReportEngine::builder().build().expect("default engine")
    }

    fn audit() -> AuditRecord {
        AuditRecord {
            company: Some("Metalúrgica Sur".to_string()),
            auditor: Some("A. Rojas".to_string()),
            created_at: "2024-05-02 09:30:00".to_string(),
            auditor_text: Some("Sin desvíos graves.\n\nSeguimiento en 90 días.".to_string()),
            ..AuditRecord::default()
        }
    }

    fn questions(count: usize) -> Vec<QuestionRecord> {
        let states = ["Fortalezas", "Hallazgos", "Observaciones", "No conformidad menor"];
        (0..count)
            .map(|i| {
                QuestionRecord::new(format!("Pregunta {i}: ¿se registra el control {i}?"))
                    .with_state(states[i % states.len()])
            })
            .collect()
    }

    #[test]
    fn builder_rejects_margins_that_eat_the_page() {
        let err = ReportEngine::builder()
            .page_size(Size::new(100.0, 100.0))
            .margin_all(50.0)
            .build()
            .err()
            .expect("must fail");
        assert!(matches!(err, RenderError::InvalidGeometry(_)));
    }

    #[test]
    fn builder_rejects_styles_without_metrics() {
        let mut sheet = Stylesheet::default();
        sheet.body = TextStyle::new("Garamond", 10.0, 12.0);
        let err = ReportEngine::builder()
            .stylesheet(sheet)
            .build()
            .err()
            .expect("must fail");
        assert!(matches!(err, RenderError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("body"));
    }

    #[test]
    fn builder_rejects_fonts_with_custom_measurer() {
        let err = ReportEngine::builder()
            .measurer(Arc::new(FixedAdvanceMeasurer::default()))
            .register_font_file("fonts/Inter.ttf")
            .build()
            .err()
            .expect("must fail");
        assert!(matches!(err, RenderError::InvalidConfiguration(_)));
    }

    #[test]
    fn report_without_answers_is_one_page_with_left_needle() {
        let (report, doc) = engine().render_report(&audit(), &[]).unwrap();
        assert_eq!(report.compliance.status, ComplianceStatus::NoAnswers);
        assert_eq!(report.gauge.needle.angle_deg, 180.0);
        assert_eq!(doc.page_count(), 1);
        assert!(doc.texts().any(|t| t.contains("Sin respuestas")));
        assert!(doc.texts().any(|t| t == "Observación"));
        assert!(!doc.texts().any(|t| t == "1"));
        assert!(
            doc.commands
                .iter()
                .any(|c| matches!(c, Command::DrawForm { resource_id, .. } if resource_id == "gauge"))
        );
        // Both signatures fall back to a line.
        assert_eq!(doc.texts().filter(|t| *t == "____________________").count(), 2);
    }

    #[test]
    fn long_paragraph_wraps_the_same_way_every_time() {
        let vocabulary = ["auditoría", "control", "registro", "riesgo", "de", "la", "evidencia"];
        let words: Vec<&str> = (0..500).map(|i| vocabulary[(i * 7 + i / 3) % vocabulary.len()]).collect();
        let text = words.join(" ");
        let engine = ReportEngine::builder()
            .page_size(Size::new(480.0, 792.0))
            .margin_all(40.0)
            .build()
            .unwrap();
        assert_eq!(engine.geometry().content_width(), Pt::from_i32(400));

        let first = engine.render(&[ContentBlock::paragraph(text.clone())], None).unwrap();
        let second = engine.render(&[ContentBlock::paragraph(text.clone())], None).unwrap();
        let lines = first.texts().count();
        assert_eq!(lines, second.texts().count());
        assert_eq!(first.fingerprint(), second.fingerprint());

        let body = &engine.stylesheet().body;
        let font = FontRef {
            name: &body.font_name,
            size: body.font_size,
        };
        let wrapped = wrap_text(&text, Pt::from_i32(400), engine.measurer(), font).unwrap();
        assert_eq!(lines, wrapped.len());
        assert!(lines > 10);
        let rejoined: Vec<&str> = first.texts().collect();
        assert_eq!(rejoined.join(" "), text);
    }

    #[test]
    fn long_reports_paginate_without_splitting_rows() {
        let (_, doc) = engine().render_report(&audit(), &questions(120)).unwrap();
        assert!(doc.page_count() >= 3);

        let metrics = &doc.metrics;
        let used: Pt = metrics.pages.iter().map(|p| p.used_height).sum();
        assert_eq!(used, metrics.total_placed_height);
        let usable = engine().geometry().usable_height();
        assert!(metrics.pages.iter().all(|p| p.used_height <= usable));

        // Every continuation page of the details table starts with its header.
        let pages = doc.pages();
        let second_first_text = pages[1].iter().find_map(|c| match c {
            Command::DrawText { text, .. } => Some(text.as_str()),
            _ => None,
        });
        assert_eq!(second_first_text, Some("#"));

        // Each text line, at the line height of the style that drew it, ends
        // above the bottom margin.
        let bottom = Pt::from_i32(792 - 40);
        let sheet = engine().stylesheet().clone();
        let line_height = |name: &str, size: Pt| {
            sheet
                .named_styles()
                .iter()
                .filter(|(_, style)| &*style.font_name == name && style.font_size == size)
                .map(|(_, style)| style.line_height)
                .fold(None, |tallest: Option<Pt>, lh| Some(tallest.map_or(lh, |t| t.max(lh))))
                .unwrap()
        };
        for page in &pages {
            let mut line = None;
            for cmd in page.iter() {
                match cmd {
                    Command::SetFont { name, size } => line = Some(line_height(name, *size)),
                    Command::DrawText { y, text, .. } => {
                        let line = line.expect("font set before text on every page");
                        assert!(*y + line <= bottom, "{text:?} at {y:?} runs past the margin");
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn missing_signature_image_degrades_and_is_logged() {
        let dir = std::env::temp_dir();
        let log = dir.join(format!("auditpress_engine_debug_{}.jsonl", std::process::id()));
        let engine = ReportEngine::builder()
            .image_resolver(Arc::new(AssetBundle::new()))
            .image_placeholder("(firma no disponible)")
            .debug_log(&log)
            .build()
            .unwrap();
        let mut record = audit();
        record.auditor_signature = Some("firmas/auditor.png".to_string());
        let (_, doc) = engine.render_report(&record, &questions(3)).unwrap();

        assert_eq!(doc.metrics.degraded_blocks, 1);
        // The signature's own placeholder wins over the engine-wide one.
        assert!(doc.texts().any(|t| t == "(firma auditor no disponible)"));
        assert!(!doc.texts().any(|t| t == "(firma no disponible)"));
        let events = std::fs::read_to_string(&log).unwrap();
        assert!(events.contains("\"type\":\"render.image_unavailable\""));
        assert!(events.contains("\"type\":\"debug.summary\""));
        let _ = std::fs::remove_file(&log);
    }

    #[test]
    fn resolved_signature_is_drawn_as_an_image() {
        let mut bundle = AssetBundle::new();
        bundle.add_image("firma.png", assets::tests::png_bytes(200, 50));
        let engine = ReportEngine::builder()
            .image_resolver(Arc::new(bundle))
            .build()
            .unwrap();
        let mut record = audit();
        record.company_signature = Some("firma.png".to_string());
        let (_, doc) = engine.render_report(&record, &[]).unwrap();
        assert!(doc.commands.iter().any(|c| matches!(
            c,
            Command::DrawImage { resource_id, width, .. }
                if resource_id == "firma.png" && *width == Pt::from_i32(200)
        )));
        assert_eq!(doc.metrics.degraded_blocks, 0);
    }

    #[test]
    fn batch_render_keeps_input_order() {
        let engine = engine();
        let jobs: Vec<RenderJob> = [0usize, 40, 5, 90]
            .iter()
            .map(|n| RenderJob::from(build_report(&audit(), &questions(*n))))
            .collect();
        let results = engine.render_many(&jobs);
        assert_eq!(results.len(), jobs.len());
        for (job, result) in jobs.iter().zip(&results) {
            let single = engine.render(&job.blocks, job.gauge.as_ref()).unwrap();
            let batched = result.as_ref().unwrap();
            assert_eq!(batched.fingerprint(), single.fingerprint());
        }
    }

    #[test]
    fn batch_debug_summaries_count_each_job_on_its_own() {
        let log = std::env::temp_dir().join(format!("auditpress_batch_debug_{}.jsonl", std::process::id()));
        let engine = ReportEngine::builder().debug_log(&log).build().unwrap();
        let paragraphs = |n: usize| RenderJob {
            blocks: (0..n).map(|i| ContentBlock::paragraph(format!("Párrafo {i}"))).collect(),
            gauge: None,
        };
        let jobs = vec![paragraphs(1), paragraphs(4), paragraphs(2)];
        let results = engine.render_many(&jobs);
        assert!(results.iter().all(Result::is_ok));

        let events = std::fs::read_to_string(&log).unwrap();
        let summaries: Vec<&str> = events
            .lines()
            .filter(|line| line.starts_with("{\"type\":\"debug.summary\""))
            .collect();
        assert_eq!(summaries.len(), 3);
        for (job, count) in [(0, 1), (1, 4), (2, 2)] {
            let prefix = format!("{{\"type\":\"debug.summary\",\"job\":{job},");
            let line = summaries.iter().find(|l| l.starts_with(&prefix)).unwrap();
            assert!(
                line.contains(&format!("\"counts\":{{\"render.block.paragraph\":{count}}}")),
                "{line}"
            );
        }
        let _ = std::fs::remove_file(&log);
    }

    struct NoSnowmen;

    impl TextMeasurer for NoSnowmen {
        fn text_width(&self, text: &str, font_name: &str, font_size: Pt) -> Result<Pt, MeasureError> {
            if let Some(ch) = text.chars().find(|c| *c == '☃') {
                return Err(MeasureError::UnsupportedGlyph {
                    font: font_name.to_string(),
                    ch,
                });
            }
            FixedAdvanceMeasurer::default().text_width(text, font_name, font_size)
        }
    }

    #[test]
    fn measurement_failure_aborts_with_block_context() {
        let engine = ReportEngine::builder()
            .measurer(Arc::new(NoSnowmen))
            .build()
            .unwrap();
        let mut record = audit();
        record.auditor_text = Some("cierre ☃".to_string());
        let report = build_report(&record, &questions(2));
        let expected_index = report
            .blocks
            .iter()
            .position(|b| *b == ContentBlock::paragraph("cierre ☃"))
            .unwrap();
        let err = engine.render(&report.blocks, Some(&report.gauge)).unwrap_err();
        match err {
            RenderError::Measurement {
                block_index,
                stage,
                source,
            } => {
                assert_eq!(block_index, expected_index);
                assert_eq!(stage, "paragraph");
                assert_eq!(
                    source,
                    MeasureError::UnsupportedGlyph {
                        font: "Helvetica".to_string(),
                        ch: '☃'
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn gauge_raster_matches_report_value() {
        let (report, _) = engine().render_report(&audit(), &questions(8)).unwrap();
        let png = rasterize_gauge(&report.gauge, 400, 200).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
        assert_eq!(report.compliance.percentage, 50.0);
        assert_eq!(report.gauge.needle.angle_deg, 90.0);
    }
}
