use crate::block::ContentBlock;
use crate::gauge::{GaugeSpec, build_gauge};
use crate::score::{ComplianceResult, OutcomeTally, format_percentage, score};
use crate::style::TextRole;

/// One questionnaire answer as stored by the record keeper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionRecord {
    pub text: String,
    pub state: Option<String>,
    pub observation: Option<String>,
}

impl QuestionRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = Some(observation.into());
        self
    }
}

/// Report header data. Signatures are image handles for the resolver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditRecord {
    pub company: Option<String>,
    pub auditor: Option<String>,
    pub created_at: String,
    pub auditor_text: Option<String>,
    pub auditor_signature: Option<String>,
    pub company_signature: Option<String>,
}

/// Everything a render needs for one audit report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportBlocks {
    pub blocks: Vec<ContentBlock>,
    pub tally: OutcomeTally,
    pub compliance: ComplianceResult,
    pub gauge: GaugeSpec,
}

const SUMMARY_COLUMNS: [f32; 2] = [180.0, 80.0];
const DETAIL_COLUMNS: [f32; 4] = [30.0, 260.0, 90.0, 160.0];
const GAUGE_SIZE: (f32, f32) = (400.0, 200.0);
const SIGNATURE_SIZE: (f32, f32) = (200.0, 50.0);
const SIGNATURE_LINE: &str = "____________________";

// Blank strings count as missing.
fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(default)
}

pub fn indicator_text(compliance: &ComplianceResult) -> String {
    format!(
        "Cumplimiento de la auditoria: {}%  —  Resultado obtenido: {}",
        format_percentage(compliance.percentage),
        compliance.status.label()
    )
}

/// Scores the answers and lays out the audit report body: header lines,
/// outcome summary, per-question table, compliance indicator and gauge, the
/// auditor's closing text and the signature block.
pub fn build_report(audit: &AuditRecord, questions: &[QuestionRecord]) -> ReportBlocks {
    let tally = OutcomeTally::from_states(questions.iter().map(|q| q.state.as_deref()));
    let compliance = score(&tally);
    let pct = format_percentage(compliance.percentage);
    let gauge = build_gauge(compliance.percentage, Some(&format!("Cumplimiento: {pct}%")));

    let mut blocks = vec![
        ContentBlock::heading(1, "INFORME DE AUDITORÍA"),
        ContentBlock::paragraph(format!("Fecha: {}", audit.created_at)),
        ContentBlock::spacer(12.0),
        ContentBlock::paragraph(format!(
            "Empresa: {}",
            or_default(audit.company.as_deref(), "(no definida)")
        )),
        ContentBlock::paragraph(format!(
            "Auditor: {}",
            or_default(audit.auditor.as_deref(), "(no definido)")
        )),
        ContentBlock::spacer(12.0),
        ContentBlock::heading(2, "Resumen de hallazgos"),
        ContentBlock::spacer(12.0),
        ContentBlock::columns(&SUMMARY_COLUMNS),
        ContentBlock::header_row(&["Estado", "Cantidad"]),
    ];
    for (outcome, count) in tally.iter() {
        blocks.push(ContentBlock::row(&[outcome.label().to_string(), count.to_string()]));
    }
    blocks.push(ContentBlock::spacer(12.0));

    blocks.push(ContentBlock::heading(2, "Resultados Detallados"));
    blocks.push(ContentBlock::spacer(12.0));
    blocks.push(ContentBlock::columns(&DETAIL_COLUMNS));
    blocks.push(ContentBlock::header_row(&["#", "Pregunta", "Estado", "Observación"]));
    for (idx, question) in questions.iter().enumerate() {
        blocks.push(ContentBlock::row(&[
            (idx + 1).to_string(),
            or_default(Some(question.text.as_str()), "(sin texto)").to_string(),
            or_default(question.state.as_deref(), "(OK)").to_string(),
            or_default(question.observation.as_deref(), "(sin observación)").to_string(),
        ]));
    }
    blocks.push(ContentBlock::spacer(18.0));

    blocks.push(ContentBlock::styled_paragraph(
        indicator_text(&compliance),
        TextRole::Emphasis,
    ));
    blocks.push(ContentBlock::spacer(8.0));
    blocks.push(ContentBlock::Gauge {
        width: GAUGE_SIZE.0,
        height: GAUGE_SIZE.1,
    });
    blocks.push(ContentBlock::spacer(12.0));

    blocks.push(ContentBlock::heading(2, "Informe Final del Auditor"));
    blocks.push(ContentBlock::spacer(12.0));
    blocks.push(ContentBlock::paragraph(or_default(
        audit.auditor_text.as_deref(),
        "(sin observaciones)",
    )));
    blocks.push(ContentBlock::spacer(18.0));

    for (signature, name, unavailable) in [
        (
            audit.auditor_signature.as_deref(),
            "Auditor",
            "(firma auditor no disponible)",
        ),
        (
            audit.company_signature.as_deref(),
            "Empresa",
            "(firma empresa no disponible)",
        ),
    ] {
        match signature.filter(|s| !s.trim().is_empty()) {
            Some(handle) => blocks.push(ContentBlock::image_or(
                handle,
                SIGNATURE_SIZE.0,
                SIGNATURE_SIZE.1,
                unavailable,
            )),
            None => blocks.push(ContentBlock::paragraph(SIGNATURE_LINE)),
        }
        blocks.push(ContentBlock::paragraph(name));
        blocks.push(ContentBlock::spacer(12.0));
    }

    ReportBlocks {
        blocks,
        tally,
        compliance,
        gauge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::ComplianceStatus;

    fn audit() -> AuditRecord {
        AuditRecord {
            company: Some("Acme".to_string()),
            auditor: Some("R. Díaz".to_string()),
            created_at: "2024-03-01 10:00:00".to_string(),
            ..AuditRecord::default()
        }
    }

    fn rows(blocks: &[ContentBlock]) -> Vec<Vec<String>> {
        blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::TableRow { cells, .. } => Some(cells.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn no_answers_yields_empty_details_and_left_needle() {
        let report = build_report(&audit(), &[]);
        assert_eq!(report.compliance.status, ComplianceStatus::NoAnswers);
        assert_eq!(report.compliance.percentage, 0.0);
        assert_eq!(report.gauge.needle.angle_deg, 180.0);
        assert_eq!(report.gauge.title.as_deref(), Some("Cumplimiento: 0.0%"));

        let rows = rows(&report.blocks);
        // Summary header + 5 outcomes + details header.
        assert_eq!(rows.len(), 7);
        assert!(rows[1..6].iter().all(|r| r[1] == "0"));
        assert_eq!(rows[6], vec!["#", "Pregunta", "Estado", "Observación"]);
        assert!(report.blocks.contains(&ContentBlock::styled_paragraph(
            "Cumplimiento de la auditoria: 0.0%  —  Resultado obtenido: Sin respuestas",
            TextRole::Emphasis,
        )));
    }

    #[test]
    fn question_rows_fill_in_defaults() {
        let questions = [
            QuestionRecord::new("¿Existe política?").with_state("Fortalezas"),
            QuestionRecord::new("").with_observation("revisar"),
        ];
        let report = build_report(&audit(), &questions);
        let rows = rows(&report.blocks);
        assert_eq!(rows[7], vec!["1", "¿Existe política?", "Fortalezas", "(sin observación)"]);
        assert_eq!(rows[8], vec!["2", "(sin texto)", "(OK)", "revisar"]);
        assert_eq!(report.tally.total(), 1);
        assert_eq!(report.compliance.status, ComplianceStatus::Compliant);
    }

    #[test]
    fn signatures_use_images_or_a_line() {
        let mut record = audit();
        record.auditor_signature = Some("firmas/auditor.png".to_string());
        record.company = None;
        let report = build_report(&record, &[]);
        assert!(report.blocks.contains(&ContentBlock::image_or(
            "firmas/auditor.png",
            200.0,
            50.0,
            "(firma auditor no disponible)"
        )));
        assert!(report.blocks.contains(&ContentBlock::paragraph(SIGNATURE_LINE)));
        assert!(report.blocks.contains(&ContentBlock::paragraph("Empresa: (no definida)")));
        assert!(report.blocks.contains(&ContentBlock::paragraph("(sin observaciones)")));
        let gauges = report
            .blocks
            .iter()
            .filter(|b| matches!(b, ContentBlock::Gauge { .. }))
            .count();
        assert_eq!(gauges, 1);
    }
}
