/// Closed set of questionnaire outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Strength,
    Finding,
    MinorNonconformity,
    MajorNonconformity,
    Observation,
}

impl Outcome {
    pub const ALL: [Outcome; 5] = [
        Outcome::Strength,
        Outcome::Finding,
        Outcome::MinorNonconformity,
        Outcome::MajorNonconformity,
        Outcome::Observation,
    ];

    /// Label as stored by the questionnaire tool and printed in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Strength => "Fortalezas",
            Outcome::Finding => "Hallazgos",
            Outcome::MinorNonconformity => "No conformidad menor",
            Outcome::MajorNonconformity => "No conformidad mayor",
            Outcome::Observation => "Observaciones",
        }
    }

    /// Accepts the stored labels and their English names. Matching ignores
    /// case and surrounding whitespace; anything else is `None`.
    pub fn from_label(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        let outcome = match key.as_str() {
            "fortalezas" | "strength" => Outcome::Strength,
            "hallazgos" | "finding" => Outcome::Finding,
            "no conformidad menor" | "minor nonconformity" => Outcome::MinorNonconformity,
            "no conformidad mayor" | "major nonconformity" => Outcome::MajorNonconformity,
            "observaciones" | "observation" => Outcome::Observation,
            _ => return None,
        };
        Some(outcome)
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// Count per outcome. Every outcome has an entry, zero by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    counts: [u64; 5],
}

impl OutcomeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, outcome: Outcome, count: u64) -> Self {
        self.counts[outcome.slot()] = count;
        self
    }

    /// Tallies raw state labels; missing and unrecognized labels are skipped.
    pub fn from_states<'a, I>(states: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut tally = Self::default();
        for outcome in states.into_iter().flatten().filter_map(Outcome::from_label) {
            tally.counts[outcome.slot()] += 1;
        }
        tally
    }

    pub fn get(&self, outcome: Outcome) -> u64 {
        self.counts[outcome.slot()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn favorable(&self) -> u64 {
        self.get(Outcome::Strength) + self.get(Outcome::Observation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Outcome, u64)> + '_ {
        Outcome::ALL.into_iter().map(move |o| (o, self.get(o)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceStatus {
    Compliant,
    PartiallyCompliant,
    NonCompliant,
    NoAnswers,
}

impl ComplianceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "Cumple",
            ComplianceStatus::PartiallyCompliant => "Cumplimiento Parcial",
            ComplianceStatus::NonCompliant => "No Cumple",
            ComplianceStatus::NoAnswers => "Sin respuestas",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplianceResult {
    /// Rounded to one decimal, half away from zero.
    pub percentage: f64,
    pub status: ComplianceStatus,
}

pub const COMPLIANT_THRESHOLD: f64 = 85.0;
pub const PARTIAL_THRESHOLD: f64 = 60.0;

/// Share of favorable outcomes (strengths plus observations) over all tallied
/// answers. Thresholds apply to the unrounded share, so a 84.96% score prints
/// as 85.0 and still reads as partial.
pub fn score(tally: &OutcomeTally) -> ComplianceResult {
    let total = tally.total();
    if total == 0 {
        return ComplianceResult {
            percentage: 0.0,
            status: ComplianceStatus::NoAnswers,
        };
    }
    let pct = 100.0 * tally.favorable() as f64 / total as f64;
    let status = if pct >= COMPLIANT_THRESHOLD {
        ComplianceStatus::Compliant
    } else if pct >= PARTIAL_THRESHOLD {
        ComplianceStatus::PartiallyCompliant
    } else {
        ComplianceStatus::NonCompliant
    };
    ComplianceResult {
        percentage: round_one_decimal(pct),
        status,
    }
}

// f64::round rounds half away from zero.
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `12.5` → `"12.5"`, `85.0` → `"85.0"`.
pub fn format_percentage(value: f64) -> String {
    format!("{:.1}", value)
}
