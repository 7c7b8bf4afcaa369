use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BreakReason {
    Overflow,
    Explicit,
}

impl BreakReason {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            BreakReason::Overflow => "overflow",
            BreakReason::Explicit => "explicit",
        }
    }
}

/// One JSON object, built field by field in insertion order.
struct Event(String);

impl Event {
    fn new(kind: &str, job: Option<usize>) -> Self {
        let mut line = format!("{{\"type\":\"{}\",\"job\":", json_escape(kind));
        match job {
            Some(id) => {
                let _ = write!(line, "{id}");
            }
            None => line.push_str("null"),
        }
        Event(line)
    }

    fn num(mut self, key: &str, value: impl std::fmt::Display) -> Self {
        let _ = write!(self.0, ",\"{key}\":{value}");
        self
    }

    fn text(mut self, key: &str, value: &str) -> Self {
        let _ = write!(self.0, ",\"{key}\":\"{}\"", json_escape(value));
        self
    }

    fn raw(mut self, key: &str, json: &str) -> Self {
        let _ = write!(self.0, ",\"{key}\":{json}");
        self
    }

    fn finish(mut self) -> String {
        self.0.push('}');
        self.0
    }
}

/// Per-render event counts, written out with that render's summary line.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Counters(BTreeMap<String, u64>);

impl Counters {
    pub fn bump(&mut self, key: &str) {
        let slot = self.0.entry(key.to_owned()).or_default();
        *slot = slot.saturating_add(1);
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    fn to_json(&self) -> String {
        let mut counts = String::from("{");
        for (n, (key, value)) in self.0.iter().enumerate() {
            if n > 0 {
                counts.push(',');
            }
            let _ = write!(counts, "\"{}\":{value}", json_escape(key));
        }
        counts.push('}');
        counts
    }
}

/// JSON-lines event log for layout decisions. Clones append to the same file;
/// every line carries the job it belongs to.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    out: Arc<Mutex<BufWriter<File>>>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let out = BufWriter::new(File::create(path)?);
        Ok(Self {
            out: Arc::new(Mutex::new(out)),
        })
    }

    fn write_event(&self, event: Event) {
        let line = event.finish();
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{line}");
        }
    }

    pub fn log_page_break(
        &self,
        job: Option<usize>,
        reason: BreakReason,
        from_page: usize,
        block_index: usize,
        block_kind: &str,
    ) {
        self.write_event(
            Event::new("layout.page_break", job)
                .text("reason", reason.as_str())
                .num("from_page", from_page)
                .num("to_page", from_page + 1)
                .num("block_index", block_index)
                .text("block", block_kind),
        );
    }

    pub fn log_image_unavailable(
        &self,
        job: Option<usize>,
        block_index: usize,
        handle: &str,
        error: &str,
    ) {
        self.write_event(
            Event::new("render.image_unavailable", job)
                .num("block_index", block_index)
                .text("handle", handle)
                .text("error", error),
        );
    }

    pub fn log_render_failed(&self, job: Option<usize>, block_index: usize, error: &str) {
        self.write_event(
            Event::new("render.failed", job)
                .num("block_index", block_index)
                .text("error", error),
        );
    }

    /// Writes one render's counters, sorted by key.
    pub fn emit_summary(&self, job: Option<usize>, context: &str, counters: &Counters) {
        self.write_event(
            Event::new("debug.summary", job)
                .text("context", context)
                .raw("counts", &counters.to_json()),
        );
    }

    pub fn flush(&self) {
        if let Ok(mut out) = self.out.lock() {
            let _ = out.flush();
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '"' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(escaped, "\\u{:04x}", u32::from(c));
            }
            c => escaped.push(c),
        }
    }
    escaped
}
