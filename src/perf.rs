use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::debug::json_escape;

#[derive(Debug, Default, Clone, Copy)]
struct SpanTotal {
    ms: f64,
    calls: u64,
}

struct PerfSink {
    out: BufWriter<File>,
    log_path: PathBuf,
    spans: HashMap<String, SpanTotal>,
    counts: HashMap<String, u64>,
}

/// Timing log. Each span and count set is one JSON line; per-name totals are
/// ranked into a sibling `<stem>_hot.log` when the last clone goes away.
#[derive(Clone)]
pub(crate) struct PerfLogger {
    sink: Arc<Mutex<PerfSink>>,
}

/// Logs its own lifetime as a span when dropped.
pub(crate) struct PerfSpan<'a> {
    logger: &'a PerfLogger,
    name: &'static str,
    job: Option<usize>,
    started: Instant,
}

impl Drop for PerfSpan<'_> {
    fn drop(&mut self) {
        let ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.logger.log_span_ms(self.name, self.job, ms);
    }
}

fn job_field(job: Option<usize>) -> String {
    match job {
        Some(id) => id.to_string(),
        None => "null".to_string(),
    }
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let log_path = path.as_ref().to_path_buf();
        let out = BufWriter::new(File::create(&log_path)?);
        Ok(Self {
            sink: Arc::new(Mutex::new(PerfSink {
                out,
                log_path,
                spans: HashMap::new(),
                counts: HashMap::new(),
            })),
        })
    }

    pub fn span(&self, name: &'static str, job: Option<usize>) -> PerfSpan<'_> {
        PerfSpan {
            logger: self,
            name,
            job,
            started: Instant::now(),
        }
    }

    pub fn log_span_ms(&self, name: &str, job: Option<usize>, ms: f64) {
        let line = format!(
            "{{\"type\":\"perf.span\",\"name\":\"{}\",\"job\":{},\"ms\":{:.3}}}",
            json_escape(name),
            job_field(job),
            ms
        );
        if let Ok(mut sink) = self.sink.lock() {
            let total = sink.spans.entry(name.to_string()).or_default();
            total.ms += ms;
            total.calls = total.calls.saturating_add(1);
            let _ = writeln!(sink.out, "{line}");
        }
    }

    pub fn log_counts(&self, name: &str, job: Option<usize>, counts: &[(&str, u64)]) {
        let fields: Vec<String> = counts
            .iter()
            .map(|(key, value)| format!("\"{}\":{}", json_escape(key), value))
            .collect();
        let line = format!(
            "{{\"type\":\"perf.counts\",\"name\":\"{}\",\"job\":{},\"counts\":{{{}}}}}",
            json_escape(name),
            job_field(job),
            fields.join(",")
        );
        if let Ok(mut sink) = self.sink.lock() {
            for (key, value) in counts {
                let total = sink.counts.entry(format!("{name}.{key}")).or_insert(0);
                *total = total.saturating_add(*value);
            }
            let _ = writeln!(sink.out, "{line}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = sink.out.flush();
        }
    }
}

impl PerfSink {
    fn write_hot(&self, out: &mut impl Write) -> io::Result<()> {
        let mut spans: Vec<(&String, &SpanTotal)> = self.spans.iter().collect();
        spans.sort_by(|a, b| b.1.ms.total_cmp(&a.1.ms).then_with(|| a.0.cmp(b.0)));
        for (rank, (name, total)) in spans.iter().enumerate() {
            let calls = total.calls.max(1);
            writeln!(
                out,
                "{{\"type\":\"perf.hot.span\",\"rank\":{},\"name\":\"{}\",\"ms\":{:.3},\"calls\":{},\"avg_ms\":{:.3}}}",
                rank + 1,
                json_escape(name),
                total.ms,
                calls,
                total.ms / calls as f64
            )?;
        }
        let mut counts: Vec<(&String, &u64)> = self.counts.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (rank, (name, value)) in counts.iter().enumerate() {
            writeln!(
                out,
                "{{\"type\":\"perf.hot.count\",\"rank\":{},\"name\":\"{}\",\"value\":{}}}",
                rank + 1,
                json_escape(name),
                value
            )?;
        }
        out.flush()
    }
}

impl Drop for PerfSink {
    fn drop(&mut self) {
        let _ = self.out.flush();
        if let Ok(file) = File::create(hot_log_path(&self.log_path)) {
            let _ = self.write_hot(&mut BufWriter::new(file));
        }
    }
}

fn hot_log_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("auditpress_perf.log");
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    };
    path.with_file_name(format!("{stem}_hot.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hot_log_sits_next_to_the_main_log() {
        assert_eq!(
            hot_log_path(Path::new("/tmp/run.perf.jsonl")),
            PathBuf::from("/tmp/run.perf_hot.log")
        );
        assert_eq!(hot_log_path(Path::new("perf")), PathBuf::from("perf_hot.log"));
    }

    #[test]
    fn spans_and_counts_are_written_and_ranked() {
        let path = std::env::temp_dir().join(format!("auditpress_perf_{}.log", std::process::id()));
        {
            let logger = PerfLogger::new(&path).unwrap();
            logger.log_span_ms("render.layout", Some(0), 2.0);
            logger.log_span_ms("render.layout", Some(1), 4.0);
            {
                let _span = logger.span("render.batch", None);
            }
            logger.log_counts("render.doc", None, &[("pages", 3), ("commands", 40)]);
            logger.flush();
        }
        let main = std::fs::read_to_string(&path).unwrap();
        assert_eq!(main.lines().count(), 4);
        assert!(main.contains("\"name\":\"render.batch\",\"job\":null"));
        assert!(main.contains("\"counts\":{\"pages\":3,\"commands\":40}"));

        let hot_path = hot_log_path(&path);
        let hot = std::fs::read_to_string(&hot_path).unwrap();
        assert!(hot.contains(
            "\"rank\":1,\"name\":\"render.layout\",\"ms\":6.000,\"calls\":2,\"avg_ms\":3.000"
        ));
        assert!(hot.contains("\"name\":\"render.doc.commands\",\"value\":40"));
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(&hot_path);
    }
}
