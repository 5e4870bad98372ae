//! Progress lines of the stream extractor, captured through the `log` facade.
//!
//! The logger is process-global, so this binary holds a single test.
use std::sync::Mutex;

use hitsieve::{io::stream_extractor::load_objects_from_str, Config};
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_json::{json, Value};

static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            LINES.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

#[test]
fn progress_counts_rejected_elements() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Info);

    let objects: Vec<String> = (0..25).map(|i| json!({ "n": i }).to_string()).collect();
    let text = format!("[{}]", objects.join(","));
    let config = Config::builder().log_every(5).build().unwrap();
    let (accepted, stats) =
        load_objects_from_str(&text, &config, |v: &mut Value| v["n"] == json!(24)).unwrap();

    assert_eq!(accepted.len(), 1);
    assert_eq!((stats.accepted, stats.rejected), (1, 24));

    let progress: Vec<String> = LINES
        .lock()
        .unwrap()
        .iter()
        .filter(|line| line.starts_with("... just parsed"))
        .cloned()
        .collect();
    assert_eq!(progress.len(), 5, "{progress:?}");
    for (line, seen) in progress.iter().zip([5, 10, 15, 20, 25]) {
        assert!(line.starts_with(&format!("... just parsed {seen} objects...")), "{line}");
    }
}
