//! # Streaming extraction of objects from a huge JSON array
//!
//! Carves the top-level elements out of a JSON array **one object at a time**, so that
//! multi-million element exports never have to be resident in memory, and so that the
//! input does not need to be syntactically perfect around the array.
//!
//! ## Overview
//! -----------------
//! [`ObjectExtractor`] is a four-state byte scanner over any [`BufRead`]:
//!
//! ```text
//! SeekOpenBracket ──'['──▶ BetweenObjects ──'{'──▶ InsideObject ──depth 0──▶ ObjectClosed
//!                              ▲   │ ']'                                        │
//!                              │   ▼                                            │
//!                              │ Finished                                       │
//!                              └──────────────── yield substring ◀──────────────┘
//! ```
//!
//! - Everything before the first `[` is ignored (leading noise, BOM, log lines...).
//! - Between objects, separators and whitespace are skipped; `]` ends the stream.
//! - Inside an object, only `{` / `}` nesting is counted.
//!
//! [`FilteredObjects`] parses each substring independently with `serde_json` and passes
//! it to a caller-supplied filter, which may reject it (e.g. a hit without image payload)
//! before it lands in the output sequence. With [`FilteredObjects::with_progress`] it logs
//! a progress line every [`Config::log_every`] elements, accepted and rejected alike.
//! [`load_objects_from_stream`] drains it into a `Vec`.
//!
//! ## Limitations
//! -----------------
//! The scanner counts braces, it does not tokenize JSON: a string value containing an
//! unbalanced `{` or `}` breaks the element boundaries. Hit exports never contain such
//! strings (base64 payloads and numbers only).
//!
//! ## Error semantics
//! -----------------
//! A substring that does not parse as the target type raises
//! [`HitSieveError::MalformedObject`] and aborts the batch: there is no skip-and-continue.
//! Input ending inside an object raises [`HitSieveError::TruncatedInput`].
use std::io::{BufRead, Cursor, ErrorKind};
use std::marker::PhantomData;
use std::time::Instant;

use serde::de::DeserializeOwned;

use crate::{
    config::{log_step, Config},
    hitsieve_errors::HitSieveError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekOpenBracket,
    BetweenObjects,
    InsideObject,
    ObjectClosed,
    Finished,
}

/// Brace-counting state machine; kept apart from the reader so both can be borrowed
/// at the same time while a chunk is scanned.
#[derive(Debug)]
struct Scanner {
    state: ScanState,
    depth: usize,
    buffer: Vec<u8>,
}

impl Scanner {
    /// Advance the scanner by one byte.
    ///
    /// Return `true` when the byte ended the current scan (object closed or array end).
    fn step(&mut self, byte: u8) -> bool {
        match self.state {
            ScanState::SeekOpenBracket => {
                if byte == b'[' {
                    self.state = ScanState::BetweenObjects;
                }
                false
            }
            ScanState::BetweenObjects => match byte {
                b']' => {
                    self.state = ScanState::Finished;
                    true
                }
                b'{' => {
                    self.buffer.clear();
                    self.buffer.push(byte);
                    self.depth = 1;
                    self.state = ScanState::InsideObject;
                    false
                }
                _ => false,
            },
            ScanState::InsideObject => {
                self.buffer.push(byte);
                match byte {
                    b'{' => self.depth += 1,
                    b'}' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            self.state = ScanState::ObjectClosed;
                            return true;
                        }
                    }
                    _ => {}
                }
                false
            }
            ScanState::ObjectClosed | ScanState::Finished => true,
        }
    }
}

/// Lazy iterator over the raw text of each top-level object of a JSON array.
pub struct ObjectExtractor<R> {
    reader: R,
    scanner: Scanner,
    extracted: usize,
}

impl<R: BufRead> ObjectExtractor<R> {
    pub fn new(reader: R) -> Self {
        ObjectExtractor {
            reader,
            scanner: Scanner {
                state: ScanState::SeekOpenBracket,
                depth: 0,
                buffer: Vec::new(),
            },
            extracted: 0,
        }
    }

    /// Number of objects yielded so far.
    pub fn extracted(&self) -> usize {
        self.extracted
    }
}

impl<R: BufRead> Iterator for ObjectExtractor<R> {
    type Item = Result<String, HitSieveError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.scanner.state {
                ScanState::Finished => return None,
                ScanState::ObjectClosed => {
                    self.scanner.state = ScanState::BetweenObjects;
                    let index = self.extracted;
                    self.extracted += 1;
                    let bytes = std::mem::take(&mut self.scanner.buffer);
                    return Some(
                        String::from_utf8(bytes).map_err(|_| HitSieveError::InvalidUtf8(index)),
                    );
                }
                _ => {}
            }

            let available = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.scanner.state = ScanState::Finished;
                    return Some(Err(e.into()));
                }
            };

            if available.is_empty() {
                let truncated = self.scanner.state == ScanState::InsideObject;
                self.scanner.state = ScanState::Finished;
                return truncated.then(|| Err(HitSieveError::TruncatedInput(self.extracted)));
            }

            let mut consumed = 0;
            for &byte in available {
                consumed += 1;
                if self.scanner.step(byte) {
                    break;
                }
            }
            self.reader.consume(consumed);
        }
    }
}

/// Counters of a filtered extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub accepted: usize,
    pub rejected: usize,
}

impl LoadStats {
    /// Elements seen, accepted and rejected combined.
    pub fn total(&self) -> usize {
        self.accepted + self.rejected
    }
}

/// Progress cadence of a [`FilteredObjects`].
#[derive(Debug, Clone, Copy)]
struct Progress {
    every: usize,
    step: Instant,
}

/// Lazy iterator of parsed objects that pass a filter.
///
/// The filter receives each freshly parsed element by mutable reference, so it can both
/// decide acceptance and enrich the element (e.g. decode its image).
pub struct FilteredObjects<T, R, F> {
    extractor: ObjectExtractor<R>,
    filter: F,
    stats: LoadStats,
    progress: Option<Progress>,
    _target: PhantomData<fn() -> T>,
}

impl<T, R, F> FilteredObjects<T, R, F>
where
    T: DeserializeOwned,
    R: BufRead,
    F: FnMut(&mut T) -> bool,
{
    pub fn new(reader: R, filter: F) -> Self {
        FilteredObjects {
            extractor: ObjectExtractor::new(reader),
            filter,
            stats: LoadStats::default(),
            progress: None,
            _target: PhantomData,
        }
    }

    /// Log `... just parsed <n> objects...` each time `n`, the count of elements seen,
    /// reaches a multiple of `config.log_every`. Nothing is logged when `config.log` is off.
    pub fn with_progress(mut self, config: &Config) -> Self {
        self.progress = (config.log && config.log_every > 0).then(|| Progress {
            every: config.log_every,
            step: Instant::now(),
        });
        self
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    fn record(&mut self, accepted: bool) {
        if accepted {
            self.stats.accepted += 1;
        } else {
            self.stats.rejected += 1;
        }
        let seen = self.stats.total();
        if let Some(progress) = self.progress.as_mut() {
            if seen % progress.every == 0 {
                log_step(&format!("... just parsed {seen} objects..."), Some(progress.step));
                progress.step = Instant::now();
            }
        }
    }
}

impl<T, R, F> Iterator for FilteredObjects<T, R, F>
where
    T: DeserializeOwned,
    R: BufRead,
    F: FnMut(&mut T) -> bool,
{
    type Item = Result<T, HitSieveError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.extractor.next()? {
                Ok(raw) => raw,
                Err(e) => return Some(Err(e)),
            };
            let index = self.stats.total();
            let mut object: T = match serde_json::from_str(&raw) {
                Ok(o) => o,
                Err(source) => return Some(Err(HitSieveError::MalformedObject { index, source })),
            };
            let accepted = (self.filter)(&mut object);
            self.record(accepted);
            if accepted {
                return Some(Ok(object));
            }
        }
    }
}

/// Filter accepting every element.
pub fn accept_all<T>(_: &mut T) -> bool {
    true
}

/// Load every accepted object of a JSON array stream.
///
/// Arguments
/// -----------------
/// * `input`: the text stream; anything before the opening `[` is ignored.
/// * `config`: logging switch and cadence (`log_every`).
/// * `filter`: acceptance predicate, see [`FilteredObjects`].
///
/// Return
/// ----------
/// * The accepted objects in input order with the accepted/rejected counters, or the
///   first fatal error (malformed element, truncated input, I/O).
pub fn load_objects_from_stream<T, R, F>(
    input: R,
    config: &Config,
    filter: F,
) -> Result<(Vec<T>, LoadStats), HitSieveError>
where
    T: DeserializeOwned,
    R: BufRead,
    F: FnMut(&mut T) -> bool,
{
    let start = config.print_log("Parsing objects from the JSON input...", None);
    let mut objects = FilteredObjects::new(input, filter).with_progress(config);
    let mut ret = Vec::new();
    for object in &mut objects {
        ret.push(object?);
    }

    let stats = objects.stats();
    config.print_log(
        &format!(
            "... done, {} objects parsed ({} accepted, {} rejected)",
            stats.total(),
            stats.accepted,
            stats.rejected
        ),
        Some(start),
    );
    Ok((ret, stats))
}

/// Convenience wrapper of [`load_objects_from_stream`] over an in-memory string.
pub fn load_objects_from_str<T, F>(
    s: &str,
    config: &Config,
    filter: F,
) -> Result<(Vec<T>, LoadStats), HitSieveError>
where
    T: DeserializeOwned,
    F: FnMut(&mut T) -> bool,
{
    load_objects_from_stream(Cursor::new(s.as_bytes()), config, filter)
}

#[cfg(test)]
mod stream_extractor_test {
    use super::*;
    use serde_json::{json, Value};
    use std::io::BufReader;

    fn raw_objects(s: &str) -> Vec<String> {
        ObjectExtractor::new(Cursor::new(s.as_bytes()))
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_skips_leading_noise_and_separators() {
        let objects = raw_objects("garbage { not here } [ {\"a\":1},\n\n  {\"b\":2}\r\n]");
        assert_eq!(objects, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_nested_objects_are_one_element() {
        let objects = raw_objects(r#"[{"a":{"b":{"c":1}},"d":2},{"e":3}]"#);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0], r#"{"a":{"b":{"c":1}},"d":2}"#);
    }

    #[test]
    fn test_stops_at_closing_bracket() {
        let objects = raw_objects(r#"[{"a":1}] {"ignored":true}"#);
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn test_small_read_buffer() {
        // one byte per fill_buf call, objects straddle every chunk boundary
        let text = r#"[{"id":1,"v":[1,2,3]}, {"id":2,"v":{"w":[]}}]"#;
        let reader = BufReader::with_capacity(1, text.as_bytes());
        let objects: Vec<String> = ObjectExtractor::new(reader)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[1], r#"{"id":2,"v":{"w":[]}}"#);
    }

    #[test]
    fn test_truncated_input_is_fatal() {
        let mut it = ObjectExtractor::new(Cursor::new(&b"[{\"a\":1},{\"b\":"[..]));
        assert!(it.next().unwrap().is_ok());
        assert_eq!(
            it.next().unwrap().unwrap_err(),
            HitSieveError::TruncatedInput(1)
        );
        assert!(it.next().is_none());
    }

    #[test]
    fn test_missing_array_yields_nothing() {
        assert!(raw_objects("no array at all {\"a\":1}").is_empty());
    }

    #[test]
    fn test_filter_counts_accepted_and_rejected() {
        let config = Config::builder().log(false).build().unwrap();
        let text = r#"[{"n":1},{"n":2},{"n":3},{"n":4},{"n":5}]"#;
        let (objects, stats) = load_objects_from_str::<Value, _>(text, &config, |v| {
            v["n"].as_i64().unwrap_or(0) % 2 == 1
        })
        .unwrap();

        assert_eq!(objects, vec![json!({"n":1}), json!({"n":3}), json!({"n":5})]);
        assert_eq!(stats, LoadStats { accepted: 3, rejected: 2 });
        assert_eq!(stats.total(), 5);
    }

    #[test]
    fn test_malformed_element_aborts() {
        let config = Config::builder().log(false).build().unwrap();
        let text = r#"[{"n":1},{"n":},{"n":3}]"#;
        let err = load_objects_from_str::<Value, _>(text, &config, accept_all).unwrap_err();
        assert!(matches!(err, HitSieveError::MalformedObject { index: 1, .. }));
    }
}
