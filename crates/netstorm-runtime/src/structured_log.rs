//! NDJSON output for storm log records.
//!
//! Provides:
//! - [`RecordEmitter`]: writes one JSON object per line to a file, stdout, or
//!   an in-memory buffer.
//! - [`validate_record_line`]: checks a single line against the record schema.
//! - [`validate_record_file`]: checks an entire NDJSON file.
//!
//! Record schema: `name` (string), `rate` (number in `[0, 1]`), `rateDelta`
//! (number or `null`), `@timestamp` (integer epoch milliseconds).

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use netstorm_core::LogRecord;
use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Writes storm log records as NDJSON.
pub struct RecordEmitter {
    writer: Box<dyn Write + Send>,
    written: u64,
}

impl std::fmt::Debug for RecordEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordEmitter")
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

impl RecordEmitter {
    /// Create an emitter that writes to a file (truncating it).
    pub fn to_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::to_writer(std::io::BufWriter::new(file)))
    }

    /// Create an emitter that writes to stdout.
    #[must_use]
    pub fn to_stdout() -> Self {
        Self::to_writer(std::io::stdout())
    }

    /// Create an emitter over any writer.
    #[must_use]
    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            written: 0,
        }
    }

    /// Create an emitter over a shared buffer (for testing).
    #[must_use]
    pub fn to_buffer() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::to_writer(buffer.clone()), buffer)
    }

    /// Write one line per record and flush, so followers see whole ticks.
    pub fn emit(&mut self, records: &[LogRecord]) -> std::io::Result<()> {
        for record in records {
            let line = record.to_jsonl().map_err(std::io::Error::other)?;
            writeln!(self.writer, "{line}")?;
            self.written += 1;
        }
        self.writer.flush()
    }

    /// Number of records written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }
}

/// Cloneable in-memory writer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation error for a record line.
#[derive(Debug)]
pub struct RecordValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for RecordValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

/// Validate a single NDJSON line against the record schema.
pub fn validate_record_line(
    line: &str,
    line_number: usize,
) -> Result<LogRecord, Vec<RecordValidationError>> {
    let error = |field: &str, message: String| RecordValidationError {
        line_number,
        field: field.to_string(),
        message,
    };

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Err(vec![error("<json>", format!("invalid JSON: {e}"))]),
    };
    let Some(obj) = value.as_object() else {
        return Err(vec![error("<root>", "expected JSON object".to_string())]);
    };

    let mut errors = Vec::new();

    let name = obj.get("name").and_then(|v| v.as_str());
    if name.is_none() {
        errors.push(error("name", "required string field missing".to_string()));
    }

    let rate = obj.get("rate").and_then(|v| v.as_f64());
    match rate {
        None => errors.push(error("rate", "required number field missing".to_string())),
        Some(r) if !(0.0..=1.0).contains(&r) => {
            errors.push(error("rate", format!("{r} is outside [0, 1]")));
        }
        Some(_) => {}
    }

    let rate_delta = match obj.get("rateDelta") {
        Some(serde_json::Value::Null) => None,
        Some(v) => match v.as_f64() {
            Some(d) => Some(d),
            None => {
                errors.push(error("rateDelta", "expected number or null".to_string()));
                None
            }
        },
        None => {
            errors.push(error("rateDelta", "required field missing".to_string()));
            None
        }
    };

    let timestamp = obj.get("@timestamp").and_then(|v| v.as_u64());
    if timestamp.is_none() {
        errors.push(error(
            "@timestamp",
            "required integer field missing".to_string(),
        ));
    }

    match (name, rate, timestamp) {
        (Some(name), Some(rate), Some(timestamp)) if errors.is_empty() => Ok(LogRecord {
            name: name.to_string(),
            rate,
            rate_delta,
            timestamp,
        }),
        _ => Err(errors),
    }
}

/// Validate every non-empty line of an NDJSON file.
///
/// Returns the parsed records, or every error found.
pub fn validate_record_file(path: &Path) -> Result<Vec<LogRecord>, Vec<RecordValidationError>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        vec![RecordValidationError {
            line_number: 0,
            field: "<file>".to_string(),
            message: format!("cannot read {}: {e}", path.display()),
        }]
    })?;

    let mut records = Vec::new();
    let mut errors = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match validate_record_line(line, idx + 1) {
            Ok(record) => records.push(record),
            Err(mut errs) => errors.append(&mut errs),
        }
    }
    if errors.is_empty() { Ok(records) } else { Err(errors) }
}
