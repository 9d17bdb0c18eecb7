//! Cloud Logging structured output.
//!
//! [`CloudLoggingFormat`] writes one JSON object per event in the format the
//! Cloud Run logging agent parses:
//!
//! ```text
//! {"severity":"INFO","time":"2025-01-01T00:00:00.000000000Z","message":"...",
//!  "logging.googleapis.com/sourceLocation":{"file":"...","line":"42","function":"..."},
//!  "logging.googleapis.com/trace":"projects/my-project/traces/0af7...",
//!  "logging.googleapis.com/spanId":"b7ad6b7169203331",
//!  "logging.googleapis.com/trace_sampled":true, ...event fields}
//! ```
//!
//! Trace correlation comes from [`TraceContextLayer`], which picks up the
//! `trace_id`, `span_id` and `trace_sampled` fields recorded on any span.
//! The closest span carrying a trace wins.
//!
//! The project ID is required to build the fully-qualified trace name; when
//! it is empty the trace key is omitted and only the span ID is written.

use crate::env::snapshot;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

pub const SOURCE_LOCATION_KEY: &str = "logging.googleapis.com/sourceLocation";
pub const TRACE_KEY: &str = "logging.googleapis.com/trace";
pub const SPAN_ID_KEY: &str = "logging.googleapis.com/spanId";
pub const TRACE_SAMPLED_KEY: &str = "logging.googleapis.com/trace_sampled";

/// Span field names read by [`TraceContextLayer`].
pub const TRACE_ID_FIELD: &str = "trace_id";
pub const SPAN_ID_FIELD: &str = "span_id";
pub const TRACE_SAMPLED_FIELD: &str = "trace_sampled";

/// Header set by the Cloud Run frontend.
pub const CLOUD_TRACE_HEADER: &str = "x-cloud-trace-context";
/// W3C trace context header.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Cloud Logging severity for a tracing level.
#[must_use]
pub fn severity(level: Level) -> &'static str {
    match level {
        Level::TRACE => "DEFAULT",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARNING",
        Level::ERROR => "ERROR",
    }
}

// ============================================================================
// Trace context
// ============================================================================

/// Trace identity attached to a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// 32 lowercase hex characters.
    pub trace_id: String,
    /// 16 lowercase hex characters, empty when unknown.
    pub span_id: String,
    pub sampled: bool,
}

impl TraceContext {
    /// Parses `X-Cloud-Trace-Context: TRACE_ID/SPAN_ID;o=OPTIONS`.
    ///
    /// The span ID is decimal in this header and is converted to hex. The
    /// span ID and options are optional.
    #[must_use]
    pub fn parse_cloud_trace_header(value: &str) -> Option<Self> {
        let (ids, options) = match value.trim().split_once(';') {
            Some((ids, options)) => (ids, Some(options)),
            None => (value.trim(), None),
        };
        let (trace_id, span_id) = match ids.split_once('/') {
            Some((trace_id, span_id)) => (trace_id, Some(span_id)),
            None => (ids, None),
        };

        let trace_id = parse_hex_id(trace_id, 32)?;
        let span_id = match span_id.filter(|s| !s.is_empty()) {
            Some(span_id) => format!("{:016x}", span_id.parse::<u64>().ok()?),
            None => String::new(),
        };
        let sampled = options.is_some_and(|o| o.trim() == "o=1");

        Some(Self {
            trace_id,
            span_id,
            sampled,
        })
    }

    /// Parses a W3C `traceparent` header:
    /// `VERSION-TRACE_ID-PARENT_ID-FLAGS`.
    #[must_use]
    pub fn parse_traceparent(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;

        if version.len() != 2 || version.eq_ignore_ascii_case("ff") {
            return None;
        }
        // Version 00 has exactly four parts; later versions may append more.
        if version == "00" && parts.next().is_some() {
            return None;
        }

        let trace_id = parse_hex_id(trace_id, 32)?;
        let span_id = parse_hex_id(span_id, 16)?;
        if flags.len() != 2 {
            return None;
        }
        let flags = u8::from_str_radix(flags, 16).ok()?;

        Some(Self {
            trace_id,
            span_id,
            sampled: flags & 0x01 == 0x01,
        })
    }

    /// Trace context from request headers, preferring `traceparent`.
    #[must_use]
    pub fn from_headers<'a>(mut header: impl FnMut(&str) -> Option<&'a str>) -> Option<Self> {
        header(TRACEPARENT_HEADER)
            .and_then(Self::parse_traceparent)
            .or_else(|| header(CLOUD_TRACE_HEADER).and_then(Self::parse_cloud_trace_header))
    }
}

/// Lowercased `id` if it is `len` hex digits and not all zero.
fn parse_hex_id(id: &str, len: usize) -> Option<String> {
    let valid = id.len() == len
        && id.chars().all(|c| c.is_ascii_hexdigit())
        && id.chars().any(|c| c != '0');
    valid.then(|| id.to_ascii_lowercase())
}

/// Collects trace fields from span attributes and records.
#[derive(Default)]
struct TraceFieldVisitor {
    trace_id: Option<String>,
    span_id: Option<String>,
    sampled: Option<bool>,
}

impl TraceFieldVisitor {
    fn set(&mut self, field: &Field, value: String) {
        match field.name() {
            TRACE_ID_FIELD => self.trace_id = Some(value),
            SPAN_ID_FIELD => self.span_id = Some(value),
            TRACE_SAMPLED_FIELD => self.sampled = Some(value == "true"),
            _ => {}
        }
    }

    fn is_empty(&self) -> bool {
        self.trace_id.is_none() && self.span_id.is_none() && self.sampled.is_none()
    }

    fn apply(self, context: &mut TraceContext) {
        if let Some(trace_id) = self.trace_id {
            context.trace_id = trace_id;
        }
        if let Some(span_id) = self.span_id {
            context.span_id = span_id;
        }
        if let Some(sampled) = self.sampled {
            context.sampled = sampled;
        }
    }
}

impl Visit for TraceFieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == TRACE_SAMPLED_FIELD {
            self.sampled = Some(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.set(field, format!("{value:?}"));
    }
}

/// Layer storing a [`TraceContext`] in the extensions of every span that
/// records a `trace_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceContextLayer;

impl TraceContextLayer {
    fn update<S>(id: &Id, visitor: TraceFieldVisitor, ctx: &Context<'_, S>)
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        if visitor.is_empty() {
            return;
        }
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut extensions = span.extensions_mut();
        if let Some(existing) = extensions.get_mut::<TraceContext>() {
            visitor.apply(existing);
        } else {
            let mut context = TraceContext {
                trace_id: String::new(),
                span_id: String::new(),
                sampled: false,
            };
            visitor.apply(&mut context);
            extensions.insert(context);
        }
    }
}

impl<S> Layer<S> for TraceContextLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = TraceFieldVisitor::default();
        attrs.record(&mut visitor);
        Self::update(id, visitor, &ctx);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let mut visitor = TraceFieldVisitor::default();
        values.record(&mut visitor);
        Self::update(id, visitor, &ctx);
    }
}

// ============================================================================
// Event formatting
// ============================================================================

/// JSON event formatter for Cloud Logging.
///
/// Clones share the project ID, so a formatter installed before the
/// configuration is loaded can be given the project afterwards.
#[derive(Debug, Clone, Default)]
pub struct CloudLoggingFormat {
    project_id: Arc<OnceLock<String>>,
}

impl CloudLoggingFormat {
    /// Formatter qualifying trace IDs with `project_id`.
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        let format = Self::deferred();
        format.set_project_id(project_id);
        format
    }

    /// Formatter whose project ID is set later with
    /// [`set_project_id`](Self::set_project_id).
    #[must_use]
    pub fn deferred() -> Self {
        Self::default()
    }

    /// Set the project ID once. Returns false if it was already set or
    /// `project_id` is empty.
    pub fn set_project_id(&self, project_id: impl Into<String>) -> bool {
        let project_id = project_id.into();
        !project_id.is_empty() && self.project_id.set(project_id).is_ok()
    }

    /// Project ID in use, empty until set.
    #[must_use]
    pub fn project_id(&self) -> &str {
        self.project_id.get().map_or("", String::as_str)
    }
}

/// Writes event fields into a JSON object.
struct JsonVisitor<'a>(&'a mut Map<String, Value>);

impl Visit for JsonVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.0
            .insert(field.name().to_string(), Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().to_string(), Value::from(format!("{value:?}")));
    }
}

impl<S, N> FormatEvent<S, N> for CloudLoggingFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let mut entry = Map::new();

        // Event fields first so the reserved keys below cannot be shadowed.
        event.record(&mut JsonVisitor(&mut entry));

        entry.insert("severity".to_string(), Value::from(severity(*meta.level())));
        entry.insert(
            "time".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)),
        );
        entry
            .entry("message".to_string())
            .or_insert_with(|| Value::from(""));

        let mut location = Map::new();
        if let Some(file) = meta.file() {
            location.insert("file".to_string(), Value::from(file));
        }
        if let Some(line) = meta.line() {
            location.insert("line".to_string(), Value::from(line.to_string()));
        }
        location.insert("function".to_string(), Value::from(meta.target()));
        entry.insert(SOURCE_LOCATION_KEY.to_string(), Value::Object(location));

        // Spans that only carry a span ID or sampling flag do not hide an
        // outer trace.
        let mut trace = None;
        if let Some(scope) = ctx.event_scope() {
            for span in scope {
                let extensions = span.extensions();
                let found = extensions
                    .get::<TraceContext>()
                    .filter(|t| !t.trace_id.is_empty());
                if let Some(found) = found {
                    trace = Some(found.clone());
                    break;
                }
            }
        }
        if let Some(trace) = trace {
            let project_id = self.project_id();
            if !project_id.is_empty() {
                entry.insert(
                    TRACE_KEY.to_string(),
                    Value::from(format!("projects/{project_id}/traces/{}", trace.trace_id)),
                );
            }
            if !trace.span_id.is_empty() {
                entry.insert(SPAN_ID_KEY.to_string(), Value::from(trace.span_id));
            }
            entry.insert(TRACE_SAMPLED_KEY.to_string(), Value::from(trace.sampled));
        }

        let line = serde_json::to_string(&entry).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

// ============================================================================
// Initialization
// ============================================================================

/// Filter directive from `LOG_LEVEL`, `RUST_LOG` or `default`, in that order.
///
/// `LOG_LEVEL` takes a single level name (`trace`, `debug`, `info`, `warn`,
/// `error`; `warning`, `fatal` and `panic` are accepted as aliases). Invalid
/// values are ignored.
#[must_use]
pub fn log_directive(vars: &HashMap<String, String>, default: &str) -> String {
    if let Some(level) = vars.get("LOG_LEVEL").and_then(|l| parse_level(l)) {
        return level.to_string().to_ascii_lowercase();
    }

    vars.get("RUST_LOG")
        .filter(|v| !v.is_empty() && EnvFilter::try_new(v.as_str()).is_ok())
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

fn parse_level(value: &str) -> Option<Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        "fatal" | "panic" | "critical" => Some(Level::ERROR),
        other => Level::from_str(other).ok(),
    }
}

/// Install the global subscriber writing Cloud Logging JSON to stdout.
///
/// Keep a clone of `format` to set the project ID once it is known.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init_logging(
    format: CloudLoggingFormat,
    default_directive: &str,
) -> Result<(), TryInitError> {
    let directive = log_directive(&snapshot(), default_directive);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(TraceContextLayer)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stdout),
        )
        .try_init()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;
    use tracing::{debug, info, info_span, warn};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn lines(&self) -> Vec<Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }
    }

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(project_id: &str, f: impl FnOnce()) -> Vec<Value> {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::registry().with(TraceContextLayer).with(
            tracing_subscriber::fmt::layer()
                .event_format(CloudLoggingFormat::new(project_id))
                .with_writer(buffer.clone()),
        );
        tracing::subscriber::with_default(subscriber, f);
        buffer.lines()
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity(Level::TRACE), "DEFAULT");
        assert_eq!(severity(Level::DEBUG), "DEBUG");
        assert_eq!(severity(Level::INFO), "INFO");
        assert_eq!(severity(Level::WARN), "WARNING");
        assert_eq!(severity(Level::ERROR), "ERROR");
    }

    #[test]
    fn test_event_format() {
        let lines = capture("my-project", || {
            warn!(target: "runcfg.test", attempts = 3, path = "instance/id", "Fetch slow");
        });

        let entry = lines.first().unwrap();
        assert_eq!(entry["severity"], "WARNING");
        assert_eq!(entry["message"], "Fetch slow");
        assert_eq!(entry["attempts"], 3);
        assert_eq!(entry["path"], "instance/id");
        assert_eq!(entry[SOURCE_LOCATION_KEY]["function"], "runcfg.test");
        assert!(entry[SOURCE_LOCATION_KEY]["file"]
            .as_str()
            .unwrap()
            .ends_with("logging.rs"));
        assert!(entry["time"].as_str().unwrap().ends_with('Z'));
        assert!(entry.get(TRACE_KEY).is_none());
    }

    #[test]
    fn test_trace_correlation_from_span() {
        let lines = capture("my-project", || {
            let span = info_span!(
                "request",
                trace_id = "4bf92f3577b34da6a3ce929d0e0e4736",
                span_id = "00f067aa0ba902b7",
                trace_sampled = true
            );
            let _enter = span.enter();
            info!("Handling request");
        });

        let entry = lines.first().unwrap();
        assert_eq!(
            entry[TRACE_KEY],
            "projects/my-project/traces/4bf92f3577b34da6a3ce929d0e0e4736"
        );
        assert_eq!(entry[SPAN_ID_KEY], "00f067aa0ba902b7");
        assert_eq!(entry[TRACE_SAMPLED_KEY], true);
    }

    #[test]
    fn test_trace_recorded_after_creation_and_inherited() {
        let lines = capture("my-project", || {
            let outer = info_span!(
                "request",
                trace_id = tracing::field::Empty,
                span_id = tracing::field::Empty
            );
            outer.record("trace_id", "0af7651916cd43dd8448eb211c80319c");
            outer.record("span_id", "b7ad6b7169203331");
            let _outer = outer.enter();
            let inner = info_span!("db");
            let _inner = inner.enter();
            debug!("Nested event");
        });

        let entry = lines.first().unwrap();
        assert_eq!(
            entry[TRACE_KEY],
            "projects/my-project/traces/0af7651916cd43dd8448eb211c80319c"
        );
        assert_eq!(entry[TRACE_SAMPLED_KEY], false);
    }

    #[test]
    fn test_inner_span_without_trace_id_keeps_outer_trace() {
        let lines = capture("my-project", || {
            let request = info_span!(
                "request",
                trace_id = "4bf92f3577b34da6a3ce929d0e0e4736",
                span_id = "00f067aa0ba902b7"
            );
            let _request = request.enter();
            let work = info_span!("work", span_id = "abc");
            let _work = work.enter();
            info!("Doing work");
        });

        let entry = lines.first().unwrap();
        assert_eq!(
            entry[TRACE_KEY],
            "projects/my-project/traces/4bf92f3577b34da6a3ce929d0e0e4736"
        );
        assert_eq!(entry[SPAN_ID_KEY], "00f067aa0ba902b7");
    }

    #[test]
    fn test_trace_without_project_omits_trace_key() {
        let lines = capture("", || {
            let span = info_span!(
                "request",
                trace_id = "4bf92f3577b34da6a3ce929d0e0e4736",
                span_id = "00f067aa0ba902b7"
            );
            let _enter = span.enter();
            info!("No project");
        });

        let entry = lines.first().unwrap();
        assert!(entry.get(TRACE_KEY).is_none());
        assert_eq!(entry[SPAN_ID_KEY], "00f067aa0ba902b7");
    }

    #[test]
    fn test_deferred_project_id_applies_to_clones() {
        let format = CloudLoggingFormat::deferred();
        let installed = format.clone();
        assert_eq!(installed.project_id(), "");

        assert!(!format.set_project_id(""));
        assert!(format.set_project_id("late-project"));
        assert!(!format.set_project_id("other-project"));

        assert_eq!(installed.project_id(), "late-project");
    }

    #[test]
    fn test_parse_cloud_trace_header() {
        let ctx =
            TraceContext::parse_cloud_trace_header("105445AA7843BC8BF206B12000100000/1;o=1").unwrap();

        assert_eq!(ctx.trace_id, "105445aa7843bc8bf206b12000100000");
        assert_eq!(ctx.span_id, "0000000000000001");
        assert!(ctx.sampled);

        let ctx = TraceContext::parse_cloud_trace_header("105445aa7843bc8bf206b12000100000").unwrap();
        assert_eq!(ctx.span_id, "");
        assert!(!ctx.sampled);

        assert!(TraceContext::parse_cloud_trace_header("not-a-trace/1;o=1").is_none());
        assert!(TraceContext::parse_cloud_trace_header("105445aa7843bc8bf206b12000100000/abc").is_none());
        assert!(TraceContext::parse_cloud_trace_header("00000000000000000000000000000000/1").is_none());
    }

    #[test]
    fn test_parse_traceparent() {
        let ctx = TraceContext::parse_traceparent(
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        )
        .unwrap();

        assert_eq!(ctx.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.span_id, "00f067aa0ba902b7");
        assert!(ctx.sampled);

        let unsampled = TraceContext::parse_traceparent(
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00",
        )
        .unwrap();
        assert!(!unsampled.sampled);

        for invalid in [
            "",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7",
            "ff-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
            "00-00000000000000000000000000000000-00f067aa0ba902b7-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01-extra",
            "00-4bf92f3577b34da6a3ce929d0e0e473-00f067aa0ba902b7-01",
        ] {
            assert!(TraceContext::parse_traceparent(invalid).is_none(), "{invalid}");
        }
    }

    #[test]
    fn test_from_headers_prefers_traceparent() {
        let headers: HashMap<&str, &str> = [
            (
                TRACEPARENT_HEADER,
                "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
            ),
            (CLOUD_TRACE_HEADER, "105445aa7843bc8bf206b12000100000/1;o=1"),
        ]
        .into_iter()
        .collect();

        let ctx = TraceContext::from_headers(|name| headers.get(name).copied()).unwrap();
        assert_eq!(ctx.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");

        let ctx = TraceContext::from_headers(|name| {
            (name == CLOUD_TRACE_HEADER).then_some("105445aa7843bc8bf206b12000100000/1;o=0")
        })
        .unwrap();
        assert_eq!(ctx.trace_id, "105445aa7843bc8bf206b12000100000");
        assert!(!ctx.sampled);
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_log_directive_precedence() {
        assert_eq!(log_directive(&vars(&[]), "info"), "info");
        assert_eq!(
            log_directive(&vars(&[("RUST_LOG", "runcfg=debug")]), "info"),
            "runcfg=debug"
        );
        assert_eq!(
            log_directive(
                &vars(&[("LOG_LEVEL", "WARNING"), ("RUST_LOG", "runcfg=debug")]),
                "info"
            ),
            "warn"
        );
        assert_eq!(log_directive(&vars(&[("LOG_LEVEL", "fatal")]), "info"), "error");
        assert_eq!(
            log_directive(&vars(&[("LOG_LEVEL", "verbose")]), "info"),
            "info",
            "invalid LOG_LEVEL is ignored"
        );
    }
}
