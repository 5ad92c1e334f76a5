use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use super::{LogBuffer, LogEntry, LogLevel};

const TEST_CASE_ID: &str = "test_case_id";

/// Copies every event into a [`LogBuffer`], tagged with the test case it
/// belongs to when the event or one of its spans names one.
#[derive(Clone)]
pub struct LogBufferLayer {
    buffer: LogBuffer,
}

impl LogBufferLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }

    fn remember_test_case_id<S>(&self, id: &Id, test_case_id: Option<String>, ctx: &Context<'_, S>)
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let (Some(test_case_id), Some(span)) = (test_case_id, ctx.span(id)) else {
            return;
        };

        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanTestCase>() {
            Some(existing) => existing.0 = test_case_id,
            None => extensions.insert(SpanTestCase(test_case_id)),
        }
    }
}

thread_local! {
    static IN_LAYER: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside the layer so events emitted while
/// buffering are dropped instead of recursing.
struct Reentrancy;

impl Reentrancy {
    fn enter() -> Option<Self> {
        IN_LAYER.with(|flag| (!flag.replace(true)).then_some(Reentrancy))
    }
}

impl Drop for Reentrancy {
    fn drop(&mut self) {
        IN_LAYER.with(|flag| flag.set(false));
    }
}

impl<S> Layer<S> for LogBufferLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(_guard) = Reentrancy::enter() else {
            return;
        };

        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let test_case_id = visitor.test_case_id.or_else(|| {
            ctx.event_scope(event)?.find_map(|span| {
                let extensions = span.extensions();
                extensions.get::<SpanTestCase>().map(|tagged| tagged.0.clone())
            })
        });

        self.buffer.push(LogEntry {
            timestamp: chrono::Utc::now(),
            level: LogLevel::from(metadata.level()),
            message: visitor.message,
            test_case_id,
            target: metadata.target().to_string(),
            fields: visitor.fields,
        });
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        self.remember_test_case_id(id, visitor.test_case_id, &ctx);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);
        self.remember_test_case_id(id, visitor.test_case_id, &ctx);
    }
}

/// Span extension holding the test case a span was opened for.
#[derive(Debug)]
struct SpanTestCase(String);

#[derive(Default)]
struct FieldVisitor {
    message: String,
    test_case_id: Option<String>,
    fields: BTreeMap<String, String>,
}

impl FieldVisitor {
    fn store(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            TEST_CASE_ID => self.test_case_id = Some(value),
            name => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

/// Debug output of `&str` values arrives wrapped in quotes.
fn strip_debug_quotes(s: String) -> String {
    match s.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(inner) => inner.to_string(),
        None => s,
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field, strip_debug_quotes(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }
}
