#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! Helpers for the jinja-to-js test suites: one-time tracing setup, a
//! syntax check for generated JavaScript and an engine to run it.

use std::sync::LazyLock;
use std::time::Instant;

use boa_engine::{Context, Source};
use oxc::allocator::Allocator;
use oxc::parser::Parser;
use oxc::span::SourceType;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

struct Uptime;

impl FormatTime for Uptime {
    fn format_time(&self, w: &mut Writer<'_>) -> core::fmt::Result {
        let elapsed = START_TIME.elapsed();
        write!(w, "{:4}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis())
    }
}

static SUBSCRIBER_INIT: LazyLock<()> = LazyLock::new(|| {
    let _ = *START_TIME;

    let filter = std::env::var("JINJA_TO_JS_LOG")
        .ok()
        .and_then(|s| s.parse::<Targets>().ok())
        .unwrap_or_else(|| Targets::new().with_default(tracing::Level::TRACE));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_timer(Uptime)
                .with_target(false)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .ok();
});

/// Set up a tracing subscriber for tests.
///
/// Safe to call from every test: the subscriber is installed once per
/// process. Set `JINJA_TO_JS_LOG` (e.g. `jinja_to_js=debug`) to narrow the
/// output; everything is logged at `TRACE` by default.
pub fn setup() {
    #[allow(clippy::let_unit_value)]
    let _ = *SUBSCRIBER_INIT;
}

/// Panic with the parser diagnostics unless `code` is valid JavaScript.
///
/// `es_module` selects module grammar, which is needed for `import` and
/// `export` statements.
#[track_caller]
pub fn assert_valid_js(code: &str, es_module: bool) {
    let allocator = Allocator::default();
    let source_type = if es_module {
        SourceType::mjs()
    } else {
        SourceType::cjs()
    };
    let ret = Parser::new(&allocator, code, source_type).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        panic!(
            "generated JavaScript does not parse:\n{}\n--- code ---\n{code}",
            messages.join("\n")
        );
    }
}

/// A JavaScript engine for running compiled templates.
///
/// Scripts share one global scope, so a runtime library or templates
/// registered with it stay available to later calls.
pub struct JsEngine {
    context: Context,
}

impl Default for JsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl JsEngine {
    /// A fresh engine with nothing loaded.
    pub fn new() -> Self {
        Self {
            context: Context::default(),
        }
    }

    /// Run `script` and return its completion value as a string.
    #[track_caller]
    pub fn eval(&mut self, script: &str) -> String {
        let value = match self.context.eval(Source::from_bytes(script)) {
            Ok(value) => value,
            Err(err) => panic!("JavaScript threw: {err}\n--- script ---\n{script}"),
        };
        match value.to_string(&mut self.context) {
            Ok(s) => s.to_std_string_escaped(),
            Err(err) => panic!("result is not printable: {err}"),
        }
    }

    /// Call a compiled render function (global module format) with
    /// `context`, a JavaScript object literal.
    #[track_caller]
    pub fn render(&mut self, function: &str, context: &str) -> String {
        let script = format!("({})({context})", function.trim_end());
        self.eval(&script)
    }
}

/// An error type that panics when it's built, so tests can use `?` on any
/// error and still get a location in the failure message.
#[derive(Debug)]
pub struct IPanic;

impl<E> From<E> for IPanic
where
    E: core::error::Error + Send + Sync,
{
    #[track_caller]
    fn from(value: E) -> Self {
        panic!("from: {}: {value}", core::panic::Location::caller())
    }
}
