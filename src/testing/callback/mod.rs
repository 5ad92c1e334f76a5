//! # Callback sandbox
//!
//! Schema params may be executable callbacks. They are Rhai scripts run in a
//! restricted engine: no `eval`, no `import`, no file I/O, and bounded
//! operations, call depth, expression depth and collection sizes (see
//! [`SandboxConfig`]).
//!
//! Every invocation gets a fresh [`rhai::Scope`], so callbacks cannot see each
//! other's variables. The scope carries a few read-only constants:
//!
//! - `path`: the node path, e.g. `checkout/totals add up`
//! - `description`: the enclosing Suite/Test description, or `()`
//! - `params`: resolved params of a custom node, or `()`
//!
//! Output from `print`, `debug` and the registered `log` function is captured
//! and returned with the invocation so it can go into the run log.
//!
//! ```rhai
//! let total = 2 + 2;
//! log(`computed ${total} for ${path}`);
//! total
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use rhai::{Dynamic, Scope};
use serde_json::Value as JsonValue;

use crate::config::SandboxConfig;
use crate::schema::Callback;

pub mod convert;

use convert::{ConvertError, JsonConverter};

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("callback at {path} failed to compile: {source}")]
    Compile {
        path: String,
        #[source]
        source: rhai::ParseError,
    },

    #[error("callback at {path} failed: {message}")]
    Runtime { path: String, message: String },

    #[error("callback at {path} returned an unusable value: {source}")]
    Convert {
        path: String,
        #[source]
        source: ConvertError,
    },
}

/// Read-only context handed to a callback.
#[derive(Debug, Clone, Copy)]
pub struct CallbackContext<'a> {
    pub path: &'a str,
    pub description: Option<&'a str>,
    pub params: Option<&'a [JsonValue]>,
}

impl<'a> CallbackContext<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            description: None,
            params: None,
        }
    }

    pub fn with_description(mut self, description: &'a str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_params(mut self, params: &'a [JsonValue]) -> Self {
        self.params = Some(params);
        self
    }

    fn scope(&self) -> Result<Scope<'static>, ConvertError> {
        let mut scope = Scope::new();
        scope.push_constant("path", self.path.to_string());

        match self.description {
            Some(description) => scope.push_constant("description", description.to_string()),
            None => scope.push_constant_dynamic("description", Dynamic::UNIT),
        };

        let params = match self.params {
            Some(params) => Dynamic::try_from(JsonConverter::new(JsonValue::Array(params.to_vec())))?,
            None => Dynamic::UNIT,
        };
        scope.push_constant_dynamic("params", params);

        Ok(scope)
    }
}

/// Result of a single callback invocation plus whatever it printed.
#[derive(Debug)]
pub struct Invocation {
    pub value: Result<JsonValue, CallbackError>,
    pub output: Vec<String>,
}

/// Sandboxed Rhai engine used to run callbacks.
///
/// One engine serves one evaluation; it holds no state between invocations
/// apart from the output buffer, which is drained after each call.
pub struct CallbackEngine {
    engine: rhai::Engine,
    output: Arc<Mutex<Vec<String>>>,
}

impl CallbackEngine {
    pub fn new(config: &SandboxConfig) -> Self {
        let output = Arc::new(Mutex::new(Vec::new()));
        let engine = Self::sandboxed_engine(config, output.clone());

        Self { engine, output }
    }

    /// Runs a callback in a fresh scope and converts its return value to JSON.
    pub fn invoke(&self, callback: &Callback, ctx: &CallbackContext<'_>) -> Invocation {
        let value = self.execute(callback, ctx);
        let output = std::mem::take(&mut *self.output.lock());

        Invocation { value, output }
    }

    fn execute(
        &self,
        callback: &Callback,
        ctx: &CallbackContext<'_>,
    ) -> Result<JsonValue, CallbackError> {
        let ast = self
            .engine
            .compile(&callback.script)
            .map_err(|source| CallbackError::Compile {
                path: ctx.path.to_string(),
                source,
            })?;

        let mut scope = ctx.scope().map_err(|source| CallbackError::Convert {
            path: ctx.path.to_string(),
            source,
        })?;

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
            .map_err(|err| CallbackError::Runtime {
                path: ctx.path.to_string(),
                message: err.to_string(),
            })?;

        JsonConverter::try_from(result)
            .map(JsonConverter::into_value)
            .map_err(|source| CallbackError::Convert {
                path: ctx.path.to_string(),
                source,
            })
    }

    fn sandboxed_engine(config: &SandboxConfig, output: Arc<Mutex<Vec<String>>>) -> rhai::Engine {
        let mut engine = rhai::Engine::new();

        // Disable dangerous operations
        engine.disable_symbol("eval");
        engine.disable_symbol("load_file");
        engine.disable_symbol("load_script");
        engine.disable_symbol("import");

        // Disable file I/O
        engine.disable_symbol("open");
        engine.disable_symbol("close");
        engine.disable_symbol("read_line");
        engine.disable_symbol("write");
        engine.disable_symbol("flush");

        engine.set_max_operations(config.max_operations);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
        engine.set_max_string_size(config.max_string_size);
        engine.set_max_array_size(config.max_array_size);
        engine.set_max_map_size(config.max_map_size);

        let print_sink = output.clone();
        engine.on_print(move |text| print_sink.lock().push(text.to_string()));

        let debug_sink = output.clone();
        engine.on_debug(move |text, _source, _pos| debug_sink.lock().push(text.to_string()));

        engine.register_fn("log", move |value: Dynamic| output.lock().push(value.to_string()));

        engine.register_fn(
            "json_decode",
            |json_str: &str| -> Result<Dynamic, Box<rhai::EvalAltResult>> {
                let json_value = serde_json::from_str(json_str)
                    .map_err(|e| format!("Rhai JSON parse error: {}", e))?;

                Dynamic::try_from(JsonConverter::new(json_value))
                    .map_err(|e| format!("JSON conversion error: {}", e).into())
            },
        );

        engine.register_fn(
            "json_encode",
            |d: Dynamic| -> Result<String, Box<rhai::EvalAltResult>> {
                let converter = JsonConverter::try_from(d)
                    .map_err(|e| format!("JSON conversion error: {}", e))?;
                serde_json::to_string(&converter.into_value())
                    .map_err(|e| format!("Rhai JSON encode error: {}", e).into())
            },
        );

        engine
    }
}
