//! Test schema documents.
//!
//! A test case stores its schema as a tree of [`NodeDocument`]s, the loosely
//! typed shape that is persisted and accepted over the API. Before anything is
//! evaluated the document is converted into the closed [`Node`] tree, which is
//! where arity, callbacks and the Expect/Equals pairing are checked.
//!
//! # Document format
//!
//! ```json
//! {
//!   "kind": "Suite",
//!   "params": ["checkout", { "script": "()" }],
//!   "returns": null,
//!   "children": [
//!     {
//!       "kind": "Test",
//!       "params": ["totals add up", { "script": "()" }],
//!       "children": [
//!         { "kind": "Expect", "params": [{ "script": "1 + 1" }], "returns": "pipe" },
//!         { "kind": "Equals", "params": [2] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! A param is either a literal JSON value or a callback object holding a Rhai
//! script under the single key `script`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value as JsonValue, json};

pub mod error;
pub mod node;

pub use error::SchemaError;
pub use node::{Assertion, CustomNode, Group, Node, Subject};

pub const SUITE: &str = "Suite";
pub const TEST: &str = "Test";
pub const EXPECT: &str = "Expect";
pub const EQUALS: &str = "Equals";

/// Persisted form of a schema node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDocument {
    pub kind: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub returns: Option<Returns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_schema: Option<CustomSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_functions: Option<Vec<CustomFunction>>,
    #[serde(default)]
    pub children: Vec<NodeDocument>,
}

/// A node parameter: executable callback or literal value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Param {
    Callback(Callback),
    Value(JsonValue),
}

/// Rhai source evaluated in the callback sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Callback {
    pub script: String,
}

/// The pipe-sentinel: the node's result feeds the next sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Returns {
    Pipe,
}

/// Shape override for a custom node kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSchema {
    #[serde(default)]
    pub params: Vec<ParamKind>,
    #[serde(default = "default_allows_children")]
    pub allows_children: bool,
}

fn default_allows_children() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Value,
    Callback,
}

/// Named handler for a custom node kind. The handler whose name matches the
/// node's `kind` is the one invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFunction {
    pub name: String,
    pub script: String,
}

impl Callback {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// A callback that does nothing and returns unit.
    pub fn noop() -> Self {
        Self::new("()")
    }
}

impl<'de> Deserialize<'de> for Param {
    /// Only an object whose sole key is a string `script` is a callback.
    /// Arrays and every other shape stay literal values.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        let script = value
            .as_object()
            .filter(|map| map.len() == 1)
            .and_then(|map| map.get("script"))
            .and_then(JsonValue::as_str);

        Ok(match script {
            Some(script) => Param::callback(script),
            None => Param::Value(value),
        })
    }
}

impl Param {
    pub fn value(value: impl Into<JsonValue>) -> Self {
        Param::Value(value.into())
    }

    pub fn callback(script: impl Into<String>) -> Self {
        Param::Callback(Callback::new(script))
    }
}

impl NodeDocument {
    pub fn new(kind: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            kind: kind.into(),
            params,
            returns: None,
            custom_schema: None,
            custom_functions: None,
            children: vec![],
        }
    }

    pub fn suite(description: &str, children: Vec<NodeDocument>) -> Self {
        Self::new(
            SUITE,
            vec![Param::value(description), Param::Callback(Callback::noop())],
        )
        .with_children(children)
    }

    pub fn test(description: &str, children: Vec<NodeDocument>) -> Self {
        Self::new(
            TEST,
            vec![Param::value(description), Param::Callback(Callback::noop())],
        )
        .with_children(children)
    }

    pub fn expect(subject: Param) -> Self {
        Self::new(EXPECT, vec![subject]).with_returns(Returns::Pipe)
    }

    pub fn equals(expected: Param) -> Self {
        Self::new(EQUALS, vec![expected])
    }

    /// Default schema for a test case created from a bare name: a single
    /// suite and test wrapping an assertion that always holds.
    pub fn smoke(name: &str) -> Self {
        Self::suite(
            name,
            vec![Self::test(
                name,
                vec![
                    Self::expect(Param::value(json!(true))),
                    Self::equals(Param::value(json!(true))),
                ],
            )],
        )
    }

    pub fn with_children(mut self, children: Vec<NodeDocument>) -> Self {
        self.children = children;
        self
    }

    pub fn with_returns(mut self, returns: Returns) -> Self {
        self.returns = Some(returns);
        self
    }

    pub fn with_custom_schema(mut self, schema: CustomSchema) -> Self {
        self.custom_schema = Some(schema);
        self
    }

    pub fn with_custom_function(mut self, name: &str, script: &str) -> Self {
        self.custom_functions
            .get_or_insert_with(Vec::new)
            .push(CustomFunction {
                name: name.to_string(),
                script: script.to_string(),
            });
        self
    }

    pub fn is_pipe(&self) -> bool {
        self.returns == Some(Returns::Pipe)
    }

    /// Looks up the handler resolving this node's kind, if any.
    pub fn custom_function(&self) -> Option<&CustomFunction> {
        self.custom_functions
            .as_ref()?
            .iter()
            .find(|f| f.name == self.kind)
    }
}
