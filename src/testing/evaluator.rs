//! Schema evaluation.
//!
//! Walks a [`Node`] tree depth-first, left to right, on a single thread.
//! Suite, Test and custom nodes stop at the first child that fails or errors
//! and propagate that verdict upward; siblings after it are never evaluated.
//! Callback errors are caught at the node that raised them and turn into an
//! `error` verdict. Nothing here touches storage.

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::SandboxConfig;
use crate::schema::{Assertion, Callback, CustomNode, EQUALS, EXPECT, Group, Node, Param, Subject};
use crate::testing::callback::{CallbackContext, CallbackEngine};
use crate::testing::outcome::{Outcome, RunStatus};

const INDENT: &str = "  ";

pub struct Evaluator {
    engine: CallbackEngine,
}

enum Verdict {
    Pass,
    Fail(String),
    Error(String),
}

impl Verdict {
    fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

#[derive(Default)]
struct RunLog {
    lines: Vec<String>,
    assertions: usize,
}

impl RunLog {
    fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", INDENT.repeat(depth), text.as_ref()));
    }

    fn output(&mut self, depth: usize, lines: Vec<String>) {
        for line in lines {
            self.line(depth, format!("> {}", line));
        }
    }
}

impl Evaluator {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            engine: CallbackEngine::new(config),
        }
    }

    pub fn evaluate(&self, root: &Node) -> Outcome {
        let mut log = RunLog::default();
        let verdict = self.visit(root, "", 0, &mut log);

        let (status, result) = match verdict {
            Verdict::Pass => (RunStatus::Pass, pass_summary(log.assertions)),
            Verdict::Fail(message) => (RunStatus::Fail, message),
            Verdict::Error(message) => (RunStatus::Error, message),
        };

        debug!(
            status = %status,
            assertions = log.assertions,
            lines = log.lines.len(),
            "evaluation finished"
        );

        Outcome {
            status,
            result,
            logs: log.lines,
        }
    }

    fn visit(&self, node: &Node, parent: &str, depth: usize, log: &mut RunLog) -> Verdict {
        match node {
            Node::Suite(group) => self.visit_group("suite", group, parent, depth, log),
            Node::Test(group) => self.visit_group("test", group, parent, depth, log),
            Node::Assertion(assertion) => self.visit_assertion(assertion, parent, depth, log),
            Node::Custom(custom) => self.visit_custom(custom, parent, depth, log),
        }
    }

    fn visit_group(
        &self,
        label: &str,
        group: &Group,
        parent: &str,
        depth: usize,
        log: &mut RunLog,
    ) -> Verdict {
        let path = join_path(parent, &group.description);
        log.line(depth, format!("{}: {}", label, group.description));

        let ctx = CallbackContext::new(&path).with_description(&group.description);
        if let Err(message) = self.call(&group.callback, &ctx, depth + 1, log) {
            return Verdict::Error(message);
        }

        self.visit_children(&group.children, &path, depth + 1, log)
    }

    fn visit_children(
        &self,
        children: &[Node],
        path: &str,
        depth: usize,
        log: &mut RunLog,
    ) -> Verdict {
        for (index, child) in children.iter().enumerate() {
            let verdict = self.visit(child, path, depth, log);
            if verdict.is_pass() {
                continue;
            }

            let skipped = children.len() - index - 1;
            if skipped > 0 {
                log.line(depth, format!("skipped {} remaining", skipped));
            }
            return verdict;
        }

        Verdict::Pass
    }

    fn visit_assertion(
        &self,
        assertion: &Assertion,
        parent: &str,
        depth: usize,
        log: &mut RunLog,
    ) -> Verdict {
        let actual = match &assertion.subject {
            Subject::Expect(param) => {
                let path = join_path(parent, EXPECT);
                self.resolve(param, &CallbackContext::new(&path), depth, log)
            }
            Subject::Custom(custom) => {
                let path = join_path(parent, &custom.kind);
                self.run_handler(custom, &path, depth, log)
            }
        };
        let actual = match actual {
            Ok(value) => value,
            Err(message) => return Verdict::Error(message),
        };

        let path = join_path(parent, EQUALS);
        let expected =
            match self.resolve(&assertion.expected, &CallbackContext::new(&path), depth, log) {
                Ok(value) => value,
                Err(message) => return Verdict::Error(message),
            };

        log.assertions += 1;

        if values_equal(&actual, &expected) {
            log.line(depth, format!("expect {} equals {}: ok", actual, expected));
            Verdict::Pass
        } else {
            let message = format!("expected {} but received {}", expected, actual);
            log.line(depth, format!("fail: {}", message));
            Verdict::Fail(message)
        }
    }

    fn visit_custom(
        &self,
        custom: &CustomNode,
        parent: &str,
        depth: usize,
        log: &mut RunLog,
    ) -> Verdict {
        let path = join_path(parent, &custom.kind);
        log.line(depth, format!("{}:", custom.kind));

        match self.run_handler(custom, &path, depth + 1, log) {
            Err(message) => return Verdict::Error(message),
            Ok(JsonValue::Bool(false)) => {
                let message = format!("{} at {} did not hold", custom.kind, path);
                log.line(depth + 1, format!("fail: {}", message));
                return Verdict::Fail(message);
            }
            Ok(_) => {}
        }

        self.visit_children(&custom.children, &path, depth + 1, log)
    }

    /// Resolves the custom node's params, then runs its handler with them.
    fn run_handler(
        &self,
        custom: &CustomNode,
        path: &str,
        depth: usize,
        log: &mut RunLog,
    ) -> Result<JsonValue, String> {
        let mut params = Vec::with_capacity(custom.params.len());
        for param in &custom.params {
            params.push(self.resolve(param, &CallbackContext::new(path), depth, log)?);
        }

        let ctx = CallbackContext::new(path).with_params(&params);
        self.call(&custom.handler, &ctx, depth, log)
    }

    fn resolve(
        &self,
        param: &Param,
        ctx: &CallbackContext<'_>,
        depth: usize,
        log: &mut RunLog,
    ) -> Result<JsonValue, String> {
        match param {
            Param::Value(value) => Ok(value.clone()),
            Param::Callback(callback) => self.call(callback, ctx, depth, log),
        }
    }

    fn call(
        &self,
        callback: &Callback,
        ctx: &CallbackContext<'_>,
        depth: usize,
        log: &mut RunLog,
    ) -> Result<JsonValue, String> {
        let invocation = self.engine.invoke(callback, ctx);
        log.output(depth, invocation.output);

        invocation.value.map_err(|err| {
            let message = err.to_string();
            log.line(depth, format!("error: {}", message));
            message
        })
    }
}

fn join_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{}", parent, segment)
    }
}

fn pass_summary(assertions: usize) -> String {
    match assertions {
        1 => "1 assertion passed".to_string(),
        n => format!("{} assertions passed", n),
    }
}

/// Value equality used by Equals. Numbers compare by value, so `2` equals
/// `2.0`; everything else compares structurally.
pub fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| values_equal(value, other)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::{NodeDocument, Returns, SUITE, TEST};

    fn evaluate(doc: &NodeDocument) -> Outcome {
        let node = Node::try_from(doc).unwrap();
        Evaluator::new(&SandboxConfig::default()).evaluate(&node)
    }

    fn pair(actual: Param, expected: Param) -> Vec<NodeDocument> {
        vec![NodeDocument::expect(actual), NodeDocument::equals(expected)]
    }

    fn group(kind: &str, description: &str, body: &str, children: Vec<NodeDocument>) -> NodeDocument {
        NodeDocument::new(kind, vec![Param::value(description), Param::callback(body)])
            .with_children(children)
    }

    #[test]
    fn matching_pair_passes() {
        let doc = NodeDocument::suite(
            "S",
            vec![NodeDocument::test("T", pair(Param::value(2), Param::value(2)))],
        );
        let outcome = evaluate(&doc);

        assert_eq!(outcome.status, RunStatus::Pass);
        assert_eq!(outcome.result, "1 assertion passed");
        assert_eq!(
            outcome.logs,
            vec![
                "suite: S".to_string(),
                "  test: T".to_string(),
                "    expect 2 equals 2: ok".to_string(),
            ]
        );
    }

    #[test]
    fn mismatch_fails_naming_both_values() {
        let doc = NodeDocument::suite(
            "S",
            vec![NodeDocument::test("T", pair(Param::value(2), Param::value(3)))],
        );
        let outcome = evaluate(&doc);

        assert_eq!(outcome.status, RunStatus::Fail);
        assert_eq!(outcome.result, "expected 3 but received 2");
        let line = outcome.logs.last().unwrap();
        assert!(line.contains('2') && line.contains('3'), "{}", line);
    }

    #[test]
    fn callback_subject_is_invoked() {
        let doc = NodeDocument::test(
            "T",
            pair(Param::callback("[1, 2].len() + 1"), Param::value(3)),
        );
        assert!(evaluate(&doc).is_pass());
    }

    #[test]
    fn callback_expected_value_is_invoked() {
        let doc = NodeDocument::test(
            "T",
            pair(Param::value("ab"), Param::callback(r#""a" + "b""#)),
        );
        assert!(evaluate(&doc).is_pass());
    }

    #[test]
    fn first_failing_test_stops_its_siblings() {
        let doc = NodeDocument::suite(
            "S",
            vec![
                NodeDocument::test("first", pair(Param::value(1), Param::value(2))),
                group(TEST, "second", r#"log("second ran")"#, pair(Param::value(1), Param::value(1))),
            ],
        );
        let outcome = evaluate(&doc);

        assert_eq!(outcome.status, RunStatus::Fail);
        assert_eq!(outcome.result, "expected 2 but received 1");
        assert!(!outcome.logs.iter().any(|l| l.contains("second")));
        assert!(outcome.logs.iter().any(|l| l.contains("skipped 1 remaining")));
    }

    #[test]
    fn failure_propagates_through_nested_suites() {
        let doc = NodeDocument::suite(
            "outer",
            vec![
                NodeDocument::suite(
                    "inner",
                    vec![NodeDocument::test("T", pair(Param::value(true), Param::value(false)))],
                ),
                NodeDocument::test("after", pair(Param::value(1), Param::value(1))),
            ],
        );
        let outcome = evaluate(&doc);

        assert_eq!(outcome.status, RunStatus::Fail);
        assert!(!outcome.logs.iter().any(|l| l.contains("after")));
    }

    #[test]
    fn later_assertions_in_a_test_are_skipped_after_failure() {
        let mut children = pair(Param::value(1), Param::value(0));
        children.extend(pair(Param::callback(r#"log("late"); 1"#), Param::value(1)));
        let outcome = evaluate(&NodeDocument::test("T", children));

        assert_eq!(outcome.status, RunStatus::Fail);
        assert!(!outcome.logs.iter().any(|l| l.contains("late")));
    }

    #[test]
    fn throwing_body_is_an_error_with_message_logged() {
        let doc = NodeDocument::suite(
            "S",
            vec![group(TEST, "T", r#"throw "db offline""#, pair(Param::value(1), Param::value(1)))],
        );
        let outcome = evaluate(&doc);

        assert_eq!(outcome.status, RunStatus::Error);
        assert!(outcome.result.contains("db offline"));
        assert!(outcome.logs.iter().any(|l| l.contains("error:") && l.contains("db offline")));
        assert!(!outcome.logs.iter().any(|l| l.contains("expect")));
    }

    #[test]
    fn throwing_subject_is_an_error() {
        let doc = NodeDocument::test("T", pair(Param::callback(r#"throw "nope""#), Param::value(1)));
        let outcome = evaluate(&doc);

        assert_eq!(outcome.status, RunStatus::Error);
        assert!(outcome.result.contains("nope"));
    }

    #[test]
    fn syntax_error_in_callback_is_an_error_not_a_panic() {
        let doc = group(SUITE, "S", "let = ;", vec![]);
        assert_eq!(evaluate(&doc).status, RunStatus::Error);
    }

    #[test]
    fn callback_output_is_logged_under_its_node() {
        let doc = group(SUITE, "S", r#"print("setting up " + description)"#, vec![]);
        let outcome = evaluate(&doc);

        assert!(outcome.is_pass());
        assert_eq!(outcome.logs, vec!["suite: S".to_string(), "  > setting up S".to_string()]);
    }

    #[test]
    fn callbacks_see_their_node_path() {
        let doc = NodeDocument::suite(
            "S",
            vec![NodeDocument::test("T", pair(Param::callback("path"), Param::value("S/T/Expect")))],
        );
        assert!(evaluate(&doc).is_pass());
    }

    #[test]
    fn custom_node_false_fails() {
        let custom = NodeDocument::new("Positive", vec![Param::value(-3)])
            .with_custom_function("Positive", "params[0] > 0");
        let outcome = evaluate(&NodeDocument::suite("S", vec![custom]));

        assert_eq!(outcome.status, RunStatus::Fail);
        assert_eq!(outcome.result, "Positive at S/Positive did not hold");
    }

    #[test]
    fn custom_node_runs_children_after_handler() {
        let custom = NodeDocument::new("Always", vec![])
            .with_custom_function("Always", "true")
            .with_children(vec![NodeDocument::test("T", pair(Param::value(1), Param::value(1)))]);
        let outcome = evaluate(&NodeDocument::suite("S", vec![custom]));

        assert!(outcome.is_pass());
        assert_eq!(outcome.result, "1 assertion passed");
    }

    #[test]
    fn custom_params_resolve_callbacks_before_handler() {
        let custom = NodeDocument::new("Double", vec![Param::callback("20 + 1")])
            .with_custom_function("Double", "params[0] * 2")
            .with_returns(Returns::Pipe);
        let doc = NodeDocument::test("T", vec![custom, NodeDocument::equals(Param::value(42))]);
        assert!(evaluate(&doc).is_pass());
    }

    #[test]
    fn empty_suite_passes_with_zero_assertions() {
        let outcome = evaluate(&NodeDocument::suite("S", vec![]));
        assert!(outcome.is_pass());
        assert_eq!(outcome.result, "0 assertions passed");
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(values_equal(&json!(2), &json!(2.0)));
        assert!(!values_equal(&json!(2), &json!(2.5)));
        assert!(values_equal(&json!([1, {"a": 2.0}]), &json!([1.0, {"a": 2}])));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!values_equal(&json!("2"), &json!(2)));
        assert!(values_equal(&json!(null), &json!(null)));
    }

    #[test]
    fn large_unsigned_numbers_compare_exactly() {
        assert!(values_equal(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!values_equal(&json!(u64::MAX), &json!(u64::MAX - 1)));
        assert!(!values_equal(&json!(u64::MAX), &json!(-1)));
    }

    #[test]
    fn literal_array_params_compare_by_value() {
        let doc: NodeDocument = serde_json::from_value(json!({
            "kind": "Test",
            "params": ["T", {"script": "()"}],
            "children": [
                {"kind": "Expect", "params": [["ok"]]},
                {"kind": "Equals", "params": [["ok"]]}
            ]
        }))
        .unwrap();

        let outcome = evaluate(&doc);
        assert_eq!(outcome.status, RunStatus::Pass, "{:?}", outcome.logs);
    }
}
