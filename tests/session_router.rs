//! Session Router Tests
//!
//! Command dispatch, per-session context handling and result bounding.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use vega_interactive::config::ResourceConfig;
use vega_interactive::randomizer::MAX_SUGGESTIONS;
use vega_interactive::resources::MARKS;
use vega_interactive::{
    Derivation, Example, NullParser, OnlineLearner, ParseStatus, QueryLog, ResourceStore,
    Response, RouterOptions, SchemaTree, SemanticParser, SessionCommandRouter, VegaError,
    VegaResources, CONSOLE_SESSION,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn resource_config() -> ResourceConfig {
    ResourceConfig {
        vega_schema: Some(fixture("vega_lite_mini.json")),
        color_file: Some(fixture("colors.json")),
        initial_templates: Some(fixture("templates.json")),
        ..ResourceConfig::default()
    }
}

fn resources() -> Arc<VegaResources> {
    Arc::new(VegaResources::load(&resource_config()).unwrap())
}

/// Returns `size` ranked derivations for any utterance and remembers each call
struct RankedParser {
    size: usize,
    calls: Mutex<Vec<(String, bool)>>,
}

impl RankedParser {
    fn new(size: usize) -> Arc<Self> {
        Arc::new(Self {
            size,
            calls: Mutex::new(Vec::new()),
        })
    }
}

impl SemanticParser for RankedParser {
    fn parse(&self, example: &mut Example, learning: bool) -> vega_interactive::Result<()> {
        self.calls.lock().push((example.utterance.clone(), learning));
        example.pred_derivations = (0..self.size)
            .map(|i| {
                Derivation::new(format!("(d{})", i), json!({ "mark": MARKS[i % MARKS.len()] }))
                    .with_score(-(i as f64))
            })
            .collect();
        Ok(())
    }

    fn execute_expression(&self, session_id: &str, line: &str) -> vega_interactive::Result<Response> {
        let mut response = Response::new("expression");
        response.lines.push(format!("{}: {}", session_id, line));
        Ok(response)
    }
}

#[derive(Default)]
struct RecordingLearner {
    seen: Mutex<Vec<Example>>,
}

impl OnlineLearner for RecordingLearner {
    fn online_learn_example(&self, example: &Example) {
        self.seen.lock().push(example.clone());
    }
}

fn data_schema() -> Value {
    json!({
        "a": { "name": "a", "type": "string", "uniqueCount": 3, "count": 9, "probablyYears": false, "source": true },
        "b": { "name": "b", "type": "number", "uniqueCount": 9, "count": 9, "probablyYears": false, "source": true },
        "c": { "name": "c", "type": "integer", "uniqueCount": 4, "count": 9, "probablyYears": true, "source": true }
    })
}

fn q(utterance: &str, context: Value) -> String {
    json!(["q", { "utterance": utterance, "context": context, "schema": data_schema() }]).to_string()
}

fn formulas(response: &Response) -> Vec<&str> {
    response.derivations().iter().map(|d| d.formula.as_str()).collect()
}

// =============================================================================
// q Tests
// =============================================================================

#[test]
fn test_q_truncates_to_amount() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(10));

    let cases = [(Some(3), 3), (None, 10), (Some(100), 10), (Some(0), 0)];
    for (amount, expected) in cases {
        let mut payload = json!({ "utterance": "bars", "context": {}, "schema": {} });
        if let Some(amount) = amount {
            payload["amount"] = json!(amount);
        }
        let response = router
            .process_query("s1", &json!(["q", payload]).to_string())
            .unwrap();
        assert_eq!(response.derivations().len(), expected, "amount {:?}", amount);
        assert_eq!(response.stats.size, Some(10));
    }
}

#[test]
fn test_q_keeps_parser_order_unless_random() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(10));

    let response = router.process_query("s1", &q("bars", json!({}))).unwrap();
    assert_eq!(formulas(&response)[..3], ["(d0)", "(d1)", "(d2)"]);

    let shuffled = json!(["q", { "utterance": "bars", "context": {}, "schema": {}, "random": true }]);
    let response = router.process_query("s1", &shuffled.to_string()).unwrap();
    let got: HashSet<&str> = formulas(&response).into_iter().collect();
    let expected: Vec<String> = (0..10).map(|i| format!("(d{})", i)).collect();
    let expected: HashSet<&str> = expected.iter().map(String::as_str).collect();
    assert_eq!(got, expected);
}

#[test]
fn test_q_reports_parse_status() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(2));
    let response = router.process_query("s1", &q("bars", json!({}))).unwrap();
    assert_eq!(response.stats.command, "q");
    assert_eq!(response.stats.status, Some(ParseStatus::Core));

    let router = SessionCommandRouter::new(resources(), Arc::new(NullParser));
    let response = router.process_query("s1", &q("bars", json!({}))).unwrap();
    assert_eq!(response.stats.size, Some(0));
    assert_eq!(response.stats.status, Some(ParseStatus::Nothing));
    assert!(response.derivations().is_empty());
}

#[test]
fn test_q_replaces_session_context() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(1));

    router
        .process_query("s1", &q("bars", json!({ "mark": "bar", "width": 300 })))
        .unwrap();
    let session = router.session("s1").unwrap();
    assert_eq!(session.context.context, json!({ "mark": "bar", "width": 300 }));
    assert_eq!(session.context.schema.len(), 3);
    assert_eq!(session.last_utterance.as_deref(), Some("bars"));

    router.process_query("s1", &q("lines", json!({ "mark": "line" }))).unwrap();
    let session = router.session("s1").unwrap();
    assert_eq!(session.context.context, json!({ "mark": "line" }));
    assert_eq!(session.query_count, 2);
}

#[test]
fn test_excluded_context_keys_are_stripped() {
    let mut config = resource_config();
    config.excluded_context_paths = ["data".to_string()].into_iter().collect();
    let resources = Arc::new(VegaResources::load(&config).unwrap());
    let router = SessionCommandRouter::new(resources, RankedParser::new(1));

    router
        .process_query("s1", &q("bars", json!({ "mark": "bar", "data": { "values": [1, 2] } })))
        .unwrap();
    assert_eq!(router.session("s1").unwrap().context.context, json!({ "mark": "bar" }));
}

// =============================================================================
// random Tests
// =============================================================================

#[test]
fn test_random_on_empty_context_suggests_initial_plots() {
    let router = SessionCommandRouter::new(resources(), Arc::new(NullParser));
    let command = json!(["random", { "amount": 4, "context": {}, "schema": data_schema() }]);

    let response = router.process_query("s1", &command.to_string()).unwrap();
    assert_eq!(response.derivations().len(), 4);
    for derivation in response.derivations() {
        assert!(derivation.formula.starts_with("(initial "), "{}", derivation.formula);
        let mark = derivation.value["mark"].as_str().unwrap();
        assert!(["bar", "point", "line"].contains(&mark));
        let encoding = derivation.value["encoding"].as_object().unwrap();
        assert!(encoding.contains_key("x") && encoding.contains_key("y"));
        for channel in encoding.values() {
            assert!(["a", "b", "c"].contains(&channel["field"].as_str().unwrap()));
        }
    }
}

#[test]
fn test_random_flagged_initial_context() {
    let router = SessionCommandRouter::new(resources(), Arc::new(NullParser));
    let command = json!(["random", {
        "amount": 2,
        "context": { "initialContext": true, "mark": "bar" },
        "schema": data_schema()
    }]);

    let response = router.process_query("s1", &command.to_string()).unwrap();
    assert_eq!(response.derivations().len(), 2);
    assert!(formulas(&response).iter().all(|f| f.starts_with("(initial ")));
}

#[test]
fn test_random_without_fields_suggests_nothing_initial() {
    let router = SessionCommandRouter::new(resources(), Arc::new(NullParser));
    let command = json!(["random", { "amount": 3, "context": {}, "schema": {} }]);

    let response = router.process_query("s1", &command.to_string()).unwrap();
    assert!(response.derivations().is_empty());
}

#[test]
fn test_random_on_existing_plot_suggests_edits() {
    let router = SessionCommandRouter::new(resources(), Arc::new(NullParser));
    let plot = json!({
        "mark": "bar",
        "encoding": { "x": { "field": "a", "type": "nominal" }, "y": { "field": "b", "type": "quantitative" } }
    });
    let command = json!(["random", { "amount": 3, "context": plot, "schema": data_schema() }]);

    let response = router.process_query("s1", &command.to_string()).unwrap();
    let derivations = response.derivations();
    assert!(!derivations.is_empty());
    assert!(derivations.len() <= 3);
    for derivation in derivations {
        assert!(derivation.formula.starts_with("(set "), "{}", derivation.formula);
        assert_ne!(derivation.value, plot);
    }
    assert_eq!(router.session("s1").unwrap().context.context, plot);
}

#[test]
fn test_random_with_huge_amount_is_capped() {
    let router = SessionCommandRouter::new(resources(), Arc::new(NullParser));

    let no_fields = json!(["random", { "amount": u64::MAX, "context": {}, "schema": {} }]);
    let response = router.process_query("s1", &no_fields.to_string()).unwrap();
    assert!(response.derivations().is_empty());

    let initial = json!(["random", { "amount": u64::MAX / 10, "context": {}, "schema": data_schema() }]);
    let response = router.process_query("s1", &initial.to_string()).unwrap();
    assert_eq!(response.derivations().len(), MAX_SUGGESTIONS);

    let edits = json!(["random", { "amount": u64::MAX / 10, "context": { "mark": "bar" }, "schema": {} }]);
    let response = router.process_query("s1", &edits.to_string()).unwrap();
    assert!(!response.derivations().is_empty());
    assert!(response.derivations().len() <= MAX_SUGGESTIONS);
}

// =============================================================================
// accept / reject / log / example Tests
// =============================================================================

fn accept(utterance: &str) -> String {
    json!(["accept", {
        "utterance": utterance,
        "context": { "mark": "bar" },
        "targetValue": { "mark": "line" },
        "targetFormula": "(set mark line)"
    }])
    .to_string()
}

#[test]
fn test_accept_feeds_the_learner() {
    let parser = RankedParser::new(1);
    let learner = Arc::new(RecordingLearner::default());
    let router = SessionCommandRouter::new(resources(), parser.clone()).with_learner(learner.clone());

    let response = router.process_query("s1", &accept("make it a line")).unwrap();
    assert!(response.ex.is_none());

    let seen = learner.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].utterance, "make it a line");
    assert_eq!(seen[0].target_value, Some(json!({ "mark": "line" })));
    assert_eq!(seen[0].context.context, json!({ "mark": "bar" }));
    assert_eq!(parser.calls.lock().as_slice(), [("make it a line".to_string(), true)]);
}

#[test]
fn test_accept_skips_learner_when_disabled() {
    let learner = Arc::new(RecordingLearner::default());
    let router = SessionCommandRouter::new(resources(), RankedParser::new(1))
        .with_learner(learner.clone())
        .with_options(RouterOptions {
            online_learn_examples: false,
            ..RouterOptions::default()
        });

    router.process_query("s1", &accept("make it a line")).unwrap();
    assert!(learner.seen.lock().is_empty());
}

#[test]
fn test_accept_leaves_session_context() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(1));
    router.process_query("s1", &q("bars", json!({ "mark": "point" }))).unwrap();
    router.process_query("s1", &accept("make it a line")).unwrap();
    assert_eq!(router.session("s1").unwrap().context.context, json!({ "mark": "point" }));
}

#[test]
fn test_reject_and_log_do_nothing() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(1));
    for command in [json!(["reject", { "utterance": "no" }]), json!(["log", { "event": "click" }])] {
        let response = router.process_query("s1", &command.to_string()).unwrap();
        assert!(response.ex.is_none());
        assert!(response.lines.is_empty());
    }
    assert!(router.session("s1").is_none());
}

fn accepted_entry(i: usize) -> Map<String, Value> {
    json!({ "q": ["accept", { "utterance": format!("example {}", i) }], "sessionId": "old" })
        .as_object()
        .unwrap()
        .clone()
}

#[test]
fn test_example_returns_bounded_shuffle() {
    let tree = SchemaTree::from_file(&fixture("vega_lite_mini.json")).unwrap();
    let store = ResourceStore::default().with_examples((0..5).map(accepted_entry).collect());
    let resources = Arc::new(VegaResources::build(tree, &HashSet::new(), store));
    let router = SessionCommandRouter::new(resources, Arc::new(NullParser));

    let cases = [
        (json!(["example", { "amount": 2 }]), 2),
        (json!(["example", {}]), 5),
        (json!(["example"]), 5),
        (json!(["example", { "amount": 10 }]), 5),
    ];
    for (command, expected) in cases {
        let response = router.process_query("s1", &command.to_string()).unwrap();
        assert_eq!(response.lines.len(), expected, "{}", command);
        for line in &response.lines {
            let entry: Value = serde_json::from_str(line).unwrap();
            assert_eq!(entry["q"][0], "accept");
        }
    }
}

// =============================================================================
// Error Isolation Tests
// =============================================================================

#[test]
fn test_unknown_command_is_ignored() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(1));
    router.process_query("s1", &q("bars", json!({ "mark": "bar" }))).unwrap();

    let response = router.process_query("s1", r#"["bogus", {}]"#).unwrap();
    assert!(response.ex.is_none());
    assert!(response.derivations().is_empty());
    assert_eq!(router.session("s1").unwrap().context.context, json!({ "mark": "bar" }));
}

#[test]
fn test_invalid_wire_shape() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(1));
    for line in [r#"{"q": "bars"}"#, "[]", "[1, {}]"] {
        let err = router.process_query("s1", line).unwrap_err();
        assert!(matches!(err, VegaError::InvalidCommand(_)), "{}: {:?}", line, err);
    }
    assert!(matches!(
        router.process_query("s1", "not json").unwrap_err(),
        VegaError::Json(_)
    ));
}

#[test]
fn test_malformed_payload_fails_only_its_command() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(4));
    router.process_query("s1", &q("bars", json!({ "mark": "bar" }))).unwrap();

    let missing_utterance = json!(["q", { "context": { "mark": "line" }, "schema": {} }]);
    let negative_amount = json!(["random", { "amount": -2, "context": {}, "schema": {} }]);
    let bad_schema = json!(["q", { "utterance": "x", "context": {}, "schema": { "a": 3 } }]);
    for command in [missing_utterance, negative_amount, bad_schema] {
        let err = router.process_query("s1", &command.to_string()).unwrap_err();
        assert!(matches!(err, VegaError::MalformedPayload { .. }), "{:?}", err);
    }

    assert_eq!(router.session("s1").unwrap().context.context, json!({ "mark": "bar" }));
    let response = router.process_query("s1", &q("lines", json!({}))).unwrap();
    assert_eq!(response.derivations().len(), 4);
}

// =============================================================================
// Console and Expression Tests
// =============================================================================

#[test]
fn test_console_lines_become_queries() {
    let parser = RankedParser::new(3);
    let router = SessionCommandRouter::new(resources(), parser.clone());

    let response = router.process_query(CONSOLE_SESSION, "  make a bar chart ").unwrap();
    let ex = response.ex.unwrap();
    assert_eq!(ex.utterance, "make a bar chart");
    assert_eq!(ex.pred_derivations.len(), 3);

    let session = router.session(CONSOLE_SESSION).unwrap();
    let fields: Vec<&str> = session.context.schema.keys().map(String::as_str).collect();
    assert_eq!(fields, ["a", "b"]);
    assert_eq!(parser.calls.lock()[0], ("make a bar chart".to_string(), false));
}

#[test]
fn test_console_expressions_go_to_the_parser() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(1));
    let response = router.process_query(CONSOLE_SESSION, "(set mark bar)").unwrap();
    assert_eq!(response.lines, ["stdin: (set mark bar)"]);

    let router = SessionCommandRouter::new(resources(), Arc::new(NullParser));
    assert!(matches!(
        router.process_query(CONSOLE_SESSION, "(set mark bar)").unwrap_err(),
        VegaError::ExpressionUnsupported
    ));
}

#[test]
fn test_only_interactive_console_parses_expressions_as_utterances() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(1)).with_options(
        RouterOptions {
            only_interactive: true,
            ..RouterOptions::default()
        },
    );
    let response = router.process_query(CONSOLE_SESSION, "(set mark bar)").unwrap();
    assert_eq!(response.ex.unwrap().utterance, "(set mark bar)");
}

#[test]
fn test_client_expressions_need_opt_in() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(1));
    assert!(router.process_query("s1", "(set mark bar)").is_err());

    let router = SessionCommandRouter::new(resources(), RankedParser::new(1)).with_options(
        RouterOptions {
            allow_regular_commands: true,
            ..RouterOptions::default()
        },
    );
    let response = router.process_query("s1", "(set mark bar)").unwrap();
    assert_eq!(response.lines, ["s1: (set mark bar)"]);
}

// =============================================================================
// Query Log and Concurrency Tests
// =============================================================================

#[test]
fn test_query_log_feeds_the_example_pool() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("int-output/query.log");
    let router = SessionCommandRouter::new(resources(), RankedParser::new(1))
        .with_query_log(QueryLog::open(&log_path).unwrap());

    router.process_query("s1", &q("bars", json!({}))).unwrap();
    router.process_query("s1", &accept("make it a line")).unwrap();
    router.process_query("s2", &accept("now points")).unwrap();
    router.process_query("s2", r#"["bogus", {}]"#).unwrap();

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(content.lines().count(), 4);

    let config = ResourceConfig {
        query_path: Some(log_path),
        ..ResourceConfig::default()
    };
    let store = ResourceStore::load(&config).unwrap();
    let sessions: Vec<&str> = store
        .examples()
        .iter()
        .map(|e| e["sessionId"].as_str().unwrap())
        .collect();
    assert_eq!(sessions, ["s1", "s2"]);
}

#[test]
fn test_sessions_are_isolated_across_threads() {
    let router = SessionCommandRouter::new(resources(), RankedParser::new(5));

    std::thread::scope(|scope| {
        for t in 0..8 {
            let router = &router;
            scope.spawn(move || {
                let id = format!("client-{}", t);
                for i in 0..20 {
                    let context = json!({ "title": id, "width": i });
                    let response = router.process_query(&id, &q("bars", context)).unwrap();
                    assert_eq!(response.derivations().len(), 5);
                }
            });
        }
    });

    for t in 0..8 {
        let id = format!("client-{}", t);
        let session = router.session(&id).unwrap();
        assert_eq!(session.context.context, json!({ "title": id, "width": 19 }));
        assert_eq!(session.query_count, 20);
    }
}

/// Holds the `slow` utterance inside `parse` until released
struct GatedParser {
    started: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
    released: AtomicBool,
}

impl SemanticParser for GatedParser {
    fn parse(&self, example: &mut Example, _learning: bool) -> vega_interactive::Result<()> {
        if example.utterance == "slow" {
            self.started.lock().send(()).ok();
            let released = self
                .release
                .lock()
                .recv_timeout(Duration::from_secs(5))
                .is_ok();
            self.released.store(released, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[test]
fn test_snapshot_wait_does_not_block_new_sessions() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let parser = Arc::new(GatedParser {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
        released: AtomicBool::new(false),
    });
    let router = SessionCommandRouter::new(resources(), parser.clone());

    std::thread::scope(|scope| {
        let router = &router;
        let slow = scope.spawn(move || {
            router
                .process_query("slow", &q("slow", json!({ "mark": "bar" })))
                .unwrap();
        });
        started_rx.recv().unwrap();

        let reader = scope.spawn(move || router.session("slow"));
        std::thread::sleep(Duration::from_millis(100));

        for i in 0..64 {
            router
                .process_query(&format!("fresh-{}", i), &q("bars", json!({})))
                .unwrap();
        }
        release_tx.send(()).unwrap();

        slow.join().unwrap();
        let snapshot = reader.join().unwrap().unwrap();
        assert_eq!(snapshot.context.context, json!({ "mark": "bar" }));
    });

    assert!(parser.released.load(Ordering::SeqCst));
    assert!(router.session("fresh-63").is_some());
}
