//! End-to-end scenarios from §8: each builds a tiny fixture repo, runs the
//! real ingestion pipeline, then asserts on the persisted Graph Store and
//! Query Surface, matching the teacher's convention of exercising real
//! parsers/files under `tempfile::TempDir` rather than mocking them.

use std::fs;
use std::path::Path;

use gitnexus::config::Settings;
use gitnexus::graph::GraphStore;
use gitnexus::model;
use gitnexus::pipeline::{self, AnalyzeOptions, CancellationToken};
use gitnexus::query::QuerySurface;
use gitnexus::types::{CallReason, RelationType};

fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn analyze(root: &Path) -> (Settings, gitnexus::pipeline::PipelineReport) {
    let settings = Settings::load(root).unwrap();
    let options = AnalyzeOptions { force: true, skip_embeddings: true };
    let cancel = CancellationToken::new();
    let report = pipeline::analyze(&settings, &options, &cancel).unwrap();
    (settings, report)
}

fn has_relation(store: &GraphStore, from: &str, to: &str, kind: RelationType) -> bool {
    store.relations().any(|r| r.from == from && r.to == to && r.kind == kind)
}

/// S1 — Define/Call same file.
#[test]
fn s1_define_call_same_file() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "app/a.ts",
        "export function foo() {}\nexport function bar() { foo(); }\n",
    );

    let (settings, report) = analyze(dir.path());
    assert!(!report.up_to_date);
    let surface = QuerySurface::load(&settings).unwrap();
    let store = surface.graph();

    let file_id = model::file_id("app/a.ts");
    let foo_id = "Function:app/a.ts:foo";
    let bar_id = "Function:app/a.ts:bar";

    assert!(store.contains_node(&file_id));
    let foo = store.get_node(foo_id).expect("foo symbol present");
    let bar = store.get_node(bar_id).expect("bar symbol present");
    match foo {
        gitnexus::model::GraphNode::Symbol(s) => assert!(s.is_exported, "foo must be exported"),
        _ => panic!("expected a Symbol node"),
    }
    match bar {
        gitnexus::model::GraphNode::Symbol(s) => assert!(s.is_exported, "bar must be exported"),
        _ => panic!("expected a Symbol node"),
    }

    assert!(has_relation(store, &file_id, foo_id, RelationType::Defines));
    assert!(has_relation(store, &file_id, bar_id, RelationType::Defines));

    let calls = store.relations().find(|r| r.from == bar_id && r.to == foo_id && r.kind == RelationType::Calls);
    let calls = calls.expect("bar -> foo CALLS edge");
    assert_eq!(calls.reason, Some(CallReason::SameFile));
    assert!((calls.confidence - 0.85).abs() < 1e-9);
}

/// S2 — Resolved import call.
#[test]
fn s2_resolved_import_call() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.ts", "export function greet() {}\n");
    write_file(
        dir.path(),
        "b.ts",
        "import { greet } from './a';\nfunction main() { greet(); }\n",
    );

    let (settings, _) = analyze(dir.path());
    let surface = QuerySurface::load(&settings).unwrap();
    let store = surface.graph();

    let a_id = model::file_id("a.ts");
    let b_id = model::file_id("b.ts");
    assert!(has_relation(store, &b_id, &a_id, RelationType::Imports));

    let main_id = "Function:b.ts:main";
    let greet_id = "Function:a.ts:greet";
    let calls = store
        .relations()
        .find(|r| r.from == main_id && r.to == greet_id && r.kind == RelationType::Calls)
        .expect("main -> greet CALLS edge");
    assert_eq!(calls.reason, Some(CallReason::ImportResolved));
    assert!((calls.confidence - 0.9).abs() < 1e-9);
}

/// S3 — Fuzzy global: two unrelated files each define `foo`, a third calls
/// it without importing either.
#[test]
fn s3_fuzzy_global() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "one.ts", "export function foo() {}\n");
    write_file(dir.path(), "two.ts", "export function foo() {}\n");
    write_file(dir.path(), "caller.ts", "function user() { foo(); }\n");

    let (settings, _) = analyze(dir.path());
    let surface = QuerySurface::load(&settings).unwrap();
    let store = surface.graph();

    let user_id = "Function:caller.ts:user";
    let calls: Vec<_> = store.relations().filter(|r| r.from == user_id && r.kind == RelationType::Calls).collect();
    assert_eq!(calls.len(), 1, "exactly one fuzzy CALLS edge from the caller");
    assert_eq!(calls[0].reason, Some(CallReason::FuzzyGlobal));
    assert!((calls[0].confidence - 0.3).abs() < 1e-9, "multiple fuzzy hits => confidence 0.3");
}

/// S4 — Go exportedness.
#[test]
fn s4_go_exportedness() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "pkg/thing.go", "package pkg\n\nfunc Foo() {}\n\nfunc bar() {}\n");

    let (settings, _) = analyze(dir.path());
    let surface = QuerySurface::load(&settings).unwrap();
    let store = surface.graph();

    let foo = store.get_node("Function:pkg/thing.go:Foo").expect("Foo present");
    let bar = store.get_node("Function:pkg/thing.go:bar").expect("bar present");
    match foo {
        gitnexus::model::GraphNode::Symbol(s) => assert!(s.is_exported),
        _ => panic!("expected Symbol"),
    }
    match bar {
        gitnexus::model::GraphNode::Symbol(s) => assert!(!s.is_exported),
        _ => panic!("expected Symbol"),
    }
}

/// S5 — Community + cohesion: A-B, B-C, A-C fully connected triangle, D isolated.
#[test]
fn s5_community_and_cohesion() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "graph.ts",
        "export function A() { B(); C(); }\n\
         export function B() { A(); C(); }\n\
         export function C() { A(); B(); }\n\
         export function D() {}\n",
    );

    let (settings, _) = analyze(dir.path());
    let surface = QuerySurface::load(&settings).unwrap();
    let store = surface.graph();

    let community = store
        .nodes()
        .find_map(|n| match n {
            gitnexus::model::GraphNode::Community(c)
                if store.outgoing(&c.id, RelationType::MemberOf).is_empty()
                    && store.incoming(&c.id, RelationType::MemberOf).len() == 3 =>
            {
                Some(c)
            }
            _ => None,
        })
        .expect("one community of size 3");

    assert_eq!(community.symbol_count, 3);
    assert!((community.cohesion - 1.0).abs() < 1e-9);

    let d_id = "Function:graph.ts:D";
    assert!(store.outgoing(d_id, RelationType::MemberOf).is_empty(), "D joins no community");
}

/// S6 — Process assembly across communities: main -> validate -> persist.
#[test]
fn s6_process_assembly() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "pipeline.ts",
        "export function main() { validate(); }\n\
         export function validate() { persist(); }\n\
         export function persist() {}\n",
    );

    let (settings, _) = analyze(dir.path());
    let surface = QuerySurface::load(&settings).unwrap();
    let store = surface.graph();

    let process = store
        .nodes()
        .find_map(|n| match n {
            gitnexus::model::GraphNode::Process(p) => Some(p),
            _ => None,
        })
        .expect("one process traced");

    assert_eq!(process.entry_point_id, "Function:pipeline.ts:main");
    assert_eq!(process.terminal_id, "Function:pipeline.ts:persist");

    let mut steps: Vec<u32> = store
        .relations()
        .filter(|r| r.kind == RelationType::StepInProcess && r.to == process.id)
        .filter_map(|r| r.step)
        .collect();
    steps.sort_unstable();
    assert_eq!(steps, vec![0, 1, 2], "gap-free 0..stepCount-1 sequence");
}

/// Universal invariant 7: re-ingestion with an unchanged commit hash is a
/// no-op unless `--force`.
#[test]
fn reingest_without_force_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.ts", "export function foo() {}\n");

    let settings = Settings::load(dir.path()).unwrap();
    let cancel = CancellationToken::new();

    let first = pipeline::analyze(&settings, &AnalyzeOptions { force: true, skip_embeddings: true }, &cancel).unwrap();
    assert!(!first.up_to_date);

    let second =
        pipeline::analyze(&settings, &AnalyzeOptions { force: false, skip_embeddings: true }, &cancel).unwrap();
    assert!(second.up_to_date, "unchanged repo must be a no-op without --force");
    assert_eq!(second.files, first.files);
}

/// Universal invariant 6: `STEP_IN_PROCESS` steps are gap-free; invariant 1:
/// ids round-trip through a persisted-then-reloaded store unchanged.
#[test]
fn node_ids_round_trip_through_persistence() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.ts", "export function foo() { bar(); }\nexport function bar() {}\n");

    let settings = Settings::load(dir.path()).unwrap();
    let cancel = CancellationToken::new();
    pipeline::analyze(&settings, &AnalyzeOptions { force: true, skip_embeddings: true }, &cancel).unwrap();

    let surface = QuerySurface::load(&settings).unwrap();
    let store = surface.graph();
    let foo_id = "Function:a.ts:foo";
    assert_eq!(store.get_node(foo_id).unwrap().id(), foo_id);
}

/// Non-function definitions (§4.5(b), §6): a Rust struct plus a tuple-struct
/// constructor call and a top-level const initializer exercise the
/// `DEFINES(File->Struct)` and `CALLS(File->Function)` /
/// `CALLS(Function->Struct)` pairs, none of which a TypeScript-only fixture
/// would ever produce. Ingestion must complete without aborting.
#[test]
fn rust_struct_and_top_level_call_do_not_abort_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "lib.rs",
        "pub struct Point(pub i32, pub i32);\n\
         \n\
         pub fn make_point() -> Point {\n\
         \x20   Point(1, 2)\n\
         }\n\
         \n\
         const ORIGIN_X: i32 = compute_x();\n\
         \n\
         fn compute_x() -> i32 {\n\
         \x20   0\n\
         }\n",
    );

    let (settings, report) = analyze(dir.path());
    assert!(!report.up_to_date);
    assert!(report.warnings.is_empty(), "a fully-declared schema should produce no warnings: {:?}", report.warnings);

    let surface = QuerySurface::load(&settings).unwrap();
    let store = surface.graph();
    let file_id = model::file_id("lib.rs");

    let point_id = "Struct:lib.rs:Point";
    assert!(store.contains_node(point_id), "struct symbol present");
    assert!(has_relation(store, &file_id, point_id, RelationType::Defines));

    let make_point_id = "Function:lib.rs:make_point";
    assert!(has_relation(store, make_point_id, point_id, RelationType::Calls), "tuple-struct constructor call");

    let compute_x_id = "Function:lib.rs:compute_x";
    assert!(
        has_relation(store, &file_id, compute_x_id, RelationType::Calls),
        "top-level const initializer call has no enclosing function, so the File itself is the source"
    );
}

/// Query Surface: `impact` at full depth upstream includes every ancestor
/// reachable via CALLS and excludes the target itself (invariant 10).
#[test]
fn impact_upstream_excludes_target() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "chain.ts",
        "export function leaf() {}\n\
         export function mid() { leaf(); }\n\
         export function top() { mid(); }\n",
    );

    let settings = Settings::load(dir.path()).unwrap();
    let cancel = CancellationToken::new();
    pipeline::analyze(&settings, &AnalyzeOptions { force: true, skip_embeddings: true }, &cancel).unwrap();
    let surface = QuerySurface::load(&settings).unwrap();

    let report = surface.impact("leaf", gitnexus::query::ImpactDirection::Upstream, 10, &[], 0.0).unwrap();

    let all_ids: Vec<&str> = report.levels.iter().flat_map(|l| l.node_ids.iter().map(String::as_str)).collect();
    assert!(all_ids.contains(&"Function:chain.ts:mid"));
    assert!(all_ids.contains(&"Function:chain.ts:top"));
    assert!(!all_ids.contains(&"Function:chain.ts:leaf"), "target itself must be excluded");
}
