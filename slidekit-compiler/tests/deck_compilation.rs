use std::path::PathBuf;

use slidekit_compiler::{
    parse_assignment, CompileError, CompileRequest, Compiler, SLIDE_BREAK,
};
use slidekit_core::{
    Block, BoundValue, BoundVariables, ErrorKind, TemplateId, TemplateStore, VariableKind,
    VariableSpec,
};
use tempfile::TempDir;

fn bundled_store() -> TemplateStore {
    TemplateStore::new(
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("templates"),
    )
}

fn input(name: &str) -> VariableSpec {
    VariableSpec {
        name: name.to_string(),
        label: name.to_string(),
        kind: VariableKind::Input,
        description: None,
        default: None,
        options: vec![],
    }
}

fn block(function: &str, order: i64, vars: &[&str]) -> Block {
    Block {
        id: function.to_string(),
        function: function.to_string(),
        label: function.to_string(),
        description: String::new(),
        variables: vars.iter().map(|v| input(v)).collect(),
        order,
    }
}

/// Template directory with one fragment file per `(file, source)` pair.
fn fixture(fragments: &[(&str, &str)]) -> (TempDir, TemplateStore) {
    let tmp = TempDir::new().expect("tempdir");
    let slides = tmp.path().join("demo").join("slides");
    std::fs::create_dir_all(&slides).expect("mkdir");
    for (name, source) in fragments {
        std::fs::write(slides.join(name), source).expect("write fragment");
    }
    let store = TemplateStore::new(tmp.path());
    (tmp, store)
}

fn pitch_variables() -> BoundVariables {
    let mut vars = BoundVariables::new();
    vars.insert("companyName".into(), BoundValue::from("Acme Rockets"));
    vars.insert("tagline".into(), BoundValue::from("Orbit for \"everyone\""));
    vars.insert("problemTitle".into(), BoundValue::from("Launch is expensive"));
    vars.insert(
        "painPoints".into(),
        BoundValue::List(vec![
            "Costs $60M per launch".into(),
            "It's slow".into(),
            "Waitlists of `years`".into(),
        ]),
    );
    vars
}

// ---------------------------------------------------------------------------
// Bundled template
// ---------------------------------------------------------------------------

#[test]
fn business_pitch_compiles_with_partial_variables() {
    let store = bundled_store();
    let id = TemplateId::from("business-pitch");
    let blocks = store.blocks(&id).expect("blocks");
    let compiler = Compiler::new(store);

    let doc = compiler
        .compile(&id, &pitch_variables(), &blocks)
        .unwrap_or_else(|e| panic!("compile failed: {e}"));
    let text = doc.as_str();

    assert!(text.starts_with("---\ntheme: apple-basic\n"), "{text}");
    assert!(text.contains("title: Acme Rockets\n"));
    assert!(text.contains("# Acme Rockets"));
    assert!(text.contains("Orbit for \"everyone\""));
    assert!(text.contains("- Costs $60M per launch"));
    assert!(text.contains("- It's slow"));
    assert!(text.contains("- Waitlists of `years`"));
    assert!(!text.contains("{{"), "unresolved expression left in:\n{text}");
    assert!(!text.contains("{%"), "unresolved tag left in:\n{text}");
}

#[test]
fn business_pitch_slides_appear_in_block_order() {
    let store = bundled_store();
    let id = TemplateId::from("business-pitch");
    let mut blocks = store.blocks(&id).expect("blocks");
    blocks.reverse();
    let compiler = Compiler::new(store);

    let doc = compiler.compile(&id, &pitch_variables(), &blocks).expect("compile");
    let text = doc.as_str();
    let title = text.find("# Acme Rockets").expect("title slide");
    let team = text.find("# Our Team").expect("team slide");
    let thanks = text.find("# Thank You").expect("thank-you slide");
    assert!(title < team && team < thanks);
}

#[test]
fn compile_is_deterministic() {
    let store = bundled_store();
    let id = TemplateId::from("business-pitch");
    let blocks = store.blocks(&id).expect("blocks");
    let compiler = Compiler::new(store);
    let a = compiler.compile(&id, &pitch_variables(), &blocks).expect("first");
    let b = compiler.compile(&id, &pitch_variables(), &blocks).expect("second");
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[test]
fn lower_order_block_is_invoked_first_with_one_break() {
    let (_tmp, store) = fixture(&[(
        "all.tera",
        "{% macro first() %}FIRST{% endmacro first %}\
         {% macro second() %}SECOND{% endmacro second %}",
    )]);
    let compiler = Compiler::new(store);
    let blocks = vec![block("second", 2, &[]), block("first", 1, &[])];

    let doc = compiler
        .compile(&TemplateId::from("demo"), &BoundVariables::new(), &blocks)
        .expect("compile");
    let text = doc.as_str();

    let body = text.split("title: Slidev Presentation\n---").nth(1).expect("body");
    assert_eq!(body.matches(SLIDE_BREAK).count(), 1, "{body}");
    assert!(body.find("FIRST").expect("first") < body.find("SECOND").expect("second"));
    assert!(body.contains(&format!("FIRST{SLIDE_BREAK}SECOND")), "{body}");
}

#[test]
fn fragments_are_concatenated_in_file_name_order() {
    let (_tmp, store) = fixture(&[
        ("b.tera", "{% macro shared() %}from b{% endmacro shared %}"),
        ("a.tera", "{% macro other() %}from a{% endmacro other %}"),
    ]);
    let fragments = store.macro_fragments(&TemplateId::from("demo")).expect("fragments");
    let names: Vec<_> = fragments.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["a.tera", "b.tera"]);
}

#[test]
fn unknown_macro_is_compilation_failed() {
    let (_tmp, store) = fixture(&[("a.tera", "{% macro known() %}ok{% endmacro known %}")]);
    let compiler = Compiler::new(store);
    let err = compiler
        .compile(
            &TemplateId::from("demo"),
            &BoundVariables::new(),
            &[block("unknown", 0, &[])],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CompilationFailed);
    assert!(matches!(err, CompileError::Engine { .. }));
}

#[test]
fn malformed_fragment_is_compilation_failed() {
    let (_tmp, store) = fixture(&[("a.tera", "{% macro broken() %}never closed")]);
    let compiler = Compiler::new(store);
    let err = compiler
        .compile(&TemplateId::from("demo"), &BoundVariables::new(), &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CompilationFailed);
}

#[test]
fn unknown_template_is_not_found() {
    let compiler = Compiler::new(bundled_store());
    let err = compiler
        .compile(&TemplateId::from("no-such-deck"), &BoundVariables::new(), &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn invalid_variable_name_is_bad_request() {
    let (_tmp, store) = fixture(&[("a.tera", "")]);
    let compiler = Compiler::new(store);
    let mut vars = BoundVariables::new();
    vars.insert("not valid".into(), BoundValue::from("x"));
    let err = compiler
        .compile(&TemplateId::from("demo"), &vars, &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[test]
fn compile_request_round_trips_through_json() {
    let compiler = Compiler::new(bundled_store());
    let blocks = compiler
        .store()
        .blocks(&TemplateId::from("business-pitch"))
        .expect("blocks");
    let body = serde_json::json!({
        "templateId": "business-pitch",
        "variables": { "companyName": "Json Co" },
        "blocks": blocks,
    });
    let request: CompileRequest = serde_json::from_value(body).expect("request");
    let doc = compiler.compile_request(&request).expect("compile");
    assert!(doc.as_str().contains("# Json Co"));
}

#[test]
fn emitted_assignments_parse_back() {
    let stmt = slidekit_compiler::assignment(
        "painPoints",
        &BoundValue::List(vec!["a \"b\"".into(), "it's `c`".into(), "x\ny".into()]),
    )
    .expect("assignment");
    let (name, value) = parse_assignment(&stmt).expect("parse");
    assert_eq!(name, "painPoints");
    assert_eq!(
        value,
        BoundValue::List(vec!["a \"b\"".into(), "it's `c`".into(), "x\ny".into()])
    );
}
