//! Shared harness for end-to-end tests
//!
//! Programs are built with [`AstBuilder`] (the parser lives outside this
//! crate), compiled through the [`Pipeline`], and run on a fresh VM.

#![allow(dead_code)]

use fool_engine::{Analysis, AstBuilder, FaultKind, Pipeline, PipelineError, Program, Type};

/// Install a test-writer subscriber so `RUST_LOG`-style output shows up
/// under `cargo test -- --nocapture`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Build a program with a fresh builder
pub fn build(f: impl FnOnce(&mut AstBuilder) -> Program) -> Program {
    let mut b = AstBuilder::new();
    f(&mut b)
}

/// Run a program and return its output lines, failing on any error
pub fn run(program: &Program) -> Vec<String> {
    init_tracing();
    let mut out = Vec::new();
    if let Err(error) = Pipeline::default().run(program, &mut out) {
        panic!("program failed: {}", error);
    }
    lines(out)
}

/// Assert the output lines of a program
pub fn expect_output(program: &Program, expected: &[&str]) {
    assert_eq!(run(program), expected);
}

/// Run a program expected to fault; returns the fault kind and the output
/// produced before the fault
pub fn expect_fault(program: &Program) -> (FaultKind, Vec<String>) {
    init_tracing();
    let mut out = Vec::new();
    match Pipeline::default().run(program, &mut out) {
        Err(PipelineError::Vm(error)) => (error.kind(), lines(out)),
        other => panic!("expected a runtime fault, got {:?}", other),
    }
}

/// Analyze a program without running it
pub fn analyze(program: &Program) -> Analysis {
    init_tracing();
    Pipeline::default().analyze(program)
}

/// Assert the number of scope errors, with no type errors
pub fn expect_scope_errors(program: &Program, count: usize) -> Analysis {
    let analysis = analyze(program);
    assert_eq!(
        analysis.counts.scope,
        count,
        "scope errors: {:?}",
        analysis.context.scope_errors()
    );
    analysis
}

/// Assert that a program fails type checking
pub fn expect_type_error(program: &Program) -> Analysis {
    let analysis = analyze(program);
    assert_eq!(analysis.counts.scope, 0, "scope errors: {:?}", analysis.context.scope_errors());
    assert!(
        analysis.counts.types > 0,
        "expected a type error, main type {:?}",
        analysis.main_type
    );
    analysis
}

/// Assert the type of a well-formed program's main expression
pub fn expect_type(program: &Program, expected: Type) {
    let analysis = analyze(program);
    assert!(analysis.counts.is_clean(), "unexpected errors: {}", analysis.counts);
    assert_eq!(analysis.main_type.ok(), Some(expected));
}

fn lines(out: Vec<u8>) -> Vec<String> {
    String::from_utf8(out)
        .expect("utf-8 output")
        .lines()
        .map(str::to_string)
        .collect()
}
