//! Exercises the full extract -> render pipeline against a real
//! `g++`-compiled ELF/DWARF5 binary, covering both output formats.

use std::sync::Arc;

use render::{Config, Format};

fn fixture_bytes() -> Arc<[u8]> {
    std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/scenario1"))
        .expect("fixture binary missing")
        .into()
}

#[test]
fn scenario1_renders_plain_declarations() {
    let result = extract::extract(fixture_bytes()).expect("extraction failed");
    assert_eq!(result.entities.len(), 1, "expected one top-level namespace");

    let rendered = render::render(
        &result.entities,
        &result.base_dir,
        Format::Cpp,
        Config { includes: true },
    );
    assert_eq!(rendered.len(), 1, "expected one output file");
    let text = &rendered[0].text;

    assert!(text.contains("namespace N {"), "{text}");
    assert!(text.contains("class C {"), "{text}");
    assert!(text.contains("int x;"), "{text}");
    assert!(text.contains("C();"), "{text}");
    assert!(text.contains("void f(int y);"), "{text}");
    assert!(!text.contains("PTR_C"), "plain format must not synthesize trampolines: {text}");
}

#[test]
fn scenario1_renders_pointer_trampolines() {
    let result = extract::extract(fixture_bytes()).expect("extraction failed");
    let rendered = render::render(
        &result.entities,
        &result.base_dir,
        Format::PointersCpp,
        Config { includes: true },
    );
    let text = &rendered[0].text;

    assert!(text.contains("static C * construct();"), "construct must be a class member: {text}");
    assert!(text.contains("namespace PTR_C {"), "{text}");
    assert!(text.contains("unsigned long long C ="), "{text}");
    assert!(text.contains("unsigned long long f ="), "{text}");
    assert!(text.contains("static C * C::construct() {"), "{text}");
    assert!(
        text.contains("((void (*)(C *))(BASE_ADDRESS + PTR_C::C))(self);"),
        "constructor trampoline must pass the newly allocated instance as the receiver: {text}"
    );
    assert!(
        text.contains("void C::f(int y) {"),
        "out-of-class definition must match the in-class declaration, no injected self param: {text}"
    );
    assert!(
        text.contains("((void (*)(C *, int))(BASE_ADDRESS + PTR_C::f))(this, y);"),
        "method trampoline body must call through `this`: {text}"
    );
}
