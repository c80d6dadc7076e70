use super::*;
use crate::files;
use std::{fs, path::Path};

/// A scratch project on disk plus an engine over it.
struct TestSite {
    /// Keeps the temporary directory alive for the engine's lifetime.
    _tmp: tempfile::TempDir,
    /// The engine under test.
    engine: Engine,
}

/// Builds a minimal scratch project, letting `setup` add files before the
/// project loads.
fn site_with(setup: impl FnOnce(&Path)) -> TestSite {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("site");
    files::scaffold(&root).unwrap();
    setup(&root);
    let project = Rc::new(Project::open(&root).unwrap());
    TestSite {
        _tmp: tmp,
        engine: Engine::new(project).unwrap(),
    }
}

/// Builds a minimal scratch project.
fn site() -> TestSite {
    site_with(|_| {})
}

#[track_caller]
fn eval(engine: &mut Engine, source: &str) -> String {
    let tree = tokenizer::tokenize(source).unwrap();
    engine.evaluate_collection(&tree).unwrap().resolve()
}

#[test]
fn variables_splice_their_bodies() {
    let mut site = site();
    assert_eq!(
        eval(&mut site.engine, "{{!def who World}}Hello {{!who}}"),
        "Hello World"
    );
}

#[test]
fn macros_substitute_arguments() {
    let mut site = site();
    assert_eq!(
        eval(
            &mut site.engine,
            "{{!def em {{t}} <em>{{!t}}</em>}}{{!em hi}}"
        ),
        "<em>hi</em>"
    );
}

#[test]
fn single_parameter_macros_take_their_whole_tail() {
    let mut site = site();
    assert_eq!(
        eval(
            &mut site.engine,
            "{{!def greet {{x}} Hello {{!x}}}}{{!greet World}}"
        ),
        "Hello World"
    );
    assert_eq!(
        eval(&mut site.engine, "{{!greet big wide World}}"),
        "Hello big wide World"
    );
}

#[test]
fn optional_parameters_default_to_empty() {
    let mut site = site();
    assert_eq!(
        eval(
            &mut site.engine,
            "{{!def m {{a / b}} [{{!a}}-{{!b}}]}}{{!m one}}"
        ),
        "[one-]"
    );
    assert_eq!(
        eval(&mut site.engine, "{{!m {{one}} {{two}}}}"),
        "[one-two]"
    );
}

#[test]
fn arity_mismatches_discard_the_block() {
    let mut site = site();
    assert_eq!(
        eval(&mut site.engine, "{{!def m {{a b}} x}}a{{!m one}}b"),
        "ab"
    );
    // Functions too: datefmt takes exactly two.
    assert_eq!(eval(&mut site.engine, "a{{!datefmt}}b"), "ab");
}

#[test]
fn if_branches_on_defined_names() {
    let mut site = site();
    eval(&mut site.engine, "{{!def present x}}");
    assert_eq!(eval(&mut site.engine, "{{!if present yes no}}"), "yes");
    assert_eq!(eval(&mut site.engine, "{{!if absent yes no}}"), "no");
    assert_eq!(eval(&mut site.engine, "{{!if absent yes}}"), "");
}

#[test]
fn if_does_not_evaluate_the_untaken_branch() {
    let mut site = site();
    assert_eq!(
        eval(
            &mut site.engine,
            "{{!if undefined_name {{!nonexistent}} fallback}}"
        ),
        "fallback"
    );
    assert_eq!(
        eval(
            &mut site.engine,
            "{{!def present x}}{{!if present {{!present}} {{!nonexistent}}}}"
        ),
        "x"
    );
}

#[test]
fn def_bodies_are_stored_unevaluated() {
    let mut site = site();
    // Defining a body that references an undefined binding is fine; the
    // failure surfaces only at invocation, as empty output.
    assert_eq!(eval(&mut site.engine, "{{!def broken {{!missing}}}}"), "");
    assert_eq!(eval(&mut site.engine, "a{{!broken}}b"), "ab");
}

#[test]
fn unknown_bindings_collapse_to_empty() {
    let mut site = site();
    assert_eq!(eval(&mut site.engine, "a{{!nope}}b"), "ab");
}

#[test]
fn redefining_a_builtin_is_fatal() {
    let mut site = site();
    let tree = tokenizer::tokenize("{{!def if x}}").unwrap();
    assert!(matches!(
        site.engine.evaluate_collection(&tree),
        Err(Error::Overwrite(_))
    ));
}

#[test]
fn bindings_do_not_escape_their_scope() {
    let mut site = site();
    site.engine.bindings.push();
    eval(&mut site.engine, "{{!def temp x}}");
    assert!(site.engine.bindings.contains("temp"));
    site.engine.bindings.pop();
    assert!(!site.engine.bindings.contains("temp"));
}

#[test]
fn escaped_markers_pass_through() {
    let mut site = site();
    assert_eq!(
        eval(&mut site.engine, r"\{{not a tag\}}"),
        "{{not a tag}}"
    );
    assert_eq!(eval(&mut site.engine, r"\\"), r"\");
}

#[test]
fn call_output_is_trimmed() {
    let mut site = site();
    assert_eq!(
        eval(&mut site.engine, "{{!def v {{  padded  }}}}[{{!v}}]"),
        "[padded]"
    );
}

#[test]
fn datefmt_formats_and_passes_bad_input_through() {
    let mut site = site();
    assert_eq!(
        eval(&mut site.engine, "{{!datefmt 2024-03-15 %Y/%m/%d}}"),
        "2024/03/15"
    );
    assert_eq!(eval(&mut site.engine, "{{!datefmt nope %Y}}"), "nope");
}

#[test]
fn generated_is_an_iso_date() {
    let mut site = site();
    let out = eval(&mut site.engine, "{{!generated}}");
    assert!(dates::parse_iso(&out).is_ok(), "not an ISO date: {out}");
}

#[test]
fn anchor_slugifies() {
    let mut site = site();
    assert_eq!(
        eval(&mut site.engine, "{{!anchor {{Some Heading Text}}}}"),
        "some-heading-text"
    );
}

#[test]
fn md_renders_its_tail() {
    let mut site = site();
    assert_eq!(
        eval(&mut site.engine, "{{!md *hi*}}"),
        "<p><em>hi</em></p>"
    );
}

#[test]
fn code_wraps_single_lines_inline() {
    let mut site = site();
    assert_eq!(
        eval(&mut site.engine, "{{!code {{a < b}}}}"),
        "<code>a &lt; b</code>"
    );
}

#[test]
fn code_highlights_blocks() {
    let mut site = site();
    let out = eval(
        &mut site.engine,
        "{{!code rust {{let x = 1;\nlet y = 2;}}}}",
    );
    assert!(out.starts_with(r#"<div class="siter_code"><pre>"#), "{out}");
    assert!(out.contains("siter-line"));
}

#[test]
fn evaluation_is_deterministic() {
    let mut site = site();
    let source = "{{!def v {{a b}}}}{{!v}} {{!md # Title}} {{!code x {{y\nz}}}}";
    let first = eval(&mut site.engine, source);
    let second = eval(&mut site.engine, source);
    assert_eq!(first, second);
}

#[test]
fn stubs_render_newest_first() {
    let mut site = site_with(|root| {
        let stubs = root.join(config::DIR_STUBS).join("news");
        fs::create_dir_all(&stubs).unwrap();
        fs::write(stubs.join("2024-01.md"), "one").unwrap();
        fs::write(stubs.join("2024-02.md"), "two").unwrap();
        fs::write(stubs.join("2024-03.md"), "three").unwrap();
        let templates = root.join(config::DIR_TEMPLATE);
        fs::write(templates.join("item.html"), "<li>{{!content}}</li>").unwrap();
        fs::write(templates.join("sep.html"), " | ").unwrap();
    });

    assert_eq!(
        eval(&mut site.engine, "{{!stubs news item.html}}"),
        "<li><p>three</p></li><li><p>two</p></li><li><p>one</p></li>"
    );
    assert_eq!(
        eval(&mut site.engine, "{{!stubs news item.html {{sep.html}} 2}}"),
        "<li><p>three</p></li> | <li><p>two</p></li>"
    );
    // A third argument that parses as a number is the count.
    assert_eq!(
        eval(&mut site.engine, "{{!stubs news item.html 1}}"),
        "<li><p>three</p></li>"
    );
}

#[test]
fn missing_stub_directory_is_fatal() {
    let mut site = site();
    let tree = tokenizer::tokenize("{{!stubs absent page.html}}").unwrap();
    assert!(matches!(
        site.engine.evaluate_collection(&tree),
        Err(Error::Files(_))
    ));
}

#[test]
fn stub_bindings_keep_the_invoking_page_locals() {
    let mut site = site_with(|root| {
        let stubs = root.join(config::DIR_STUBS).join("news");
        fs::create_dir_all(&stubs).unwrap();
        fs::write(stubs.join("a.md"), "stub").unwrap();
        let templates = root.join(config::DIR_TEMPLATE);
        fs::write(templates.join("item.html"), "{{!root}}:{{!content}}").unwrap();
    });

    // The invoking page's root stays visible inside the stub render.
    site.engine.bindings.push();
    site.engine
        .bindings
        .set(
            config::names::ROOT,
            BindingKind::Variable {
                body: tokenizer::text("../.."),
            },
            false,
        )
        .unwrap();
    assert_eq!(
        eval(&mut site.engine, "{{!stubs news item.html}}"),
        "../..:<p>stub</p>"
    );
    site.engine.bindings.pop();
}
