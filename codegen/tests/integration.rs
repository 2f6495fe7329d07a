use codegen::{CompileOptions, Compiler, compile_source, emit};
use tasse::parser::{ParseErrorKind, ParseOptions, Parser, TrimMode};

const HEAD: &str = "<html><head><link rel=\"stylesheet\" href=\"example.css\"></head><body>";

fn body_of(source: &str) -> String {
    let program = Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed");
    emit(&program.root).body
}

fn script_of(source: &str) -> String {
    let program = Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed");
    emit(&program.root).script
}

#[test]
fn two_children_end_to_end() {
    assert_eq!(
        body_of("((a)(b))"),
        "<div id=\"id1\" class=\"\"><div id=\"id2\" class=\"\"></div><div id=\"id3\" class=\"\"></div></div>"
    );
}

#[test]
fn full_document_shape() {
    let html = compile_source("((a)(b))").unwrap();
    assert_eq!(
        html,
        format!(
            "{}<div id=\"id1\" class=\"\"><div id=\"id2\" class=\"\"></div>\
             <div id=\"id3\" class=\"\"></div></div><script>let el;</script></body></html>",
            HEAD
        )
    );
}

#[test]
fn opening_tag_count_matches_element_count() {
    let source = "( ( (x) (y) ) ( (z) ) () )";
    let mut compiler = Compiler::default();
    let compiled = compiler.compile(source, 0).unwrap();
    assert_eq!(compiled.element_count, 7);
    assert_eq!(compiled.html.matches("<div ").count(), 7);
    assert_eq!(compiled.html.matches("</div>").count(), 7);
}

#[test]
fn style_and_text_render_on_the_element() {
    assert_eq!(
        body_of("({card};\r\n<Hello>;\r\n)"),
        "<div id=\"id1\" class=\"card\">Hello</div>"
    );
}

#[test]
fn scripts_are_wrapped_and_ordered() {
    let script = script_of("([a()]\r\n([b()]\r\n)([c()]\r\n))");
    assert_eq!(
        script,
        "(()=>{let el=document.getElementById(\"id1\");a();})();\
         (()=>{let el=document.getElementById(\"id2\");b();})();\
         (()=>{let el=document.getElementById(\"id3\");c();})();"
    );
}

#[test]
fn recompiling_gives_identical_output() {
    let mut compiler = Compiler::default();
    let first = compiler.compile("((a)([x()]\r\n))", 0).unwrap();
    let second = compiler.compile("((a)([x()]\r\n))", 0).unwrap();
    assert_eq!(first.html, second.html);
    assert!(second.html.contains("getElementById(\"id3\")"));
}

#[test]
fn custom_stylesheet_and_trim_mode() {
    let mut compiler = Compiler::new(CompileOptions {
        parse: ParseOptions {
            trim: TrimMode::Delimited,
            ..ParseOptions::default()
        },
        stylesheet: "app.css".to_string(),
    });
    let html = compiler.compile("({big}<Hi>)", 0).unwrap().html;
    assert!(html.contains("href=\"app.css\""));
    assert!(html.contains("<div id=\"id1\" class=\"big\">Hi</div>"));
}

#[test]
fn errors_produce_no_output() {
    let err = compile_source("((a)").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnbalancedDelimiter);

    let err = compile_source("({a)").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MalformedElement);
}

#[test]
fn warnings_are_passed_through() {
    let mut compiler = Compiler::default();
    let compiled = compiler.compile("(a) trailing", 0).unwrap();
    assert_eq!(compiled.warnings.len(), 1);
    assert_eq!(compiled.element_count, 1);
}
