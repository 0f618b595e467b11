use indoc::indoc;
use jinja_to_js::{CompileError, CompileOptions, Environment, InMemoryLoader, ModuleFormat, compile};
use jinja_to_js_testhelpers::assert_valid_js;

fn env() -> Environment {
    Environment::new(
        InMemoryLoader::new()
            .with(
                "base.jinja",
                indoc! {r#"
                    <title>{% block title %}Base{% endblock %}</title>
                    {% block body %}{{ greeting|title }}{% endblock %}
                    {% block footer %}(c){% endblock %}
                "#},
            )
            .with(
                "child.jinja",
                indoc! {r#"
                    {% extends "base.jinja" %}
                    {% block title %}Child - {{ super() }}{% endblock %}
                    {% block body %}Hi{% endblock %}
                "#},
            )
            .with(
                "grandchild.jinja",
                indoc! {r#"
                    {% extends "child.jinja" %}
                    {% block body %}Grand {{ super() }}{% endblock %}
                "#},
            )
            .with(
                "lonely.jinja",
                "{% block a %}{{ super() }}{% endblock %}",
            )
            .with("orphan.jinja", "{% extends 'missing.jinja' %}")
            .with(
                "conditional.jinja",
                "{% if flag %}{% extends 'base.jinja' %}{% endif %}tail",
            )
            .with(
                "looped.jinja",
                "{% for x in xs %}{% extends 'base.jinja' %}{% endfor %}",
            )
            .with(
                "nested_block.jinja",
                "{% extends 'base.jinja' %}{% block body %}{% extends 'child.jinja' %}{% endblock %}",
            ),
    )
}

fn compile_named(name: &str, format: ModuleFormat) -> Result<String, CompileError> {
    jinja_to_js_testhelpers::setup();
    let options = CompileOptions::new()
        .template_name(name)
        .module_format(format);
    let js = compile(&env(), &options)?;
    assert_valid_js(&js, format == ModuleFormat::Es6);
    Ok(js)
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in:\n{haystack}"))
}

#[test]
fn child_blocks_replace_parent_blocks() {
    let js = compile_named("child.jinja", ModuleFormat::Global).unwrap();
    assert!(js.starts_with("function templateChild(context) {"));

    let title = position(&js, r#"__result += "<title>";"#);
    let child = position(&js, r#"__result += "Child - ";"#);
    let parent = position(&js, r#"__result += "Base";"#);
    let body = position(&js, r#"__result += "Hi";"#);
    let footer = position(&js, r#"__result += "(c)";"#);
    assert!(title < child && child < parent && parent < body && body < footer);

    // the parent's own body block is overridden
    assert!(!js.contains("context.greeting"));
}

#[test]
fn super_renders_the_parent_block_inline() {
    let js = compile_named("child.jinja", ModuleFormat::Global).unwrap();
    assert!(js.contains("__result += ((__tmp = ((function () {"));
    assert!(js.contains("return __result;"));
    assert!(js.contains("})())) == null ? \"\" : __tmp);"));
}

#[test]
fn super_walks_up_every_level() {
    let js = compile_named("grandchild.jinja", ModuleFormat::Global).unwrap();
    assert!(js.starts_with("function templateGrandchild(context) {"));

    let grand = position(&js, r#"__result += "Grand ";"#);
    let child = position(&js, r#"__result += "Hi";"#);
    assert!(grand < child);
    // title comes from the middle template, which calls super() itself
    assert!(js.contains(r#"__result += "Child - ";"#));
    assert!(js.contains(r#"__result += "Base";"#));
}

#[test]
fn parent_helpers_are_injected_into_the_child() {
    let env = Environment::new(
        InMemoryLoader::new()
            .with("base.jinja", "{{ name|capitalize }}{% block content %}{% endblock %}")
            .with("page.jinja", "{% extends 'base.jinja' %}{% block content %}{{ n|abs }}{% endblock %}"),
    );
    let js = compile(&env, &CompileOptions::new().template_name("page.jinja")).unwrap();
    assert_valid_js(&js, false);
    assert_eq!(js.matches("function __capitalize(").count(), 1);
    assert_eq!(js.matches("function __escape(").count(), 1);
    assert!(js.contains("Math.abs(context.n)"));
}

#[test]
fn parents_are_not_imported() {
    let js = compile_named("child.jinja", ModuleFormat::Es6).unwrap();
    assert!(js.starts_with("import jinjaToJS from \"jinja-to-js\";\n"));
    assert!(!js.contains("templateBase"));
    assert_eq!(js.matches("import ").count(), 1);
}

#[test]
fn content_before_extends_is_kept() {
    let env = Environment::new(
        InMemoryLoader::new()
            .with("base.jinja", "[{% block a %}{% endblock %}]")
            .with("page.jinja", "{% set x = 1 %}{% extends 'base.jinja' %}{% block a %}{{ x }}{% endblock %}ignored"),
    );
    let js = compile(&env, &CompileOptions::new().template_name("page.jinja")).unwrap();
    assert_valid_js(&js, false);
    assert!(js.contains("var x = 1;"));
    assert!(!js.contains("ignored"));
}

#[test]
fn blocks_without_extends_render_in_place() {
    let js = compile(
        &Environment::default(),
        &CompileOptions::new().template_source("a{% block b %}b{% endblock %}c"),
    )
    .unwrap();
    assert_valid_js(&js, false);
    let a = position(&js, r#"__result += "a";"#);
    let b = position(&js, r#"__result += "b";"#);
    let c = position(&js, r#"__result += "c";"#);
    assert!(a < b && b < c);
}

#[test]
fn super_without_a_parent_block_fails() {
    let err = compile_named("lonely.jinja", ModuleFormat::Global).unwrap_err();
    assert!(matches!(err, CompileError::SuperOutsideBlock { .. }));
}

#[test]
fn missing_parent_fails() {
    let err = compile_named("orphan.jinja", ModuleFormat::Global).unwrap_err();
    assert!(matches!(err, CompileError::TemplateNotFound { ref name, .. } if name == "missing.jinja"));
}

#[test]
fn extends_must_be_top_level() {
    for name in ["conditional.jinja", "looped.jinja", "nested_block.jinja"] {
        for format in [ModuleFormat::Global, ModuleFormat::Es6] {
            match compile_named(name, format) {
                Err(CompileError::NestedExtends { .. }) => {}
                other => panic!("{name}: expected NestedExtends, got {other:?}"),
            }
        }
    }
}

#[test]
fn nested_extends_points_at_the_tag() {
    use miette::Diagnostic;

    let err = compile_named("conditional.jinja", ModuleFormat::Global).unwrap_err();
    assert_eq!(
        err.code().map(|c| c.to_string()).as_deref(),
        Some("jinja_to_js::nested_extends")
    );
    let source = "{% if flag %}{% extends 'base.jinja' %}{% endif %}tail";
    let label = err.labels().and_then(|mut l| l.next()).unwrap();
    assert!(source[label.offset()..label.offset() + label.len()].contains("extends 'base.jinja'"));
}
