use indoc::indoc;
use jinja_to_js::{
    CompileError, CompileOptions, Environment, InMemoryLoader, ModuleFormat, compile,
};
use jinja_to_js_testhelpers::assert_valid_js;

fn compile_with(env: &Environment, options: &CompileOptions) -> String {
    jinja_to_js_testhelpers::setup();
    let js = match compile(env, options) {
        Ok(js) => js,
        Err(e) => panic!("compilation failed: {e:?}"),
    };
    assert_valid_js(&js, options.module_format == ModuleFormat::Es6);
    js
}

fn compile_source(source: &str) -> String {
    compile_with(
        &Environment::default(),
        &CompileOptions::new().template_source(source),
    )
}

fn compile_err(source: &str) -> CompileError {
    jinja_to_js_testhelpers::setup();
    let options = CompileOptions::new().template_source(source);
    match compile(&Environment::default(), &options) {
        Ok(js) => panic!("expected an error, got:\n{js}"),
        Err(e) => e,
    }
}

#[test]
fn function_shape() {
    let options = CompileOptions::new()
        .template_source("Hello {{ name }}!")
        .autoescape(false);
    let js = compile_with(&Environment::default(), &options);
    insta::assert_snapshot!(js, @r#"
    function template(context) {
        var __result = "";
        var __tmp;
        __result += "Hello ";
        __result += ((__tmp = (context.name)) == null ? "" : __tmp);
        __result += "!";
        return __result;
    }
    "#);
}

#[test]
fn output_is_escaped_by_default() {
    let js = compile_source("{{ name }}{{ html|safe }}");
    assert!(js.contains("function __escape("));
    assert!(js.contains("__result += __escape(context.name);"));
    assert!(js.contains("__result += ((__tmp = (context.html)) == null ? \"\" : __tmp);"));
}

#[test]
fn template_names_become_function_names() {
    let env = Environment::new(InMemoryLoader::new().with("includes/user_name.jinja", "hi"));
    let js = compile_with(&env, &CompileOptions::new().template_name("includes/user_name.jinja"));
    assert!(js.starts_with("function templateIncludesUserName(context) {"));
}

#[test]
fn custom_context_name() {
    let options = CompileOptions::new()
        .template_source("{{ user.name }}")
        .context_name("ctx");
    let js = compile_with(&Environment::default(), &options);
    assert!(js.starts_with("function template(ctx) {"));
    assert!(js.contains("__escape(ctx.user.name)"));
}

#[test]
fn conditions_use_python_truthiness() {
    let js = compile_source("{% if items %}some{% else %}none{% endif %}");
    assert!(js.contains("if (__ok(context.items)) {"));
    assert!(js.contains("} else {"));
    let type_at = js.find("function __type(").unwrap();
    let ok_at = js.find("function __ok(").unwrap();
    assert!(type_at < ok_at, "helpers must follow their dependencies");
}

#[test]
fn logical_operators_coerce_each_operand() {
    let js = compile_source("{% if a and not b or c == 1 %}x{% endif %}");
    assert!(js.contains("if (((__ok(context.a) && !__ok(context.b)) || (context.c === 1))) {"));
}

#[test]
fn elif_chains() {
    let js = compile_source(indoc! {r#"
        {% if a %}A{% elif b %}B{% elif c %}C{% else %}D{% endif %}
    "#});
    assert!(js.contains("if (__ok(context.a)) {"));
    assert!(js.contains("} else if (__ok(context.b)) {"));
    assert!(js.contains("} else if (__ok(context.c)) {"));
    assert!(js.contains("} else {"));
    assert_eq!(js.matches("function __ok(").count(), 1);
}

#[test]
fn equality() {
    let js = compile_source("{{ a == b }}{{ a != b }}{{ a == 'x' }}{{ 1 != a }}");
    assert!(js.contains("__isEqual(context.a, context.b)"));
    assert!(js.contains("!__isEqual(context.a, context.b)"));
    assert!(js.contains("(context.a === \"x\")"));
    assert!(js.contains("(1 !== context.a)"));
}

#[test]
fn comparisons_and_membership() {
    let js = compile_source("{{ a < b }}{{ a >= 2 }}{{ 'x' in xs }}{{ y not in xs }}");
    assert!(js.contains("(context.a < context.b)"));
    assert!(js.contains("(context.a >= 2)"));
    assert!(js.contains("__contains(context.xs, \"x\")"));
    assert!(js.contains("!__contains(context.xs, context.y)"));
    assert!(js.contains("function __contains("));
    assert!(js.contains("function __isEqual("));
}

#[test]
fn arithmetic() {
    let js = compile_source("{{ a + 1 }}{{ a - b * c }}{{ 7 // 2 }}{{ 2 ** 8 }}{{ a % 3 }}{{ -a }}");
    assert!(js.contains("(context.a + 1)"));
    assert!(js.contains("(context.a - (context.b * context.c))"));
    assert!(js.contains("Math.floor(7 / 2)"));
    assert!(js.contains("Math.pow(2, 8)"));
    assert!(js.contains("(context.a % 3)"));
    assert!(js.contains("(-context.a)"));
}

#[test]
fn concatenation_forces_strings() {
    let js = compile_source("{{ 1 ~ 2 }}");
    assert!(js.contains("(\"\" + 1 + 2)"));
}

#[test]
fn collections_and_access() {
    let js = compile_source(r#"{{ [1, "a"] }}{{ {"k": v, n: 2} }}{{ user["name"] }}{{ xs[0].id }}"#);
    assert!(js.contains(r#"[1, "a"]"#));
    assert!(js.contains(r#"{"k": context.v, [context.n]: 2}"#));
    assert!(js.contains(r#"context.user["name"]"#));
    assert!(js.contains("context.xs[0].id"));
}

#[test]
fn slices() {
    let js = compile_source("{{ xs[1:] }}{{ xs[:2] }}{{ xs[a:b] }}");
    assert!(js.contains("context.xs.slice(1)"));
    assert!(js.contains("context.xs.slice(0, 2)"));
    assert!(js.contains("context.xs.slice(context.a, context.b)"));
}

#[test]
fn inline_conditionals() {
    let js = compile_source("{{ 'yes' if ok else 'no' }}{{ 'maybe' if ok }}");
    assert!(js.contains("(__ok(context.ok) ? \"yes\" : \"no\")"));
    assert!(js.contains("(__ok(context.ok) ? \"maybe\" : undefined)"));
}

#[test]
fn conditions_coerce_the_chosen_branch() {
    let js = compile_source("{% if (items if flag else other) %}yes{% else %}no{% endif %}");
    assert!(js.contains(
        "if (__ok((__ok(context.flag) ? context.items : context.other))) {"
    ));
}

#[test]
fn method_calls() {
    let js = compile_source("{{ user.greet('hi') }}{{ d.items() }}");
    assert!(js.contains("context.user.greet(\"hi\")"));
    assert!(js.contains("__escape(context.d)"));
}

#[test]
fn helper_filters() {
    let js = compile_source(indoc! {r#"
        {{ a|capitalize }}{{ b|capitalize }}
        {{ xs|batch(3, "-") }}{{ x|default("n/a", true) }}{{ xs|first }}{{ xs|last }}
        {{ s|int }}{{ xs|slice(2) }}{{ s|title }}{{ s|truncate(10) }}{{ xs|length }}
    "#});
    assert_eq!(js.matches("function __capitalize(").count(), 1);
    assert!(js.contains("__capitalize(context.a)"));
    assert!(js.contains("__batch(context.xs, 3, \"-\")"));
    assert!(js.contains("__default(context.x, \"n/a\", true)"));
    assert!(js.contains("__first(context.xs)"));
    assert!(js.contains("__last(context.xs)"));
    assert!(js.contains("__int(context.s)"));
    assert!(js.contains("__slice(context.xs, 2)"));
    assert!(js.contains("__title(context.s)"));
    assert!(js.contains("__truncate(context.s, 10)"));
    assert!(js.contains("__size(context.xs)"));
}

#[test]
fn inline_filters() {
    let js = compile_source("{{ n|abs }}{{ s|lower }}{{ s|upper }}{{ s|trim }}{{ obj|attr('key') }}");
    assert!(js.contains("Math.abs(context.n)"));
    assert!(js.contains("context.s.toLowerCase()"));
    assert!(js.contains("context.s.toUpperCase()"));
    assert!(js.contains("context.s.trim()"));
    assert!(js.contains("context.obj[\"key\"]"));
}

#[test]
fn custom_filters_go_through_the_runtime() {
    let options = CompileOptions::new()
        .template_source("{{ body|markdown }}{{ n|format_num(2) }}")
        .custom_filter("markdown")
        .custom_filter("format_num");
    let js = compile_with(&Environment::default(), &options);
    assert!(js.contains("jinjaToJS.filters.markdown(context.body)"));
    assert!(js.contains("jinjaToJS.filters.format_num(context.n, 2)"));
}

#[test]
fn tests() {
    let js = compile_source(indoc! {r#"
        {% if x is defined %}1{% endif %}
        {% if x is undefined %}2{% endif %}
        {% if x is not none %}3{% endif %}
        {% if n is divisibleby 3 %}4{% endif %}
        {% if n is even %}5{% endif %}
        {% if n is odd %}6{% endif %}
        {% if f is callable %}7{% endif %}
        {% if s is string %}8{% endif %}
        {% if d is mapping %}9{% endif %}
        {% if n is number %}10{% endif %}
        {% if s is upper %}11{% endif %}
    "#});
    assert!(js.contains("if ((typeof context.x !== \"undefined\")) {"));
    assert!(js.contains("if ((typeof context.x === \"undefined\")) {"));
    assert!(js.contains("if (!(context.x === null)) {"));
    assert!(js.contains("if ((context.n % 3 === 0)) {"));
    assert!(js.contains("if ((context.n % 2 === 0)) {"));
    assert!(js.contains("if ((Math.abs(context.n % 2) === 1)) {"));
    assert!(js.contains("if ((__type(context.f) === \"Function\")) {"));
    assert!(js.contains("if ((__type(context.s) === \"String\")) {"));
    assert!(js.contains("if ((__type(context.d) === \"Object\")) {"));
    assert!(js.contains("if ((__type(context.n) === \"Number\" && !isNaN(context.n))) {"));
    assert!(js.contains("if ((context.s.toUpperCase() === context.s)) {"));
}

#[test]
fn loops() {
    let js = compile_source("{% for item in items %}{{ loop.index }}: {{ item }}{% endfor %}");
    assert!(js.contains("__each(context.items, function (item, __$0, __$1) {"));
    assert!(js.contains("__result += __escape((__$0 + 1));"));
    assert!(js.contains("__result += __escape(item);"));
    assert!(js.contains("});"));
}

#[test]
fn loop_metadata() {
    let js = compile_source(indoc! {"
        {% for x in xs %}
        {{ loop.index0 }}{{ loop.first }}{{ loop.last }}{{ loop.length }}{{ loop.revindex }}{{ loop.revindex0 }}
        {% endfor %}
    "});
    assert!(js.contains("__escape(__$0)"));
    assert!(js.contains("(__$0 === 0)"));
    assert!(js.contains("(__$0 === __$1.length - 1)"));
    assert!(js.contains("__escape(__$1.length)"));
    assert!(js.contains("(__$1.length - __$0)"));
    assert!(js.contains("(__$1.length - __$0 - 1)"));
}

#[test]
fn nested_loops_see_their_own_metadata() {
    let js = compile_source("{% for a in xs %}{% for b in a %}{{ loop.index }}{% endfor %}{{ loop.index }}{% endfor %}");
    assert!(js.contains("function (a, __$0, __$1) {"));
    assert!(js.contains("function (b, __$3, __$4) {"));
    assert!(js.contains("__escape((__$3 + 1))"));
    assert!(js.contains("__escape((__$0 + 1))"));
}

#[test]
fn key_value_loops() {
    let js = compile_source("{% for key, value in data.items() %}{{ key }}={{ value }}{% endfor %}");
    assert!(js.contains("__each(context.data, function (value, key, __$0) {"));
    assert!(js.contains("__escape(key)"));
    assert!(js.contains("__escape(value)"));
}

#[test]
fn keys_loops() {
    let js = compile_source("{% for k in data.keys() %}{{ k }}{% endfor %}");
    assert!(js.contains("__each(__keys(context.data), function (k, __$0, __$1) {"));
    assert!(js.contains("function __keys("));
}

#[test]
fn loop_filters_skip_items() {
    let js = compile_source("{% for x in xs if x > 1 %}{{ x }}{% endfor %}");
    assert!(js.contains("if (!((x > 1))) {"));
    assert!(js.contains("return;"));
}

#[test]
fn loop_variables_shadow_the_context_during_the_body() {
    let js = compile_source("{% for item in items %}{% include 'row.jinja' %}{% endfor %}");
    assert!(js.contains("var __$2 = context.item;"));
    assert!(js.contains("context.item = item;"));
    assert!(js.contains("context.item = __$2;"));
}

#[test]
fn assignments_are_locals() {
    let js = compile_source("{% set title = 'Home' %}{{ title }}{{ other }}");
    assert!(js.contains("var title = \"Home\";"));
    assert!(js.contains("__escape(title)"));
    assert!(js.contains("__escape(context.other)"));
}

#[test]
fn loop_assignments_do_not_leak() {
    let js = compile_source("{% for x in xs %}{% set y = x %}{{ y }}{% endfor %}{{ y }}{{ x }}");
    assert!(js.contains("var y = x;"));
    assert!(js.contains("__escape(y)"));
    assert!(js.contains("__escape(context.y)"));
    assert!(js.contains("__escape(context.x)"));
}

#[test]
fn outer_assignments_stay_visible_after_a_loop() {
    let js = compile_source("{% set y = 1 %}{% for x in xs %}{% endfor %}{{ y }}");
    assert!(js.contains("__escape(y)"));
}

#[test]
fn with_blocks() {
    let js = compile_source("{% with a = 1, b = a %}{{ a }}{{ b }}{% set c = 3 %}{% endwith %}{{ a }}");
    assert!(js.contains("var __$0 = context.a;"));
    assert!(js.contains("context.a = 1;"));
    assert!(js.contains("context.b = context.a;"));
    assert!(js.contains("(function () {"));
    assert!(js.contains("})();"));
    assert!(js.contains("context.a = __$0;"));
    assert!(js.contains("context.b = __$1;"));
    assert!(js.contains("__escape(context.b)"));
}

#[test]
fn autoescape_off_makes_every_region_safe() {
    let options = CompileOptions::new()
        .template_source("{{ a }}{{ b|safe }}")
        .autoescape(false);
    let js = compile_with(&Environment::default(), &options);
    assert!(!js.contains("__escape"));
    assert_eq!(js.matches("== null ? \"\" : __tmp);").count(), 2);
}

#[test]
fn raw_text_and_comments() {
    let js = compile_source("{# note #}{% raw %}{{ not a tag }}{% endraw %}\"quoted\"\n");
    assert!(js.contains(r#"__result += "{{ not a tag }}";"#));
    assert!(js.contains(r#"__result += "\"quoted\"\n";"#));
    assert!(!js.contains("note"));
}

#[test]
fn missing_source() {
    let err = compile(&Environment::default(), &CompileOptions::new()).unwrap_err();
    assert!(matches!(err, CompileError::MissingTemplateSource));
}

#[test]
fn missing_template() {
    let options = CompileOptions::new().template_name("nope.jinja");
    let err = compile(&Environment::default(), &options).unwrap_err();
    assert!(matches!(err, CompileError::TemplateNotFound { ref name, .. } if name == "nope.jinja"));
}

#[test]
fn parse_errors_pass_through() {
    assert!(matches!(compile_err("{% if x %}"), CompileError::Parse(_)));
}

#[test]
fn chained_comparisons_are_rejected() {
    assert!(matches!(
        compile_err("{{ 1 < x < 3 }}"),
        CompileError::MultipleComparisonOperandsUnsupported { .. }
    ));
}

#[test]
fn unknown_filters_suggest_alternatives() {
    let CompileError::UnsupportedFilter { name, help, .. } = compile_err("{{ x|captalize }}") else {
        panic!("expected UnsupportedFilter");
    };
    assert_eq!(name, "captalize");
    assert_eq!(help.as_deref(), Some("Did you mean `capitalize`?"));

    let CompileError::UnsupportedFilter { help, .. } = compile_err("{{ x|markdown }}") else {
        panic!("expected UnsupportedFilter");
    };
    assert!(help.unwrap().starts_with("Supported filters: safe, capitalize"));
}

#[test]
fn unknown_tests_are_rejected() {
    assert!(matches!(
        compile_err("{% if x is sameas y %}{% endif %}"),
        CompileError::UnsupportedTest { ref name, .. } if name == "sameas"
    ));
}

#[test]
fn destructuring_more_than_two_names_is_rejected() {
    assert!(matches!(
        compile_err("{% for a, b, c in xs %}{% endfor %}"),
        CompileError::UnsupportedDestructuring { count: 3, .. }
    ));
}

#[test]
fn slice_steps_are_rejected() {
    assert!(matches!(
        compile_err("{{ xs[0:4:2] }}"),
        CompileError::UnsupportedSliceStep { .. }
    ));
}

#[test]
fn super_outside_a_block_is_rejected() {
    assert!(matches!(
        compile_err("{{ super() }}"),
        CompileError::SuperOutsideBlock { .. }
    ));
}

#[test]
fn macros_are_rejected() {
    assert!(matches!(
        compile_err("{% macro m(a) %}{{ a }}{% endmacro %}"),
        CompileError::UnknownNodeKind { kind: "macro", .. }
    ));
}

#[test]
fn diagnostics_carry_codes_and_spans() {
    use miette::Diagnostic;

    let source = "{{ 1 < x < 3 }}";
    let err = compile_err(source);
    assert_eq!(
        err.code().map(|c| c.to_string()).as_deref(),
        Some("jinja_to_js::multiple_comparison_operands_unsupported")
    );
    let label = err.labels().and_then(|mut l| l.next()).unwrap();
    assert_eq!(&source[label.offset()..label.offset() + label.len()], "1 < x < 3");
}
