use std::fs;

use jinja_to_js::{
    CompileError, CompileOptions, Environment, FileSystemLoader, InMemoryLoader, ModuleFormat,
    RUNTIME_SOURCE, compile,
};
use jinja_to_js_testhelpers::{IPanic, assert_valid_js};

fn env() -> Environment {
    Environment::new(
        InMemoryLoader::new()
            .with(
                "pages/home.jinja",
                "{% include 'partials/user.jinja' %}{% include 'partials/user.jinja' %}{% include 'pages/footer.jinja' %}",
            )
            .with("partials/user.jinja", "{{ user.name }}")
            .with("tree.jinja", "{% for child in children %}{% include 'tree.jinja' %}{% endfor %}")
            .with(
                "lookalikes.jinja",
                "{% include 'a/x.jinja' %}{% include 'a_x.jinja' %}{% include 'a/x.jinja' %}",
            ),
    )
}

fn compile_home(options: CompileOptions) -> String {
    jinja_to_js_testhelpers::setup();
    let options = options.template_name("pages/home.jinja");
    let js = match compile(&env(), &options) {
        Ok(js) => js,
        Err(e) => panic!("compilation failed: {e:?}"),
    };
    assert_valid_js(&js, options.module_format == ModuleFormat::Es6);
    js
}

#[test]
fn global_includes_use_the_runtime_registry() {
    let js = compile_home(CompileOptions::new());
    assert!(js.starts_with("function templatePagesHome(context) {"));
    assert!(js.contains(
        r#"__result += ((__tmp = (jinjaToJS.include("partials/user")(context))) == null ? "" : __tmp);"#
    ));
    assert!(js.contains(r#"jinjaToJS.include("pages/footer")(context)"#));
}

#[test]
fn es6_modules_import_included_templates() {
    let js = compile_home(CompileOptions::new().module_format(ModuleFormat::Es6));
    insta::assert_snapshot!(js.lines().take(3).collect::<Vec<_>>().join("\n"), @r#"
    import jinjaToJS from "jinja-to-js";
    import templatePartialsUser from "../partials/user";
    import templatePagesFooter from "./footer";
    "#);
    assert!(js.contains("export default function templatePagesHome(context) {"));
    assert!(js.contains("templatePartialsUser(context)"));
    assert_eq!(js.matches("import templatePartialsUser").count(), 1);
}

#[test]
fn includes_with_the_same_function_name_get_distinct_bindings() {
    jinja_to_js_testhelpers::setup();
    for format in [ModuleFormat::Es6, ModuleFormat::CommonJs, ModuleFormat::Amd] {
        let options = CompileOptions::new()
            .template_name("lookalikes.jinja")
            .module_format(format);
        let js = compile(&env(), &options).unwrap();
        assert_valid_js(&js, format == ModuleFormat::Es6);

        assert!(js.contains("templateAX(context)"), "{js}");
        assert!(js.contains("templateAX2(context)"), "{js}");
        assert!(!js.contains("templateAX3"), "{js}");
    }

    let options = CompileOptions::new()
        .template_name("lookalikes.jinja")
        .module_format(ModuleFormat::Es6);
    let js = compile(&env(), &options).unwrap();
    insta::assert_snapshot!(js.lines().take(3).collect::<Vec<_>>().join("\n"), @r#"
    import jinjaToJS from "jinja-to-js";
    import templateAX from "./a/x";
    import templateAX2 from "./a_x";
    "#);
}

#[test]
fn commonjs_modules_require_included_templates() {
    let js = compile_home(
        CompileOptions::new()
            .module_format(ModuleFormat::CommonJs)
            .include_ext(".js"),
    );
    assert!(js.starts_with("var jinjaToJS = require(\"jinja-to-js\");\n"));
    assert!(js.contains("var templatePartialsUser = require(\"../partials/user.js\");"));
    assert!(js.contains("var templatePagesFooter = require(\"./footer.js\");"));
    assert!(js.contains("module.exports = function templatePagesHome(context) {"));
    assert!(js.trim_end().ends_with("};"));
}

#[test]
fn amd_modules_list_dependencies_in_order() {
    let js = compile_home(
        CompileOptions::new()
            .module_format(ModuleFormat::Amd)
            .runtime_path("lib/jinja-to-js")
            .include_prefix("/templates/")
            .include_ext(".js"),
    );
    assert!(js.starts_with(
        "define([\"lib/jinja-to-js\", \"/templates/partials/user.js\", \"/templates/pages/footer.js\"], \
         function (jinjaToJS, templatePartialsUser, templatePagesFooter) {\n\
         return function templatePagesHome(context) {"
    ));
    assert!(js.ends_with("};\n});\n"));
}

#[test]
fn self_includes_call_the_template_itself() {
    jinja_to_js_testhelpers::setup();
    for format in ModuleFormat::ALL {
        let options = CompileOptions::new()
            .template_name("tree.jinja")
            .module_format(format);
        let js = compile(&env(), &options).unwrap();
        assert_valid_js(&js, format == ModuleFormat::Es6);
        assert!(js.contains("templateTree(context)"), "{format}: {js}");
        assert!(!js.contains("include("), "{format}: {js}");
    }
}

#[test]
fn every_format_wraps_a_literal_template() {
    jinja_to_js_testhelpers::setup();
    for format in ModuleFormat::ALL {
        let options = CompileOptions::new()
            .template_source("{% for x in xs %}{{ x|upper }}{% endfor %}")
            .module_format(format);
        let js = compile(&Environment::default(), &options).unwrap();
        assert_valid_js(&js, format == ModuleFormat::Es6);
        assert!(js.contains("function template(context) {"), "{format}");
    }
}

#[test]
fn module_formats_parse_from_strings() {
    assert_eq!("amd".parse::<ModuleFormat>().unwrap(), ModuleFormat::Amd);
    assert!(matches!(
        "iife".parse::<ModuleFormat>(),
        Err(CompileError::InvalidModuleFormat { ref found }) if found == "iife"
    ));
}

#[test]
fn file_system_loader() -> Result<(), IPanic> {
    jinja_to_js_testhelpers::setup();
    let dir = tempfile::tempdir()?;
    fs::create_dir(dir.path().join("layouts"))?;
    fs::write(
        dir.path().join("layouts/base.jinja"),
        "<main>{% block main %}{% endblock %}</main>",
    )?;
    fs::write(
        dir.path().join("index.jinja"),
        "{% extends 'layouts/base.jinja' %}{% block main %}{{ message }}{% endblock %}",
    )?;

    let root = dir.path().to_str().expect("temp dir is UTF-8").to_string();
    let env = Environment::new(FileSystemLoader::new(root));
    let js = compile(&env, &CompileOptions::new().template_name("index.jinja")).unwrap();
    assert_valid_js(&js, false);
    assert!(js.starts_with("function templateIndex(context) {"));
    assert!(js.contains(r#"__result += "<main>";"#));
    assert!(js.contains("__escape(context.message)"));

    let err = compile(&env, &CompileOptions::new().template_name("../index.jinja")).unwrap_err();
    assert!(matches!(err, CompileError::TemplateNotFound { .. }));
    Ok(())
}

#[test]
fn runtime_library_is_valid_javascript() {
    assert_valid_js(RUNTIME_SOURCE, false);
    assert!(RUNTIME_SOURCE.contains("exports.filters"));
    assert!(RUNTIME_SOURCE.contains("exports.register"));
    assert!(RUNTIME_SOURCE.contains("exports.include"));
}
