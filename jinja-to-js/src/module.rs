//! Naming and module wrappers for generated code

use indexmap::IndexMap;

use crate::options::ModuleFormat;

/// Binding of the runtime library in generated modules.
pub(crate) const RUNTIME_BINDING: &str = "jinjaToJS";

/// Name of the render function for a template.
///
/// `includes/user_name.jinja` becomes `templateIncludesUserName`; a
/// template without a name is just `template`.
pub fn function_name(template_name: Option<&str>) -> String {
    let mut name = String::from("template");
    let Some(template_name) = template_name else {
        return name;
    };

    for word in strip_extension(template_name)
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            name.push(first.to_ascii_uppercase());
            name.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    name
}

/// `dir/name.ext` without `.ext`. Dots in directory names are kept.
pub(crate) fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[file_start..].rfind('.') {
        Some(0) | None => path,
        Some(dot) => &path[..file_start + dot],
    }
}

/// Reference used to load `target` from the template `from`.
///
/// With a prefix the reference is `prefix + target`; in module formats
/// without a prefix it is relative to the including template. The
/// extension is replaced with `ext` in both cases.
pub(crate) fn include_reference(
    target: &str,
    from: Option<&str>,
    prefix: &str,
    ext: &str,
    format: ModuleFormat,
) -> String {
    let path = if !prefix.is_empty() {
        format!("{prefix}{target}")
    } else if format.is_module() {
        relative_path(target, from.unwrap_or(""))
    } else {
        target.to_string()
    };
    format!("{}{ext}", strip_extension(&path))
}

/// `target` relative to the directory of `from`, always starting with `.`.
fn relative_path(target: &str, from: &str) -> String {
    let from_dirs: Vec<&str> = from
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    let from_dirs = &from_dirs[..from_dirs.len().saturating_sub(1)];
    let target_parts: Vec<&str> = target
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    let common = from_dirs
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();
    // never strip the file name itself
    let common = common.min(target_parts.len().saturating_sub(1));

    let ups = from_dirs.len() - common;
    let rest = target_parts[common..].join("/");
    if ups == 0 {
        format!("./{rest}")
    } else {
        format!("{}{rest}", "../".repeat(ups))
    }
}

/// Wrap a finished render function in the requested module format.
///
/// `dependencies` maps module paths to bindings, runtime first.
pub(crate) fn wrap(
    format: ModuleFormat,
    dependencies: &IndexMap<String, String>,
    function: &str,
) -> String {
    let mut out = String::new();
    match format {
        ModuleFormat::Global => {
            out.push_str(function);
            out.push('\n');
        }
        ModuleFormat::Amd => {
            let paths: Vec<String> = dependencies.keys().map(|p| js_string(p)).collect();
            let bindings: Vec<&str> = dependencies.values().map(String::as_str).collect();
            out.push_str(&format!(
                "define([{}], function ({}) {{\n",
                paths.join(", "),
                bindings.join(", ")
            ));
            out.push_str(&format!("return {function};\n"));
            out.push_str("});\n");
        }
        ModuleFormat::CommonJs => {
            for (path, binding) in dependencies {
                out.push_str(&format!("var {binding} = require({});\n", js_string(path)));
            }
            out.push_str(&format!("module.exports = {function};\n"));
        }
        ModuleFormat::Es6 => {
            for (path, binding) in dependencies {
                out.push_str(&format!("import {binding} from {};\n", js_string(path)));
            }
            out.push_str(&format!("export default {function}\n"));
        }
    }
    out
}

/// A JavaScript string literal.
pub(crate) fn js_string(s: &str) -> String {
    // JSON strings are valid JavaScript string literals
    serde_json::Value::from(s).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_names() {
        assert_eq!(function_name(None), "template");
        assert_eq!(function_name(Some("index.jinja")), "templateIndex");
        assert_eq!(
            function_name(Some("includes/user_name.jinja")),
            "templateIncludesUserName"
        );
        assert_eq!(
            function_name(Some("my-templates/v2.0/list.html.jinja")),
            "templateMyTemplatesV20ListHtml"
        );
    }

    #[test]
    fn extension_stripping() {
        assert_eq!(strip_extension("a/b.jinja"), "a/b");
        assert_eq!(strip_extension("a.d/b"), "a.d/b");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }

    #[test]
    fn include_references() {
        use ModuleFormat::*;

        assert_eq!(
            include_reference("part.jinja", Some("page.jinja"), "", "", Global),
            "part"
        );
        assert_eq!(
            include_reference("part.jinja", Some("page.jinja"), "/tpl/", ".js", Global),
            "/tpl/part.js"
        );
        assert_eq!(
            include_reference("part.jinja", Some("page.jinja"), "", ".js", Es6),
            "./part.js"
        );
        assert_eq!(
            include_reference("includes/part.jinja", Some("pages/home.jinja"), "", "", CommonJs),
            "../includes/part"
        );
        assert_eq!(
            include_reference("pages/part.jinja", Some("pages/home.jinja"), "", "", Amd),
            "./part"
        );
        assert_eq!(
            include_reference("includes/part.jinja", None, "", "", Es6),
            "./includes/part"
        );
    }

    #[test]
    fn wrappers() {
        let mut deps = IndexMap::new();
        deps.insert("jinja-to-js".to_string(), RUNTIME_BINDING.to_string());
        deps.insert("./part".to_string(), "templatePart".to_string());
        let function = "function template(context) {}";

        insta::assert_snapshot!(wrap(ModuleFormat::Global, &deps, function), @"function template(context) {}");
        insta::assert_snapshot!(wrap(ModuleFormat::Amd, &deps, function), @r#"
        define(["jinja-to-js", "./part"], function (jinjaToJS, templatePart) {
        return function template(context) {};
        });
        "#);
        insta::assert_snapshot!(wrap(ModuleFormat::CommonJs, &deps, function), @r#"
        var jinjaToJS = require("jinja-to-js");
        var templatePart = require("./part");
        module.exports = function template(context) {};
        "#);
        insta::assert_snapshot!(wrap(ModuleFormat::Es6, &deps, function), @r#"
        import jinjaToJS from "jinja-to-js";
        import templatePart from "./part";
        export default function template(context) {}
        "#);
    }
}
