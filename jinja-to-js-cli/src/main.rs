//! `jinja-to-js`: compile a template file into a JavaScript module.

mod logging;

use std::io::{self, Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use jinja_to_js::{
    CompileOptions, Environment, FileSystemLoader, ModuleFormat, RUNTIME_SOURCE, TemplateSource,
    compile,
};
use miette::{IntoDiagnostic, WrapErr};

#[derive(Parser, Debug)]
#[command(name = "jinja-to-js", version, about = "Compile Jinja templates into JavaScript")]
struct Args {
    /// Template to compile; `-` or nothing reads standard input
    input: Option<Utf8PathBuf>,

    /// Write the result here instead of standard output
    #[arg(short, long)]
    output: Option<Utf8PathBuf>,

    /// global, amd, commonjs or es6
    #[arg(short, long, default_value = "global")]
    module_format: String,

    /// Import path of the runtime library
    #[arg(short, long, default_value = "jinja-to-js")]
    runtime_path: String,

    /// Prepended to the names of included templates
    #[arg(short = 'p', long, default_value = "")]
    include_prefix: String,

    /// Replaces the extension of included templates
    #[arg(short, long, default_value = "")]
    include_ext: String,

    /// Name of the render function's parameter
    #[arg(short, long, default_value = "context")]
    context_name: String,

    /// A filter resolved at render time through `jinjaToJS.filters`
    #[arg(short = 'f', long = "filter", value_name = "NAME")]
    filters: Vec<String>,

    /// Directory that included and extended templates are loaded from.
    /// Defaults to the directory of INPUT
    #[arg(short, long)]
    template_root: Option<Utf8PathBuf>,

    /// Print values without HTML escaping
    #[arg(long)]
    no_autoescape: bool,

    /// Write the runtime library instead of compiling a template
    #[arg(long)]
    emit_runtime: bool,
}

fn main() -> miette::Result<()> {
    logging::init_tracing();
    let args = Args::parse();

    let js = run(&args)?;
    match &args.output {
        Some(path) => std::fs::write(path, js)
            .into_diagnostic()
            .wrap_err_with(|| format!("writing {path}"))?,
        None => io::stdout()
            .write_all(js.as_bytes())
            .into_diagnostic()
            .wrap_err("writing to standard output")?,
    }
    Ok(())
}

fn run(args: &Args) -> miette::Result<String> {
    if args.emit_runtime {
        return Ok(RUNTIME_SOURCE.to_string());
    }

    let module_format: ModuleFormat = args.module_format.parse()?;
    let input = args.input.as_deref().filter(|path| path.as_str() != "-");

    let root = match (&args.template_root, input) {
        (Some(root), _) => root.clone(),
        (None, Some(input)) => input.parent().map(Utf8Path::to_path_buf).unwrap_or_default(),
        (None, None) => Utf8PathBuf::from("."),
    };
    tracing::debug!(%root, "template root");

    let source = match input {
        // named templates get a function name and relative includes
        Some(input) => match input.strip_prefix(&root) {
            Ok(name) => TemplateSource::Name(name.as_str().replace('\\', "/")),
            Err(_) => TemplateSource::Literal(
                std::fs::read_to_string(input)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("reading {input}"))?,
            ),
        },
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .into_diagnostic()
                .wrap_err("reading standard input")?;
            TemplateSource::Literal(text)
        }
    };

    let mut options = CompileOptions::new()
        .module_format(module_format)
        .runtime_path(&args.runtime_path)
        .include_prefix(&args.include_prefix)
        .include_ext(&args.include_ext)
        .context_name(&args.context_name)
        .autoescape(!args.no_autoescape);
    options.source = Some(source);
    for filter in &args.filters {
        options = options.custom_filter(filter);
    }

    let env = Environment::new(FileSystemLoader::new(root));
    Ok(compile(&env, &options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags() {
        let args = Args::try_parse_from([
            "jinja-to-js",
            "page.jinja",
            "-m",
            "es6",
            "-f",
            "markdown",
            "--filter",
            "money",
            "--no-autoescape",
        ])
        .unwrap();
        assert_eq!(args.input.as_deref(), Some(Utf8Path::new("page.jinja")));
        assert_eq!(args.module_format, "es6");
        assert_eq!(args.filters, ["markdown", "money"]);
        assert!(args.no_autoescape);
        assert_eq!(args.context_name, "context");
    }

    #[test]
    fn compiles_a_file_relative_to_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir(root.join("pages")).unwrap();
        std::fs::write(root.join("pages/home.jinja"), "{% include 'pages/nav.jinja' %}{{ title }}").unwrap();

        let input = root.join("pages/home.jinja");
        let args = Args::try_parse_from([
            "jinja-to-js",
            input.as_str(),
            "-t",
            root.as_str(),
            "-m",
            "commonjs",
        ])
        .unwrap();
        let js = run(&args).unwrap();
        assert!(js.contains("module.exports = function templatePagesHome(context) {"));
        assert!(js.contains("var templatePagesNav = require(\"./nav\");"));
    }

    #[test]
    fn invalid_module_formats_are_reported() {
        let args = Args::try_parse_from(["jinja-to-js", "x.jinja", "-m", "umd"]).unwrap();
        let err = run(&args).unwrap_err();
        assert_eq!(err.to_string(), "Unknown module format `umd`");
    }

    #[test]
    fn emits_the_runtime() {
        let args = Args::try_parse_from(["jinja-to-js", "--emit-runtime"]).unwrap();
        assert_eq!(run(&args).unwrap(), RUNTIME_SOURCE);
    }
}
