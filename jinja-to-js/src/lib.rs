#![doc = include_str!("../README.md")]

mod compiler;
mod environment;
mod error;
mod module;
mod options;
mod runtime;

pub use compiler::{SUPPORTED_FILTERS, SUPPORTED_TESTS};
pub use environment::{Environment, FileSystemLoader, InMemoryLoader, Loader};
pub use error::CompileError;
pub use jinja_to_js_syntax as syntax;
pub use module::function_name;
pub use options::{CompileOptions, ModuleFormat, TemplateSource};
pub use runtime::{Helper, RUNTIME_SOURCE};

use compiler::{Compiler, Shared};

/// Compile one template into JavaScript source.
///
/// Named templates are loaded through `env`, as are the templates they
/// extend. The result is a complete script or module in the configured
/// [`ModuleFormat`]; on error nothing is returned.
pub fn compile(env: &Environment, options: &CompileOptions) -> Result<String, CompileError> {
    let template = match &options.source {
        None => return Err(CompileError::MissingTemplateSource),
        Some(TemplateSource::Name(name)) => env.load(name)?,
        Some(TemplateSource::Literal(text)) => env.parse(None, text)?,
    };

    let name = function_name(template.name.as_deref());
    tracing::debug!(
        function = %name,
        format = %options.module_format,
        "compiling template"
    );

    let mut shared = Shared::new(&options.runtime_path);
    let output = Compiler::new(env, options, &mut shared, &template).run()?;
    let function = compiler::render_function(&name, &options.context_name, &output);
    let js = module::wrap(options.module_format, &shared.dependencies, &function);

    tracing::debug!(
        function = %name,
        helpers = output.helpers.len(),
        dependencies = shared.dependencies.len(),
        bytes = js.len(),
        "compiled template"
    );
    Ok(js)
}
