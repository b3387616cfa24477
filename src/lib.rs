//! Transpile the textual AST dump of a C front end (`clang -Xclang
//! -ast-dump -fsyntax-only`) into Go source.
//!
//! The pipeline is split into three stages: [`parser::split_records`] turns
//! the raw dump into depth-annotated records, [`parser::build`] reconnects
//! them into a tree of [`parser::Node`]s and [`renderer::GoRenderer`] walks
//! that tree to produce one Go file.

pub mod config;
pub mod error;
pub mod parser;
pub mod renderer;


use tracing::info;

pub use config::TranspileOptions;
pub use error::{Result, TranspileError};
pub use parser::{build, build_from_dump, parse, split_records, Node, NodeKind};
pub use renderer::{GoRenderer, Render, RenderContext, Rendered};

/// Transpile a complete dump into a Go translation unit
pub fn transpile(dump: &str, options: &TranspileOptions) -> Result<String> {
    let records = split_records(dump)?;
    let root = build(&records)?;

    let (output, context) = GoRenderer::new(options.clone()).render_with_context(&root)?;
    info!(
        records = records.len(),
        imports = context.imports().len(),
        "transpiled {}",
        root.kind_name()
    );
    Ok(output)
}
