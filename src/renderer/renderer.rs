use crate::config::TranspileOptions;
use crate::error::Result;
use crate::parser::Node;
use crate::renderer::traits::*;

/// Assembles a complete Go translation unit from a reconstructed tree
pub struct GoRenderer {
    options: TranspileOptions,
}

impl GoRenderer {
    pub fn new(options: TranspileOptions) -> Self {
        Self { options }
    }

    /// Render `root` with a fresh context, returning the Go source and the
    /// context it left behind
    pub fn render_with_context(&self, root: &Node) -> Result<(String, RenderContext)> {
        let mut context = RenderContext::new(self.options.clone());
        let body = root.render(&mut context)?;

        let mut output = format!("package {}\n\n", self.options.package_name);

        // Imports in the order they were first needed
        if !context.imports().is_empty() {
            output.push_str("import (\n");
            for import in context.imports() {
                output.push_str(&format!("\t\"{}\"\n", import));
            }
            output.push_str(")\n\n");
        }

        if !body.text.is_empty() {
            output.push_str(&body.text);
            output.push('\n');
        }

        Ok((output, context))
    }

    pub fn render(&self, root: &Node) -> Result<String> {
        Ok(self.render_with_context(root)?.0)
    }
}
