use std::collections::HashMap;

use crate::config::TranspileOptions;
use crate::error::Result;
use crate::parser::Node;

/// Output of a render: the Go fragment and its resolved Go type.
///
/// `ty` is only consumed by ancestor nodes for conversion decisions; it is
/// empty for statements, declarations and `void` expressions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendered {
    pub text: String,
    pub ty: String,
}

impl Rendered {
    pub fn new(text: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ty: ty.into(),
        }
    }

    /// A statement or declaration fragment, which has no type
    pub fn stmt(text: impl Into<String>) -> Self {
        Self::new(text, "")
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Go signature of a function declared in the translation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub return_type: String,
    pub params: Vec<String>,
    pub variadic: bool,
}

/// Follows the dump's location shorthand, where `line:` and `col:` refer to
/// the most recently named file.
#[derive(Debug, Clone, Default)]
pub struct SourceTracker {
    current: Option<String>,
}

impl SourceTracker {
    /// Observe a source range and return the file it starts in.
    /// `None` means the node has no valid location (builtins, implicit decls).
    pub fn observe(&mut self, position: &str) -> Option<String> {
        let mut start = None;
        for (idx, part) in position.split(", ").enumerate() {
            let file = self.observe_location(part.trim());
            if idx == 0 {
                start = file;
            }
        }
        start
    }

    fn observe_location(&mut self, location: &str) -> Option<String> {
        if location.starts_with("<invalid sloc>") {
            return None;
        }
        if location.starts_with("line:") || location.starts_with("col:") {
            return self.current.clone();
        }

        // `path:line:col`, where the path itself may contain colons
        let location = location.split(' ').next().unwrap_or(location);
        let mut parts = location.rsplitn(3, ':');
        let col = parts.next()?;
        let line = parts.next()?;
        let file = parts.next()?;
        if col.parse::<u32>().is_err() || line.parse::<u32>().is_err() {
            return self.current.clone();
        }
        self.current = Some(file.to_string());
        self.current.clone()
    }

    /// Walk a subtree in dump order, returning the file the subtree root starts in
    pub fn scan(&mut self, node: &Node) -> Option<String> {
        let start = node
            .position
            .as_deref()
            .and_then(|position| self.observe(position));
        for child in &node.children {
            self.scan(child);
        }
        start
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

/// Translation-wide state threaded through every render call
#[derive(Debug, Clone)]
pub struct RenderContext {
    imports: Vec<String>,
    /// Name of the enclosing function, empty at file scope
    pub function_name: String,
    /// Go return type of the enclosing function
    pub return_type: String,
    /// Block nesting depth of the statement being rendered
    pub depth: usize,
    functions: HashMap<String, FunctionSignature>,
    pub options: TranspileOptions,
    pub source: SourceTracker,
    /// Go type of the last untagged struct or enum, claimed by the typedef naming it
    pub anonymous_record: Option<String>,
}

impl RenderContext {
    pub fn new(options: TranspileOptions) -> Self {
        Self {
            imports: Vec::new(),
            function_name: String::new(),
            return_type: String::new(),
            depth: 0,
            functions: HashMap::new(),
            options,
            source: SourceTracker::default(),
            anonymous_record: None,
        }
    }

    pub fn indent(&self) -> String {
        "\t".repeat(self.depth)
    }

    /// Imports in the order they were first needed
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn add_import(&mut self, path: &str) {
        if !self.imports.iter().any(|existing| existing == path) {
            self.imports.push(path.to_string());
        }
    }

    /// Register the package of a qualified Go name and return the name as
    /// it is written in code.
    ///
    /// `github.com/elliotchance/c2go/noarch.BoolToInt` imports
    /// `github.com/elliotchance/c2go/noarch` and returns `noarch.BoolToInt`.
    /// Unqualified names are returned unchanged.
    pub fn import_type(&mut self, name: &str) -> String {
        let Some((package, _)) = name.rsplit_once('.') else {
            return name.to_string();
        };
        self.add_import(package);
        name.rsplit('/').next().unwrap_or(name).to_string()
    }

    /// Run `f` one block level deeper, restoring the depth afterwards
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Run `f` inside a function body, restoring the enclosing function context afterwards
    pub fn in_function<T>(
        &mut self,
        name: &str,
        return_type: &str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let outer_name = std::mem::replace(&mut self.function_name, name.to_string());
        let outer_return = std::mem::replace(&mut self.return_type, return_type.to_string());
        let result = f(self);
        self.function_name = outer_name;
        self.return_type = outer_return;
        result
    }

    pub fn declare_function(&mut self, name: &str, signature: FunctionSignature) {
        self.functions.insert(name.to_string(), signature);
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }

    pub fn in_main(&self) -> bool {
        self.function_name == "main"
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(TranspileOptions::default())
    }
}

/// Core rendering trait for reconstructed nodes
pub trait Render {
    fn render(&self, context: &mut RenderContext) -> Result<Rendered>;
}
