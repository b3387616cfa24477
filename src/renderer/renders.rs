use tracing::debug;

use crate::config::TranspileOptions;
use crate::error::{Result, TranspileError};
use crate::parser::*;
use crate::renderer::ctypes::*;
use crate::renderer::expressions::{render_expression, render_statement};
use crate::renderer::traits::*;

impl Render for Node {
    fn render(&self, context: &mut RenderContext) -> Result<Rendered> {
        match &self.kind {
            NodeKind::TranslationUnit => render_translation_unit(self, context),
            NodeKind::Function(decl) => render_function(self, decl, context),
            NodeKind::Param(param) => {
                let name = param.name.as_deref().map_or_else(|| "_".to_string(), go_ident);
                let ty = go_type(context, &param.ty.spelling);
                Ok(Rendered::new(format!("{} {}", name, ty), ty))
            }
            NodeKind::Var(decl) => render_var(self, decl, context),
            NodeKind::Field(field) => render_field(field, context),
            NodeKind::Record(decl) => render_record(self, decl, context),
            NodeKind::Enum(decl) => render_enum(self, decl, context),
            NodeKind::EnumConstant(constant) => Ok(Rendered::new(
                go_ident(&constant.name),
                resolved_type(constant.ty.canonical()),
            )),
            NodeKind::Typedef(decl) => render_typedef(decl, context),

            NodeKind::Compound => {
                let statements: Vec<&Node> = self.code_children().collect();
                Ok(Rendered::stmt(render_block(context, &statements, Vec::new())?))
            }
            NodeKind::DeclStmt => render_decl_stmt(self, context),
            NodeKind::If { has_else } => render_if(self, *has_else, context),
            NodeKind::While => render_while(self, context),
            NodeKind::Do => render_do(self, context),
            NodeKind::For => render_for(self, context),
            NodeKind::Return => render_return(self, context),
            NodeKind::Break => Ok(Rendered::stmt("break")),
            NodeKind::Continue => Ok(Rendered::stmt("continue")),

            NodeKind::Type(node) => {
                let ty = go_type(context, &node.ty.spelling);
                Ok(Rendered::new(ty.clone(), ty))
            }
            // No Go counterpart; recognised so the dump parses
            NodeKind::Attr(_) | NodeKind::Absent => Ok(Rendered::empty()),

            _ => render_expression(self, context),
        }
    }
}

fn render_translation_unit(node: &Node, context: &mut RenderContext) -> Result<Rendered> {
    let mut declarations = Vec::new();

    for child in node.code_children() {
        let file = context.source.scan(child);
        if context.options.skip_system_headers {
            if let Some(reason) = skip_reason(&context.options, file.as_deref()) {
                debug!(kind = child.kind_name(), address = %child.address, reason, "skipping declaration");
                continue;
            }
        }

        // An untagged struct or enum is only claimed by the typedef right after it
        if !matches!(child.kind, NodeKind::Typedef(_)) {
            context.anonymous_record = None;
        }

        let rendered = child.render(context)?;
        if rendered.is_empty() {
            continue;
        }
        debug!(kind = child.kind_name(), address = %child.address, "rendered declaration");
        declarations.push(rendered.text);
    }

    Ok(Rendered::stmt(declarations.join("\n\n")))
}

fn skip_reason(options: &TranspileOptions, file: Option<&str>) -> Option<&'static str> {
    match file {
        None => Some("no source location"),
        Some(file) if file.starts_with('<') => Some("builtin location"),
        Some(file) if options.is_system_path(file) => Some("system header"),
        Some(_) => None,
    }
}

/// Render statements at the current depth, dropping the ones that produce no code
fn statement_lines(context: &mut RenderContext, statements: &[&Node]) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for statement in statements {
        let rendered = render_statement(statement, context)?;
        if !rendered.is_empty() {
            lines.push(rendered.text);
        }
    }
    Ok(lines)
}

/// Lay out rendered lines as a `{ ... }` block that closes at the current depth
fn wrap_block(context: &RenderContext, lines: &[String]) -> String {
    let indent = context.indent();
    let mut output = String::from("{\n");
    for line in lines {
        output.push_str(&format!("{}\t{}\n", indent, line));
    }
    output.push_str(&indent);
    output.push('}');
    output
}

/// Render a block one level deeper than the current statement
fn render_block(
    context: &mut RenderContext,
    statements: &[&Node],
    prologue: Vec<String>,
) -> Result<String> {
    let lines = context.nested(|context| {
        let mut lines = prologue;
        lines.extend(statement_lines(context, statements)?);
        Ok(lines)
    })?;
    Ok(wrap_block(context, &lines))
}

/// The statements a branch or loop body consists of
fn body_statements(node: Option<&Node>) -> Vec<&Node> {
    match node {
        None => Vec::new(),
        Some(node) if node.is_absent() => Vec::new(),
        Some(node) if matches!(node.kind, NodeKind::Compound) => node.code_children().collect(),
        Some(node) => vec![node],
    }
}

fn render_condition(context: &mut RenderContext, node: &Node) -> Result<String> {
    let rendered = node.render(context)?;
    Ok(to_bool(&rendered.text, &rendered.ty))
}

/// The first child carrying code, used as a declaration's initializer
fn initializer(node: &Node) -> Option<&Node> {
    node.code_children().find(|child| !child.is_absent())
}

fn render_function(
    node: &Node,
    decl: &FunctionDecl,
    context: &mut RenderContext,
) -> Result<Rendered> {
    let params: Vec<&ParmVarDecl> = node
        .children
        .iter()
        .filter_map(|child| match &child.kind {
            NodeKind::Param(param) => Some(param),
            _ => None,
        })
        .collect();

    // Prototypes declare the signature so later calls can coerce their arguments
    context.declare_function(
        &decl.name,
        FunctionSignature {
            return_type: resolved_type(decl.return_type()),
            params: params.iter().map(|p| resolved_type(&p.ty.spelling)).collect(),
            variadic: decl.is_variadic(),
        },
    );

    let Some(body) = node
        .children
        .iter()
        .find(|child| matches!(child.kind, NodeKind::Compound))
    else {
        return Ok(Rendered::empty());
    };
    let statements: Vec<&Node> = body.code_children().collect();

    if decl.name == "main" {
        let mut prologue = Vec::new();
        if let Some(argc) = params.first() {
            let args = context.import_type("os.Args");
            let name = argc.name.as_deref().unwrap_or("argc");
            prologue.push(format!("var {} int = len({})", go_ident(name), args));
        }
        if let Some(argv) = params.get(1) {
            let args = context.import_type("os.Args");
            let name = argv.name.as_deref().unwrap_or("argv");
            prologue.push(format!("var {} []string = {}", go_ident(name), args));
        }

        let block = context.in_function("main", "int", |context| {
            render_block(context, &statements, prologue)
        })?;
        return Ok(Rendered::stmt(format!("func main() {}", block)));
    }

    let mut signature = Vec::new();
    for param in &params {
        let name = param.name.as_deref().map_or_else(|| "_".to_string(), go_ident);
        signature.push(format!("{} {}", name, go_type(context, &param.ty.spelling)));
    }
    if decl.is_variadic() {
        signature.push("args ...interface{}".to_string());
    }

    let return_type = go_type(context, decl.return_type());
    let mut output = format!("func {}({})", go_ident(&decl.name), signature.join(", "));
    if !return_type.is_empty() {
        output.push(' ');
        output.push_str(&return_type);
    }

    let block = context.in_function(&decl.name, &return_type, |context| {
        render_block(context, &statements, Vec::new())
    })?;
    output.push(' ');
    output.push_str(&block);

    Ok(Rendered::stmt(output))
}

fn render_var(node: &Node, decl: &VarDecl, context: &mut RenderContext) -> Result<Rendered> {
    let init = initializer(node);
    if decl.storage == StorageClass::Extern && init.is_none() {
        return Ok(Rendered::empty());
    }

    let name = go_ident(&decl.name);
    let ty = go_type(context, &decl.ty.spelling);
    match init {
        Some(init) => {
            let value = init.render(context)?;
            let value = coerce(context, &value.text, &value.ty, &ty);
            Ok(Rendered::stmt(format!("var {} {} = {}", name, ty, value)))
        }
        None => Ok(Rendered::stmt(format!("var {} {}", name, ty))),
    }
}

fn render_field(field: &FieldDecl, context: &mut RenderContext) -> Result<Rendered> {
    let name = field.name.as_deref().ok_or_else(|| {
        TranspileError::unsupported("FieldDecl", format!("unnamed field of type '{}'", field.ty))
    })?;
    let ty = go_type(context, &field.ty.spelling);
    Ok(Rendered::new(format!("{} {}", go_ident(name), ty), ty))
}

fn render_record(node: &Node, decl: &RecordDecl, context: &mut RenderContext) -> Result<Rendered> {
    if !decl.definition {
        return Ok(Rendered::empty());
    }
    if decl.tag == RecordTag::Union {
        return Err(TranspileError::unsupported(
            "RecordDecl",
            format!("union {}", decl.name.as_deref().unwrap_or("(anonymous)")),
        ));
    }

    let indent = context.indent();
    let mut hoisted = Vec::new();
    let mut fields = Vec::new();

    for child in node.code_children() {
        match &child.kind {
            // Untagged members are inlined into the field that uses them
            NodeKind::Record(nested) if nested.name.is_none() => {
                context.nested(|context| child.render(context))?;
            }
            NodeKind::Record(_) => {
                let rendered = child.render(context)?;
                if !rendered.is_empty() {
                    hoisted.push(rendered.text);
                }
            }
            NodeKind::Field(field) if is_anonymous_type(&field.ty.spelling) => {
                let name = field.name.as_deref().ok_or_else(|| {
                    TranspileError::unsupported("FieldDecl", "unnamed untagged member")
                })?;
                let body = context.anonymous_record.take().ok_or_else(|| {
                    TranspileError::unsupported(
                        "FieldDecl",
                        format!("field '{}' of undeclared type '{}'", name, field.ty),
                    )
                })?;
                fields.push(format!("{} {}", go_ident(name), body));
            }
            NodeKind::Field(field) => {
                fields.push(render_field(field, context)?.text);
            }
            _ => {}
        }
    }

    let mut body = String::from("struct {\n");
    for field in &fields {
        body.push_str(&format!("{}\t{}\n", indent, field));
    }
    body.push_str(&indent);
    body.push('}');

    match &decl.name {
        Some(name) => hoisted.push(format!("type {} {}", go_ident(name), body)),
        None => context.anonymous_record = Some(body),
    }
    Ok(Rendered::stmt(hoisted.join(format!("\n\n{}", indent).as_str())))
}

fn render_enum(node: &Node, decl: &EnumDecl, context: &mut RenderContext) -> Result<Rendered> {
    let indent = context.indent();
    let underlying = decl
        .underlying
        .as_ref()
        .map(|ty| go_type(context, &ty.spelling))
        .filter(|ty| !ty.is_empty())
        .unwrap_or_else(|| "int".to_string());

    let mut output = String::new();
    let type_name = decl.name.as_deref().map(go_ident);
    match &type_name {
        Some(name) => output.push_str(&format!("type {} {}\n\n{}", name, underlying, indent)),
        None => context.anonymous_record = Some(underlying),
    }
    let typed = type_name.map(|name| format!(" {}", name)).unwrap_or_default();

    output.push_str("const (\n");
    let mut explicit = false;
    let mut previous: Option<String> = None;
    for child in node.code_children() {
        let NodeKind::EnumConstant(constant) = &child.kind else {
            continue;
        };
        let name = go_ident(&constant.name);

        let value = match initializer(child) {
            Some(init) => {
                explicit = true;
                Some(init.render(context)?.text)
            }
            None if explicit => previous.as_ref().map(|prev| format!("{} + 1", prev)),
            None => None,
        };
        let line = match value {
            Some(value) => format!("{}{} = {}", name, typed, value),
            None if previous.is_none() => format!("{}{} = iota", name, typed),
            // Repeats the previous `iota` expression
            None => name.clone(),
        };

        output.push_str(&format!("{}\t{}\n", indent, line));
        previous = Some(name);
    }
    output.push_str(&indent);
    output.push(')');

    Ok(Rendered::stmt(output))
}

fn render_typedef(decl: &TypedefDecl, context: &mut RenderContext) -> Result<Rendered> {
    if decl.implicit {
        return Ok(Rendered::empty());
    }
    let name = go_ident(&decl.name);
    let anonymous =
        is_anonymous_type(&decl.ty.spelling) || is_anonymous_type(decl.ty.canonical());

    if let Some(body) = context.anonymous_record.take() {
        if anonymous || resolved_type(&decl.ty.spelling) == name {
            return Ok(Rendered::stmt(format!("type {} {}", name, body)));
        }
    }
    if anonymous {
        return Err(TranspileError::unsupported(
            "TypedefDecl",
            format!("'{}' names a type that was never declared: '{}'", name, decl.ty),
        ));
    }

    let ty = go_type(context, &decl.ty.spelling);
    if ty.is_empty() || ty == name {
        return Ok(Rendered::empty());
    }
    Ok(Rendered::stmt(format!("type {} {}", name, ty)))
}

fn render_decl_stmt(node: &Node, context: &mut RenderContext) -> Result<Rendered> {
    let children: Vec<&Node> = node.code_children().collect();
    let lines = statement_lines(context, &children)?;
    let separator = format!("\n{}", context.indent());
    Ok(Rendered::stmt(lines.join(separator.as_str())))
}

fn render_if(node: &Node, has_else: bool, context: &mut RenderContext) -> Result<Rendered> {
    let children: Vec<&Node> = node.code_children().collect();

    // Older front ends print `<<<NULL>>>` slots for the init statement and
    // condition variable ahead of the condition.
    let legacy = children
        .first()
        .map_or(false, |first| first.is_absent() || matches!(first.kind, NodeKind::Var(_)));
    let (condition, then, otherwise) = if legacy && children.len() >= 3 {
        let n = children.len();
        (children[n - 3], children[n - 2], Some(children[n - 1]))
    } else if children.len() >= 2 {
        if has_else && children.len() < 3 {
            return Err(TranspileError::unsupported(
                "IfStmt",
                format!("marked has_else but the else branch is missing at {}", node.address),
            ));
        }
        (children[0], children[1], children.get(2).copied())
    } else {
        return Err(TranspileError::unsupported(
            "IfStmt",
            format!("expected a condition and a branch, found {} children", children.len()),
        ));
    };

    let condition = render_condition(context, condition)?;
    let then = render_block(context, &body_statements(Some(then)), Vec::new())?;
    let mut output = format!("if {} {}", condition, then);

    match otherwise {
        Some(branch) if branch.is_absent() => {}
        Some(branch) if matches!(branch.kind, NodeKind::If { .. }) => {
            output.push_str(" else ");
            output.push_str(&branch.render(context)?.text);
        }
        Some(branch) => {
            let block = render_block(context, &body_statements(Some(branch)), Vec::new())?;
            output.push_str(" else ");
            output.push_str(&block);
        }
        None => {}
    }

    Ok(Rendered::stmt(output))
}

fn render_while(node: &Node, context: &mut RenderContext) -> Result<Rendered> {
    let children: Vec<&Node> = node.code_children().collect();
    if children.len() < 2 {
        return Err(TranspileError::unsupported(
            "WhileStmt",
            format!("expected a condition and a body, found {} children", children.len()),
        ));
    }
    let n = children.len();
    let condition = render_condition(context, children[n - 2])?;
    let block = render_block(context, &body_statements(Some(children[n - 1])), Vec::new())?;
    Ok(Rendered::stmt(format!("for {} {}", condition, block)))
}

fn render_do(node: &Node, context: &mut RenderContext) -> Result<Rendered> {
    let children: Vec<&Node> = node.code_children().collect();
    let [body, condition] = children.as_slice() else {
        return Err(TranspileError::unsupported(
            "DoStmt",
            format!("expected a body and a condition, found {} children", children.len()),
        ));
    };

    let statements = body_statements(Some(*body));
    let lines = context.nested(|context| {
        let mut lines = statement_lines(context, &statements)?;
        let rendered = condition.render(context)?;
        let negated = to_bool_negated(&rendered.text, &rendered.ty);
        let indent = context.indent();
        lines.push(format!("if {} {{\n{}\tbreak\n{}}}", negated, indent, indent));
        Ok(lines)
    })?;

    Ok(Rendered::stmt(format!("for {}", wrap_block(context, &lines))))
}

fn render_for(node: &Node, context: &mut RenderContext) -> Result<Rendered> {
    let children: Vec<&Node> = node.code_children().collect();
    let [init, _, condition, increment, body] = children.as_slice() else {
        return Err(TranspileError::unsupported(
            "ForStmt",
            format!("expected 5 child slots, found {}", children.len()),
        ));
    };

    let init = render_for_init(context, init)?;
    let condition = if condition.is_absent() {
        String::new()
    } else {
        render_condition(context, condition)?
    };
    let increment = render_statement(increment, context)?.text;
    let block = render_block(context, &body_statements(Some(*body)), Vec::new())?;

    let header = match (init.is_empty() && increment.is_empty(), condition.is_empty()) {
        (true, true) => "for".to_string(),
        (true, false) => format!("for {}", condition),
        (false, _) => format!("for {}; {}; {}", init, condition, increment),
    };
    Ok(Rendered::stmt(format!("{} {}", header, block)))
}

/// A loop initializer: declarations become a short variable declaration
fn render_for_init(context: &mut RenderContext, init: &Node) -> Result<String> {
    if !matches!(init.kind, NodeKind::DeclStmt) {
        return Ok(render_statement(init, context)?.text);
    }

    let mut names = Vec::new();
    let mut values = Vec::new();
    for child in init.code_children() {
        let NodeKind::Var(decl) = &child.kind else {
            return Err(TranspileError::unsupported(
                "ForStmt",
                format!("{} in loop initializer", child.kind_name()),
            ));
        };
        let value = initializer(child).ok_or_else(|| {
            TranspileError::unsupported(
                "ForStmt",
                format!("loop variable '{}' without an initializer", decl.name),
            )
        })?;

        let ty = go_type(context, &decl.ty.spelling);
        let value = value.render(context)?;
        let mut text = coerce(context, &value.text, &value.ty, &ty);
        // `:=` infers int, float64, string and bool from untyped constants
        let inferred = matches!(ty.as_str(), "int" | "float64" | "string" | "bool");
        if !inferred && !text.starts_with(&format!("{}(", ty)) {
            text = format!("{}({})", ty, text);
        }

        names.push(go_ident(&decl.name));
        values.push(text);
    }
    Ok(format!("{} := {}", names.join(", "), values.join(", ")))
}

fn render_return(node: &Node, context: &mut RenderContext) -> Result<Rendered> {
    let Some(value) = initializer(node) else {
        return Ok(Rendered::stmt("return"));
    };
    let rendered = value.render(context)?;

    if context.in_main() {
        if rendered.text == "0" {
            return Ok(Rendered::stmt("return"));
        }
        let exit = context.import_type("os.Exit");
        let code = coerce(context, &rendered.text, &rendered.ty, "int");
        return Ok(Rendered::stmt(format!("{}({})", exit, code)));
    }

    let return_type = context.return_type.clone();
    let text = coerce(context, &rendered.text, &rendered.ty, &return_type);
    Ok(Rendered::stmt(format!("return {}", text)))
}
