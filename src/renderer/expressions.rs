//! Expression nodes. Each render reports the Go type of its result so the
//! parent can decide which conversions it needs.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::error::{Result, TranspileError};
use crate::parser::*;
use crate::renderer::ctypes::*;
use crate::renderer::traits::*;

lazy_static! {
    /// A printf conversion specification with an optional length modifier
    static ref FORMAT_SPEC: Regex = Regex::new(
        r"%(?P<flags>[-+ #0]*\d*(?:\.\d*)?)(?:hh|h|ll|l|L|q|j|z|t)?(?P<conversion>[diouxXeEfFgGaAcsp%])"
    )
    .unwrap();
}

pub fn render_expression(node: &Node, context: &mut RenderContext) -> Result<Rendered> {
    match &node.kind {
        // Go only has these as statements
        NodeKind::Binary(operator) if operator.op == "=" => Err(used_as_value(node, operator)),
        NodeKind::CompoundAssign(operator) => Err(used_as_value(node, operator)),
        NodeKind::Unary(operator) if is_step(operator) => {
            Err(TranspileError::unsupported(
                "UnaryOperator",
                format!("'{}' used as a value at {}", operator.op, node.address),
            ))
        }
        NodeKind::Binary(operator) => render_binary(node, operator, context),
        NodeKind::Unary(operator) => render_unary(node, operator, context),
        NodeKind::Cast(cast) => render_cast(node, cast, context),
        NodeKind::Call { ty } => render_call(node, ty, context),
        NodeKind::DeclRef(reference) => Ok(Rendered::new(
            go_ident(&reference.name),
            resolved_type(reference.ty.canonical()),
        )),
        NodeKind::Member(member) => {
            let base = operand(node, 0, context)?;
            Ok(Rendered::new(
                format!("{}.{}", base.text, go_ident(&member.name)),
                resolved_type(member.ty.canonical()),
            ))
        }
        NodeKind::Subscript { ty } => {
            let base = operand(node, 0, context)?;
            let index = operand(node, 1, context)?;
            Ok(Rendered::new(
                format!("{}[{}]", base.text, index.text),
                resolved_type(ty.canonical()),
            ))
        }
        NodeKind::Paren { ty } => {
            let inner = operand(node, 0, context)?;
            let resolved = if inner.ty.is_empty() {
                resolved_type(ty.canonical())
            } else {
                inner.ty
            };
            Ok(Rendered::new(format!("({})", inner.text), resolved))
        }
        NodeKind::Conditional { ty } => render_conditional(node, ty, context),
        NodeKind::Predefined { name, .. } => match name.as_str() {
            "__func__" | "__FUNCTION__" | "__PRETTY_FUNCTION__" => Ok(Rendered::new(
                format!("\"{}\"", context.function_name),
                "string",
            )),
            other => Err(TranspileError::unsupported("PredefinedExpr", other)),
        },
        NodeKind::Literal(literal) => render_literal(literal),
        _ => Err(TranspileError::unsupported(
            node.kind_name(),
            "not an expression",
        )),
    }
}

/// Render an expression that stands on its own as a statement: an
/// expression statement, a loop's init or increment slot, or the operand of a
/// `(void)` cast. Assignments and increments are only accepted here.
pub fn render_statement(node: &Node, context: &mut RenderContext) -> Result<Rendered> {
    match &node.kind {
        NodeKind::Binary(operator) if operator.op == "=" => render_assignment(node, context),
        NodeKind::CompoundAssign(operator) => render_compound_assign(node, operator, context),
        NodeKind::Unary(operator) if is_step(operator) => {
            let target = operand(node, 0, context)?;
            Ok(Rendered::stmt(format!("{}{}", target.text, operator.op)))
        }
        NodeKind::Paren { .. } => match node.code_children().next() {
            Some(inner) if is_side_effect(inner) => render_statement(inner, context),
            _ => node.render(context),
        },
        _ => node.render(context),
    }
}

fn is_step(operator: &UnaryOperator) -> bool {
    matches!(operator.op.as_str(), "++" | "--")
}

/// Whether the expression is one Go only accepts as a statement
fn is_side_effect(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Binary(operator) => operator.op == "=",
        NodeKind::CompoundAssign(_) => true,
        NodeKind::Unary(operator) => is_step(operator),
        NodeKind::Paren { .. } => node.code_children().next().map_or(false, is_side_effect),
        _ => false,
    }
}

fn used_as_value(node: &Node, operator: &Operator) -> TranspileError {
    TranspileError::unsupported(
        node.kind_name(),
        format!("assignment '{}' used as a value at {}", operator.op, node.address),
    )
}

/// Render the `index`-th code child of an expression
fn operand(node: &Node, index: usize, context: &mut RenderContext) -> Result<Rendered> {
    let child = node.code_children().nth(index).ok_or_else(|| {
        TranspileError::unsupported(
            node.kind_name(),
            format!("missing operand {} at {}", index, node.address),
        )
    })?;
    child.render(context)
}

/// Binding strength of a Go binary operator
fn precedence(op: &str) -> u8 {
    match op {
        "*" | "/" | "%" | "<<" | ">>" | "&" => 5,
        "+" | "-" | "|" | "^" => 4,
        "==" | "!=" | "<" | "<=" | ">" | ">=" => 3,
        "&&" => 2,
        "||" => 1,
        _ => 0,
    }
}

/// The binary operator an operand renders as, seen through implicit conversions
fn binary_op(node: &Node) -> Option<&str> {
    match &node.kind {
        NodeKind::Binary(operator) => Some(operator.op.as_str()),
        NodeKind::Cast(_) => node.code_children().next().and_then(binary_op),
        _ => None,
    }
}

/// Parenthesise an operand whose operator binds looser in Go than its parent
fn grouped(node: &Node, index: usize, text: String, parent: u8) -> String {
    let child = node.code_children().nth(index);
    match child.and_then(binary_op).map(precedence) {
        Some(inner) if inner < parent || (index > 0 && inner == parent) => format!("({})", text),
        _ => text,
    }
}

fn render_assignment(node: &Node, context: &mut RenderContext) -> Result<Rendered> {
    let left = operand(node, 0, context)?;
    let right = operand(node, 1, context)?;
    let value = coerce(context, &right.text, &right.ty, &left.ty);
    Ok(Rendered::stmt(format!("{} = {}", left.text, value)))
}

fn render_binary(node: &Node, operator: &Operator, context: &mut RenderContext) -> Result<Rendered> {
    let op = operator.op.as_str();
    let level = precedence(op);
    if level == 0 {
        return Err(TranspileError::unsupported(
            "BinaryOperator",
            format!("operator '{}'", op),
        ));
    }
    let left = operand(node, 0, context)?;
    let right = operand(node, 1, context)?;

    let (text, ty) = match op {
        "&&" | "||" => {
            let lhs = grouped(node, 0, to_bool(&left.text, &left.ty), level);
            let rhs = grouped(node, 1, to_bool(&right.text, &right.ty), level);
            (format!("{} {} {}", lhs, op, rhs), "bool".to_string())
        }
        "==" | "!=" => {
            let (lhs, rhs, _) = unify(context, &left, &right);
            let lhs = grouped(node, 0, lhs, level);
            let rhs = grouped(node, 1, rhs, level);
            (format!("{} {} {}", lhs, op, rhs), "bool".to_string())
        }
        "<" | "<=" | ">" | ">=" => {
            let left = numeric_operand(node, 0, left, context);
            let right = numeric_operand(node, 1, right, context);
            let (lhs, rhs, _) = unify(context, &left.rendered, &right.rendered);
            let lhs = left.place(node, 0, lhs, level);
            let rhs = right.place(node, 1, rhs, level);
            (format!("{} {} {}", lhs, op, rhs), "bool".to_string())
        }
        "+" | "-" | "*" | "/" | "%" | "&" | "|" | "^" => {
            let left = numeric_operand(node, 0, left, context);
            let right = numeric_operand(node, 1, right, context);
            let (lhs, rhs, ty) = unify(context, &left.rendered, &right.rendered);
            let lhs = left.place(node, 0, lhs, level);
            let rhs = right.place(node, 1, rhs, level);
            (format!("{} {} {}", lhs, op, rhs), ty)
        }
        "<<" | ">>" => {
            let left = numeric_operand(node, 0, left, context);
            let right = numeric_operand(node, 1, right, context);
            let ty = left.rendered.ty.clone();
            let lhs = left.place(node, 0, left.rendered.text.clone(), level);
            let rhs = right.place(node, 1, right.rendered.text.clone(), level);
            (format!("{} {} {}", lhs, op, rhs), ty)
        }
        _ => {
            return Err(TranspileError::unsupported(
                "BinaryOperator",
                format!("operator '{}'", op),
            ))
        }
    };

    Ok(Rendered::new(text, ty))
}

/// An operand of an arithmetic, bitwise or ordering operator
struct NumericOperand {
    rendered: Rendered,
    /// Already wrapped in a `BoolToInt` call, so it never needs grouping
    converted: bool,
}

impl NumericOperand {
    fn place(&self, node: &Node, index: usize, text: String, level: u8) -> String {
        if self.converted {
            text
        } else {
            grouped(node, index, text, level)
        }
    }
}

/// C comparisons yield `int`; a Go `bool` becomes a number before any
/// arithmetic is applied to it.
fn numeric_operand(
    node: &Node,
    index: usize,
    rendered: Rendered,
    context: &mut RenderContext,
) -> NumericOperand {
    if rendered.ty != "bool" {
        return NumericOperand {
            rendered,
            converted: false,
        };
    }

    let parenthesised = node
        .code_children()
        .nth(index)
        .map_or(false, |child| matches!(child.kind, NodeKind::Paren { .. }));
    let inner = match rendered.text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) if parenthesised => inner,
        _ => rendered.text.as_str(),
    };
    NumericOperand {
        rendered: Rendered::new(coerce(context, inner, "bool", "int"), "int"),
        converted: true,
    }
}

/// Bring both operands to their promoted type.
/// Non-numeric operands are left alone and keep the left type.
fn unify(context: &mut RenderContext, left: &Rendered, right: &Rendered) -> (String, String, String) {
    match promote(&left.ty, &right.ty) {
        Some(ty) => (
            coerce(context, &left.text, &left.ty, &ty),
            coerce(context, &right.text, &right.ty, &ty),
            ty,
        ),
        None => (left.text.clone(), right.text.clone(), left.ty.clone()),
    }
}

fn render_compound_assign(
    node: &Node,
    operator: &Operator,
    context: &mut RenderContext,
) -> Result<Rendered> {
    let op = operator.op.as_str();
    let left = operand(node, 0, context)?;
    let right = operand(node, 1, context)?;
    let right = numeric_operand(node, 1, right, context).rendered;

    let value = match op {
        "<<=" | ">>=" => right.text,
        "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" => {
            coerce(context, &right.text, &right.ty, &left.ty)
        }
        _ => {
            return Err(TranspileError::unsupported(
                "CompoundAssignOperator",
                format!("operator '{}'", op),
            ))
        }
    };
    Ok(Rendered::stmt(format!("{} {} {}", left.text, op, value)))
}

fn render_unary(
    node: &Node,
    operator: &UnaryOperator,
    context: &mut RenderContext,
) -> Result<Rendered> {
    let inner = operand(node, 0, context)?;
    let inner = match operator.op.as_str() {
        "-" | "+" | "~" => numeric_operand(node, 0, inner, context),
        _ => NumericOperand {
            rendered: inner,
            converted: false,
        },
    };
    // Every prefix form binds tighter than any binary operator
    let text = inner.place(node, 0, inner.rendered.text.clone(), 6);
    let inner = inner.rendered;

    let rendered = match operator.op.as_str() {
        "-" if text.starts_with('-') => Rendered::new(format!("-({})", text), inner.ty),
        "-" => Rendered::new(format!("-{}", text), inner.ty),
        "+" => Rendered::new(text, inner.ty),
        "~" => Rendered::new(format!("^{}", text), inner.ty),
        "!" => Rendered::new(to_bool_negated(&inner.text, &inner.ty), "bool"),
        "&" => Rendered::new(format!("&{}", text), resolved_type(operator.ty.canonical())),
        "*" => Rendered::new(format!("*{}", text), resolved_type(operator.ty.canonical())),
        other => {
            return Err(TranspileError::unsupported(
                "UnaryOperator",
                format!("operator '{}'", other),
            ))
        }
    };
    Ok(rendered)
}

fn render_cast(node: &Node, cast: &Cast, context: &mut RenderContext) -> Result<Rendered> {
    let target = resolved_type(cast.ty.canonical());

    if cast.cast_kind == "ToVoid" {
        return match node.code_children().next() {
            Some(child) if is_side_effect(child) => render_statement(child, context),
            _ => {
                let inner = operand(node, 0, context)?;
                Ok(Rendered::stmt(format!("_ = {}", inner.text)))
            }
        };
    }
    let inner = operand(node, 0, context)?;

    match cast.cast_kind.as_str() {
        "NullToPointer" => {
            let null = if target == "string" { "\"\"" } else { "nil" };
            Ok(Rendered::new(null, target))
        }
        "FunctionToPointerDecay" | "ArrayToPointerDecay" | "LValueToRValue" | "NoOp"
        | "BitCast" => {
            if is_numeric(&inner.ty) && is_numeric(&target) {
                let text = coerce(context, &inner.text, &inner.ty, &target);
                return Ok(Rendered::new(text, target));
            }
            let ty = if target.is_empty() { inner.ty } else { target };
            Ok(Rendered::new(inner.text, ty))
        }
        _ => {
            let text = coerce(context, &inner.text, &inner.ty, &target);
            Ok(Rendered::new(text, target))
        }
    }
}

/// Name of the function a call expression invokes directly
fn callee_name(node: &Node) -> Option<&str> {
    match &node.kind {
        NodeKind::DeclRef(reference) if reference.decl_kind == "Function" => {
            Some(reference.name.as_str())
        }
        NodeKind::Cast(_) | NodeKind::Paren { .. } => {
            node.code_children().next().and_then(callee_name)
        }
        _ => None,
    }
}

fn render_call(node: &Node, ty: &CType, context: &mut RenderContext) -> Result<Rendered> {
    let mut children = node.code_children();
    let callee = children.next().ok_or_else(|| {
        TranspileError::unsupported("CallExpr", format!("call without callee at {}", node.address))
    })?;
    let arguments: Vec<&Node> = children.collect();
    let name = callee_name(callee);

    let mut args = Vec::new();
    for argument in &arguments {
        args.push(argument.render(context)?);
    }

    // Libc functions with a Go counterpart
    if let Some(builtin) = name.and_then(builtin_function) {
        let function = context.import_type(builtin.go_name);
        let mut texts = coerce_arguments(context, &args, builtin.params);
        if name == Some("printf") {
            if let Some(format) = texts.first_mut() {
                *format = go_format(format);
            }
        }
        return Ok(Rendered::new(
            format!("{}({})", function, texts.join(", ")),
            builtin.return_type,
        ));
    }

    let declared = name.and_then(|name| context.function(name)).cloned();
    if let Some(signature) = declared {
        let params: Vec<&str> = signature.params.iter().map(String::as_str).collect();
        let texts = coerce_arguments(context, &args, &params);
        return Ok(Rendered::new(
            format!("{}({})", go_ident(name.unwrap_or_default()), texts.join(", ")),
            signature.return_type,
        ));
    }

    let callee = callee.render(context)?;
    let texts: Vec<String> = args.into_iter().map(|arg| arg.text).collect();
    Ok(Rendered::new(
        format!("{}({})", callee.text, texts.join(", ")),
        resolved_type(ty.canonical()),
    ))
}

/// Convert arguments to their parameter types; variadic extras pass unchanged
fn coerce_arguments(context: &mut RenderContext, args: &[Rendered], params: &[&str]) -> Vec<String> {
    args.iter()
        .enumerate()
        .map(|(idx, arg)| match params.get(idx) {
            Some(param) => coerce(context, &arg.text, &arg.ty, param),
            None => arg.text.clone(),
        })
        .collect()
}

/// Rewrite a printf format string literal for Go's fmt package
pub fn go_format(format: &str) -> String {
    if !format.starts_with('"') {
        return format.to_string();
    }
    FORMAT_SPEC
        .replace_all(format, |caps: &Captures| {
            let conversion = match &caps["conversion"] {
                "i" | "u" => "d",
                other => other,
            };
            format!("%{}{}", &caps["flags"], conversion)
        })
        .into_owned()
}

fn render_conditional(node: &Node, ty: &CType, context: &mut RenderContext) -> Result<Rendered> {
    let condition = operand(node, 0, context)?;
    let condition = to_bool(&condition.text, &condition.ty);
    let then = operand(node, 1, context)?;
    let otherwise = operand(node, 2, context)?;

    let result = match promote(&then.ty, &otherwise.ty) {
        Some(ty) => ty,
        None if !then.ty.is_empty() => then.ty.clone(),
        None => resolved_type(ty.canonical()),
    };

    if result.is_empty() {
        let text = format!(
            "func() {{ if {} {{ {} }} else {{ {} }} }}()",
            condition, then.text, otherwise.text
        );
        return Ok(Rendered::stmt(text));
    }

    let then = coerce(context, &then.text, &then.ty, &result);
    let otherwise = coerce(context, &otherwise.text, &otherwise.ty, &result);
    Ok(Rendered::new(
        format!(
            "func() {} {{ if {} {{ return {} }}; return {} }}()",
            result, condition, then, otherwise
        ),
        result,
    ))
}

fn render_literal(literal: &Literal) -> Result<Rendered> {
    match literal.kind {
        LiteralKind::Integer | LiteralKind::Floating => Ok(Rendered::new(
            literal.value.clone(),
            resolved_type(literal.ty.canonical()),
        )),
        LiteralKind::Character => {
            let value = literal.value.parse::<u32>().map_err(|e| {
                TranspileError::unsupported(
                    "CharacterLiteral",
                    format!("value '{}': {}", literal.value, e),
                )
            })?;
            Ok(Rendered::new(go_rune(value), "byte"))
        }
        LiteralKind::String => Ok(Rendered::new(go_string(&literal.value), "string")),
    }
}

/// A character literal as a Go rune literal, or its code when not printable
pub fn go_rune(value: u32) -> String {
    match char::from_u32(value) {
        Some('\n') => r"'\n'".to_string(),
        Some('\t') => r"'\t'".to_string(),
        Some('\r') => r"'\r'".to_string(),
        Some('\0') => r"'\x00'".to_string(),
        Some('\\') => r"'\\'".to_string(),
        Some('\'') => r"'\''".to_string(),
        Some(c) if (' '..='~').contains(&c) => format!("'{}'", c),
        _ => value.to_string(),
    }
}

/// Rewrite the escapes C accepts but Go does not: `\'`, `\?` and octal escapes
pub fn go_string(literal: &str) -> String {
    let mut output = String::with_capacity(literal.len());
    let mut chars = literal.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('\'') | Some('?') => {
                if let Some(escaped) = chars.next() {
                    output.push(escaped);
                }
            }
            Some(digit) if digit.is_digit(8) => {
                let mut value = 0u32;
                for _ in 0..3 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                output.push_str(&format!("\\x{:02x}", value & 0xff));
            }
            Some(escaped) => {
                chars.next();
                output.push('\\');
                output.push(escaped);
            }
            None => output.push('\\'),
        }
    }

    output
}
