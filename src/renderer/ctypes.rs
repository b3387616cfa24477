//! Mapping of C type spellings to Go types, numeric promotion and the
//! conversions needed to move a value from one Go type to another.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::renderer::traits::RenderContext;

/// Helper used to turn a Go `bool` into a C-style integer
pub const BOOL_TO_INT: &str = "github.com/elliotchance/c2go/noarch.BoolToInt";

lazy_static! {
    static ref QUALIFIERS: Regex =
        Regex::new(r"\b(?:const|volatile|restrict|__restrict)\b").unwrap();
    static ref SPACES: Regex = Regex::new(r"\s+").unwrap();
    static ref ARRAY: Regex = Regex::new(r"^(?P<element>.*?) ?\[(?P<size>\d*)\]$").unwrap();
    static ref IDENT: Regex = Regex::new(r"^[A-Za-z_]\w*$").unwrap();

    static ref BUILTIN_TYPES: HashMap<&'static str, &'static str> = [
        ("void", ""),
        ("_Bool", "bool"),
        ("bool", "bool"),
        ("char", "byte"),
        ("signed char", "int8"),
        ("unsigned char", "uint8"),
        ("short", "int16"),
        ("short int", "int16"),
        ("signed short", "int16"),
        ("unsigned short", "uint16"),
        ("unsigned short int", "uint16"),
        ("int", "int"),
        ("signed", "int"),
        ("signed int", "int"),
        ("unsigned", "uint32"),
        ("unsigned int", "uint32"),
        ("long", "int64"),
        ("long int", "int64"),
        ("signed long", "int64"),
        ("unsigned long", "uint64"),
        ("unsigned long int", "uint64"),
        ("long long", "int64"),
        ("long long int", "int64"),
        ("unsigned long long", "uint64"),
        ("unsigned long long int", "uint64"),
        ("__int128", "int64"),
        ("unsigned __int128", "uint64"),
        ("float", "float32"),
        ("double", "float64"),
        ("long double", "float64"),
        ("int8_t", "int8"),
        ("int16_t", "int16"),
        ("int32_t", "int32"),
        ("int64_t", "int64"),
        ("uint8_t", "uint8"),
        ("uint16_t", "uint16"),
        ("uint32_t", "uint32"),
        ("uint64_t", "uint64"),
        ("size_t", "uint64"),
        ("ssize_t", "int64"),
        ("ptrdiff_t", "int64"),
        ("intptr_t", "int64"),
        ("uintptr_t", "uint64"),
        ("FILE", "os.File"),
    ]
    .into_iter()
    .collect();

    static ref GO_RESERVED: Vec<&'static str> = vec![
        "chan", "defer", "fallthrough", "func", "go", "import", "interface", "map", "package",
        "range", "select", "type", "var", "string", "len", "cap", "append", "copy", "new",
        "make", "nil", "true", "false", "iota", "error", "print", "println", "panic", "recover",
        "close", "delete", "real", "imag", "complex", "byte", "rune", "uint", "uintptr",
    ];
}

/// Drop qualifiers and normalise spacing: `const char *const` -> `char *`
pub fn normalize(c_type: &str) -> String {
    let stripped = QUALIFIERS.replace_all(c_type, "");
    let mut out = SPACES.replace_all(stripped.trim(), " ").to_string();
    while out.contains("* *") {
        out = out.replace("* *", "**");
    }
    out.replace("( ", "(")
        .replace(" )", ")")
        .replace(" ,", ",")
        .trim()
        .to_string()
}

/// Go spelling of a C type. Qualified Go names register their import.
pub fn go_type(ctx: &mut RenderContext, c_type: &str) -> String {
    let c_type = normalize(c_type);

    if let Some(func) = function_type(ctx, &c_type) {
        return func;
    }

    if let Some(caps) = ARRAY.captures(&c_type) {
        let element = go_type(ctx, &caps["element"]);
        return format!("[{}]{}", &caps["size"], element);
    }

    if let Some(inner) = c_type.strip_suffix('*') {
        let inner = inner.trim();
        return match inner {
            "char" | "signed char" => "string".to_string(),
            "void" => ctx.import_type("unsafe.Pointer"),
            _ => format!("*{}", go_type(ctx, inner)),
        };
    }

    let name = ["struct ", "union ", "enum "]
        .iter()
        .find_map(|tag| c_type.strip_prefix(tag))
        .unwrap_or(&c_type);

    match BUILTIN_TYPES.get(name) {
        Some(mapped) => ctx.import_type(mapped),
        None => go_ident(name),
    }
}

/// Go spelling of a C type without registering imports.
///
/// Used for the resolved types expressions report to their parents, which
/// may never reach the output.
pub fn resolved_type(c_type: &str) -> String {
    let mut scratch = RenderContext::default();
    go_type(&mut scratch, c_type)
}

/// Types the front end prints for structs and enums declared without a tag,
/// e.g. `struct (anonymous struct at main.c:1:9)` or `enum (unnamed at ...)`.
pub fn is_anonymous_type(c_type: &str) -> bool {
    c_type.contains("(anonymous") || c_type.contains("(unnamed")
}

/// `int (int, char **)` and `int (*)(int)` as Go `func` types
fn function_type(ctx: &mut RenderContext, c_type: &str) -> Option<String> {
    let open = c_type.find('(')?;
    if !c_type.ends_with(')') {
        return None;
    }
    let result = c_type[..open].trim();
    let mut rest = &c_type[open..];
    if let Some(after) = rest.strip_prefix("(*)") {
        rest = after;
    }
    let args = rest.strip_prefix('(')?.strip_suffix(')')?;

    let mut params = Vec::new();
    for arg in split_top_level(args) {
        match arg.as_str() {
            "" | "void" => {}
            "..." => params.push("...interface{}".to_string()),
            other => params.push(go_type(ctx, other)),
        }
    }

    let result = go_type(ctx, result);
    Some(if result.is_empty() {
        format!("func({})", params.join(", "))
    } else {
        format!("func({}) {}", params.join(", "), result)
    })
}

/// Split a parameter list on commas that are not inside parentheses
fn split_top_level(args: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in args.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

/// Rename C identifiers that collide with Go keywords or predeclared names
pub fn go_ident(name: &str) -> String {
    if GO_RESERVED.iter().any(|reserved| *reserved == name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

pub fn is_integer(ty: &str) -> bool {
    matches!(
        ty,
        "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32"
            | "uint64" | "byte" | "rune" | "uintptr"
    )
}

pub fn is_float(ty: &str) -> bool {
    matches!(ty, "float32" | "float64")
}

pub fn is_numeric(ty: &str) -> bool {
    is_integer(ty) || is_float(ty)
}

pub fn is_pointer(ty: &str) -> bool {
    ty.starts_with('*') || ty == "unsafe.Pointer" || ty.starts_with("func(")
}

fn is_unsigned(ty: &str) -> bool {
    ty.starts_with("uint") || ty == "byte"
}

fn bit_width(ty: &str) -> u32 {
    match ty {
        "int8" | "uint8" | "byte" => 8,
        "int16" | "uint16" => 16,
        // C `int` maps to Go `int` but keeps its 32-bit rank
        "int" | "int32" | "uint32" | "rune" | "float32" => 32,
        _ => 64,
    }
}

/// The type both operands of an arithmetic operator are brought to.
///
/// Floating types beat integer types, wider beats narrower and on equal width
/// the unsigned type wins. `bool` promotes to the other operand. Returns
/// `None` when either side is not numeric.
pub fn promote(left: &str, right: &str) -> Option<String> {
    if left == right {
        return Some(left.to_string());
    }
    if left == "bool" && is_numeric(right) {
        return Some(right.to_string());
    }
    if right == "bool" && is_numeric(left) {
        return Some(left.to_string());
    }
    if !is_numeric(left) || !is_numeric(right) {
        return None;
    }

    let winner = match (is_float(left), is_float(right)) {
        (true, false) => left,
        (false, true) => right,
        _ => {
            let (lw, rw) = (bit_width(left), bit_width(right));
            if lw != rw {
                if lw > rw {
                    left
                } else {
                    right
                }
            } else if is_unsigned(right) && !is_unsigned(left) {
                right
            } else {
                left
            }
        }
    };
    Some(winner.to_string())
}

/// Convert `text` of Go type `from` into Go type `to`.
///
/// Identical or unknown types are left alone, so no redundant conversions
/// are ever emitted.
pub fn coerce(ctx: &mut RenderContext, text: &str, from: &str, to: &str) -> String {
    if from == to || from.is_empty() || to.is_empty() {
        return text.to_string();
    }

    if to == "bool" {
        return to_bool(text, from);
    }

    if from == "bool" && (is_numeric(to) || is_named(to)) {
        let converted = format!("{}({})", ctx.import_type(BOOL_TO_INT), text);
        return if to == "int" {
            converted
        } else {
            format!("{}({})", to, converted)
        };
    }

    if is_numeric(from) && (is_numeric(to) || is_named(to)) {
        return format!("{}({})", to, text);
    }

    text.to_string()
}

/// A user-defined named type such as a typedef or enum
fn is_named(ty: &str) -> bool {
    IDENT.is_match(ty) && ty != "string" && ty != "bool"
}

/// A Go condition from a C scalar
pub fn to_bool(text: &str, from: &str) -> String {
    match from {
        "bool" => text.to_string(),
        "string" => format!("{} != \"\"", text),
        ty if is_pointer(ty) => format!("{} != nil", text),
        _ => format!("{} != 0", text),
    }
}

/// The negated condition, used for C's `!`
pub fn to_bool_negated(text: &str, from: &str) -> String {
    match from {
        "bool" if text.contains(' ') => format!("!({})", text),
        "bool" => format!("!{}", text),
        "string" => format!("{} == \"\"", text),
        ty if is_pointer(ty) => format!("{} == nil", text),
        _ => format!("{} == 0", text),
    }
}

/// Libc function with a Go counterpart
#[derive(Debug, Clone, Copy)]
pub struct BuiltinFunction {
    pub go_name: &'static str,
    pub return_type: &'static str,
    pub params: &'static [&'static str],
    pub variadic: bool,
}

const fn builtin(
    go_name: &'static str,
    return_type: &'static str,
    params: &'static [&'static str],
    variadic: bool,
) -> BuiltinFunction {
    BuiltinFunction {
        go_name,
        return_type,
        params,
        variadic,
    }
}

lazy_static! {
    static ref BUILTIN_FUNCTIONS: HashMap<&'static str, BuiltinFunction> = [
        ("printf", builtin("fmt.Printf", "", &["string"], true)),
        ("puts", builtin("fmt.Println", "", &["string"], false)),
        ("sqrt", builtin("math.Sqrt", "float64", &["float64"], false)),
        ("pow", builtin("math.Pow", "float64", &["float64", "float64"], false)),
        ("fabs", builtin("math.Abs", "float64", &["float64"], false)),
        ("floor", builtin("math.Floor", "float64", &["float64"], false)),
        ("ceil", builtin("math.Ceil", "float64", &["float64"], false)),
        ("fmod", builtin("math.Mod", "float64", &["float64", "float64"], false)),
        ("sin", builtin("math.Sin", "float64", &["float64"], false)),
        ("cos", builtin("math.Cos", "float64", &["float64"], false)),
        ("tan", builtin("math.Tan", "float64", &["float64"], false)),
        ("exp", builtin("math.Exp", "float64", &["float64"], false)),
        ("log", builtin("math.Log", "float64", &["float64"], false)),
        ("log10", builtin("math.Log10", "float64", &["float64"], false)),
        ("exit", builtin("os.Exit", "", &["int"], false)),
        ("strlen", builtin("len", "int", &["string"], false)),
    ]
    .into_iter()
    .collect();
}

pub fn builtin_function(name: &str) -> Option<BuiltinFunction> {
    BUILTIN_FUNCTIONS.get(name).copied()
}
