//! The grammar table: one field-extraction rule per dump node kind.
//!
//! Every record looks like `Kind 0xADDRESS <rest>`. The address is split off
//! by the line parser; each rule here only has to describe `<rest>`. Rules
//! are assembled from the shared fragments below so that the same field is
//! always captured under the same group name.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;

use crate::parser::types::*;

/// Optional `parent 0x..`/`prev 0x..` links printed before a declaration's range
const DECL: &str = r"(?:parent [0-9a-fx]+ )?(?:prev [0-9a-fx]+ )?";
/// Source range, e.g. `<main.c:3:1, line:6:1>` or `<<invalid sloc>>`
const POS: &str = r"<(?P<position>(?:[^<>]|<[^<>]*>)*)>";
/// A declaration's own location, e.g. `col:9` or `line:3:5`
const LOC: &str = r"(?: (?P<loc><invalid sloc>|[^ ']*:\d+(?::\d+)?))?";
const FLAGS: &str = r"(?P<flags>(?: (?:implicit|used|referenced|invalid|constexpr|inline))*)";
/// A quoted type, optionally followed by its desugared form
const QT: &str = r" '(?P<type>[^']*)'(?::'(?P<desugared>[^']*)')?";
const BARE_TYPE: &str = r"'(?P<type>[^']*)'(?::'(?P<desugared>[^']*)')?";
const VALUE_KIND: &str = r"(?: (?P<value_kind>lvalue|xvalue))?(?: (?P<object_kind>bitfield|vectorcomponent))?";
const STORAGE: &str =
    r"(?P<storage>(?: (?:extern|static|inline|cinit|callinit|listinit|tls|nrvo|__module_private__))*)";
const TAGS: &str = r"(?P<tags>.*)";

type Build = fn(&Fields) -> Result<NodeKind, String>;

/// Field-extraction rule for one node kind
pub struct Rule {
    pub kind: &'static str,
    pub pattern: Regex,
    build: Option<Build>,
}

impl Rule {
    fn new(kind: &'static str, parts: &[&str], build: Build) -> Self {
        Self {
            kind,
            pattern: compile(kind, parts),
            build: Some(build),
        }
    }

    /// A rule for records that carry no semantics and never enter the tree
    fn discard(kind: &'static str, parts: &[&str]) -> Self {
        Self {
            kind,
            pattern: compile(kind, parts),
            build: None,
        }
    }

    pub fn source(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn is_discarded(&self) -> bool {
        self.build.is_none()
    }

    /// Build the node payload. `None` means the record is dropped.
    pub fn build(&self, fields: &Fields) -> Option<Result<NodeKind, String>> {
        self.build.map(|build| build(fields))
    }
}

fn compile(kind: &str, parts: &[&str]) -> Regex {
    let source = format!("^{}", parts.concat());
    Regex::new(&source).unwrap_or_else(|e| panic!("grammar pattern for {kind}: {e}"))
}

/// Named captures of a matched record
pub struct Fields<'t> {
    caps: Captures<'t>,
}

impl<'t> Fields<'t> {
    pub fn new(caps: Captures<'t>) -> Self {
        Self { caps }
    }

    /// A captured group, `None` when it did not participate or is empty
    pub fn get(&self, name: &str) -> Option<&'t str> {
        self.caps
            .name(name)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
    }

    pub fn text(&self, name: &str) -> &'t str {
        self.get(name).unwrap_or("")
    }

    /// Whether a space-separated flag group contains `word`
    pub fn has_word(&self, group: &str, word: &str) -> bool {
        self.text(group).split_whitespace().any(|w| w == word)
    }

    pub fn ctype(&self) -> CType {
        CType::new(self.text("type")).with_desugared(self.get("desugared").map(String::from))
    }

    fn storage(&self) -> StorageClass {
        if self.has_word("storage", "extern") {
            StorageClass::Extern
        } else if self.has_word("storage", "static") {
            StorageClass::Static
        } else {
            StorageClass::Auto
        }
    }

    fn string(&self, name: &str) -> Option<String> {
        self.get(name).map(String::from)
    }
}

fn attr(kind: AttrKind, detail: Option<String>) -> NodeKind {
    NodeKind::Attr(Attribute { kind, detail })
}

fn type_node(kind: TypeKind, f: &Fields) -> Result<NodeKind, String> {
    let size = match f.get("size") {
        Some(size) => Some(
            size.parse::<u64>()
                .map_err(|e| format!("bad array size '{}': {}", size, e))?,
        ),
        None => None,
    };
    Ok(NodeKind::Type(TypeNode {
        kind,
        ty: f.ctype(),
        size,
    }))
}

fn literal(kind: LiteralKind, f: &Fields) -> NodeKind {
    NodeKind::Literal(Literal {
        kind,
        ty: f.ctype(),
        value: f.text("value").to_string(),
    })
}

fn operator(f: &Fields) -> Operator {
    Operator {
        ty: f.ctype(),
        op: f.text("operator").to_string(),
    }
}

fn cast(f: &Fields, explicit: bool) -> NodeKind {
    NodeKind::Cast(Cast {
        ty: f.ctype(),
        cast_kind: f.text("cast_kind").to_string(),
        explicit,
    })
}

fn rules() -> Vec<Rule> {
    vec![
        // Declarations
        Rule::new("TranslationUnitDecl", &[POS, TAGS], |_| Ok(NodeKind::TranslationUnit)),
        Rule::new(
            "FunctionDecl",
            &[DECL, POS, LOC, FLAGS, r" (?P<name>\w+)", QT, STORAGE, TAGS],
            |f| {
                Ok(NodeKind::Function(FunctionDecl {
                    name: f.text("name").to_string(),
                    ty: f.ctype(),
                    implicit: f.has_word("flags", "implicit"),
                    storage: f.storage(),
                    inline: f.has_word("storage", "inline") || f.has_word("flags", "inline"),
                }))
            },
        ),
        Rule::new(
            "ParmVarDecl",
            &[DECL, POS, LOC, FLAGS, r"(?: (?P<name>\w+))?", QT, TAGS],
            |f| {
                Ok(NodeKind::Param(ParmVarDecl {
                    name: f.string("name"),
                    ty: f.ctype(),
                }))
            },
        ),
        Rule::new(
            "VarDecl",
            &[DECL, POS, LOC, FLAGS, r" (?P<name>\w+)", QT, STORAGE, TAGS],
            |f| {
                Ok(NodeKind::Var(VarDecl {
                    name: f.text("name").to_string(),
                    ty: f.ctype(),
                    storage: f.storage(),
                }))
            },
        ),
        Rule::new(
            "FieldDecl",
            &[DECL, POS, LOC, FLAGS, r"(?: (?P<name>\w+))?", QT, TAGS],
            |f| {
                Ok(NodeKind::Field(FieldDecl {
                    name: f.string("name"),
                    ty: f.ctype(),
                }))
            },
        ),
        Rule::new(
            "RecordDecl",
            &[
                DECL,
                POS,
                LOC,
                FLAGS,
                r" (?P<tag>struct|union|class)(?: (?P<name>\w+))?(?P<definition> definition)?",
                TAGS,
            ],
            |f| {
                let tag = match f.text("tag") {
                    "union" => RecordTag::Union,
                    "class" => RecordTag::Class,
                    _ => RecordTag::Struct,
                };
                // An anonymous definition reads as `struct definition`
                let (name, definition) = match f.get("name") {
                    Some("definition") if f.get("definition").is_none() => (None, true),
                    name => (name.map(String::from), f.get("definition").is_some()),
                };
                Ok(NodeKind::Record(RecordDecl {
                    tag,
                    name,
                    definition,
                }))
            },
        ),
        Rule::new(
            "EnumDecl",
            &[DECL, POS, LOC, FLAGS, r"(?: (?P<name>\w+))?(?: '(?P<type>[^']*)')?", TAGS],
            |f| {
                Ok(NodeKind::Enum(EnumDecl {
                    name: f.string("name"),
                    underlying: f.get("type").map(CType::new),
                }))
            },
        ),
        Rule::new(
            "EnumConstantDecl",
            &[DECL, POS, LOC, FLAGS, r" (?P<name>\w+)", QT, TAGS],
            |f| {
                Ok(NodeKind::EnumConstant(EnumConstantDecl {
                    name: f.text("name").to_string(),
                    ty: f.ctype(),
                }))
            },
        ),
        Rule::new(
            "TypedefDecl",
            &[DECL, POS, LOC, FLAGS, r" (?P<name>\w+)", QT, TAGS],
            |f| {
                Ok(NodeKind::Typedef(TypedefDecl {
                    name: f.text("name").to_string(),
                    ty: f.ctype(),
                    implicit: f.has_word("flags", "implicit"),
                }))
            },
        ),
        // Statements
        Rule::new("CompoundStmt", &[POS, TAGS], |_| Ok(NodeKind::Compound)),
        Rule::new("DeclStmt", &[POS, TAGS], |_| Ok(NodeKind::DeclStmt)),
        Rule::new("IfStmt", &[POS, TAGS], |f| {
            Ok(NodeKind::If {
                has_else: f.has_word("tags", "has_else"),
            })
        }),
        Rule::new("WhileStmt", &[POS, TAGS], |_| Ok(NodeKind::While)),
        Rule::new("DoStmt", &[POS, TAGS], |_| Ok(NodeKind::Do)),
        Rule::new("ForStmt", &[POS, TAGS], |_| Ok(NodeKind::For)),
        Rule::new("ReturnStmt", &[POS, TAGS], |_| Ok(NodeKind::Return)),
        Rule::new("BreakStmt", &[POS, TAGS], |_| Ok(NodeKind::Break)),
        Rule::new("ContinueStmt", &[POS, TAGS], |_| Ok(NodeKind::Continue)),
        Rule::discard("NullStmt", &[POS, TAGS]),
        // Expressions
        Rule::new(
            "BinaryOperator",
            &[POS, QT, VALUE_KIND, r" '(?P<operator>[^']+)'", TAGS],
            |f| Ok(NodeKind::Binary(operator(f))),
        ),
        Rule::new(
            "CompoundAssignOperator",
            &[POS, QT, VALUE_KIND, r" '(?P<operator>[^']+)'", TAGS],
            |f| Ok(NodeKind::CompoundAssign(operator(f))),
        ),
        Rule::new(
            "UnaryOperator",
            &[
                POS,
                QT,
                VALUE_KIND,
                r" (?P<fix>prefix|postfix) '(?P<operator>[^']+)'",
                TAGS,
            ],
            |f| {
                Ok(NodeKind::Unary(UnaryOperator {
                    ty: f.ctype(),
                    op: f.text("operator").to_string(),
                    postfix: f.text("fix") == "postfix",
                }))
            },
        ),
        Rule::new(
            "ImplicitCastExpr",
            &[POS, QT, VALUE_KIND, r" <(?P<cast_kind>\w+)>", TAGS],
            |f| Ok(cast(f, false)),
        ),
        Rule::new(
            "CStyleCastExpr",
            &[POS, QT, VALUE_KIND, r" <(?P<cast_kind>\w+)>", TAGS],
            |f| Ok(cast(f, true)),
        ),
        Rule::new("CallExpr", &[POS, QT, VALUE_KIND, TAGS], |f| {
            Ok(NodeKind::Call { ty: f.ctype() })
        }),
        Rule::new(
            "DeclRefExpr",
            &[
                POS,
                QT,
                VALUE_KIND,
                r" (?P<decl_kind>\w+) (?P<decl>[0-9a-fx]+) '(?P<name>[^']*)'",
                TAGS,
            ],
            |f| {
                Ok(NodeKind::DeclRef(DeclRef {
                    ty: f.ctype(),
                    decl_kind: f.text("decl_kind").to_string(),
                    name: f.text("name").to_string(),
                }))
            },
        ),
        Rule::new(
            "MemberExpr",
            &[
                POS,
                QT,
                VALUE_KIND,
                r" (?P<arrow>->|\.)(?P<name>\w*) (?P<decl>[0-9a-fx]+)",
                TAGS,
            ],
            |f| {
                Ok(NodeKind::Member(Member {
                    ty: f.ctype(),
                    name: f.text("name").to_string(),
                    arrow: f.text("arrow") == "->",
                }))
            },
        ),
        Rule::new("ArraySubscriptExpr", &[POS, QT, VALUE_KIND, TAGS], |f| {
            Ok(NodeKind::Subscript { ty: f.ctype() })
        }),
        Rule::new("ParenExpr", &[POS, QT, VALUE_KIND, TAGS], |f| {
            Ok(NodeKind::Paren { ty: f.ctype() })
        }),
        Rule::new("ConditionalOperator", &[POS, QT, VALUE_KIND, TAGS], |f| {
            Ok(NodeKind::Conditional { ty: f.ctype() })
        }),
        Rule::new(
            "PredefinedExpr",
            &[POS, QT, VALUE_KIND, r" (?P<name>\w+)", TAGS],
            |f| {
                Ok(NodeKind::Predefined {
                    ty: f.ctype(),
                    name: f.text("name").to_string(),
                })
            },
        ),
        Rule::new("IntegerLiteral", &[POS, QT, r" (?P<value>-?\d+)"], |f| {
            Ok(literal(LiteralKind::Integer, f))
        }),
        Rule::new("FloatingLiteral", &[POS, QT, r" (?P<value>\S+)"], |f| {
            Ok(literal(LiteralKind::Floating, f))
        }),
        Rule::new("CharacterLiteral", &[POS, QT, r" (?P<value>\d+)"], |f| {
            f.text("value")
                .parse::<u32>()
                .map_err(|e| format!("bad character value '{}': {}", f.text("value"), e))?;
            Ok(literal(LiteralKind::Character, f))
        }),
        Rule::new(
            "StringLiteral",
            &[POS, QT, VALUE_KIND, r#" (?P<value>".*")"#],
            |f| Ok(literal(LiteralKind::String, f)),
        ),
        // Types
        Rule::new("BuiltinType", &[BARE_TYPE, TAGS], |f| type_node(TypeKind::Builtin, f)),
        Rule::new(
            "ConstantArrayType",
            &[BARE_TYPE, r" (?P<size>\d+)", TAGS],
            |f| type_node(TypeKind::ConstantArray, f),
        ),
        Rule::new("ElaboratedType", &[BARE_TYPE, TAGS], |f| {
            type_node(TypeKind::Elaborated, f)
        }),
        Rule::new("Enum", &[BARE_TYPE, TAGS], |f| type_node(TypeKind::Enum, f)),
        Rule::new("EnumType", &[BARE_TYPE, TAGS], |f| type_node(TypeKind::EnumType, f)),
        Rule::new("FunctionProtoType", &[BARE_TYPE, TAGS], |f| {
            type_node(TypeKind::FunctionProto, f)
        }),
        Rule::new("PointerType", &[BARE_TYPE, TAGS], |f| type_node(TypeKind::Pointer, f)),
        Rule::new("QualType", &[BARE_TYPE, TAGS], |f| type_node(TypeKind::Qual, f)),
        Rule::new("Record", &[BARE_TYPE, TAGS], |f| type_node(TypeKind::Record, f)),
        Rule::new("RecordType", &[BARE_TYPE, TAGS], |f| {
            type_node(TypeKind::RecordType, f)
        }),
        Rule::new("Typedef", &[BARE_TYPE, TAGS], |f| type_node(TypeKind::Typedef, f)),
        Rule::new("TypedefType", &[BARE_TYPE, TAGS], |f| {
            type_node(TypeKind::TypedefType, f)
        }),
        // Attributes
        Rule::new("AlwaysInlineAttr", &[POS, TAGS], |f| {
            Ok(attr(AttrKind::AlwaysInline, f.string("tags")))
        }),
        Rule::new(
            "AsmLabelAttr",
            &[POS, r#"(?P<tags>[^"]*)"(?P<label>[^"]*)""#],
            |f| Ok(attr(AttrKind::AsmLabel, f.string("label"))),
        ),
        Rule::new("AvailabilityAttr", &[POS, TAGS], |f| {
            Ok(attr(AttrKind::Availability, f.string("tags")))
        }),
        Rule::new("ConstAttr", &[POS, TAGS], |f| {
            Ok(attr(AttrKind::Const, f.string("tags")))
        }),
        Rule::new(
            "DeprecatedAttr",
            &[POS, r#"(?P<tags>[^"]*)(?:"(?P<message>[^"]*)")?"#],
            |f| Ok(attr(AttrKind::Deprecated, f.string("message"))),
        ),
        Rule::new(
            "FormatAttr",
            &[
                POS,
                r"(?: Implicit)? (?P<archetype>\w+) (?P<format_index>\d+) (?P<first_arg>\d+)",
            ],
            |f| Ok(attr(AttrKind::Format, f.string("archetype"))),
        ),
        Rule::new("MallocAttr", &[POS, TAGS], |f| {
            Ok(attr(AttrKind::Malloc, f.string("tags")))
        }),
        Rule::new("ModeAttr", &[POS, r" (?P<name>\w+)"], |f| {
            Ok(attr(AttrKind::Mode, f.string("name")))
        }),
        Rule::new("NoThrowAttr", &[POS, TAGS], |f| {
            Ok(attr(AttrKind::NoThrow, f.string("tags")))
        }),
        Rule::new("NonNullAttr", &[POS, TAGS], |f| {
            Ok(attr(AttrKind::NonNull, f.string("tags")))
        }),
        Rule::new("RestrictAttr", &[POS, TAGS], |f| {
            Ok(attr(AttrKind::Restrict, f.string("tags")))
        }),
    ]
}

lazy_static! {
    static ref GRAMMAR: HashMap<&'static str, Rule> =
        rules().into_iter().map(|rule| (rule.kind, rule)).collect();
}

/// Look up the rule registered for a node kind keyword
pub fn lookup(kind: &str) -> Option<&'static Rule> {
    GRAMMAR.get(kind)
}

/// Every registered kind keyword, sorted
pub fn kinds() -> Vec<&'static str> {
    let mut kinds: Vec<_> = GRAMMAR.keys().copied().collect();
    kinds.sort_unstable();
    kinds
}
