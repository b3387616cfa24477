use serde::Serialize;

/// A C type as it appears in a dump record: the written spelling plus, for
/// sugared types (`'size_t':'unsigned long'`), the type it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CType {
    pub spelling: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desugared: Option<String>,
}

impl CType {
    pub fn new(spelling: impl Into<String>) -> Self {
        Self {
            spelling: spelling.into(),
            desugared: None,
        }
    }

    pub fn with_desugared(mut self, desugared: Option<String>) -> Self {
        self.desugared = desugared;
        self
    }

    /// The type used for semantic decisions in expressions
    pub fn canonical(&self) -> &str {
        self.desugared.as_deref().unwrap_or(&self.spelling)
    }
}

impl std::fmt::Display for CType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.spelling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StorageClass {
    Auto,
    Extern,
    Static,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: String,
    pub ty: CType,
    pub implicit: bool,
    pub storage: StorageClass,
    pub inline: bool,
}

impl FunctionDecl {
    /// Return type spelled in front of the parameter list, e.g. `int` in
    /// `'int (int, char **)'`.
    pub fn return_type(&self) -> &str {
        match self.ty.spelling.find('(') {
            Some(idx) => self.ty.spelling[..idx].trim(),
            None => self.ty.spelling.trim(),
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.ty.canonical().contains("...")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParmVarDecl {
    pub name: Option<String>,
    pub ty: CType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: CType,
    pub storage: StorageClass,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecl {
    pub name: Option<String>,
    pub ty: CType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordTag {
    Struct,
    Union,
    Class,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDecl {
    pub tag: RecordTag,
    pub name: Option<String>,
    pub definition: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDecl {
    pub name: Option<String>,
    pub underlying: Option<CType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumConstantDecl {
    pub name: String,
    pub ty: CType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedefDecl {
    pub name: String,
    pub ty: CType,
    pub implicit: bool,
}

/// Binary and compound-assignment operators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operator {
    pub ty: CType,
    pub op: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnaryOperator {
    pub ty: CType,
    pub op: String,
    pub postfix: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cast {
    pub ty: CType,
    pub cast_kind: String,
    pub explicit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclRef {
    pub ty: CType,
    /// What the reference points at: `Var`, `ParmVar`, `Function`, `EnumConstant`...
    pub decl_kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub ty: CType,
    pub name: String,
    pub arrow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiteralKind {
    Integer,
    Floating,
    Character,
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Literal {
    pub kind: LiteralKind,
    pub ty: CType,
    /// Textual value exactly as dumped (character literals are numeric)
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeKind {
    Builtin,
    ConstantArray,
    Elaborated,
    Enum,
    EnumType,
    FunctionProto,
    Pointer,
    Qual,
    Record,
    RecordType,
    Typedef,
    TypedefType,
}

impl TypeKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeKind::Builtin => "BuiltinType",
            TypeKind::ConstantArray => "ConstantArrayType",
            TypeKind::Elaborated => "ElaboratedType",
            TypeKind::Enum => "Enum",
            TypeKind::EnumType => "EnumType",
            TypeKind::FunctionProto => "FunctionProtoType",
            TypeKind::Pointer => "PointerType",
            TypeKind::Qual => "QualType",
            TypeKind::Record => "Record",
            TypeKind::RecordType => "RecordType",
            TypeKind::Typedef => "Typedef",
            TypeKind::TypedefType => "TypedefType",
        }
    }
}

/// Type nodes hanging under typedefs and declarations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeNode {
    pub kind: TypeKind,
    pub ty: CType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttrKind {
    AlwaysInline,
    AsmLabel,
    Availability,
    Const,
    Deprecated,
    Format,
    Malloc,
    Mode,
    NoThrow,
    NonNull,
    Restrict,
}

impl AttrKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            AttrKind::AlwaysInline => "AlwaysInlineAttr",
            AttrKind::AsmLabel => "AsmLabelAttr",
            AttrKind::Availability => "AvailabilityAttr",
            AttrKind::Const => "ConstAttr",
            AttrKind::Deprecated => "DeprecatedAttr",
            AttrKind::Format => "FormatAttr",
            AttrKind::Malloc => "MallocAttr",
            AttrKind::Mode => "ModeAttr",
            AttrKind::NoThrow => "NoThrowAttr",
            AttrKind::NonNull => "NonNullAttr",
            AttrKind::Restrict => "RestrictAttr",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub kind: AttrKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "variant")]
pub enum NodeKind {
    TranslationUnit,
    Function(FunctionDecl),
    Param(ParmVarDecl),
    Var(VarDecl),
    Field(FieldDecl),
    Record(RecordDecl),
    Enum(EnumDecl),
    EnumConstant(EnumConstantDecl),
    Typedef(TypedefDecl),

    Compound,
    DeclStmt,
    If { has_else: bool },
    While,
    Do,
    For,
    Return,
    Break,
    Continue,

    Binary(Operator),
    CompoundAssign(Operator),
    Unary(UnaryOperator),
    Cast(Cast),
    Call { ty: CType },
    DeclRef(DeclRef),
    Member(Member),
    Subscript { ty: CType },
    Paren { ty: CType },
    Conditional { ty: CType },
    Predefined { ty: CType, name: String },
    Literal(Literal),

    Type(TypeNode),
    Attr(Attribute),

    /// A `<<<NULL>>>` slot: an optional child the front end left empty
    Absent,
}

impl NodeKind {
    /// Statements whose children are positional slots
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            NodeKind::If { .. } | NodeKind::While | NodeKind::Do | NodeKind::For
        )
    }
}

/// One reconstructed AST node. Children are kept in dump order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(address: impl Into<String>, position: Option<String>, kind: NodeKind) -> Self {
        Self {
            address: address.into(),
            position,
            kind,
            children: Vec::new(),
        }
    }

    pub fn absent() -> Self {
        Self::new("", None, NodeKind::Absent)
    }

    pub fn add_child(&mut self, node: Node) {
        self.children.push(node);
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.kind, NodeKind::Absent)
    }

    /// Children that carry code, skipping attributes and type nodes
    pub fn code_children(&self) -> impl Iterator<Item = &Node> {
        self.children
            .iter()
            .filter(|c| !matches!(c.kind, NodeKind::Attr(_) | NodeKind::Type(_)))
    }

    /// The dump keyword this node was parsed from
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::TranslationUnit => "TranslationUnitDecl",
            NodeKind::Function(_) => "FunctionDecl",
            NodeKind::Param(_) => "ParmVarDecl",
            NodeKind::Var(_) => "VarDecl",
            NodeKind::Field(_) => "FieldDecl",
            NodeKind::Record(_) => "RecordDecl",
            NodeKind::Enum(_) => "EnumDecl",
            NodeKind::EnumConstant(_) => "EnumConstantDecl",
            NodeKind::Typedef(_) => "TypedefDecl",
            NodeKind::Compound => "CompoundStmt",
            NodeKind::DeclStmt => "DeclStmt",
            NodeKind::If { .. } => "IfStmt",
            NodeKind::While => "WhileStmt",
            NodeKind::Do => "DoStmt",
            NodeKind::For => "ForStmt",
            NodeKind::Return => "ReturnStmt",
            NodeKind::Break => "BreakStmt",
            NodeKind::Continue => "ContinueStmt",
            NodeKind::Binary(_) => "BinaryOperator",
            NodeKind::CompoundAssign(_) => "CompoundAssignOperator",
            NodeKind::Unary(_) => "UnaryOperator",
            NodeKind::Cast(cast) if cast.explicit => "CStyleCastExpr",
            NodeKind::Cast(_) => "ImplicitCastExpr",
            NodeKind::Call { .. } => "CallExpr",
            NodeKind::DeclRef(_) => "DeclRefExpr",
            NodeKind::Member(_) => "MemberExpr",
            NodeKind::Subscript { .. } => "ArraySubscriptExpr",
            NodeKind::Paren { .. } => "ParenExpr",
            NodeKind::Conditional { .. } => "ConditionalOperator",
            NodeKind::Predefined { .. } => "PredefinedExpr",
            NodeKind::Literal(lit) => match lit.kind {
                LiteralKind::Integer => "IntegerLiteral",
                LiteralKind::Floating => "FloatingLiteral",
                LiteralKind::Character => "CharacterLiteral",
                LiteralKind::String => "StringLiteral",
            },
            NodeKind::Type(t) => t.kind.keyword(),
            NodeKind::Attr(a) => a.kind.keyword(),
            NodeKind::Absent => "<<<NULL>>>",
        }
    }
}
