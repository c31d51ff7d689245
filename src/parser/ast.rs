// AST (Abstract Syntax Tree) definitions for the JavaScript subset

use std::rc::Rc;

/// Source location information for error reporting and line tracking.
///
/// `offset` is the character offset of the node's first token and doubles as
/// the node's identity for the source map and the loop-iteration guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

/// Declaration keyword of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

impl DeclKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DeclKind::Var => "var",
            DeclKind::Let => "let",
            DeclKind::Const => "const",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    // Equality
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    // Relational
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::LooseEq => "==",
            BinaryOp::LooseNe => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// Short-circuiting operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// Prefix unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,    // -x
    Plus,   // +x
    Not,    // !x
    Typeof, // typeof x
    Void,   // void x
}

/// `++` / `--`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

/// Assignment operators; `Assign` is plain `=`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl AssignOp {
    /// The arithmetic operator a compound assignment applies, if any.
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
        }
    }
}

/// Function parameter with an optional default value
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub location: SourceLocation,
}

/// Body of a function: a statement block, or a bare expression for arrows
#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Rc<[Stmt]>),
    Expression(Box<Expr>),
}

/// A function declaration, expression, arrow, or object method.
///
/// Shared read-only between the AST and every closure created from it.
#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    pub is_async: bool,
    pub is_arrow: bool,
    pub is_generator: bool,
    pub location: SourceLocation,
}

/// One `name = init` pair of a variable declaration
#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    pub location: SourceLocation,
}

/// `catch (param) { body }`
#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Option<String>,
    pub body: Rc<[Stmt]>,
    pub location: SourceLocation,
}

/// `case test:` or `default:` with its statements
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// Initializer slot of a classic `for` loop
#[derive(Debug, Clone)]
pub enum ForInit {
    VarDecl {
        kind: DeclKind,
        declarations: Vec<Declarator>,
    },
    Expression(Expr),
}

/// Left-hand side of `for...of` / `for...in`
#[derive(Debug, Clone)]
pub struct ForBinding {
    pub kind: Option<DeclKind>,
    pub name: String,
}

/// Which flavour of `for` iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationKind {
    Of,
    In,
}

/// Object literal property
#[derive(Debug, Clone)]
pub struct Property {
    pub key: String,
    pub value: Expr,
}

/// Property part of a member expression
#[derive(Debug, Clone)]
pub enum MemberProperty {
    Named(String),
    Computed(Box<Expr>),
}

/// Statements
#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl {
        kind: DeclKind,
        declarations: Vec<Declarator>,
        location: SourceLocation,
    },
    FunctionDecl {
        function: Rc<FunctionNode>,
        location: SourceLocation,
    },
    Expression {
        expr: Expr,
        location: SourceLocation,
    },
    Block {
        body: Rc<[Stmt]>,
        location: SourceLocation,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        location: SourceLocation,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
        location: SourceLocation,
    },
    For {
        init: Option<ForInit>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    ForEach {
        iteration: IterationKind,
        binding: ForBinding,
        iterable: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
        location: SourceLocation,
    },
    Return {
        argument: Option<Expr>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    Throw {
        argument: Expr,
        location: SourceLocation,
    },
    Try {
        block: Rc<[Stmt]>,
        handler: Option<CatchClause>,
        finalizer: Option<Rc<[Stmt]>>,
        location: SourceLocation,
    },
    Empty {
        location: SourceLocation,
    },

    // Recognised only so they can be reported; never executed
    Class {
        name: Option<String>,
        location: SourceLocation,
    },
    Import {
        location: SourceLocation,
    },
    Export {
        declaration: Option<Box<Stmt>>,
        location: SourceLocation,
    },
    With {
        object: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
}

impl Stmt {
    /// Get the source location of this statement
    pub fn location(&self) -> SourceLocation {
        match self {
            Stmt::VarDecl { location, .. }
            | Stmt::FunctionDecl { location, .. }
            | Stmt::Expression { location, .. }
            | Stmt::Block { location, .. }
            | Stmt::If { location, .. }
            | Stmt::While { location, .. }
            | Stmt::DoWhile { location, .. }
            | Stmt::For { location, .. }
            | Stmt::ForEach { location, .. }
            | Stmt::Switch { location, .. }
            | Stmt::Return { location, .. }
            | Stmt::Break { location }
            | Stmt::Continue { location }
            | Stmt::Throw { location, .. }
            | Stmt::Try { location, .. }
            | Stmt::Empty { location }
            | Stmt::Class { location, .. }
            | Stmt::Import { location }
            | Stmt::Export { location, .. }
            | Stmt::With { location, .. } => *location,
        }
    }
}

/// Expressions
#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64, SourceLocation),
    String(String, SourceLocation),
    Template {
        quasis: Vec<String>,
        expressions: Vec<Expr>,
        location: SourceLocation,
    },
    Boolean(bool, SourceLocation),
    Null(SourceLocation),
    Undefined(SourceLocation),
    Identifier(String, SourceLocation),
    This(SourceLocation),
    Array {
        elements: Vec<Expr>,
        location: SourceLocation,
    },
    Object {
        properties: Vec<Property>,
        location: SourceLocation,
    },
    Function(Rc<FunctionNode>),
    Unary {
        op: UnaryOp,
        argument: Box<Expr>,
        location: SourceLocation,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
        location: SourceLocation,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
        location: SourceLocation,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
        location: SourceLocation,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        location: SourceLocation,
    },
    New {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        location: SourceLocation,
    },
    Member {
        object: Box<Expr>,
        property: MemberProperty,
        location: SourceLocation,
    },
    Await {
        argument: Box<Expr>,
        location: SourceLocation,
    },

    // Recognised only so they can be reported; never evaluated
    Yield {
        argument: Option<Box<Expr>>,
        location: SourceLocation,
    },
    MetaProperty {
        meta: String,
        property: String,
        location: SourceLocation,
    },
    Class {
        name: Option<String>,
        location: SourceLocation,
    },
}

impl Expr {
    /// Get the source location of this expression
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::Number(_, loc)
            | Expr::String(_, loc)
            | Expr::Boolean(_, loc)
            | Expr::Null(loc)
            | Expr::Undefined(loc)
            | Expr::Identifier(_, loc)
            | Expr::This(loc) => *loc,
            Expr::Function(function) => function.location,
            Expr::Template { location, .. }
            | Expr::Array { location, .. }
            | Expr::Object { location, .. }
            | Expr::Unary { location, .. }
            | Expr::Update { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Logical { location, .. }
            | Expr::Assign { location, .. }
            | Expr::Conditional { location, .. }
            | Expr::Call { location, .. }
            | Expr::New { location, .. }
            | Expr::Member { location, .. }
            | Expr::Await { location, .. }
            | Expr::Yield { location, .. }
            | Expr::MetaProperty { location, .. }
            | Expr::Class { location, .. } => *location,
        }
    }

    /// Short source-like rendering used in step descriptions (`obj.count`, `x`).
    pub fn describe(&self) -> String {
        match self {
            Expr::Identifier(name, _) => name.clone(),
            Expr::This(_) => "this".to_string(),
            Expr::Member {
                object, property, ..
            } => match property {
                MemberProperty::Named(name) => format!("{}.{}", object.describe(), name),
                MemberProperty::Computed(index) => {
                    format!("{}[{}]", object.describe(), index.describe())
                }
            },
            Expr::Number(n, _) => crate::interpreter::format::format_number(*n),
            Expr::String(s, _) => format!("\"{}\"", s),
            Expr::Call { callee, .. } => format!("{}()", callee.describe()),
            _ => "<expression>".to_string(),
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Rc<[Stmt]>,
}

impl Program {
    pub fn new(body: Vec<Stmt>) -> Self {
        Program { body: body.into() }
    }
}
