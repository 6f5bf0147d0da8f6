//! AST node types.
//!
//! The shapes follow the statement-normalised form the instrumenter emits:
//! loops are lowered to `while`, calls live in instruction lists rather than
//! expressions, and every statement is a `Stmt` wrapper around a `StmtKind`.

use serde::{Deserialize, Serialize};

/// Statement identifier assigned by the instrumenter, dense from 0.
pub type Sid = u32;

/// A parsed C source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub globals: Vec<Global>,
}

/// Top-level item in a translation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Global {
    /// Preprocessor or pragma line carried through verbatim.
    Directive(String),
    /// File-scope variable.
    Var(VarDecl),
    /// Function definition.
    Function(FunDef),
}

/// A variable declaration, file-scope or local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub ty: Type,
    pub name: String,
    pub init: Option<Expr>,
}

/// A function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunDef {
    pub ret: Type,
    pub name: String,
    pub params: Vec<Param>,
    pub locals: Vec<VarDecl>,
    pub body: Block,
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub ty: Type,
    pub name: String,
}

/// C types, kept to what instrumented subject programs use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Void,
    Char,
    Int,
    Long,
    Double,
    /// Pointer to another type.
    Ptr(Box<Type>),
    /// A typedef or struct name used opaquely.
    Named(String),
}

/// A brace-delimited statement sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    /// The empty block, used as the target of `Delete` edits.
    pub fn empty() -> Self {
        Block { stmts: Vec::new() }
    }
}

/// A statement: identity, labels, and syntactic payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// `None` for statements materialised after indexing (inserted copies).
    pub sid: Option<Sid>,
    pub labels: Vec<String>,
    pub kind: StmtKind,
}

impl Stmt {
    /// Wrap a kind with no identity and no labels.
    pub fn unlabeled(kind: StmtKind) -> Self {
        Stmt {
            sid: None,
            labels: Vec::new(),
            kind,
        }
    }

    /// Wrap a kind with an indexed identity.
    pub fn with_sid(sid: Sid, kind: StmtKind) -> Self {
        Stmt {
            sid: Some(sid),
            labels: Vec::new(),
            kind,
        }
    }
}

/// The statement forms the transform and printer understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// Straight-line instruction list.
    Instr(Vec<Instr>),
    /// Nested block.
    Block(Block),
    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Block,
    },
    While {
        cond: Expr,
        body: Block,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Goto(String),
}

impl StmtKind {
    /// An empty-block kind, the result of deleting a statement.
    pub fn empty_block() -> Self {
        StmtKind::Block(Block::empty())
    }
}

/// Side-effecting instructions (calls never appear inside expressions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    Assign {
        lhs: Lval,
        rhs: Expr,
    },
    Call {
        /// Destination of the return value, if any.
        dst: Option<Lval>,
        func: String,
        args: Vec<Expr>,
    },
}

/// Assignable locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lval {
    Var(String),
    Deref(Box<Lval>),
    Index {
        base: Box<Lval>,
        index: Box<Expr>,
    },
    Field {
        base: Box<Lval>,
        field: String,
        /// `->` rather than `.`
        arrow: bool,
    },
}

/// Pure expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    IntLit(i64),
    StrLit(String),
    Lval(Lval),
    AddrOf(Lval),
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl UnOp {
    pub fn token(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
            UnOp::BitNot => "~",
        }
    }
}

impl BinOp {
    pub fn token(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}
