//! # cmend-ast
//!
//! C abstract syntax for the repair engine.
//!
//! This crate provides:
//! - The statement-oriented AST (`TranslationUnit`, `Stmt`, `StmtKind`, ...)
//! - A deterministic pretty-printer with a per-statement rewrite hook
//! - Structural visitors: traversal, sid numbering, and copy detachment
//!
//! The AST arrives pre-parsed and pre-numbered: an external instrumenter
//! serialises it (serde) together with the fault-localisation path. Parsing
//! C text is out of scope here; printing it back is not.
//!
//! ## Statement identity
//!
//! Every statement carries `sid: Option<Sid>`. The instrumenter assigns
//! dense sids in traversal order; statements materialised during printing
//! (appended or swapped-in copies) carry `None` so a patch transform never
//! re-targets them.

pub mod ast;
pub mod printer;
pub mod visit;

pub use ast::{
    BinOp, Block, Expr, FunDef, Global, Instr, Lval, Param, Sid, Stmt, StmtKind, TranslationUnit,
    Type, UnOp, VarDecl,
};
pub use printer::{print_unit, Identity, Rewrite};
pub use visit::{detach_stmt, for_each_stmt, number_unit};
