//! Deterministic C pretty-printer with a per-statement rewrite hook.
//!
//! The printer never consults the original tree twice: each statement is
//! handed to the [`Rewrite`] hook first, and the printer then recurses into
//! the *rewritten* statement's children with the hook still installed. A
//! hook that substitutes a block containing the original statement therefore
//! sees that statement again on the way down, which is exactly the revisit
//! discipline the patch transform is built around.
//!
//! Output contract: two-space indentation, one statement per line, labels as
//! `name:` prefixes, nested binary expressions fully parenthesised. The same
//! tree always prints to the same bytes.

use std::fmt::Write;

use crate::ast::{Block, Expr, FunDef, Global, Instr, Lval, Stmt, StmtKind, TranslationUnit, Type};

/// Per-statement rewriter invoked by the printer before rendering.
pub trait Rewrite {
    fn rewrite(&mut self, stmt: Stmt) -> Stmt;
}

/// The no-op rewriter, used for baseline printing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl Rewrite for Identity {
    fn rewrite(&mut self, stmt: Stmt) -> Stmt {
        stmt
    }
}

/// Pretty-print a translation unit, threading every statement through `rw`.
pub fn print_unit<R: Rewrite>(unit: &TranslationUnit, rw: &mut R) -> String {
    let mut p = Printer::new();
    for global in &unit.globals {
        match global {
            Global::Directive(text) => {
                p.out.push_str(text);
                p.out.push('\n');
            }
            Global::Var(decl) => {
                p.write_indent();
                p.write_decl(decl);
                p.out.push('\n');
            }
            Global::Function(fun) => p.print_function(fun, rw),
        }
    }
    p.out
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Printer {
            out: String::new(),
            indent: 0,
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn print_function<R: Rewrite>(&mut self, fun: &FunDef, rw: &mut R) {
        self.out.push_str(&fmt_type(&fun.ret));
        let _ = write!(self.out, " {}(", fun.name);
        if fun.params.is_empty() {
            self.out.push_str("void");
        } else {
            for (i, param) in fun.params.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                let _ = write!(self.out, "{} {}", fmt_type(&param.ty), param.name);
            }
        }
        self.out.push_str(")\n{\n");
        self.indent += 1;
        for local in &fun.locals {
            self.write_indent();
            self.write_decl(local);
            self.out.push('\n');
        }
        for stmt in &fun.body.stmts {
            self.print_stmt(stmt, rw);
        }
        self.indent -= 1;
        self.out.push_str("}\n");
    }

    fn write_decl(&mut self, decl: &crate::ast::VarDecl) {
        let _ = write!(self.out, "{} {}", fmt_type(&decl.ty), decl.name);
        if let Some(init) = &decl.init {
            let _ = write!(self.out, " = {}", fmt_expr(init));
        }
        self.out.push(';');
    }

    /// Rewrite, then render. Recursion goes through `print_stmt` so nested
    /// statements (including ones re-introduced by the rewriter) are offered
    /// to the hook as well.
    fn print_stmt<R: Rewrite>(&mut self, stmt: &Stmt, rw: &mut R) {
        let stmt = rw.rewrite(stmt.clone());
        let prefix = label_prefix(&stmt);
        match &stmt.kind {
            StmtKind::Instr(instrs) => {
                if instrs.is_empty() {
                    self.write_indent();
                    self.out.push_str(&prefix);
                    self.out.push_str(";\n");
                }
                for (i, instr) in instrs.iter().enumerate() {
                    self.write_indent();
                    if i == 0 {
                        self.out.push_str(&prefix);
                    }
                    self.out.push_str(&fmt_instr(instr));
                    self.out.push('\n');
                }
            }
            StmtKind::Block(block) => {
                self.write_indent();
                self.out.push_str(&prefix);
                self.print_block(block, rw);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.write_indent();
                self.out.push_str(&prefix);
                let _ = write!(self.out, "if ({}) ", fmt_expr(cond));
                self.print_block(then_branch, rw);
                if !else_branch.stmts.is_empty() {
                    self.write_indent();
                    self.out.push_str("else ");
                    self.print_block(else_branch, rw);
                }
            }
            StmtKind::While { cond, body } => {
                self.write_indent();
                self.out.push_str(&prefix);
                let _ = write!(self.out, "while ({}) ", fmt_expr(cond));
                self.print_block(body, rw);
            }
            StmtKind::Return(expr) => {
                self.write_indent();
                self.out.push_str(&prefix);
                match expr {
                    Some(e) => {
                        let _ = write!(self.out, "return {};\n", fmt_expr(e));
                    }
                    None => self.out.push_str("return;\n"),
                }
            }
            StmtKind::Break => {
                self.write_indent();
                self.out.push_str(&prefix);
                self.out.push_str("break;\n");
            }
            StmtKind::Continue => {
                self.write_indent();
                self.out.push_str(&prefix);
                self.out.push_str("continue;\n");
            }
            StmtKind::Goto(target) => {
                self.write_indent();
                self.out.push_str(&prefix);
                let _ = write!(self.out, "goto {};\n", target);
            }
        }
    }

    fn print_block<R: Rewrite>(&mut self, block: &Block, rw: &mut R) {
        self.out.push_str("{\n");
        self.indent += 1;
        for stmt in &block.stmts {
            self.print_stmt(stmt, rw);
        }
        self.indent -= 1;
        self.write_indent();
        self.out.push_str("}\n");
    }
}

fn label_prefix(stmt: &Stmt) -> String {
    let mut prefix = String::new();
    for label in &stmt.labels {
        let _ = write!(prefix, "{}: ", label);
    }
    prefix
}

fn fmt_type(ty: &Type) -> String {
    match ty {
        Type::Void => "void".into(),
        Type::Char => "char".into(),
        Type::Int => "int".into(),
        Type::Long => "long".into(),
        Type::Double => "double".into(),
        Type::Ptr(inner) => format!("{} *", fmt_type(inner)),
        Type::Named(name) => name.clone(),
    }
}

fn fmt_instr(instr: &Instr) -> String {
    match instr {
        Instr::Assign { lhs, rhs } => format!("{} = {};", fmt_lval(lhs), fmt_expr(rhs)),
        Instr::Call { dst, func, args } => {
            let args = args.iter().map(fmt_expr).collect::<Vec<_>>().join(", ");
            match dst {
                Some(lval) => format!("{} = {}({});", fmt_lval(lval), func, args),
                None => format!("{}({});", func, args),
            }
        }
    }
}

fn fmt_lval(lval: &Lval) -> String {
    match lval {
        Lval::Var(name) => name.clone(),
        Lval::Deref(inner) => format!("*{}", fmt_lval(inner)),
        Lval::Index { base, index } => format!("{}[{}]", fmt_lval(base), fmt_expr(index)),
        Lval::Field { base, field, arrow } => {
            let sep = if *arrow { "->" } else { "." };
            format!("{}{}{}", fmt_lval(base), sep, field)
        }
    }
}

fn fmt_expr(expr: &Expr) -> String {
    match expr {
        Expr::IntLit(value) => value.to_string(),
        Expr::StrLit(text) => format!("\"{}\"", escape_c(text)),
        Expr::Lval(lval) => fmt_lval(lval),
        Expr::AddrOf(lval) => format!("&{}", fmt_lval(lval)),
        Expr::Unary { op, expr } => format!("{}{}", op.token(), fmt_operand(expr)),
        Expr::Binary { op, lhs, rhs } => {
            format!("{} {} {}", fmt_operand(lhs), op.token(), fmt_operand(rhs))
        }
    }
}

/// Nested binary operands are parenthesised; everything else prints bare.
fn fmt_operand(expr: &Expr) -> String {
    match expr {
        Expr::Binary { .. } => format!("({})", fmt_expr(expr)),
        _ => fmt_expr(expr),
    }
}

fn escape_c(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}
