//! Structural visitors: traversal, sid numbering, copy detachment.

use crate::ast::{Block, Global, Sid, Stmt, StmtKind, TranslationUnit};

/// Visit every statement of a unit in traversal (pre-)order.
pub fn for_each_stmt<'a, F>(unit: &'a TranslationUnit, f: &mut F)
where
    F: FnMut(&'a Stmt),
{
    for global in &unit.globals {
        if let Global::Function(fun) = global {
            walk_block(&fun.body, f);
        }
    }
}

fn walk_block<'a, F>(block: &'a Block, f: &mut F)
where
    F: FnMut(&'a Stmt),
{
    for stmt in &block.stmts {
        f(stmt);
        match &stmt.kind {
            StmtKind::Block(inner) => walk_block(inner, f),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                walk_block(then_branch, f);
                walk_block(else_branch, f);
            }
            StmtKind::While { body, .. } => walk_block(body, f),
            StmtKind::Instr(_)
            | StmtKind::Return(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Goto(_) => {}
        }
    }
}

/// Assign dense sids in traversal order starting at `next`.
///
/// Returns the next unassigned sid, so multi-file banks can be numbered with
/// consecutive ranges. Used by tests and by the offline instrumenter tooling
/// that produces the serialised inputs.
pub fn number_unit(unit: &mut TranslationUnit, mut next: Sid) -> Sid {
    for global in &mut unit.globals {
        if let Global::Function(fun) = global {
            next = number_block(&mut fun.body, next);
        }
    }
    next
}

fn number_block(block: &mut Block, mut next: Sid) -> Sid {
    for stmt in &mut block.stmts {
        stmt.sid = Some(next);
        next += 1;
        match &mut stmt.kind {
            StmtKind::Block(inner) => next = number_block(inner, next),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                next = number_block(then_branch, next);
                next = number_block(else_branch, next);
            }
            StmtKind::While { body, .. } => next = number_block(body, next),
            StmtKind::Instr(_)
            | StmtKind::Return(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Goto(_) => {}
        }
    }
    next
}

/// Strip identity from a copied fragment.
///
/// Clears the sid of `stmt` and every statement nested inside it, so a copy
/// inserted by an edit is never matched by a later transform pass. Labels
/// are left in place; they are surface syntax, not identity.
pub fn detach_stmt(stmt: &mut Stmt) {
    stmt.sid = None;
    match &mut stmt.kind {
        StmtKind::Block(inner) => detach_block(inner),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            detach_block(then_branch);
            detach_block(else_branch);
        }
        StmtKind::While { body, .. } => detach_block(body),
        StmtKind::Instr(_)
        | StmtKind::Return(_)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Goto(_) => {}
    }
}

fn detach_block(block: &mut Block) {
    for stmt in &mut block.stmts {
        detach_stmt(stmt);
    }
}
