//! The patch transform: a just-in-time rewriter compiled from a history.
//!
//! Printing a variant does not materialise a mutated AST. Instead the
//! pretty-printer streams the original tree through a [`PatchTransform`],
//! which folds the pending edits into each statement as it passes by:
//!
//! 1. Pre-compute the set of sids any edit targets; statements outside it
//!    pass through untouched, which is the common case.
//! 2. Keep a remaining-edit list. An edit that has fired is taken off the
//!    list, so a later re-visit of the same sid (an appended block contains
//!    the original statement, and the printer recurses into it) cannot fire
//!    it twice. A swap is consumed per side: firing at one end must not
//!    starve the other.
//! 3. For a targeted statement, fold over the remaining edits in history
//!    order, threading the statement as accumulator. Later edits observe
//!    what earlier edits left behind.
//!
//! Kinds imported from elsewhere (swap, append, put operands) are resolved
//! against the statement index at construction time and detached, so they
//! carry no sids for the transform to re-target.

use std::collections::HashSet;

use cmend_ast::{detach_stmt, Block, Rewrite, Sid, Stmt, StmtKind};

use crate::{Atom, Edit, History, ReprError, StatementIndex};

/// An edit waiting to fire, with operands already resolved.
#[derive(Debug, Clone)]
enum Pending {
    Delete {
        target: Sid,
    },
    Append {
        target: Sid,
        copy: Stmt,
    },
    Swap {
        a: Sid,
        b: Sid,
        /// b's original kind, placed at a.
        kind_for_a: StmtKind,
        /// a's original kind, placed at b.
        kind_for_b: StmtKind,
        a_done: bool,
        b_done: bool,
    },
    Put {
        target: Sid,
        kind: StmtKind,
    },
}

/// Per-statement rewriter applied during pretty-printing.
///
/// Operands are resolved against the statement index up front, so the
/// transform owns everything it needs and can outlive the index borrow.
#[derive(Debug)]
pub struct PatchTransform {
    targets: HashSet<Sid>,
    remaining: Vec<Pending>,
    /// Attach `del`/`put`/`swap1`/`swap2`/`app` labels when an edit fires.
    /// Cosmetic, and off by default so labels never perturb emitted source.
    debug_labels: bool,
}

impl PatchTransform {
    /// Compile a history into a transform.
    ///
    /// Rejects the reserved edit kinds (`ReplaceSubatom`, `Crossover`, and
    /// `Put` of an expression atom) and any sid the index does not know;
    /// both are configuration errors, raised before any printing happens.
    pub fn new(
        history: &History,
        index: &StatementIndex,
        debug_labels: bool,
    ) -> Result<Self, ReprError> {
        let mut targets = HashSet::new();
        let mut remaining = Vec::with_capacity(history.len());

        for edit in history {
            match edit {
                Edit::Delete(sid) => {
                    index.get_stmt(*sid)?;
                    targets.insert(*sid);
                    remaining.push(Pending::Delete { target: *sid });
                }
                Edit::Append { target, source } => {
                    index.get_stmt(*target)?;
                    let mut copy = Stmt::unlabeled(index.get_stmt(*source)?.kind.clone());
                    detach_stmt(&mut copy);
                    targets.insert(*target);
                    remaining.push(Pending::Append {
                        target: *target,
                        copy,
                    });
                }
                Edit::Swap(a, b) => {
                    let mut kind_for_b = Stmt::unlabeled(index.get_stmt(*a)?.kind.clone());
                    let mut kind_for_a = Stmt::unlabeled(index.get_stmt(*b)?.kind.clone());
                    detach_stmt(&mut kind_for_a);
                    detach_stmt(&mut kind_for_b);
                    targets.insert(*a);
                    targets.insert(*b);
                    remaining.push(Pending::Swap {
                        a: *a,
                        b: *b,
                        kind_for_a: kind_for_a.kind,
                        kind_for_b: kind_for_b.kind,
                        a_done: false,
                        b_done: false,
                    });
                }
                Edit::Put { target, atom } => {
                    index.get_stmt(*target)?;
                    match atom {
                        Atom::Stmt(kind) => {
                            let mut copy = Stmt::unlabeled(kind.clone());
                            detach_stmt(&mut copy);
                            targets.insert(*target);
                            remaining.push(Pending::Put {
                                target: *target,
                                kind: copy.kind,
                            });
                        }
                        Atom::Exp(_) => {
                            return Err(ReprError::UnsupportedEdit {
                                sid: *target,
                                what: "put of an expression atom",
                            })
                        }
                    }
                }
                Edit::ReplaceSubatom { target, .. } => {
                    return Err(ReprError::UnsupportedEdit {
                        sid: *target,
                        what: "replace_subatom",
                    })
                }
                Edit::Crossover(a, _) => {
                    return Err(ReprError::UnsupportedEdit {
                        sid: *a,
                        what: "crossover edit",
                    })
                }
            }
        }

        Ok(PatchTransform {
            targets,
            remaining,
            debug_labels,
        })
    }

    /// Fold the remaining edits into one statement.
    pub fn apply(&mut self, stmt: Stmt) -> Stmt {
        let sid = match stmt.sid {
            Some(sid) if self.targets.contains(&sid) => sid,
            _ => return stmt,
        };

        let mut acc = stmt;
        let mut i = 0;
        while i < self.remaining.len() {
            let mut consumed = false;
            match &mut self.remaining[i] {
                Pending::Delete { target } if *target == sid => {
                    acc.kind = StmtKind::empty_block();
                    if self.debug_labels {
                        acc.labels.push(format!("del{sid}"));
                    }
                    consumed = true;
                }
                Pending::Put { target, kind } if *target == sid => {
                    acc.kind = kind.clone();
                    if self.debug_labels {
                        acc.labels.push(format!("put{sid}"));
                    }
                    consumed = true;
                }
                Pending::Swap {
                    a,
                    b,
                    kind_for_a,
                    kind_for_b,
                    a_done,
                    b_done,
                } => {
                    if *a == sid && !*a_done {
                        acc.kind = kind_for_a.clone();
                        *a_done = true;
                        if self.debug_labels {
                            acc.labels.push(format!("swap1_{sid}"));
                        }
                    } else if *b == sid && !*b_done {
                        acc.kind = kind_for_b.clone();
                        *b_done = true;
                        if self.debug_labels {
                            acc.labels.push(format!("swap2_{sid}"));
                        }
                    }
                    consumed = *a_done && *b_done;
                }
                Pending::Append { target, copy } if *target == sid => {
                    let original = Stmt {
                        sid: acc.sid,
                        labels: std::mem::take(&mut acc.labels),
                        kind: std::mem::replace(&mut acc.kind, StmtKind::empty_block()),
                    };
                    acc.kind = StmtKind::Block(Block {
                        stmts: vec![original, copy.clone()],
                    });
                    if self.debug_labels {
                        acc.labels.push(format!("app{sid}"));
                    }
                    consumed = true;
                }
                _ => {}
            }
            if consumed {
                self.remaining.remove(i);
            } else {
                i += 1;
            }
        }
        acc
    }
}

impl Rewrite for PatchTransform {
    fn rewrite(&mut self, stmt: Stmt) -> Stmt {
        self.apply(stmt)
    }
}
