//! Edit operations and histories.

use cmend_ast::{Expr, Sid, StmtKind};
use serde::{Deserialize, Serialize};

/// Operand of an edit.
///
/// The core edit operators only ever carry `Stmt`; `Exp` exists for the
/// sub-statement representation and is rejected by the patch transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Atom {
    Stmt(StmtKind),
    Exp(Expr),
}

/// One atomic mutation of the original program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Edit {
    /// Replace the statement with an empty block.
    Delete(Sid),
    /// Replace the target with a block holding it plus a copy of the source.
    Append { target: Sid, source: Sid },
    /// Each of the two statements takes a copy of the other's original kind.
    Swap(Sid, Sid),
    /// Replace the statement's kind outright.
    Put { target: Sid, atom: Atom },
    /// Reserved for sub-statement representations; fatal when printed.
    ReplaceSubatom {
        target: Sid,
        subatom: u32,
        atom: Atom,
    },
    /// Reserved; crossover is realised at the history level instead.
    Crossover(Sid, Sid),
}

impl Edit {
    /// Sids this edit targets (both sides for a swap). Source sids of an
    /// append are operands, not targets.
    pub fn targets(&self) -> (Sid, Option<Sid>) {
        match self {
            Edit::Delete(sid) => (*sid, None),
            Edit::Append { target, .. } => (*target, None),
            Edit::Swap(a, b) => (*a, Some(*b)),
            Edit::Put { target, .. } => (*target, None),
            Edit::ReplaceSubatom { target, .. } => (*target, None),
            Edit::Crossover(a, b) => (*a, Some(*b)),
        }
    }
}

/// Ordered edit list owned by one variant. Earlier edits apply first; later
/// edits observe their effect when they share a target.
pub type History = Vec<Edit>;
