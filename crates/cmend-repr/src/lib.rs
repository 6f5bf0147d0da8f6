//! # cmend-repr
//!
//! Patch-based program representation.
//!
//! A candidate repair is never a mutated AST. It is the immutable original
//! (the [`CodeBank`]) plus an ordered [`History`] of edit operations, and it
//! only becomes C source when the pretty-printer streams the original
//! through a [`PatchTransform`] that applies pending edits just-in-time.
//!
//! This keeps every variant O(|history|) in memory, lets any number of
//! variants share one code bank without locks, and makes the history itself
//! the unit of inheritance for the genetic operators.

pub mod bank;
pub mod edit;
pub mod index;
pub mod path;
pub mod transform;
pub mod variant;

pub use bank::CodeBank;
pub use edit::{Atom, Edit, History};
pub use index::{IndexEntry, StatementIndex};
pub use path::{PathStep, WeightedPath};
pub use transform::PatchTransform;
pub use variant::Variant;

use cmend_ast::Sid;
use thiserror::Error;

/// Errors raised by the representation layer.
///
/// These are configuration-grade failures: a sid that is not in the index or
/// an edit kind the patch transform refuses are corrupt inputs, not search
/// noise, and callers abort on them rather than scoring the variant zero.
#[derive(Debug, Error)]
pub enum ReprError {
    #[error("statement {0} is not in the statement index")]
    UnknownSid(Sid),

    #[error("code bank is empty")]
    EmptyCodeBank,

    #[error("unsupported edit ({what}) targeting statement {sid}")]
    UnsupportedEdit { sid: Sid, what: &'static str },
}
