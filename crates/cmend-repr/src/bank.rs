//! The code bank: the original ASTs, frozen for the lifetime of a run.

use std::collections::BTreeMap;

use cmend_ast::TranslationUnit;
use serde::{Deserialize, Serialize};

use crate::ReprError;

/// Mapping from source file name to its parsed AST.
///
/// Built once at startup and shared (behind an `Arc`) by every variant;
/// nothing in the search ever writes to it. A `BTreeMap` keeps file order
/// deterministic so multi-file variants always emit in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBank {
    files: BTreeMap<String, TranslationUnit>,
}

impl CodeBank {
    pub fn new(files: BTreeMap<String, TranslationUnit>) -> Self {
        CodeBank { files }
    }

    /// A bank holding a single file, the common case.
    pub fn single(name: impl Into<String>, unit: TranslationUnit) -> Self {
        let mut files = BTreeMap::new();
        files.insert(name.into(), unit);
        CodeBank { files }
    }

    /// The file map. Fails on an empty bank: an empty original program is a
    /// configuration error, not something the search can recover from.
    pub fn base(&self) -> Result<&BTreeMap<String, TranslationUnit>, ReprError> {
        if self.files.is_empty() {
            return Err(ReprError::EmptyCodeBank);
        }
        Ok(&self.files)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}
