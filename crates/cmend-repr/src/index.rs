//! The statement index: sid ⇄ statement kind over the original AST.

use std::collections::BTreeMap;

use cmend_ast::{for_each_stmt, Sid, StmtKind};
use serde::{Deserialize, Serialize};

use crate::{CodeBank, ReprError};

/// What the index records per statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// File the statement lives in, when the bank has more than one.
    pub file: Option<String>,
    /// The statement's original kind.
    pub kind: StmtKind,
}

/// Bidirectional map between sids and the original statements.
///
/// Constructed once by walking the code bank in traversal order; the
/// instrumenter guarantees sids are dense from 0, which is what lets the
/// mutation operator draw a replacement uniformly from `[0, count)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementIndex {
    count: u32,
    entries: BTreeMap<Sid, IndexEntry>,
}

impl StatementIndex {
    /// Build the index by walking every file of the bank.
    pub fn build(bank: &CodeBank) -> Result<Self, ReprError> {
        let files = bank.base()?;
        let multi_file = files.len() > 1;
        let mut entries = BTreeMap::new();
        for (name, unit) in files {
            for_each_stmt(unit, &mut |stmt| {
                if let Some(sid) = stmt.sid {
                    entries.insert(
                        sid,
                        IndexEntry {
                            file: multi_file.then(|| name.clone()),
                            kind: stmt.kind.clone(),
                        },
                    );
                }
            });
        }
        Ok(StatementIndex {
            count: entries.len() as u32,
            entries,
        })
    }

    /// Total number of indexed statements.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Look a statement up; absence is fatal at every call site.
    pub fn get_stmt(&self, sid: Sid) -> Result<&IndexEntry, ReprError> {
        self.entries.get(&sid).ok_or(ReprError::UnknownSid(sid))
    }

    pub fn contains(&self, sid: Sid) -> bool {
        self.entries.contains_key(&sid)
    }
}
