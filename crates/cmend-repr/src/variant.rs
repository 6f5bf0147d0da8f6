//! The variant: a candidate repair as (shared originals, owned history).

use std::sync::Arc;

use cmend_ast::{print_unit, Sid, Stmt, StmtKind};

use crate::{Atom, CodeBank, Edit, History, PatchTransform, ReprError, StatementIndex, WeightedPath};

/// One candidate repair.
///
/// The code bank, statement index, and weighted path are shared immutably
/// between every variant of a run; only the history is owned. Cloning a
/// variant is three `Arc` bumps plus one `Vec` copy, which is what makes a
/// 4N-per-generation population affordable.
#[derive(Debug, Clone)]
pub struct Variant {
    bank: Arc<CodeBank>,
    index: Arc<StatementIndex>,
    path: Arc<WeightedPath>,
    history: History,
    debug_labels: bool,
}

impl Variant {
    pub fn new(bank: Arc<CodeBank>, index: Arc<StatementIndex>, path: Arc<WeightedPath>) -> Self {
        Variant {
            bank,
            index,
            path,
            history: Vec::new(),
            debug_labels: false,
        }
    }

    /// Label fired edits in the emitted source. Diagnostics only; labelled
    /// output has a different digest, so leave this off during search.
    pub fn with_debug_labels(mut self, on: bool) -> Self {
        self.debug_labels = on;
        self
    }

    pub fn bank(&self) -> &Arc<CodeBank> {
        &self.bank
    }

    pub fn index(&self) -> &Arc<StatementIndex> {
        &self.index
    }

    pub fn path(&self) -> &Arc<WeightedPath> {
        &self.path
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Replace the history wholesale (crossover, deserialisation).
    pub fn set_history(&mut self, history: History) {
        self.history = history;
    }

    pub fn delete(&mut self, sid: Sid) {
        self.history.push(Edit::Delete(sid));
    }

    pub fn append(&mut self, target: Sid, source: Sid) {
        self.history.push(Edit::Append { target, source });
    }

    pub fn swap(&mut self, a: Sid, b: Sid) {
        self.history.push(Edit::Swap(a, b));
    }

    pub fn put(&mut self, sid: Sid, kind: StmtKind) {
        self.history.push(Edit::Put {
            target: sid,
            atom: Atom::Stmt(kind),
        });
    }

    /// Record a sub-statement replacement. The core transform cannot print
    /// it; the edit is rejected as soon as this variant is rendered.
    pub fn replace_subatom(&mut self, sid: Sid, subatom: u32, atom: Atom) {
        self.history.push(Edit::ReplaceSubatom {
            target: sid,
            subatom,
            atom,
        });
    }

    /// The statement kind visible at `sid` after the history is applied.
    pub fn get(&self, sid: Sid) -> Result<StmtKind, ReprError> {
        let entry = self.index.get_stmt(sid)?;
        let mut xform = PatchTransform::new(&self.history, &self.index, false)?;
        let stmt = Stmt::with_sid(sid, entry.kind.clone());
        Ok(xform.apply(stmt).kind)
    }

    /// Render every file of the code bank with this variant's edits applied.
    ///
    /// One transform serves all files, so an edit fires exactly once per
    /// print no matter which file its target lives in.
    pub fn emit_source(&self) -> Result<Vec<(Option<String>, String)>, ReprError> {
        let files = self.bank.base()?;
        let mut xform = PatchTransform::new(&self.history, &self.index, self.debug_labels)?;
        let multi_file = files.len() > 1;
        let mut out = Vec::with_capacity(files.len());
        for (name, unit) in files {
            let text = print_unit(unit, &mut xform);
            out.push((multi_file.then(|| name.clone()), text));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmend_ast::{
        number_unit, print_unit, Block, Expr, FunDef, Global, Identity, Instr,
        TranslationUnit, Type,
    };

    fn gcd_like_bank() -> (Arc<CodeBank>, Arc<StatementIndex>, Arc<WeightedPath>) {
        let call = |func: &str, arg: i64| {
            Stmt::unlabeled(StmtKind::Instr(vec![Instr::Call {
                dst: None,
                func: func.into(),
                args: vec![Expr::IntLit(arg)],
            }]))
        };
        let mut unit = TranslationUnit {
            globals: vec![Global::Function(FunDef {
                ret: Type::Int,
                name: "main".into(),
                params: Vec::new(),
                locals: Vec::new(),
                body: Block {
                    stmts: vec![
                        call("step", 1),
                        call("step", 2),
                        Stmt::unlabeled(StmtKind::Return(Some(Expr::IntLit(0)))),
                    ],
                },
            })],
        };
        number_unit(&mut unit, 0);
        let bank = Arc::new(CodeBank::single("main.c", unit));
        let index = Arc::new(StatementIndex::build(&bank).unwrap());
        let path = Arc::new(WeightedPath::from_sids(&[0, 1, 2]));
        (bank, index, path)
    }

    fn baseline(bank: &CodeBank) -> String {
        let unit = bank.base().unwrap().values().next().unwrap();
        print_unit(unit, &mut Identity)
    }

    #[test]
    fn empty_history_matches_baseline() {
        let (bank, index, path) = gcd_like_bank();
        let variant = Variant::new(bank.clone(), index, path);
        let emitted = variant.emit_source().unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].0, None);
        assert_eq!(emitted[0].1, baseline(&bank));
    }

    #[test]
    fn delete_replaces_statement_with_empty_block() {
        let (bank, index, path) = gcd_like_bank();
        let base = baseline(&bank);
        let mut variant = Variant::new(bank, index, path);
        variant.delete(1);
        let text = variant.emit_source().unwrap().remove(0).1;
        assert!(!text.contains("step(2);"));
        assert!(text.contains("step(1);"));
        // nothing else moved
        assert_eq!(
            text.matches("return 0;").count(),
            base.matches("return 0;").count()
        );
    }

    #[test]
    fn code_bank_untouched_by_edits() {
        let (bank, index, path) = gcd_like_bank();
        let before = serde_json::to_string(bank.as_ref()).unwrap();

        let mut a = Variant::new(bank.clone(), index.clone(), path.clone());
        a.delete(0);
        a.swap(1, 2);
        let mut b = a.clone();
        b.append(2, 0);
        a.emit_source().unwrap();
        b.emit_source().unwrap();

        let after = serde_json::to_string(bank.as_ref()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn identical_histories_emit_identical_source() {
        let (bank, index, path) = gcd_like_bank();
        let mut a = Variant::new(bank.clone(), index.clone(), path.clone());
        a.swap(0, 2);
        a.delete(1);
        let mut b = Variant::new(bank, index, path);
        b.set_history(a.history().clone());
        assert_eq!(a.emit_source().unwrap(), b.emit_source().unwrap());
    }

    #[test]
    fn get_reflects_applied_edits() {
        let (bank, index, path) = gcd_like_bank();
        let mut variant = Variant::new(bank, index, path);
        variant.delete(0);
        assert_eq!(variant.get(0).unwrap(), StmtKind::empty_block());
        // untouched statements come back as their original kinds
        assert!(matches!(variant.get(2).unwrap(), StmtKind::Return(_)));
    }

    #[test]
    fn exp_atom_put_is_fatal_and_names_sid() {
        let (bank, index, path) = gcd_like_bank();
        let mut variant = Variant::new(bank, index, path);
        variant.history.push(Edit::Put {
            target: 1,
            atom: Atom::Exp(Expr::IntLit(5)),
        });
        let err = variant.emit_source().unwrap_err();
        assert!(err.to_string().contains('1'));
    }

    #[test]
    fn replace_subatom_is_fatal_once_printed() {
        let (bank, index, path) = gcd_like_bank();
        let mut variant = Variant::new(bank, index, path);
        variant.replace_subatom(2, 0, Atom::Exp(Expr::IntLit(1)));
        assert!(variant.emit_source().is_err());
        assert!(variant.get(2).is_err());
    }
}
