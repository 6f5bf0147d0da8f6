//! End-to-end search tests against a stand-in toolchain.
//!
//! The "compiler" copies the candidate source into the executable slot and
//! the harnesses inspect that text, so the whole loop runs without a real
//! C toolchain while exercising exactly the same process plumbing.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use cmend_ast::{
    number_unit, Block, Expr, FunDef, Global, Instr, Lval, Stmt, StmtKind, TranslationUnit, Type,
};
use cmend_repr::{CodeBank, StatementIndex, Variant, WeightedPath};
use cmend_search::{
    mutate, EngineConfig, FitnessConfig, FitnessEvaluator, MutationWeights, RepairEngine, RunLog,
};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cmend-loop-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// main with an injected fault call followed by two honest statements.
fn faulty_variant() -> Variant {
    let call = |func: &str| {
        Stmt::unlabeled(StmtKind::Instr(vec![Instr::Call {
            dst: None,
            func: func.into(),
            args: vec![],
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
                    call("fault"),
                    Stmt::unlabeled(StmtKind::Instr(vec![Instr::Assign {
                        lhs: Lval::Var("x".into()),
                        rhs: Expr::IntLit(1),
                    }])),
                    Stmt::unlabeled(StmtKind::Return(Some(Expr::IntLit(0)))),
                ],
            },
        })],
    };
    number_unit(&mut unit, 0);
    let bank = Arc::new(CodeBank::single("main.c", unit));
    let index = Arc::new(StatementIndex::build(&bank).unwrap());
    let path = Arc::new(WeightedPath::from_sids(&[0, 1, 2]));
    Variant::new(bank, index, path)
}

/// Toolchain where the good harness passes two tests iff the fault call is
/// gone from the candidate.
fn repair_config(dir: &Path, baseline: &str) -> FitnessConfig {
    let compiler = write_script(
        dir,
        "fake-cc.sh",
        r#"while [ "$1" != "-o" ]; do shift; done
shift
exe="$1"
shift
cat "$@" > "$exe""#,
    );
    let good = write_script(
        dir,
        "good.sh",
        r#"if grep -q 'fault();' "$1"; then
  : > "$2"
else
  printf 'pass\npass\n' > "$2"
fi"#,
    );
    let bad = write_script(dir, "bad.sh", r#": > "$2""#);
    let baseline_path = dir.join("baseline.c");
    std::fs::write(&baseline_path, baseline).unwrap();
    FitnessConfig {
        compiler: compiler.display().to_string(),
        good_cmd: good.display().to_string(),
        bad_cmd: bad.display().to_string(),
        bad_factor: 0.0,
        max_fitness: 2.0,
        work_dir: dir.to_path_buf(),
        baseline: baseline_path,
        ..FitnessConfig::default()
    }
}

#[tokio::test]
async fn finds_deletion_repair() {
    let dir = test_dir("repair");
    let seed = faulty_variant();
    let baseline: String = seed
        .emit_source()
        .unwrap()
        .into_iter()
        .map(|(_, text)| text)
        .collect();

    let evaluator = FitnessEvaluator::new(repair_config(&dir, &baseline), 850);
    let engine = RepairEngine::new(
        EngineConfig {
            population: 10,
            generations: 5,
            weights: MutationWeights {
                mut_chance: 0.5,
                ins: 0.0,
                del: 1.0,
                swap: 0.0,
            },
        },
        evaluator,
    );

    let mut rng = StdRng::seed_from_u64(42);
    let log = RunLog::stderr_only();
    let report = engine.run(&seed, &mut rng, &log).await.unwrap();

    let best = engine.evaluator().best().expect("repair should be found");
    assert!(best.fitness >= 2.0);
    assert!(!best.source.contains("fault();"));
    assert!(report.best.is_some());
    assert!(report.evaluations > 0);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn identical_variants_compile_once() {
    let dir = test_dir("memo");
    let seed = faulty_variant();
    let baseline: String = seed
        .emit_source()
        .unwrap()
        .into_iter()
        .map(|(_, text)| text)
        .collect();
    let evaluator = FitnessEvaluator::new(repair_config(&dir, &baseline), 850);
    let log = RunLog::stderr_only();

    // distinct histories, identical text: a double swap is the identity
    let plain = seed.clone();
    let mut swapped_back = seed.clone();
    swapped_back.swap(0, 2);
    swapped_back.swap(0, 2);

    let first = evaluator.evaluate(&plain, &log).await.unwrap();
    let second = evaluator.evaluate(&swapped_back, &log).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(evaluator.compiles(), 1);
    assert_eq!(evaluator.cache_hits(), 1);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn first_generation_is_reproducible() {
    let seed = faulty_variant();
    let weights = MutationWeights::default().doubled();

    let emit_generation = |seed_value: u64| -> Vec<String> {
        let mut rng = StdRng::seed_from_u64(seed_value);
        (0..10)
            .map(|_| {
                let child = mutate(&seed, &weights, &mut rng);
                child
                    .emit_source()
                    .unwrap()
                    .into_iter()
                    .map(|(_, text)| text)
                    .collect::<String>()
            })
            .collect()
    };

    assert_eq!(emit_generation(42), emit_generation(42));
}
