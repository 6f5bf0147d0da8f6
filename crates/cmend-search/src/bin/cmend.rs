//! cmend — search-based repair of C programs.
//!
//! Takes an instrumented program (serialised AST, statement index, weighted
//! execution path) and searches for a minimal patch that passes both the
//! positive and the negative test harness.
//!
//! # Usage
//!
//! ```bash
//! cmend gcd --good ./test-good.sh --bad ./test-bad.sh --gen 10 --pop 40
//! ```
//!
//! Reads `gcd.ast`, `gcd.ht`, `gcd.path`, `gcd.goodpath`; writes
//! `gcd-baseline.c`, `gcd-best.c`, `gcd-report.json`, and a `gcd.debug`
//! transcript.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cmend_ast::Sid;
use cmend_repr::{CodeBank, StatementIndex, Variant, WeightedPath};
use cmend_search::{
    EngineConfig, FitnessConfig, FitnessEvaluator, MutationWeights, RepairEngine, RunLog,
};

/// Genetic repair of a C program against good/bad test harnesses.
#[derive(Parser, Debug)]
#[command(name = "cmend")]
#[command(about = "Search for a patch that passes the positive and negative test harnesses")]
struct Cli {
    /// Input stem: reads <stem>.ast, <stem>.ht, <stem>.path, <stem>.goodpath.
    stem: PathBuf,

    /// RNG seed; random (and logged) when absent.
    #[arg(long)]
    seed: Option<u64>,

    /// Compiler command.
    #[arg(long, default_value = "gcc")]
    gcc: String,

    /// Extra linker flags.
    #[arg(long, default_value = "")]
    ldflags: String,

    /// Positive harness command.
    #[arg(long, default_value = "./test-good.sh")]
    good: String,

    /// Negative harness command.
    #[arg(long, default_value = "./test-bad.sh")]
    bad: String,

    /// Number of generations.
    #[arg(long = "gen", default_value_t = 10)]
    generations: u32,

    /// Population size.
    #[arg(long = "pop", default_value_t = 40)]
    population: usize,

    /// Fitness at which a candidate counts as a repair.
    #[arg(long = "max", default_value_t = 15.0)]
    max_fitness: f64,

    /// Baseline per-step mutation chance.
    #[arg(long = "mut", default_value_t = 0.2)]
    mutation: f64,

    /// Relative weight of append mutations.
    #[arg(long = "ins", default_value_t = 1.0)]
    ins: f64,

    /// Relative weight of delete mutations.
    #[arg(long = "del", default_value_t = 1.0)]
    del: f64,

    /// Relative weight of swap mutations.
    #[arg(long = "swap", default_value_t = 1.0)]
    swap: f64,

    /// Weight of a bad-harness log line relative to a good one.
    #[arg(long = "bad_factor", default_value_t = 10.0)]
    bad_factor: f64,

    /// Mutation weight for statements also on the successful path.
    #[arg(long = "good_path_factor", default_value_t = 0.0)]
    good_path_factor: f64,

    /// Per-child-process timeout in seconds.
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Label fired edits in emitted source (del/put/swap1/swap2/app).
    #[arg(long)]
    label: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("cmend: {err}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let stem = |suffix: &str| PathBuf::from(format!("{}{suffix}", cli.stem.display()));

    let log = RunLog::tee(stem(".debug"))
        .map_err(|err| format!("cannot open {}: {err}", stem(".debug").display()))?;

    let seed = cli.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let mut rng = StdRng::seed_from_u64(seed);
    log.line(format!("seed {seed}"));

    // -- inputs ------------------------------------------------------------

    let ast_path = stem(".ast");
    let bank_text = std::fs::read_to_string(&ast_path)
        .map_err(|err| format!("cannot read {}: {err}", ast_path.display()))?;
    let bank: CodeBank = serde_json::from_str(&bank_text)
        .map_err(|err| format!("cannot parse {}: {err}", ast_path.display()))?;
    let bank = Arc::new(bank);

    let ht_path = stem(".ht");
    let index = if ht_path.exists() {
        let text = std::fs::read_to_string(&ht_path)
            .map_err(|err| format!("cannot read {}: {err}", ht_path.display()))?;
        serde_json::from_str(&text)
            .map_err(|err| format!("cannot parse {}: {err}", ht_path.display()))?
    } else {
        log.line(format!(
            "{} not found; rebuilding statement index from the AST",
            ht_path.display()
        ));
        StatementIndex::build(&bank)?
    };
    let index = Arc::new(index);
    log.line(format!("{} statements indexed", index.count()));

    let path_path = stem(".path");
    let path_sids = read_sid_lines(&path_path)
        .map_err(|err| format!("cannot read {}: {err}", path_path.display()))?;
    let good_sids: HashSet<Sid> = match read_sid_lines(&stem(".goodpath")) {
        Ok(sids) => sids.into_iter().collect(),
        Err(_) => HashSet::new(),
    };
    let path = Arc::new(WeightedPath::with_good_path(
        &path_sids,
        &good_sids,
        cli.good_path_factor,
    ));
    log.line(format!(
        "path: {} steps ({} on the good path)",
        path.len(),
        good_sids.len()
    ));

    // -- baseline ----------------------------------------------------------

    let seed_variant = Variant::new(bank, index, path).with_debug_labels(cli.label);
    let baseline_path = stem("-baseline.c");
    let baseline_text: String = seed_variant
        .emit_source()?
        .into_iter()
        .map(|(_, text)| text)
        .collect();
    std::fs::write(&baseline_path, &baseline_text)
        .map_err(|err| format!("cannot write {}: {err}", baseline_path.display()))?;

    // -- search ------------------------------------------------------------

    let fitness_config = FitnessConfig {
        compiler: cli.gcc.clone(),
        ldflags: cli.ldflags.clone(),
        good_cmd: cli.good.clone(),
        bad_cmd: cli.bad.clone(),
        bad_factor: cli.bad_factor,
        max_fitness: cli.max_fitness,
        work_dir: PathBuf::from("."),
        baseline: baseline_path,
        child_timeout: Duration::from_secs(cli.timeout),
    };
    let first_port = 800 + rng.gen_range(0..800);
    let evaluator = FitnessEvaluator::new(fitness_config, first_port);

    let engine_config = EngineConfig {
        population: cli.population,
        generations: cli.generations,
        weights: MutationWeights {
            mut_chance: cli.mutation,
            ins: cli.ins,
            del: cli.del,
            swap: cli.swap,
        },
    };
    log.line(format!(
        "searching: {} generations, population {}, repair threshold {}",
        engine_config.generations, engine_config.population, cli.max_fitness
    ));

    let engine = RepairEngine::new(engine_config, evaluator);
    let report = engine.run(&seed_variant, &mut rng, &log).await?;

    // -- results -----------------------------------------------------------

    match engine.evaluator().best() {
        Some(best) => {
            let best_path = stem("-best.c");
            std::fs::write(&best_path, &best.source)
                .map_err(|err| format!("cannot write {}: {err}", best_path.display()))?;
            log.line(format!(
                "repair found at evaluation {} after {:.1}s (fitness {:.1}, diff {} bytes); wrote {}",
                best.evaluation,
                best.found_after.as_secs_f64(),
                best.fitness,
                best.diff_size,
                best_path.display()
            ));
        }
        None => log.line("no adequate program found".to_string()),
    }
    log.line(format!(
        "{} evaluations, {} compiles, {} cache hits over {} generations",
        report.evaluations, report.compiles, report.cache_hits, report.generations_run
    ));

    let report_path = stem("-report.json");
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .map_err(|err| format!("cannot write {}: {err}", report_path.display()))?;

    Ok(())
}

/// One sid per line; blank lines and surrounding whitespace are tolerated.
fn read_sid_lines(path: &std::path::Path) -> std::io::Result<Vec<Sid>> {
    let text = std::fs::read_to_string(path)?;
    let mut sids = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let sid = line.parse::<Sid>().map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("bad sid {line:?}: {err}"),
            )
        })?;
        sids.push(sid);
    }
    Ok(sids)
}
