//! Fitness evaluation: compile, test, score, memoise.
//!
//! A candidate's fitness is `lines(good log) + bad_factor * lines(bad log)`
//! after compiling its emitted source and running the two external test
//! harnesses. Everything that can go wrong with a *candidate* (it does not
//! compile, a harness exits non-zero, a child times out) scores `0.0` and
//! is cached so the search never pays for the same dead end twice. Only
//! representation and I/O failures abort the run.
//!
//! The memo key is a SHA-256 digest of the emitted source, not of the
//! history: distinct histories regularly collapse to the same text.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::process::Command;

use cmend_repr::Variant;

use crate::logger::RunLog;
use crate::SearchError;

/// How candidates are compiled, tested, and compared.
#[derive(Debug, Clone)]
pub struct FitnessConfig {
    /// Compiler command, invoked as `<compiler> -o <exe> <sources> <ldflags>`.
    pub compiler: String,
    /// Extra linker flags appended to every compile.
    pub ldflags: String,
    /// Positive harness, invoked as `<cmd> <exe> <log> <port>`.
    pub good_cmd: String,
    /// Negative (regression/exploit) harness, same calling convention.
    pub bad_cmd: String,
    /// Weight of a bad-harness log line relative to a good one.
    pub bad_factor: f64,
    /// Fitness at which a candidate counts as a repair.
    pub max_fitness: f64,
    /// Directory for per-evaluation artefacts.
    pub work_dir: PathBuf,
    /// Pretty-printed original, the diff baseline.
    pub baseline: PathBuf,
    /// Ceiling on any single child process.
    pub child_timeout: Duration,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        FitnessConfig {
            compiler: "gcc".into(),
            ldflags: String::new(),
            good_cmd: "./test-good.sh".into(),
            bad_cmd: "./test-bad.sh".into(),
            bad_factor: 10.0,
            max_fitness: 15.0,
            work_dir: PathBuf::from("."),
            baseline: PathBuf::from("baseline.c"),
            child_timeout: Duration::from_secs(300),
        }
    }
}

/// The best repair seen so far.
///
/// Ordered by minimality first: a candidate only takes over when its diff
/// against the baseline is no larger and its fitness no smaller.
#[derive(Debug, Clone)]
pub struct BestRepair {
    pub fitness: f64,
    /// Byte count of `diff -e` against the baseline.
    pub diff_size: u64,
    /// The full emitted source.
    pub source: String,
    /// Elapsed run time when this repair was found.
    pub found_after: Duration,
    /// Evaluation serial that produced it.
    pub evaluation: u64,
}

/// Compiles and tests variants, memoised by source digest.
///
/// Safe to share behind an `Arc`: the memo table and best-repair slot are
/// mutexed, the counters atomic, so parallel evaluators would race only on
/// wasted work, never on wrong answers.
pub struct FitnessEvaluator {
    config: FitnessConfig,
    /// Serial number for artefact names; also the evaluation count.
    serial: AtomicU64,
    /// Compiler invocations actually launched (cache hits skip it).
    compiles: AtomicU64,
    cache_hits: AtomicU64,
    /// Next harness port; each invocation gets a fresh one.
    port: AtomicU64,
    memo: Mutex<HashMap<String, f64>>,
    best: Mutex<Option<BestRepair>>,
    started: Instant,
}

impl FitnessEvaluator {
    pub fn new(config: FitnessConfig, first_port: u64) -> Self {
        FitnessEvaluator {
            config,
            serial: AtomicU64::new(0),
            compiles: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            port: AtomicU64::new(first_port),
            memo: Mutex::new(HashMap::new()),
            best: Mutex::new(None),
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &FitnessConfig {
        &self.config
    }

    /// Total evaluations requested, cache hits included.
    pub fn evaluations(&self) -> u64 {
        self.serial.load(Ordering::SeqCst)
    }

    pub fn compiles(&self) -> u64 {
        self.compiles.load(Ordering::SeqCst)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::SeqCst)
    }

    pub fn best(&self) -> Option<BestRepair> {
        self.best.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Score one variant.
    pub async fn evaluate(&self, variant: &Variant, log: &RunLog) -> Result<f64, SearchError> {
        let serial = self.serial.fetch_add(1, Ordering::SeqCst) + 1;
        let sources = variant.emit_source()?;
        let combined: String = sources.iter().map(|(_, text)| text.as_str()).collect();

        // The combined text is always written: it is the digest subject and
        // the diff operand even when compilation uses per-file inputs.
        let primary = self.artefact(serial, "file.c");
        tokio::fs::write(&primary, &combined).await?;
        let compile_inputs = if sources.len() == 1 {
            vec![primary.clone()]
        } else {
            let mut inputs = Vec::with_capacity(sources.len());
            for (name, text) in &sources {
                let name = name.as_deref().unwrap_or("file.c");
                let path = self.config.work_dir.join(format!("{serial:05}-{name}"));
                tokio::fs::write(&path, text).await?;
                inputs.push(path);
            }
            inputs
        };

        let digest = hex::encode(Sha256::digest(combined.as_bytes()));
        {
            let memo = self.memo.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(&cached) = memo.get(&digest) {
                self.cache_hits.fetch_add(1, Ordering::SeqCst);
                log.line(format!("{serial:05}: cached fitness {cached:.1}"));
                return Ok(cached);
            }
        }

        let fitness = self.compile_and_test(serial, &compile_inputs, log).await?;
        tokio::fs::write(self.artefact(serial, "fitness"), format!("{fitness}\n")).await?;

        if fitness >= self.config.max_fitness {
            self.consider_best(serial, &primary, &combined, fitness, log)
                .await?;
        }

        self.memo
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(digest, fitness);
        log.line(format!("{serial:05}: fitness {fitness:.1}"));
        Ok(fitness)
    }

    fn artefact(&self, serial: u64, suffix: &str) -> PathBuf {
        self.config.work_dir.join(format!("{serial:05}-{suffix}"))
    }

    async fn compile_and_test(
        &self,
        serial: u64,
        inputs: &[PathBuf],
        log: &RunLog,
    ) -> Result<f64, SearchError> {
        let exe = self.artefact(serial, "prog");
        let _ = tokio::fs::remove_file(&exe).await;

        let mut parts = self.config.compiler.split_whitespace();
        let program = match parts.next() {
            Some(p) => p,
            None => {
                log.line(format!("{serial:05}: compiler command is empty"));
                return Ok(0.0);
            }
        };
        let mut cmd = Command::new(program);
        cmd.args(parts);
        cmd.arg("-o").arg(&exe);
        cmd.args(inputs);
        cmd.args(self.config.ldflags.split_whitespace());

        self.compiles.fetch_add(1, Ordering::SeqCst);
        match tokio::time::timeout(self.config.child_timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {}
            Ok(Ok(output)) => {
                log.line(format!("{serial:05}: compile failed ({})", output.status));
                return Ok(0.0);
            }
            Ok(Err(err)) => {
                log.line(format!("{serial:05}: compiler did not start: {err}"));
                return Ok(0.0);
            }
            Err(_) => {
                log.line(format!("{serial:05}: compile timed out"));
                return Ok(0.0);
            }
        }

        let good_log = self.artefact(serial, "good");
        let bad_log = self.artefact(serial, "bad");
        let good_cmd = self.config.good_cmd.clone();
        let bad_cmd = self.config.bad_cmd.clone();
        if !self
            .run_harness(serial, &good_cmd, &exe, &good_log, "good", log)
            .await
        {
            return Ok(0.0);
        }
        if !self
            .run_harness(serial, &bad_cmd, &exe, &bad_log, "bad", log)
            .await
        {
            return Ok(0.0);
        }

        let good = count_lines(&good_log).await;
        let bad = count_lines(&bad_log).await;
        Ok(good as f64 + self.config.bad_factor * bad as f64)
    }

    async fn run_harness(
        &self,
        serial: u64,
        command: &str,
        exe: &Path,
        log_path: &Path,
        which: &str,
        log: &RunLog,
    ) -> bool {
        let _ = tokio::fs::remove_file(log_path).await;
        let port = self.port.fetch_add(1, Ordering::SeqCst);

        let mut parts = command.split_whitespace();
        let program = match parts.next() {
            Some(p) => p,
            None => {
                log.line(format!("{serial:05}: {which} harness command is empty"));
                return false;
            }
        };
        let mut cmd = Command::new(program);
        cmd.args(parts);
        cmd.arg(exe).arg(log_path).arg(port.to_string());

        match tokio::time::timeout(self.config.child_timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => true,
            Ok(Ok(output)) => {
                log.line(format!(
                    "{serial:05}: {which} harness failed ({})",
                    output.status
                ));
                false
            }
            Ok(Err(err)) => {
                log.line(format!(
                    "{serial:05}: {which} harness did not start: {err}"
                ));
                false
            }
            Err(_) => {
                log.line(format!("{serial:05}: {which} harness timed out"));
                false
            }
        }
    }

    /// A candidate reached `max_fitness`: measure its diff against the
    /// baseline and take the best-so-far slot if it dominates.
    async fn consider_best(
        &self,
        serial: u64,
        source_path: &Path,
        source: &str,
        fitness: f64,
        log: &RunLog,
    ) -> Result<(), SearchError> {
        let mut cmd = Command::new("diff");
        cmd.arg("-e").arg(source_path).arg(&self.config.baseline);
        let diff_size = match tokio::time::timeout(self.config.child_timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.code().map_or(false, |c| c <= 1) => {
                output.stdout.len() as u64
            }
            Ok(Ok(output)) => {
                log.line(format!("{serial:05}: diff failed ({})", output.status));
                return Ok(());
            }
            Ok(Err(err)) => {
                log.line(format!("{serial:05}: diff did not start: {err}"));
                return Ok(());
            }
            Err(_) => {
                log.line(format!("{serial:05}: diff timed out"));
                return Ok(());
            }
        };
        tokio::fs::write(self.artefact(serial, "size"), format!("{diff_size}\n")).await?;

        let mut best = self.best.lock().unwrap_or_else(|e| e.into_inner());
        let dominates = match best.as_ref() {
            None => true,
            Some(current) => diff_size <= current.diff_size && fitness >= current.fitness,
        };
        if dominates {
            let found_after = self.started.elapsed();
            log.line(format!(
                "{serial:05}: new best repair (fitness {fitness:.1}, diff {diff_size} bytes, {:.1}s)",
                found_after.as_secs_f64()
            ));
            *best = Some(BestRepair {
                fitness,
                diff_size,
                source: source.to_string(),
                found_after,
                evaluation: serial,
            });
        }
        Ok(())
    }
}

/// Newline count, matching `wc -l`. A missing log is an empty log.
async fn count_lines(path: &Path) -> u64 {
    match tokio::fs::read(path).await {
        Ok(bytes) => bytes.iter().filter(|&&b| b == b'\n').count() as u64,
        Err(_) => 0,
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use cmend_ast::{
        number_unit, Block, Expr, FunDef, Global, Stmt, StmtKind, TranslationUnit, Type,
    };
    use cmend_repr::{CodeBank, StatementIndex, WeightedPath};
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cmend-fitness-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn seed_variant() -> Variant {
        let mut unit = TranslationUnit {
            globals: vec![Global::Function(FunDef {
                ret: Type::Int,
                name: "main".into(),
                params: Vec::new(),
                locals: Vec::new(),
                body: Block {
                    stmts: vec![Stmt::unlabeled(StmtKind::Return(Some(Expr::IntLit(0))))],
                },
            })],
        };
        number_unit(&mut unit, 0);
        let bank = Arc::new(CodeBank::single("main.c", unit));
        let index = Arc::new(StatementIndex::build(&bank).unwrap());
        let path = Arc::new(WeightedPath::from_sids(&[0]));
        Variant::new(bank, index, path)
    }

    /// Fake toolchain: "compiler" copies source to exe, good harness writes
    /// two log lines, bad harness writes none.
    fn fake_config(dir: &Path) -> FitnessConfig {
        let compiler = write_script(
            dir,
            "fake-cc.sh",
            r#"while [ "$1" != "-o" ]; do shift; done
shift
exe="$1"
shift
cat "$@" > "$exe""#,
        );
        let good = write_script(dir, "good.sh", r#"printf 'pass\npass\n' > "$2""#);
        let bad = write_script(dir, "bad.sh", r#": > "$2""#);
        FitnessConfig {
            compiler: compiler.display().to_string(),
            good_cmd: good.display().to_string(),
            bad_cmd: bad.display().to_string(),
            bad_factor: 10.0,
            max_fitness: 100.0,
            work_dir: dir.to_path_buf(),
            baseline: dir.join("baseline.c"),
            ..FitnessConfig::default()
        }
    }

    #[tokio::test]
    async fn identical_sources_share_cached_fitness() {
        let dir = test_dir("memo");
        let evaluator = FitnessEvaluator::new(fake_config(&dir), 800);
        let log = RunLog::stderr_only();

        let a = seed_variant();
        let b = a.clone();
        let first = evaluator.evaluate(&a, &log).await.unwrap();
        let second = evaluator.evaluate(&b, &log).await.unwrap();

        assert_eq!(first, 2.0);
        assert_eq!(second, first);
        assert_eq!(evaluator.compiles(), 1);
        assert_eq!(evaluator.cache_hits(), 1);
        assert_eq!(evaluator.evaluations(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn failing_harness_scores_zero_and_is_cached() {
        let dir = test_dir("harness-fail");
        let mut config = fake_config(&dir);
        config.good_cmd = write_script(&dir, "explode.sh", "exit 3").display().to_string();
        let evaluator = FitnessEvaluator::new(config, 800);
        let log = RunLog::stderr_only();

        let variant = seed_variant();
        assert_eq!(evaluator.evaluate(&variant, &log).await.unwrap(), 0.0);
        assert_eq!(evaluator.evaluate(&variant, &log).await.unwrap(), 0.0);
        assert_eq!(evaluator.compiles(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn bad_harness_lines_are_weighted() {
        let dir = test_dir("bad-factor");
        let mut config = fake_config(&dir);
        config.bad_cmd = write_script(&dir, "bad-one.sh", r#"echo exploit-blocked > "$2""#)
            .display()
            .to_string();
        let evaluator = FitnessEvaluator::new(config, 800);
        let log = RunLog::stderr_only();

        let fitness = evaluator.evaluate(&seed_variant(), &log).await.unwrap();
        // two good lines plus one bad line at weight ten
        assert_eq!(fitness, 12.0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_compiler_scores_zero() {
        let dir = test_dir("no-cc");
        let mut config = fake_config(&dir);
        config.compiler = dir.join("does-not-exist").display().to_string();
        let evaluator = FitnessEvaluator::new(config, 800);
        let log = RunLog::stderr_only();

        let fitness = evaluator.evaluate(&seed_variant(), &log).await.unwrap();
        assert_eq!(fitness, 0.0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn repair_becomes_best_with_diff_size() {
        let dir = test_dir("best");
        let mut config = fake_config(&dir);
        config.max_fitness = 2.0;
        let variant = seed_variant();
        let baseline_text = variant.emit_source().unwrap().remove(0).1;
        std::fs::write(&config.baseline, &baseline_text).unwrap();

        let evaluator = FitnessEvaluator::new(config, 800);
        let log = RunLog::stderr_only();
        let fitness = evaluator.evaluate(&variant, &log).await.unwrap();
        assert_eq!(fitness, 2.0);

        let best = evaluator.best().expect("repair should be recorded");
        assert_eq!(best.fitness, 2.0);
        assert_eq!(best.diff_size, 0);
        assert_eq!(best.source, baseline_text);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn artefacts_carry_the_serial_prefix() {
        let dir = test_dir("artefacts");
        let evaluator = FitnessEvaluator::new(fake_config(&dir), 800);
        let log = RunLog::stderr_only();
        evaluator.evaluate(&seed_variant(), &log).await.unwrap();

        assert!(dir.join("00001-file.c").exists());
        assert!(dir.join("00001-prog").exists());
        assert!(dir.join("00001-good").exists());
        assert!(dir.join("00001-fitness").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
