//! Run diagnostics, tee'd to stderr and the `.debug` file.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Every diagnostic line of a run goes through here, so the `.debug` file
/// holds the complete transcript of what was printed to stderr.
#[derive(Debug)]
pub struct RunLog {
    file: Mutex<Option<File>>,
}

impl RunLog {
    /// Tee to `path`, truncating any previous transcript.
    pub fn tee(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(RunLog {
            file: Mutex::new(Some(File::create(path)?)),
        })
    }

    /// Stderr only; used by tests.
    pub fn stderr_only() -> Self {
        RunLog {
            file: Mutex::new(None),
        }
    }

    pub fn line(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        eprintln!("{msg}");
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = writeln!(file, "{msg}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tee_appends_lines_to_the_file() {
        let path = std::env::temp_dir().join(format!("cmend-log-{}", std::process::id()));
        let log = RunLog::tee(&path).unwrap();
        log.line("first");
        log.line("second");
        drop(log);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "first\nsecond\n");
        let _ = std::fs::remove_file(&path);
    }
}
