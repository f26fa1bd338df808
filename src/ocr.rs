use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::process::Command;

use crate::{
    config::ArchiveConfig,
    error::{Error, Result},
};

/// Recognizes text in an image file.
///
/// An empty string means nothing was recognized, which is not an error.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image_path: &Path) -> Result<String>;
}

/// Runs the `tesseract` command-line engine.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
    nice: i32,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            nice: 0,
            timeout: crate::config::DEFAULT_OCR_TIMEOUT,
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(&config.tesseract_bin, &config.ocr_language)
            .with_nice(config.ocr_nice)
            .with_timeout(config.ocr_timeout)
    }

    pub fn with_nice(mut self, nice: i32) -> Self {
        self.nice = nice;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command that will be spawned for `image_path`.
    ///
    /// A non-zero niceness wraps the engine in `nice -n`.
    pub fn command(&self, image_path: &Path) -> Command {
        let mut cmd = if self.nice != 0 {
            let mut cmd = Command::new("nice");
            cmd.arg("-n").arg(self.nice.to_string()).arg(&self.binary);
            cmd
        } else {
            Command::new(&self.binary)
        };
        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language);
        cmd
    }

    async fn run(&self, image_path: &Path) -> Result<String> {
        let mut cmd = self.command(image_path);
        // Dropping the pending output on timeout kills the engine.
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                Error::Ocr(format!(
                    "timed out after {}s",
                    self.timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| {
                Error::Ocr(format!(
                    "failed to run {}: {e}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            return Err(Error::Ocr(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractOcr {
    /// Blocks the calling thread on a small current-thread runtime, so the
    /// engine can be driven from rayon workers.
    fn recognize(&self, image_path: &Path) -> Result<String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Ocr(format!("failed to start OCR runtime: {e}"))
            })?;
        runtime.block_on(self.run(image_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn plain_command_line() {
        let ocr = TesseractOcr::new("tesseract", "eng");
        let cmd = ocr.command(Path::new("/tmp/x.png"));
        assert_eq!(cmd.as_std().get_program(), "tesseract");
        assert_eq!(args(&cmd), vec!["/tmp/x.png", "stdout", "-l", "eng"]);
    }

    #[test]
    fn nice_wraps_the_engine() {
        let ocr = TesseractOcr::new("/usr/bin/tesseract", "eng").with_nice(-3);
        let cmd = ocr.command(Path::new("a.png"));
        assert_eq!(cmd.as_std().get_program(), "nice");
        assert_eq!(
            args(&cmd),
            vec!["-n", "-3", "/usr/bin/tesseract", "a.png", "stdout", "-l", "eng"]
        );
    }

    #[test]
    fn from_config_uses_settings() {
        let config = ArchiveConfig {
            ocr_language: "deu".into(),
            ocr_nice: 0,
            ..ArchiveConfig::default()
        };
        let cmd = TesseractOcr::from_config(&config).command(Path::new("b.png"));
        assert_eq!(cmd.as_std().get_program(), "tesseract");
        assert_eq!(args(&cmd).last().map(String::as_str), Some("deu"));
    }

    #[test]
    fn missing_binary_is_ocr_error() {
        let ocr = TesseractOcr::new("/nonexistent/quotevault-ocr", "eng");
        let err = ocr.recognize(Path::new("x.png")).unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
    }

    #[test]
    fn from_config_applies_nice_and_timeout() {
        let config = ArchiveConfig {
            ocr_nice: 5,
            ocr_timeout: Duration::from_secs(7),
            ..ArchiveConfig::default()
        };
        let ocr = TesseractOcr::from_config(&config);
        assert_eq!(ocr.timeout, Duration::from_secs(7));
        let cmd = ocr.command(Path::new("c.png"));
        assert_eq!(cmd.as_std().get_program(), "nice");
        assert_eq!(args(&cmd)[..2], ["-n", "5"]);
    }

    #[cfg(unix)]
    #[test]
    fn slow_engine_times_out() {
        // Run a shell script as the "engine" so no real OCR is needed.
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("slow.sh");
        std::fs::write(&script, "sleep 5\n").unwrap();

        let ocr = TesseractOcr::new("sh", "eng")
            .with_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = ocr.recognize(&script).unwrap_err();

        assert!(matches!(err, Error::Ocr(_)));
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn stdout_becomes_text() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("echo.sh");
        std::fs::write(&script, "echo \"$1 $2 $3\"\n").unwrap();

        let text = TesseractOcr::new("sh", "eng").recognize(&script).unwrap();
        assert_eq!(text, "stdout -l eng\n");
    }

    #[cfg(unix)]
    #[test]
    fn failing_engine_reports_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("fail.sh");
        std::fs::write(&script, "echo 'cannot read image' >&2\nexit 1\n")
            .unwrap();

        let err = TesseractOcr::new("sh", "eng").recognize(&script).unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
        assert!(err.to_string().contains("cannot read image"));
    }
}
