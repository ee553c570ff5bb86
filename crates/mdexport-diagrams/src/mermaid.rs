//! Mermaid rendering through the `mmdc` command-line tool.
//!
//! Each render writes the diagram source to a uniquely named `.mmd` file,
//! runs `mmdc -i <in> -o <out> -b transparent` and waits for the process with
//! a timeout. The process is killed when the timeout expires.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use mdexport_renderer::DiagramRenderer;
use uuid::Uuid;

use crate::consts::{BACKGROUND, DEFAULT_TIMEOUT, MMDC_PROGRAM, POLL_INTERVAL};

/// Error from a single `mmdc` invocation.
#[derive(Debug, thiserror::Error)]
pub enum MermaidError {
    #[error("mmdc executable not found")]
    NotFound,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("mmdc timed out after {0:?}")]
    Timeout(Duration),
    #[error("mmdc exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("mmdc produced no output file")]
    MissingOutput,
}

/// Diagram renderer backed by the Mermaid CLI.
///
/// The executable is resolved once at construction. A renderer without an
/// executable is valid and fails every render.
#[derive(Clone, Debug)]
pub struct MermaidCli {
    program: Option<PathBuf>,
    timeout: Duration,
}

impl MermaidCli {
    /// Resolve `mmdc` from `PATH`.
    pub fn new() -> Self {
        let program = which::which(MMDC_PROGRAM).ok();
        if program.is_none() {
            tracing::warn!("mmdc not found on PATH, diagrams will use fallback blocks");
        }
        Self {
            program,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use an explicitly configured executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-diagram timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolved executable, if any.
    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    /// Whether an executable was resolved.
    pub fn is_available(&self) -> bool {
        self.program.is_some()
    }

    /// Render `source` to a PNG inside `output_dir`.
    pub fn try_render(&self, source: &str, output_dir: &Path) -> Result<PathBuf, MermaidError> {
        let program = self.program.as_deref().ok_or(MermaidError::NotFound)?;

        let id = Uuid::new_v4().simple().to_string();
        let input = output_dir.join(format!("diagram_{id}.mmd"));
        let output = output_dir.join(format!("diagram_{}.png", &id[..8]));
        std::fs::write(&input, source)?;

        let result = self.run(program, &input, &output);
        let _ = std::fs::remove_file(&input);
        result?;

        if output.is_file() {
            Ok(output)
        } else {
            Err(MermaidError::MissingOutput)
        }
    }

    fn run(&self, program: &Path, input: &Path, output: &Path) -> Result<(), MermaidError> {
        let mut child = Command::new(program)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("-b")
            .arg(BACKGROUND)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drained concurrently so a chatty mmdc cannot fill the pipe and stall.
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        // On timeout the reader is left detached; orphaned grandchildren may
        // still hold the pipe open.
        let status = wait_with_timeout(&mut child, self.timeout)?;
        let stderr = stderr
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();
        if status.success() {
            return Ok(());
        }

        Err(MermaidError::Failed {
            status,
            stderr: stderr.trim().to_owned(),
        })
    }
}

impl Default for MermaidCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramRenderer for MermaidCli {
    fn render(&self, source: &str, output_dir: &Path) -> Option<PathBuf> {
        match self.try_render(source, output_dir) {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "Rendered mermaid diagram");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Mermaid rendering failed");
                None
            }
        }
    }
}

/// Poll `child` until it exits, killing it once `timeout` has elapsed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, MermaidError> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(MermaidError::Timeout(timeout));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
