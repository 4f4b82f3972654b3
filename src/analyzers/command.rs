//! Shared scaffolding for analyzers that shell out to external tools.
//!
//! Every adapter follows the same three steps: stage the file subset
//! into a temp directory, invoke the tool binary under the deadline,
//! and parse its raw output into [`AnalysisIssue`]s. Only the parser
//! and the command line are tool-specific; [`run_adapter`] owns the
//! rest, including converting every failure mode into a result status
//! so the no-throw contract holds.

use crate::core::{AnalysisIssue, Language, SourceFile, ToolInvocationResult, ToolStatus};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// How often the runner polls a child process for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Raw tool output kept in failure messages, at most this many bytes.
const RAW_OUTPUT_EXCERPT: usize = 500;

/// File subset materialized on disk for a subprocess to read.
pub struct StagedFiles {
    // Held for its Drop; the directory is removed when staging ends.
    _dir: tempfile::TempDir,
    paths: Vec<PathBuf>,
    mapping: HashMap<PathBuf, PathBuf>,
}

impl StagedFiles {
    /// Temp-disk paths, in input order, for the command line.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Map a temp path (as the tool reported it) back to the
    /// repository path.
    pub fn original_path(&self, reported: &Path) -> Option<&Path> {
        self.mapping.get(reported).map(PathBuf::as_path)
    }

    /// Like `original_path` but falls back to the reported path when
    /// the tool rewrote it (absolute vs relative, symlinks).
    pub fn resolve(&self, reported: &Path) -> PathBuf {
        if let Some(original) = self.original_path(reported) {
            return original.to_path_buf();
        }
        self.mapping
            .iter()
            .find(|(staged, _)| {
                staged.file_name() == reported.file_name() && reported.ends_with(staged)
                    || staged.ends_with(reported)
            })
            .map(|(_, original)| original.clone())
            .unwrap_or_else(|| reported.to_path_buf())
    }
}

/// Write the file subset under a fresh temp directory, preserving
/// relative layout so tool output keeps usable paths.
pub fn stage_files(files: &[SourceFile]) -> std::io::Result<StagedFiles> {
    let dir = tempfile::TempDir::new()?;
    let mut paths = Vec::with_capacity(files.len());
    let mut mapping = HashMap::with_capacity(files.len());

    for file in files {
        let staged = dir.path().join(sanitize(&file.path));
        if let Some(parent) = staged.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&staged, &file.content)?;
        mapping.insert(staged.clone(), file.path.clone());
        paths.push(staged);
    }

    Ok(StagedFiles {
        _dir: dir,
        paths,
        mapping,
    })
}

// Strip roots and parent components so staged files stay inside the
// temp directory.
fn sanitize(path: &Path) -> PathBuf {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

#[derive(Debug)]
pub enum ToolRunError {
    /// Binary not found on PATH.
    Unavailable(String),
    /// Child did not exit within the deadline; it was killed.
    Timeout,
    Io(String),
}

#[derive(Debug)]
pub struct RawToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Spawn `program args... paths...`, poll for exit under `timeout`,
/// and kill the child if the deadline passes.
pub fn run_command(
    program: &str,
    args: &[String],
    paths: &[PathBuf],
    timeout: Duration,
) -> Result<RawToolOutput, ToolRunError> {
    let binary =
        which::which(program).map_err(|e| ToolRunError::Unavailable(format!("{program}: {e}")))?;

    let mut child = Command::new(binary)
        .args(args)
        .args(paths)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ToolRunError::Io(e.to_string()))?;

    // Drain pipes on helper threads so a chatty tool can't deadlock
    // against a full pipe buffer while we poll.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = std::thread::spawn(move || read_pipe(stdout));
    let stderr_reader = std::thread::spawn(move || read_pipe(stderr));

    let deadline = Instant::now() + timeout;
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolRunError::Timeout);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                return Err(ToolRunError::Io(e.to_string()));
            }
        }
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    Ok(RawToolOutput {
        stdout,
        stderr,
        exit_code,
    })
}

fn read_pipe(pipe: Option<impl Read>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

/// The fixed execution template shared by all command-line adapters:
/// stage input, invoke under the deadline, parse. `parse` receives
/// the raw stdout and the staging map for path rewriting; its `Err`
/// carries a diagnostic and is reported as a parse failure with the
/// raw output preserved for post-hoc debugging.
pub fn run_adapter(
    tool_name: &str,
    language: Language,
    files: &[SourceFile],
    timeout: Duration,
    program: &str,
    args: Vec<String>,
    parse: impl FnOnce(&str, &StagedFiles) -> Result<Vec<AnalysisIssue>, String>,
) -> ToolInvocationResult {
    let started = Instant::now();

    let staged = match stage_files(files) {
        Ok(staged) => staged,
        Err(e) => {
            return ToolInvocationResult::unsuccessful(
                tool_name,
                language,
                ToolStatus::Failure,
                started.elapsed(),
                format!("failed to stage input files: {e}"),
            );
        }
    };

    let output = match run_command(program, &args, staged.paths(), timeout) {
        Ok(output) => output,
        Err(ToolRunError::Unavailable(e)) => {
            return ToolInvocationResult::unsuccessful(
                tool_name,
                language,
                ToolStatus::Failure,
                started.elapsed(),
                format!("tool unavailable: {e}"),
            );
        }
        Err(ToolRunError::Timeout) => {
            return ToolInvocationResult::unsuccessful(
                tool_name,
                language,
                ToolStatus::Timeout,
                started.elapsed(),
                format!("timed out after {timeout:?}"),
            );
        }
        Err(ToolRunError::Io(e)) => {
            return ToolInvocationResult::unsuccessful(
                tool_name,
                language,
                ToolStatus::Failure,
                started.elapsed(),
                format!("tool invocation failed: {e}"),
            );
        }
    };

    // Linters exit non-zero when they find issues; only an empty
    // stdout together with a non-zero exit means the tool itself
    // failed.
    if output.stdout.trim().is_empty() && output.exit_code.unwrap_or(0) != 0 {
        return ToolInvocationResult::unsuccessful(
            tool_name,
            language,
            ToolStatus::Failure,
            started.elapsed(),
            format!(
                "exit code {:?} with no parseable output; stderr: {}",
                output.exit_code,
                excerpt(&output.stderr)
            ),
        );
    }

    let issues = match parse(&output.stdout, &staged) {
        Ok(issues) => issues,
        Err(diagnostic) => {
            return ToolInvocationResult::unsuccessful(
                tool_name,
                language,
                ToolStatus::Failure,
                started.elapsed(),
                format!(
                    "failed to parse output: {diagnostic}; raw output: {}",
                    excerpt(&output.stdout)
                ),
            );
        }
    };

    let mut metrics = BTreeMap::new();
    metrics.insert("files_analyzed".to_string(), files.len() as f64);
    metrics.insert(
        "lines_analyzed".to_string(),
        files.iter().map(SourceFile::line_count).sum::<usize>() as f64,
    );
    metrics.insert("total_issues".to_string(), issues.len() as f64);

    ToolInvocationResult {
        tool_name: tool_name.to_string(),
        language,
        status: ToolStatus::Success,
        issues,
        metrics,
        duration: started.elapsed(),
        error: None,
    }
}

fn excerpt(raw: &str) -> &str {
    if raw.len() <= RAW_OUTPUT_EXCERPT {
        return raw;
    }
    let mut end = RAW_OUTPUT_EXCERPT;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}
