//! Container engine orchestration
//!
//! Drives an image build engine through its CLI:
//! - Podman (default, rootless)
//! - Docker

mod cli_engine;
mod engine;
mod factory;

pub use cli_engine::CliEngine;
pub use engine::{BuildEngine, BuildRequest};
pub use factory::{create_engine, EngineKind};

use tokio::io::{AsyncBufReadExt, BufReader};

/// Max number of output lines to include in build error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of build output for error diagnostics.
///
/// Combines stdout and stderr, then returns the last `BUILD_ERROR_TAIL_LINES`
/// lines so error messages are actionable without being overwhelming.
pub(crate) fn build_error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail: Vec<&str> = if total > BUILD_ERROR_TAIL_LINES {
        lines[total - BUILD_ERROR_TAIL_LINES..].to_vec()
    } else {
        lines
    };
    tail.join("\n")
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Returns all collected output lines for error reporting. Streams that were
/// not piped are treated as already closed.
pub(crate) async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn Fn(String) + Send + Sync),
) -> Vec<String> {
    let mut stderr_reader = child.stderr.take().map(|s| BufReader::new(s).lines());
    let mut stdout_reader = child.stdout.take().map(|s| BufReader::new(s).lines());

    let mut all_output = Vec::new();
    let mut stderr_done = stderr_reader.is_none();
    let mut stdout_done = stdout_reader.is_none();

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = async { stderr_reader.as_mut()?.next_line().await.ok().flatten() }, if !stderr_done => {
                match line {
                    Some(line) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    None => stderr_done = true,
                }
            }
            line = async { stdout_reader.as_mut()?.next_line().await.ok().flatten() }, if !stdout_done => {
                match line {
                    Some(line) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    None => stdout_done = true,
                }
            }
        }
    }

    all_output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use std::sync::Mutex;

    #[test]
    fn error_output_keeps_tail() {
        let stdout: String = (0..80).map(|i| format!("line {}\n", i)).collect();
        let tail = build_error_output(&stdout, "fatal: boom");

        assert_eq!(tail.lines().count(), BUILD_ERROR_TAIL_LINES);
        assert!(tail.ends_with("fatal: boom"));
        assert!(!tail.contains("line 0\n"));
    }

    #[test]
    fn error_output_short_is_unchanged() {
        assert_eq!(build_error_output("a\nb", "c"), "a\nb\nc");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streams_both_pipes() {
        let mut child = tokio::process::Command::new("sh")
            .args(["-c", "echo out; echo err >&2"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let seen = Mutex::new(Vec::new());
        let lines = stream_child_output(&mut child, &|line: String| seen.lock().unwrap().push(line)).await;
        child.wait().await.unwrap();

        let mut lines = lines;
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
