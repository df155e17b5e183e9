use anyhow::{Context, Result};
use flatpakkit::Invocation;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{ExitStatus, Stdio};

/// How a streamed command ended
#[derive(Debug)]
pub struct Completion {
    pub status: ExitStatus,
    /// Everything the command wrote to stderr, for error classification
    pub stderr: String,
}

/// Run a command, streaming its output line by line as it arrives
///
/// stdout and stderr are drained by two threads so neither pipe can fill up
/// and stall the child. Returns once the process and both drains are done.
pub fn run_streaming(invocation: &Invocation) -> Result<Completion> {
    let mut child = invocation
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to execute: {invocation}"))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let captured = std::thread::scope(|s| {
        if let Some(out) = stdout {
            s.spawn(move || forward(out, std::io::stdout()));
        }
        let err = stderr.map(|err| s.spawn(move || forward(err, std::io::stderr())));
        err.and_then(|h| h.join().ok()).unwrap_or_default()
    });

    let status = child
        .wait()
        .with_context(|| format!("Failed to wait for: {invocation}"))?;

    Ok(Completion {
        status,
        stderr: captured,
    })
}

/// Copy lines to the sink indented, returning what was read
fn forward<R: Read, W: Write>(source: R, mut sink: W) -> String {
    let mut seen = String::new();
    for line in BufReader::new(source).lines() {
        match line {
            Ok(line) => {
                let _ = writeln!(sink, "    {line}");
                seen.push_str(&line);
                seen.push('\n');
            }
            Err(e) => {
                log::debug!("Stopped reading command output: {e}");
                break;
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_indents_lines() {
        let mut sink = Vec::new();
        let seen = forward("one\ntwo\n".as_bytes(), &mut sink);
        assert_eq!(String::from_utf8(sink).unwrap(), "    one\n    two\n");
        assert_eq!(seen, "one\ntwo\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streaming_reports_exit_status() {
        let script = "echo out; echo err >&2";
        let ok = run_streaming(&Invocation::new("sh").args(["-c", script])).unwrap();
        assert!(ok.status.success());
        assert_eq!(ok.stderr, "err\n");

        let failed = run_streaming(&Invocation::new("sh").args(["-c", "exit 3"])).unwrap();
        assert_eq!(failed.status.code(), Some(3));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let err = run_streaming(&Invocation::new("definitely-not-a-real-program-xyz")).unwrap_err();
        assert!(err.to_string().contains("Failed to execute"));
    }
}
