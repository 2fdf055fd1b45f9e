//! Interactive agent child-process session with a deadline and bounded stderr.
//!
//! The runner exchanges newline-delimited messages with the agent process
//! mid-run, so this is a line-oriented session rather than a one-shot
//! capture: stdout lines arrive through a channel fed by a reader thread,
//! stderr is drained concurrently with a byte limit, and a single wall-clock
//! deadline bounds the whole exchange.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Final state of a finished session.
#[derive(Debug)]
pub struct SessionOutput {
    pub status: ExitStatus,
    pub stderr: Vec<u8>,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl SessionOutput {
    /// Bounded stderr as lossy UTF-8, for error messages.
    pub fn stderr_lossy(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stderr).into_owned();
        if self.stderr_truncated > 0 {
            text.push_str(&format!("\n[stderr truncated {} bytes]", self.stderr_truncated));
        }
        text
    }
}

/// A running agent child process.
///
/// Dropping an unfinished session kills the child.
pub struct AgentSession {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: mpsc::Receiver<std::io::Result<String>>,
    stderr_handle: Option<thread::JoinHandle<(Vec<u8>, usize)>>,
    deadline: Instant,
    finished: bool,
}

impl AgentSession {
    /// Spawn `command` (argv form) in `workdir` with piped stdio.
    pub fn spawn(
        command: &[String],
        workdir: &Path,
        timeout: Duration,
        output_limit_bytes: usize,
    ) -> Result<Self> {
        let program = command
            .first()
            .ok_or_else(|| anyhow!("agent command must not be empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(&command[1..])
            .current_dir(workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(program = %program, "spawning agent process");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn agent command '{program}'"))?;

        let stdin = child.stdin.take().ok_or_else(|| anyhow!("stdin was not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("stderr was not piped"))?;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        let stderr_handle =
            thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

        Ok(Self {
            child,
            stdin: Some(stdin),
            lines: rx,
            stderr_handle: Some(stderr_handle),
            deadline: Instant::now() + timeout,
            finished: false,
        })
    }

    /// Write one line to the agent's stdin and flush.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("agent stdin already closed"))?;
        stdin
            .write_all(line.as_bytes())
            .and_then(|()| stdin.write_all(b"\n"))
            .and_then(|()| stdin.flush())
            .context("write to agent stdin")
    }

    /// Next stdout line, `None` at end of stream.
    ///
    /// Fails when the deadline expires; the child is killed before returning.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        let remaining = match self.deadline.checked_duration_since(Instant::now()) {
            Some(remaining) => remaining,
            None => return self.fail_timed_out(),
        };
        match self.lines.recv_timeout(remaining) {
            Ok(line) => Ok(Some(line.context("read agent stdout")?)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Ok(None),
            Err(mpsc::RecvTimeoutError::Timeout) => self.fail_timed_out(),
        }
    }

    fn fail_timed_out(&mut self) -> Result<Option<String>> {
        warn!("agent session deadline expired, killing process");
        self.kill();
        Err(anyhow!("agent process timed out"))
    }

    fn kill(&mut self) {
        self.stdin.take();
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.finished = true;
    }

    /// Close stdin and wait for the child within the remaining budget.
    ///
    /// A child still running when the budget expires is killed and reported
    /// with `timed_out = true`.
    pub fn finish(mut self) -> Result<SessionOutput> {
        self.stdin.take();

        let remaining = self
            .deadline
            .checked_duration_since(Instant::now())
            .unwrap_or(Duration::ZERO);
        let mut timed_out = false;
        let status = match self
            .child
            .wait_timeout(remaining)
            .context("wait for agent process")?
        {
            Some(status) => status,
            None => {
                warn!("agent process outlived its budget, killing");
                timed_out = true;
                self.child.kill().context("kill agent process")?;
                self.child.wait().context("wait agent process after kill")?
            }
        };
        self.finished = true;

        let (stderr, stderr_truncated) = match self.stderr_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))?,
            None => (Vec::new(), 0),
        };
        if stderr_truncated > 0 {
            warn!(stderr_truncated, "agent stderr truncated");
        }

        debug!(exit_code = ?status.code(), timed_out, "agent process finished");
        Ok(SessionOutput {
            status,
            stderr,
            stderr_truncated,
            timed_out,
        })
    }
}

impl Drop for AgentSession {
    fn drop(&mut self) {
        if !self.finished {
            self.kill();
        }
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> (Vec<u8>, usize) {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    (buf, truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn echoes_lines_sent_on_stdin() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = AgentSession::spawn(
            &sh("read line; echo \"got:$line\""),
            temp.path(),
            Duration::from_secs(10),
            10_000,
        )
        .expect("spawn");

        session.send_line("ping").expect("send");
        let line = session.next_line().expect("next").expect("line");
        assert_eq!(line, "got:ping");
        assert_eq!(session.next_line().expect("eof"), None);

        let output = session.finish().expect("finish");
        assert!(output.status.success());
        assert!(!output.timed_out);
    }

    #[test]
    fn deadline_expiry_kills_the_child() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = AgentSession::spawn(
            &sh("sleep 30"),
            temp.path(),
            Duration::from_millis(200),
            10_000,
        )
        .expect("spawn");

        let err = session.next_line().unwrap_err();
        assert!(err.to_string().contains("timed out"), "got {err:#}");
    }

    #[test]
    fn stderr_is_captured_and_bounded() {
        let temp = tempfile::tempdir().expect("tempdir");
        let session = AgentSession::spawn(
            &sh("echo oops >&2"),
            temp.path(),
            Duration::from_secs(10),
            3,
        )
        .expect("spawn");

        let output = session.finish().expect("finish");
        assert_eq!(output.stderr, b"oop");
        assert!(output.stderr_truncated > 0);
        assert!(output.stderr_lossy().contains("truncated"));
    }
}
