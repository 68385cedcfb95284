// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Subprocess execution for suspended tasks. Callers hand over an argv
//! vector and a task handle; the child runs from a fixed binary root with
//! piped stdio and a minimal environment, and on termination the caller gets
//! the handle back together with (exit code, stdout, stderr) to resume the
//! task with.

use std::collections::HashMap;
use std::io;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("no command given")]
    NoCommand,
    #[error("invalid path")]
    InvalidPath,
    #[error("does not exist")]
    DoesNotExist,
    #[error("could not spawn subprocess: {0}")]
    Spawn(io::Error),
}

pub struct ExecConfig {
    /// Binaries may only be run from under this directory.
    pub bin_root: PathBuf,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            bin_root: PathBuf::from("executables"),
        }
    }
}

/// What a completed subprocess hands back to its suspended task.
#[derive(Debug)]
pub struct ExecOutcome {
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

struct ExecWaiter<T> {
    child: Child,
    task: T,
}

/// The table of subprocesses in flight, keyed by pid, each holding the
/// suspended task that awaits its completion.
pub struct ExecManager<T> {
    config: ExecConfig,
    waiters: HashMap<u32, ExecWaiter<T>>,
}

impl<T> ExecManager<T> {
    pub fn new(config: ExecConfig) -> Self {
        Self {
            config,
            waiters: HashMap::new(),
        }
    }

    /// Spawn `argv` and register `task` as waiting on it. Returns the child
    /// pid. Paths reaching outside the binary root are refused.
    pub fn start(&mut self, argv: &[String], task: T) -> Result<u32, ExecError> {
        let Some(cmd) = argv.first() else {
            return Err(ExecError::NoCommand);
        };
        if cmd.starts_with("..") || cmd.contains("/.") {
            return Err(ExecError::InvalidPath);
        }
        let rel = cmd.strip_prefix('/').unwrap_or(cmd);
        let path = self.config.bin_root.join(rel);
        if !path.is_file() {
            return Err(ExecError::DoesNotExist);
        }

        let child = Command::new(&path)
            .args(&argv[1..])
            .env_clear()
            .env("PATH", "/bin:/usr/bin")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExecError::Spawn)?;

        info!("EXEC: Executing {} ...", path.display());
        let pid = child.id();
        self.waiters.insert(pid, ExecWaiter { child, task });
        Ok(pid)
    }

    /// Reap completed subprocesses: each yields its suspended task and the
    /// resume triple. Still-running children stay registered.
    pub fn poll(&mut self) -> Vec<(T, ExecOutcome)> {
        let mut finished = Vec::new();
        for (pid, w) in self.waiters.iter_mut() {
            if matches!(w.child.try_wait(), Ok(Some(_))) {
                finished.push(*pid);
            }
        }

        let mut resumed = Vec::with_capacity(finished.len());
        for pid in finished {
            let Some(mut w) = self.waiters.remove(&pid) else {
                continue;
            };
            let code = match w.child.wait() {
                Ok(status) => status.code().unwrap_or(-1),
                Err(_) => -1,
            };
            let stdout = drain(w.child.stdout.take());
            let stderr = drain(w.child.stderr.take());
            resumed.push((
                w.task,
                ExecOutcome {
                    code,
                    stdout,
                    stderr,
                },
            ));
        }
        resumed
    }

    /// Kill a waiter outright (its task was destroyed); returns the orphaned
    /// task handle if the pid was known.
    pub fn kill(&mut self, pid: u32) -> Option<T> {
        let mut w = self.waiters.remove(&pid)?;
        let _ = w.child.kill();
        let _ = w.child.wait();
        Some(w.task)
    }

    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }
}

fn drain<R: Read>(stream: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf);
    }
    buf
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{ExecConfig, ExecError, ExecManager};

    fn manager() -> ExecManager<u64> {
        ExecManager::new(ExecConfig {
            bin_root: PathBuf::from("/bin"),
        })
    }

    #[test]
    fn rejects_escaping_paths() {
        let mut m = manager();
        assert!(matches!(
            m.start(&["../etc/passwd".to_string()], 1),
            Err(ExecError::InvalidPath)
        ));
        assert!(matches!(
            m.start(&["foo/./bar".to_string()], 1),
            Err(ExecError::InvalidPath)
        ));
        assert!(matches!(m.start(&[], 1), Err(ExecError::NoCommand)));
    }

    #[test]
    fn rejects_missing_binaries() {
        let mut m = manager();
        assert!(matches!(
            m.start(&["no-such-binary-here".to_string()], 1),
            Err(ExecError::DoesNotExist)
        ));
    }

    #[test]
    fn resumes_task_with_output_triple() {
        let mut m = manager();
        let pid = m
            .start(&["echo".to_string(), "hello".to_string()], 42)
            .expect("spawn echo");
        assert_eq!(m.waiting(), 1);

        let mut resumed = vec![];
        for _ in 0..100 {
            resumed = m.poll();
            if !resumed.is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let (task, outcome) = resumed.pop().expect("child completed");
        assert_eq!(task, 42);
        assert_eq!(outcome.code, 0);
        assert_eq!(outcome.stdout, b"hello\n");
        assert!(outcome.stderr.is_empty());
        assert_eq!(m.waiting(), 0);
        let _ = pid;
    }
}
