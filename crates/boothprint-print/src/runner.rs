// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External process seam.
//
// Every spooler and script invocation goes through `CommandRunner` as a
// program plus an argument vector.  Nothing is passed through a shell, so
// printer names, option values and file paths are never interpolated.

use std::fmt;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    /// Exit code; `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// A zero exit with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A non-zero exit with the given stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// The process's own diagnostic text, trimmed.  Falls back to the exit
    /// code when the process printed nothing on stderr.
    pub fn diagnostic(&self, program: &str) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.code {
            Some(code) => format!("{program} exited with code {code}"),
            None => format!("{program} was terminated by a signal"),
        }
    }
}

/// Runs an external program to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Spawn `program` with `args` and wait for it.  `Err` only when the
    /// process could not be spawned or waited on; a non-zero exit is an
    /// `Ok` with `success == false`.
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<ProcessOutput>;
}

/// Runs processes on the host via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<ProcessOutput> {
        debug!(program, ?args, "spawning");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(ProcessOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Scripted runner for tests: records every invocation and answers from a
/// table of canned replies.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    enum Reply {
        Output(ProcessOutput),
        SpawnError(String),
    }

    /// Replies are matched against the invocation rendered as
    /// `program arg1 arg2 ...`; the longest matching prefix wins.  Anything
    /// unmatched exits zero with no output.
    #[derive(Debug, Default)]
    pub struct RecordingRunner {
        replies: Mutex<Vec<(String, Reply)>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_output(self, prefix: &str, output: ProcessOutput) -> Self {
            self.push(prefix, Reply::Output(output));
            self
        }

        pub fn with_stdout(self, prefix: &str, stdout: &str) -> Self {
            self.with_output(prefix, ProcessOutput::ok(stdout))
        }

        pub fn with_failure(self, prefix: &str, stderr: &str) -> Self {
            self.with_output(prefix, ProcessOutput::failed(1, stderr))
        }

        pub fn with_spawn_error(self, prefix: &str, message: &str) -> Self {
            self.push(prefix, Reply::SpawnError(message.into()));
            self
        }

        fn push(&self, prefix: &str, reply: Reply) {
            self.replies
                .lock()
                .expect("replies lock poisoned")
                .push((prefix.to_string(), reply));
        }

        /// Every invocation so far, program first.
        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().expect("calls lock poisoned").clone()
        }

        /// Invocations of one program.
        pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
            self.calls()
                .into_iter()
                .filter(|argv| argv.first().is_some_and(|p| p == program))
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, program: &str, args: &[String]) -> std::io::Result<ProcessOutput> {
            let mut argv = vec![program.to_string()];
            argv.extend(args.iter().cloned());
            let rendered = argv.join(" ");
            self.calls.lock().expect("calls lock poisoned").push(argv);

            let replies = self.replies.lock().expect("replies lock poisoned");
            let reply = replies
                .iter()
                .filter(|(prefix, _)| rendered.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, reply)| reply.clone());

            match reply {
                Some(Reply::Output(output)) => Ok(output),
                Some(Reply::SpawnError(message)) => {
                    Err(std::io::Error::new(std::io::ErrorKind::NotFound, message))
                }
                None => Ok(ProcessOutput::ok("")),
            }
        }
    }
}
