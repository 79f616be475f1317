//! Command execution abstraction for testability
//!
//! Adapters never spawn processes directly; they go through a [`CommandExecutor`]
//! so tests can swap in the recording [`mock::MockExecutor`].

use super::command::{CommandError, CommandSpec};
use super::interrupt::Interrupt;
use std::path::PathBuf;
use std::process::Output;

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run a command, failing on a non-zero exit status
    fn run(&self, spec: &CommandSpec) -> Result<Output, CommandError>;

    /// Run a command and return stdout as string
    fn run_stdout(&self, spec: &CommandSpec) -> Result<String, CommandError> {
        let output = self.run(spec)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Resolve a tool in PATH
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor {
    interrupt: Interrupt,
}

impl RealExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill running commands when `interrupt` fires
    pub fn with_interrupt(interrupt: Interrupt) -> Self {
        Self { interrupt }
    }
}

impl CommandExecutor for RealExecutor {
    fn run(&self, spec: &CommandSpec) -> Result<Output, CommandError> {
        super::command::run_command(spec, &self.interrupt)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
        pub envs: Vec<(String, String)>,
        pub stdout_path: Option<PathBuf>,
    }

    impl CommandCall {
        pub fn command_line(&self) -> String {
            std::iter::once(self.program.as_str())
                .chain(self.args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ")
        }

        pub fn env(&self, key: &str) -> Option<&str> {
            self.envs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        /// Exit zero; `stdout` lands in the redirect file when one is set
        Success { stdout: String, stderr: String },
        /// Exit non-zero after writing a partial redirect file
        Failure { stderr: String, exit_code: i32 },
        Timeout,
        /// Killed by Ctrl-C after writing a partial redirect file
        Interrupted,
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    }

    impl MockResponse {
        pub fn stdout(stdout: &str) -> Self {
            MockResponse::Success {
                stdout: stdout.to_string(),
                stderr: String::new(),
            }
        }

        pub fn failure(stderr: &str, exit_code: i32) -> Self {
            MockResponse::Failure {
                stderr: stderr.to_string(),
                exit_code,
            }
        }
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Pre-configured responses: command line fragment -> response, first match wins
        responses: Arc<Mutex<Vec<(String, MockResponse)>>>,
        /// Default response when no specific response is configured
        default_response: Arc<Mutex<MockResponse>>,
        /// Programs that `locate` reports as missing
        missing: Arc<Mutex<Vec<String>>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for any command line containing `fragment`
        pub fn expect(self, fragment: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push((fragment.to_string(), response));
            self
        }

        /// Set the default response for unconfigured commands
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Make `locate` fail for a program
        pub fn without_program(self, program: &str) -> Self {
            self.missing.lock().unwrap().push(program.to_string());
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Recorded command lines, in call order
        pub fn command_lines(&self) -> Vec<String> {
            self.get_calls().iter().map(CommandCall::command_line).collect()
        }

        /// Check if a program was called
        pub fn was_called(&self, program: &str) -> bool {
            self.call_count(program) > 0
        }

        /// Get number of calls to a specific program
        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .count()
        }

        fn record_call(&self, spec: &CommandSpec) -> CommandCall {
            let call = CommandCall {
                program: spec.program.clone(),
                args: spec.args.clone(),
                envs: spec.envs.clone(),
                stdout_path: spec.stdout_path.clone(),
            };
            self.calls.lock().unwrap().push(call.clone());
            call
        }

        fn get_response(&self, command_line: &str) -> MockResponse {
            self.responses
                .lock()
                .unwrap()
                .iter()
                .find(|(fragment, _)| command_line.contains(fragment.as_str()))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
        }
    }

    impl CommandExecutor for MockExecutor {
        fn run(&self, spec: &CommandSpec) -> Result<Output, CommandError> {
            let call = self.record_call(spec);
            match self.get_response(&call.command_line()) {
                MockResponse::Success { stdout, stderr } => {
                    let stdout = match spec.stdout_path {
                        Some(ref path) => {
                            std::fs::write(path, stdout.as_bytes()).map_err(|source| {
                                CommandError::Spawn {
                                    program: spec.program.clone(),
                                    source,
                                }
                            })?;
                            Vec::new()
                        }
                        None => stdout.into_bytes(),
                    };
                    Ok(Output {
                        status: std::process::ExitStatus::default(),
                        stdout,
                        stderr: stderr.into_bytes(),
                    })
                }
                MockResponse::Failure { stderr, exit_code } => {
                    if let Some(ref path) = spec.stdout_path {
                        let _ = std::fs::write(path, b"-- partial");
                    }
                    Err(CommandError::Failed {
                        program: spec.program.clone(),
                        code: Some(exit_code),
                        stderr,
                    })
                }
                MockResponse::Timeout => Err(CommandError::TimedOut {
                    program: spec.program.clone(),
                    timeout: spec.timeout.unwrap_or_default(),
                }),
                MockResponse::Interrupted => {
                    if let Some(ref path) = spec.stdout_path {
                        let _ = std::fs::write(path, b"-- partial");
                    }
                    Err(CommandError::Interrupted {
                        program: spec.program.clone(),
                    })
                }
            }
        }

        fn locate(&self, program: &str) -> Option<PathBuf> {
            if self.missing.lock().unwrap().iter().any(|p| p == program) {
                None
            } else {
                Some(PathBuf::from(program))
            }
        }
    }
}
