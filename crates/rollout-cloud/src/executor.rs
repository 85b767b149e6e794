use std::fmt;
use std::process::Stdio;

use secrecy::{ExposeSecret, SecretString};

use crate::tool::ToolError;

/// Environment variables added to a child process.
///
/// Values are secrets: `Debug` lists only the variable names.
#[derive(Clone, Default)]
pub struct ExecEnv {
    vars: Vec<(String, SecretString)>,
}

impl ExecEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: &str, value: SecretString) -> Self {
        self.vars.push((key.to_owned(), value));
        self
    }

    pub fn with_plain(self, key: &str, value: &str) -> Self {
        self.with_var(key, SecretString::from(value.to_owned()))
    }

    pub fn get(&self, key: &str) -> Option<&SecretString> {
        self.vars.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    fn apply(&self, command: &mut tokio::process::Command) {
        for (key, value) in &self.vars {
            command.env(key, value.expose_secret());
        }
    }
}

impl fmt::Debug for ExecEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// Abstraction over external CLI execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
/// Secrets reach the child only through `env` or stdin, never through `args`.
#[allow(async_fn_in_trait)]
pub trait ToolExecutor: Send + Sync {
    /// Execute a command and capture stdout.
    async fn exec(&self, args: &[String], env: &ExecEnv) -> Result<String, ToolError>;

    /// Execute a command, streaming output to the terminal.
    async fn exec_streaming(&self, args: &[String], env: &ExecEnv) -> Result<(), ToolError>;

    /// Execute a command with data piped to stdin and capture stdout.
    async fn exec_with_stdin(
        &self,
        args: &[String],
        env: &ExecEnv,
        stdin_data: &[u8],
    ) -> Result<String, ToolError>;

    /// Execute a command with data piped to stdin, streaming its output to
    /// the terminal.
    async fn exec_streaming_with_stdin(
        &self,
        args: &[String],
        env: &ExecEnv,
        stdin_data: &[u8],
    ) -> Result<(), ToolError>;
}

/// Runs a real program found on `PATH`.
#[derive(Debug, Clone)]
pub struct RealExecutor {
    program: &'static str,
}

impl RealExecutor {
    pub fn aws() -> Self {
        Self { program: "aws" }
    }

    pub fn docker() -> Self {
        Self { program: "docker" }
    }

    pub fn program(&self) -> &'static str {
        self.program
    }

    fn command(&self, args: &[String], env: &ExecEnv) -> tokio::process::Command {
        tracing::debug!(program = self.program, ?args, ?env, "exec");
        let mut command = tokio::process::Command::new(self.program);
        command.args(args);
        env.apply(&mut command);
        command
    }

    fn not_found(&self, source: std::io::Error) -> ToolError {
        ToolError::NotFound {
            program: self.program.to_owned(),
            source,
        }
    }

    async fn write_stdin(
        &self,
        child: &mut tokio::process::Child,
        stdin_data: &[u8],
    ) -> Result<(), ToolError> {
        use tokio::io::AsyncWriteExt;

        if let Some(mut stdin) = child.stdin.take() {
            let stdin_err = |e| ToolError::StdinWrite {
                program: self.program.to_owned(),
                source: e,
            };
            stdin.write_all(stdin_data).await.map_err(stdin_err)?;
            stdin.shutdown().await.map_err(stdin_err)?;
        }
        Ok(())
    }

    fn check_status(
        &self,
        args: &[String],
        status: std::process::ExitStatus,
    ) -> Result<(), ToolError> {
        if status.success() {
            Ok(())
        } else {
            Err(ToolError::CommandFailed {
                program: self.program.to_owned(),
                args: args.to_vec(),
                stderr: format!("exit code: {status}"),
            })
        }
    }

    fn capture(&self, args: &[String], output: std::process::Output) -> Result<String, ToolError> {
        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| ToolError::InvalidUtf8 {
                program: self.program.to_owned(),
                source: e,
            })
        } else {
            Err(ToolError::CommandFailed {
                program: self.program.to_owned(),
                args: args.to_vec(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }
}

impl ToolExecutor for RealExecutor {
    async fn exec(&self, args: &[String], env: &ExecEnv) -> Result<String, ToolError> {
        let output = self
            .command(args, env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.not_found(e))?;

        self.capture(args, output)
    }

    async fn exec_streaming(&self, args: &[String], env: &ExecEnv) -> Result<(), ToolError> {
        let status = self
            .command(args, env)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| self.not_found(e))?;

        self.check_status(args, status)
    }

    async fn exec_with_stdin(
        &self,
        args: &[String],
        env: &ExecEnv,
        stdin_data: &[u8],
    ) -> Result<String, ToolError> {
        let mut child = self
            .command(args, env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.not_found(e))?;

        self.write_stdin(&mut child, stdin_data).await?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.not_found(e))?;

        self.capture(args, output)
    }

    async fn exec_streaming_with_stdin(
        &self,
        args: &[String],
        env: &ExecEnv,
        stdin_data: &[u8],
    ) -> Result<(), ToolError> {
        let mut child = self
            .command(args, env)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.not_found(e))?;

        self.write_stdin(&mut child, stdin_data).await?;

        let status = child.wait().await.map_err(|e| self.not_found(e))?;
        self.check_status(args, status)
    }
}
