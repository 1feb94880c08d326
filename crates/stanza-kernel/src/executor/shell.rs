//! Shell executor: runs rendered command lines with `sh -c`.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::ast::SecurityMode;
use crate::interpreter::{Context, Outcome};

use super::{CommandExecutor, Invocation};

/// Runs invocations as `sh -c <command_line>`.
///
/// Piped input is written to the child's stdin. Exit status 0 is a success
/// carrying stdout; anything else is a failure carrying stderr, or the exit
/// status when stderr is empty.
///
/// Under `🛡️` the child starts with only `PATH` in its environment and runs
/// inside a fresh temporary directory that is removed afterwards.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    /// Use a different POSIX shell binary.
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn invoke(&self, invocation: &Invocation, ctx: &Context) -> Outcome {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(&invocation.command_line);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        // Held until the child exits.
        let _sandbox = if ctx.security() == Some(SecurityMode::Shield) {
            let dir = match tempfile::tempdir() {
                Ok(dir) => dir,
                Err(e) => {
                    return Outcome::failure(format!(
                        "{}: failed to create sandbox: {e}",
                        invocation.key
                    ));
                }
            };
            let path = std::env::var_os("PATH");
            cmd.env_clear();
            if let Some(path) = path {
                cmd.env("PATH", path);
            }
            cmd.current_dir(dir.path());
            Some(dir)
        } else {
            None
        };

        let stdin_data = ctx.input().map(|input| input.output_text());
        cmd.stdin(if stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        tracing::info!(command = %invocation.key, line = %invocation.command_line, "spawning");

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Outcome::failure(format!("{}: failed to spawn: {e}", invocation.key));
            }
        };

        // Input is fed while output drains; a child that echoes its input
        // would otherwise fill stdout and block on us.
        let stdin = child.stdin.take();
        let feed = async move {
            if let (Some(data), Some(mut stdin)) = (stdin_data, stdin) {
                // A child that exits without reading its input closes the
                // pipe; that is not an error.
                if let Err(e) = stdin.write_all(data.as_bytes()).await {
                    tracing::debug!(command = %invocation.key, error = %e, "stdin write ended early");
                }
            }
        };
        let ((), output) = tokio::join!(feed, child.wait_with_output());

        match output {
            Ok(output) if output.status.success() => {
                Outcome::success(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
                if stderr.is_empty() {
                    match output.status.code() {
                        Some(code) => Outcome::failure(format!("exit status {code}")),
                        None => Outcome::failure("terminated by signal"),
                    }
                } else {
                    Outcome::failure(stderr)
                }
            }
            Err(e) => Outcome::failure(format!("{}: failed to wait: {e}", invocation.key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Command as StanzaCommand;

    fn invocation(line: &str) -> Invocation {
        Invocation {
            command: StanzaCommand::from_word("test.run", vec![]),
            key: "test.run".into(),
            template: line.into(),
            command_line: line.into(),
            args: vec![],
        }
    }

    #[tokio::test]
    async fn stdout_on_success() {
        let out = ShellExecutor::new()
            .invoke(&invocation("echo crawled"), &Context::new())
            .await;
        assert_eq!(out, Outcome::success("crawled\n"));
    }

    #[tokio::test]
    async fn stderr_on_failure() {
        let out = ShellExecutor::new()
            .invoke(&invocation("echo oops >&2; exit 3"), &Context::new())
            .await;
        assert_eq!(out, Outcome::failure("oops"));
    }

    #[tokio::test]
    async fn exit_status_when_silent() {
        let out = ShellExecutor::new()
            .invoke(&invocation("exit 1"), &Context::new())
            .await;
        assert_eq!(out, Outcome::failure("exit status 1"));
    }

    #[tokio::test]
    async fn piped_input_reaches_stdin() {
        let ctx = Context::new().with_input(Outcome::success("hello\n"));
        let out = ShellExecutor::new().invoke(&invocation("cat"), &ctx).await;
        assert_eq!(out, Outcome::success("hello\n"));
    }

    #[tokio::test]
    async fn large_piped_input_streams_through() {
        let input = "a".repeat(256 * 1024 + 17);
        let ctx = Context::new().with_input(Outcome::success(input.clone()));
        let out = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            ShellExecutor::new().invoke(&invocation("cat"), &ctx),
        )
        .await
        .expect("cat finished without deadlocking");
        assert_eq!(out, Outcome::success(input));
    }

    #[tokio::test]
    async fn shield_clears_environment() {
        let ctx = Context::new().with_security(SecurityMode::Shield);
        let out = ShellExecutor::new()
            .invoke(&invocation("printf '%s' \"${HOME:-unset}\""), &ctx)
            .await;
        assert_eq!(out, Outcome::success("unset"));
    }

    #[tokio::test]
    async fn missing_shell_is_failure() {
        let out = ShellExecutor::with_shell("/no/such/shell")
            .invoke(&invocation("true"), &Context::new())
            .await;
        assert!(out.is_failure());
    }
}
