use std::ffi::OsStr;

use drydock_core::{Error, Result};
use itertools::Itertools;
use tokio::process::Command;
use tracing::debug;

/// Run `program` to completion and return its stdout.
///
/// # Errors
///
/// Returns `Error::CommandSpawnFailed` if the program cannot be started and
/// `Error::CommandFailed` if it exits unsuccessfully.
pub async fn run<I, S>(program: &str, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let rendered = std::iter::once(program.to_string())
        .chain(args.iter().map(|arg| arg.as_ref().to_string_lossy().into_owned()))
        .join(" ");
    debug!(command = %rendered, "Running command");

    let output = Command::new(program)
        .args(&args)
        .env("DEBIAN_FRONTEND", "noninteractive")
        .output()
        .await
        .map_err(|e| Error::command_spawn_failed(&rendered, e.to_string()))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(Error::command_failed(
            rendered,
            output.status.to_string(),
            String::from_utf8_lossy(&output.stderr).trim(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() -> Result<()> {
        let out = run("sh", ["-c", "printf registry"]).await?;
        assert_eq!(out, "registry");
        Ok(())
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_command_failed() {
        let result = run("sh", ["-c", "echo boom >&2; exit 3"]).await;
        assert!(matches!(
            &result,
            Err(Error::CommandFailed { stderr, .. }) if stderr == "boom"
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_failure() {
        let result = run("drydock-no-such-tool", Vec::<&str>::new()).await;
        assert!(matches!(result, Err(Error::CommandSpawnFailed { .. })));
    }
}
