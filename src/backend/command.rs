//! Command backend - drives the system mixer through an external program
//!
//! Each call spawns one process. Reads parse the program's stdout as a number,
//! writes substitute `{volume}` into the argument list.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use super::{BackendError, VolumeBackend};

/// Placeholder replaced by the target volume in write arguments
pub const VOLUME_PLACEHOLDER: &str = "{volume}";

/// Backend that shells out to a mixer program
#[derive(Debug, Clone)]
pub struct CommandBackend {
    read_argv: Vec<String>,
    write_argv: Vec<String>,
}

impl CommandBackend {
    /// Create a backend from explicit argument vectors (program first)
    pub fn new(read_argv: Vec<String>, write_argv: Vec<String>) -> Self {
        Self {
            read_argv,
            write_argv,
        }
    }

    fn write_args(&self, volume: u8) -> Vec<String> {
        let value = volume.to_string();
        self.write_argv
            .iter()
            .map(|arg| arg.replace(VOLUME_PLACEHOLDER, &value))
            .collect()
    }

    async fn run(argv: &[String]) -> Result<String, BackendError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| BackendError::Launch("empty command line".to_string()))?;

        trace!(program = %program, args = ?args, "Running backend command");

        // A timed-out call drops this future; the child must not outlive it.
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BackendError::Launch(format!("{}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(BackendError::Command(format!(
                "{} exited with {}: {}",
                program, output.status, stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse mixer output such as `"56\n"` or `"56.0"` into a clamped volume
pub fn parse_volume(raw: &str) -> Result<u8, BackendError> {
    let trimmed = raw.trim().trim_end_matches('%');
    let value: f64 = trimmed
        .parse()
        .map_err(|_| BackendError::InvalidOutput(raw.to_string()))?;

    if !value.is_finite() {
        return Err(BackendError::InvalidOutput(raw.to_string()));
    }

    Ok(value.round().clamp(0.0, 100.0) as u8)
}

#[async_trait]
impl VolumeBackend for CommandBackend {
    fn name(&self) -> &str {
        "command"
    }

    async fn read(&self) -> Result<u8, BackendError> {
        let stdout = Self::run(&self.read_argv).await?;
        let volume = parse_volume(&stdout)?;
        debug!(volume, "Backend read");
        Ok(volume)
    }

    async fn write(&self, volume: u8) -> Result<(), BackendError> {
        let argv = self.write_args(volume);
        Self::run(&argv).await?;
        debug!(volume, "Backend write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_volume() {
        assert_eq!(parse_volume("56\n"), Ok(56));
        assert_eq!(parse_volume("  42.6 "), Ok(43));
        assert_eq!(parse_volume("75%"), Ok(75));
        assert_eq!(parse_volume("150"), Ok(100));
        assert_eq!(parse_volume("-3"), Ok(0));
    }

    #[test]
    fn test_parse_volume_rejects_garbage() {
        assert!(matches!(
            parse_volume("missing value"),
            Err(BackendError::InvalidOutput(_))
        ));
        assert!(matches!(parse_volume(""), Err(BackendError::InvalidOutput(_))));
        assert!(matches!(parse_volume("NaN"), Err(BackendError::InvalidOutput(_))));
    }

    #[test]
    fn test_write_args_substitution() {
        let backend = CommandBackend::new(
            argv(&["mixer", "get"]),
            argv(&["mixer", "set", "--level={volume}"]),
        );
        assert_eq!(
            backend.write_args(30),
            argv(&["mixer", "set", "--level=30"])
        );
    }

    #[tokio::test]
    async fn test_empty_command_line() {
        let backend = CommandBackend::new(vec![], vec![]);
        assert!(matches!(backend.read().await, Err(BackendError::Launch(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_read_and_write_through_shell() {
        let backend = CommandBackend::new(
            argv(&["sh", "-c", "echo 42"]),
            argv(&["sh", "-c", "test {volume} -eq 17"]),
        );

        assert_eq!(backend.read().await, Ok(42));
        assert!(backend.write(17).await.is_ok());
        assert!(matches!(
            backend.write(18).await,
            Err(BackendError::Command(_))
        ));
    }
}
