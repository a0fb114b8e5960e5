//! Raw health data acquisition
//!
//! The core treats the disk data source as opaque text. [`CommandSource`]
//! runs an external program with a timeout and hands back its stdout; by
//! default that is a PowerShell probe over `Get-StorageReliabilityCounter`.

use crate::error::AcquisitionError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command as AsyncCommand;
use tracing::debug;

/// One line per physical disk, `" - "` separated, counters as `Name: value`
pub const POWERSHELL_PROBE_SCRIPT: &str = r#"
$disks = Get-PhysicalDisk;
if ($null -eq $disks) { exit 0; }
foreach ($disk in $disks) {
    try {
        $counters = $disk | Get-StorageReliabilityCounter;
        $deviceId = $disk.DeviceId;
        $model = $disk.Model.Trim();
        $mediaType = $disk.MediaType;
        $wear = $counters.Wear;
        $reallocated = $counters.ReallocatedSectors;
        $pending = $counters.CurrentPendingSectors;
        $uncorrected = $counters.ReadErrorsUncorrected;
        Write-Output "Disk[$deviceId]($model) - MediaType: $mediaType - Wear: $wear - ReallocatedSectors: $reallocated - PendingSectors: $pending - UncorrectedErrors: $uncorrected";
    } catch {
        Write-Output "Could not get counters for a disk. Skipping.";
    }
}
"#;

/// Supplier of raw, free-form health report text
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn acquire(&self) -> Result<String, AcquisitionError>;
}

/// Runs a program and returns its standard output
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// PowerShell with the reliability counter script
    pub fn powershell_probe() -> Self {
        let args = ["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", POWERSHELL_PROBE_SCRIPT]
            .into_iter()
            .map(String::from)
            .collect();
        Self::new("powershell", args, Duration::from_secs(120))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl HealthSource for CommandSource {
    async fn acquire(&self) -> Result<String, AcquisitionError> {
        let start_time = Instant::now();
        debug!("Running health probe: {} (timeout: {:?})", self.program, self.timeout);

        let mut command = AsyncCommand::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| AcquisitionError::Timeout {
                program: self.program.clone(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|source| AcquisitionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(AcquisitionError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!("Health probe finished in {}ms", start_time.elapsed().as_millis());
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str, timeout_secs: u64) -> CommandSource {
        let timeout = Duration::from_secs(timeout_secs);
        if cfg!(target_os = "windows") {
            CommandSource::new("cmd", vec!["/C".into(), script.into()], timeout)
        } else {
            CommandSource::new("sh", vec!["-c".into(), script.into()], timeout)
        }
    }

    #[tokio::test]
    async fn test_stdout_is_returned() {
        let raw = shell("echo Disk0 - Wear: 1", 5).acquire().await.unwrap();
        assert!(raw.contains("Disk0 - Wear: 1"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let source = CommandSource::new("diskwatch-no-such-binary", vec![], Duration::from_secs(5));
        let err = source.acquire().await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let err = shell("echo broken >&2; exit 3", 5).acquire().await.unwrap_err();
        match err {
            AcquisitionError::Failed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_probe_times_out() {
        let err = shell("sleep 10", 1).acquire().await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Timeout { secs: 1, .. }));
    }

    #[test]
    fn test_default_probe_is_powershell() {
        let source = CommandSource::powershell_probe();
        assert_eq!(source.program(), "powershell");
        assert!(source.args().last().unwrap().contains("Get-StorageReliabilityCounter"));
    }
}
