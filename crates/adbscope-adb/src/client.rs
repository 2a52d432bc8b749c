use futures::Stream;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::process::{Child, ChildStdout, Command};

use adbscope_logs::{LineStream, ProcessListError, ProcessSource, line_stream};

/// Default adb executable, resolved through PATH
const ADB_PROGRAM: &str = "adb";

/// Errors talking to adb or selecting a device
#[derive(Debug, Error)]
pub enum AdbError {
    #[error("adb command not found in PATH")]
    NotFound,

    #[error("failed to run adb")]
    Spawn(#[source] io::Error),

    #[error("adb {command} failed: {message}")]
    CommandFailed {
        command: &'static str,
        message: String,
    },

    #[error("no device connected")]
    NoDevice,

    #[error("device '{0}' is not connected")]
    UnknownDevice(String),

    #[error("multiple devices found ({}), select one with --device", .0.join(", "))]
    MultipleDevices(Vec<String>),

    #[error("device '{serial}' is not usable: {state}")]
    Unavailable { serial: String, state: DeviceState },
}

/// Connection state reported by `adb devices`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Device,
    Unauthorized,
    Offline,
    NoPermissions,
    Other(String),
}

impl From<&str> for DeviceState {
    fn from(s: &str) -> Self {
        match s {
            "device" => Self::Device,
            "unauthorized" => Self::Unauthorized,
            "offline" => Self::Offline,
            s if s.starts_with("no permissions") => Self::NoPermissions,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device => write!(f, "online"),
            Self::Unauthorized => write!(f, "unauthorized (accept the debugging prompt on the device)"),
            Self::Offline => write!(f, "offline"),
            Self::NoPermissions => write!(f, "no permissions for device"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A device listed by `adb devices`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial: String,
    pub state: DeviceState,
}

impl DeviceInfo {
    pub fn new(serial: String, state: DeviceState) -> Self {
        Self { serial, state }
    }
}

/// Parse `adb devices` output, skipping daemon notices and the header
pub fn parse_devices(output: &str) -> Vec<DeviceInfo> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !line.starts_with('*') && !line.starts_with("List of devices")
        })
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.collect::<Vec<_>>().join(" ");
            let state = if serial.chars().all(|c| c == '?') {
                DeviceState::NoPermissions
            } else {
                DeviceState::from(state.as_str())
            };
            Some(DeviceInfo::new(serial.to_string(), state))
        })
        .collect()
}

/// Client for the adb executable
#[derive(Clone, Debug)]
pub struct AdbClient {
    program: String,
}

impl Default for AdbClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AdbClient {
    pub fn new() -> Self {
        Self::with_program(ADB_PROGRAM)
    }

    /// Use a specific adb executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check that adb can be executed
    pub async fn ensure_available(&self) -> Result<(), AdbError> {
        let status = Command::new(&self.program)
            .arg("version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => AdbError::NotFound,
                _ => AdbError::Spawn(e),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(AdbError::CommandFailed {
                command: "version",
                message: status.to_string(),
            })
        }
    }

    /// List attached devices
    pub async fn devices(&self) -> Result<Vec<DeviceInfo>, AdbError> {
        let output = Command::new(&self.program)
            .arg("devices")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(AdbError::Spawn)?;

        if !output.status.success() {
            return Err(AdbError::CommandFailed {
                command: "devices",
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_devices(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Pick the device to read from
    ///
    /// A requested serial must be present; otherwise exactly one device must be attached.
    pub fn select_device(
        devices: &[DeviceInfo],
        requested: Option<&str>,
    ) -> Result<DeviceInfo, AdbError> {
        let device = match requested {
            Some(serial) => devices
                .iter()
                .find(|d| d.serial == serial)
                .ok_or_else(|| AdbError::UnknownDevice(serial.to_string()))?,
            None => match devices {
                [] => return Err(AdbError::NoDevice),
                [device] => device,
                _ => {
                    return Err(AdbError::MultipleDevices(
                        devices.iter().map(|d| d.serial.clone()).collect(),
                    ));
                }
            },
        };

        if device.state != DeviceState::Device {
            return Err(AdbError::Unavailable {
                serial: device.serial.clone(),
                state: device.state.clone(),
            });
        }

        Ok(device.clone())
    }

    /// Start `logcat -v threadtime` on a device
    pub fn logcat(&self, serial: &str) -> Result<Logcat, AdbError> {
        tracing::debug!(serial, "starting logcat");
        let mut child = Command::new(&self.program)
            .args(["-s", serial, "logcat", "-v", "threadtime"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(AdbError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AdbError::Spawn(io::Error::other("logcat stdout not captured")))?;

        Ok(Logcat {
            child,
            lines: line_stream(stdout),
        })
    }

    /// Process table source for a device (or adb's default device)
    pub fn process_source(&self, serial: Option<String>) -> AdbProcessSource {
        AdbProcessSource {
            program: self.program.clone(),
            serial,
        }
    }
}

/// Running logcat process and its output lines
///
/// The process is killed when this is dropped.
pub struct Logcat {
    child: Child,
    lines: LineStream<ChildStdout>,
}

impl Logcat {
    /// Process id of the adb client
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

impl Stream for Logcat {
    type Item = io::Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().lines).poll_next(cx)
    }
}

/// Reads the device process table through `adb shell ps`
#[derive(Clone, Debug)]
pub struct AdbProcessSource {
    program: String,
    serial: Option<String>,
}

impl AdbProcessSource {
    async fn run_ps(&self, extra: &[&str]) -> Result<String, ProcessListError> {
        let mut command = Command::new(&self.program);
        if let Some(serial) = &self.serial {
            command.arg("-s").arg(serial);
        }
        let output = command
            .args(["shell", "ps"])
            .args(extra)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(ProcessListError::Spawn)?;

        if !output.status.success() {
            return Err(ProcessListError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ProcessSource for AdbProcessSource {
    async fn process_table(&self) -> Result<String, ProcessListError> {
        // Toybox ps only lists the shell's own processes without -A;
        // older toolbox ps lists everything but does not understand -A
        match self.run_ps(&["-A"]).await {
            Ok(table) if table.lines().count() > 1 => Ok(table),
            _ => self.run_ps(&[]).await,
        }
    }
}
