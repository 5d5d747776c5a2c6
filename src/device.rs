//! Device selection and host driver management.

use crate::consts;
use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::process::Command;

/// Channel of a multi-channel FTDI part. The FT232H only has `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channel {
    #[default]
    A,
    B,
    C,
    D,
}

/// Which USB device to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSelector {
    pub vid: u16,
    pub pid: u16,
    pub channel: Channel,
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self::ft232h()
    }
}

impl DeviceSelector {
    pub fn new(vid: u16, pid: u16) -> Self {
        Self {
            vid,
            pid,
            channel: Channel::default(),
        }
    }

    /// `0403:6014`, channel A.
    pub fn ft232h() -> Self {
        Self::new(consts::FTDI_VID, consts::FT232H_PID)
    }

    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }
}

/// Why a USB open failed, as far as a caller can act on it.
#[cfg_attr(not(feature = "libftdi"), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenFailure {
    NotFound,
    /// Present but not accessible: missing udev rule, or a kernel driver holds it.
    AccessDenied,
}

impl OpenFailure {
    /// Sorts a libftdi open failure by its message. `None` for anything that
    /// is neither a missing device nor an access problem.
    #[cfg_attr(not(feature = "libftdi"), allow(dead_code))]
    pub(crate) fn classify(message: &str) -> Option<Self> {
        let message = message.to_ascii_lowercase();
        if message.contains("not found") {
            Some(Self::NotFound)
        } else if ["claim", "usb_open", "access", "permission"]
            .iter()
            .any(|needle| message.contains(needle))
        {
            Some(Self::AccessDenied)
        } else {
            None
        }
    }
}

impl DeviceSelector {
    #[cfg_attr(not(feature = "libftdi"), allow(dead_code))]
    pub(crate) fn open_error(&self, failure: OpenFailure, message: String) -> Error {
        match failure {
            OpenFailure::NotFound => Error::DeviceNotFound {
                vid: self.vid,
                pid: self.pid,
                message,
            },
            OpenFailure::AccessDenied => Error::PermissionDenied(format!(
                "cannot open device {:04X}:{:04X} ({}); check udev rules, or unload the kernel serial driver",
                self.vid, self.pid, message
            )),
        }
    }
}

/// Options applied while opening a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptions {
    /// Unload the kernel serial drivers that claim FTDI parts before opening,
    /// and reload them on close. Needs root. Unnecessary with proper udev rules.
    pub unload_drivers: bool,
}

/// Keeps the platform serial drivers unloaded for its lifetime.
#[derive(Debug)]
pub struct DriverGuard {
    reloaded: bool,
}

impl DriverGuard {
    /// Unloads `ftdi_sio`/`usbserial` (Linux) or the Apple FTDI kext (macOS).
    pub fn unload() -> Result<Self> {
        let commands = platform_commands(false);
        if commands.is_empty() {
            debug!("No serial drivers to unload on this platform");
            return Ok(Self { reloaded: false });
        }
        if !is_privileged() {
            return Err(Error::PermissionDenied(
                "unloading serial drivers requires running as root".to_string(),
            ));
        }
        for args in commands {
            run(&args)?;
        }
        info!("Platform serial drivers unloaded");
        Ok(Self { reloaded: false })
    }

    /// Loads the drivers back. Called by `Mpsse::close`; also runs on drop.
    pub fn reload(&mut self) -> Result<()> {
        if self.reloaded {
            return Ok(());
        }
        self.reloaded = true;
        for args in platform_commands(true) {
            run(&args)?;
        }
        info!("Platform serial drivers reloaded");
        Ok(())
    }
}

impl Drop for DriverGuard {
    fn drop(&mut self) {
        if let Err(e) = self.reload() {
            warn!("Failed to reload serial drivers: {}", e);
        }
    }
}

fn platform_commands(load: bool) -> Vec<Vec<&'static str>> {
    if cfg!(target_os = "linux") {
        if load {
            vec![
                vec!["modprobe", "-q", "ftdi_sio"],
                vec!["modprobe", "-q", "usbserial"],
            ]
        } else {
            vec![
                vec!["modprobe", "-r", "-q", "ftdi_sio"],
                vec!["modprobe", "-r", "-q", "usbserial"],
            ]
        }
    } else if cfg!(target_os = "macos") {
        let tool = if load { "kextload" } else { "kextunload" };
        vec![
            vec![tool, "-b", "com.apple.driver.AppleUSBFTDI"],
            vec![tool, "/System/Library/Extensions/FTDIUSBSerialDriver.kext"],
        ]
    } else {
        Vec::new()
    }
}

fn run(args: &[&str]) -> Result<()> {
    let Some((program, rest)) = args.split_first() else {
        return Ok(());
    };
    debug!("Running {:?}", args);
    let output = Command::new(program).args(rest).output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::PermissionDenied(format!(
            "`{}` failed ({}): {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

#[cfg(unix)]
fn is_privileged() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
fn is_privileged() -> bool {
    false
}
