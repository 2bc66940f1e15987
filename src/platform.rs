//! Platform detection utilities

use log::{debug, info};
use std::fs;
use std::path::Path;
use std::sync::Once;

/// WSLg exposes its PulseAudio server on this socket
const WSLG_PULSE_PATH: &str = "/mnt/wslg/PulseServer";

/// Operating system family, used to pick a playback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Windows: native sound API and PowerShell media objects first
    Windows,
    /// Linux, macOS, BSDs: cross-platform helper first, then CLI players
    Unix,
}

impl Platform {
    /// Detect the platform this process is running on
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS name (as in `std::env::consts::OS`) to a platform family
    pub fn from_os(os: &str) -> Self {
        if os.eq_ignore_ascii_case("windows") {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Detect if running in WSL (Windows Subsystem for Linux)
///
/// Checks for WSL-specific indicators in /proc/version and environment variables.
pub fn is_wsl() -> bool {
    // Check for WSL-specific indicators in /proc/version
    if let Ok(contents) = fs::read_to_string("/proc/version") {
        let lower = contents.to_lowercase();
        if lower.contains("microsoft") || lower.contains("wsl") {
            return true;
        }
    }

    // Check for WSL environment variable
    std::env::var("WSL_DISTRO_NAME").is_ok()
}

static WSL_AUDIO: Once = Once::new();

/// Point child audio players at the WSLg PulseAudio server
///
/// Only touches the environment when running under WSL, `PULSE_SERVER`
/// is unset and the WSLg socket exists. Runs at most once per process;
/// later calls return immediately.
pub fn prepare_wsl_audio() {
    WSL_AUDIO.call_once(set_wsl_pulse_server);
}

fn set_wsl_pulse_server() {
    if !is_wsl() {
        return;
    }

    if std::env::var("PULSE_SERVER").is_ok() {
        debug!("PULSE_SERVER already set via environment");
        return;
    }

    if Path::new(WSLG_PULSE_PATH).exists() {
        info!("Auto-detected WSLG PulseAudio server at {}", WSLG_PULSE_PATH);
        std::env::set_var("PULSE_SERVER", WSLG_PULSE_PATH);
    } else {
        debug!("WSLG PulseAudio server not found at {}", WSLG_PULSE_PATH);
    }
}
