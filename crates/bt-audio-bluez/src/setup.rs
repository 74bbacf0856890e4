//! Host setup verification for the A2DP sink.
//!
//! Checks that BlueZ is installed and running and that GStreamer provides the
//! elements the decode pipelines are built from.

use std::process::Command;

/// Status of a system component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentStatus {
    /// Component is installed and running.
    Ok,
    /// Component is installed but not running.
    NotRunning,
    /// Component is not installed.
    NotInstalled,
    /// Unable to determine status.
    Unknown,
}

/// A single setup issue with suggested fix.
#[derive(Debug, Clone)]
pub struct SetupIssue {
    /// Description of the issue.
    pub description: String,
    /// Suggested command to fix the issue.
    pub fix_command: Option<String>,
}

/// Overall host setup status.
#[derive(Debug, Clone)]
pub struct SetupStatus {
    /// BlueZ daemon status.
    pub bluez: ComponentStatus,
    /// GStreamer tooling status.
    pub gstreamer: ComponentStatus,
    /// Pipeline elements that could not be found.
    pub missing_elements: Vec<String>,
    /// List of issues found.
    pub issues: Vec<SetupIssue>,
    /// Whether the host is ready to act as an audio sink.
    pub ready: bool,
}

impl SetupStatus {
    /// Get a summary message for the status.
    pub fn summary(&self) -> String {
        if self.ready {
            "System is ready for Bluetooth audio".to_string()
        } else {
            format!("{} issue(s) found", self.issues.len())
        }
    }
}

/// Package providing `element`, for the suggested fix.
pub fn package_for(element: &str) -> &'static str {
    match element {
        "avdtpsrc" | "sbcparse" | "sbcdec" => "gstreamer1.0-plugins-bad",
        "avdec_aac" => "gstreamer1.0-libav",
        "rtpjitterbuffer" | "rtpsbcdepay" | "rtpmp4adepay" => "gstreamer1.0-plugins-good",
        "alsasink" | "audioconvert" => "gstreamer1.0-plugins-base",
        "pulsesink" => "gstreamer1.0-pulseaudio",
        _ => "gstreamer1.0-plugins-bad",
    }
}

/// Host setup verification.
pub struct SystemSetup;

impl SystemSetup {
    /// Check BlueZ and the given GStreamer element factories.
    pub fn check(elements: &[&str]) -> SetupStatus {
        let mut issues = Vec::new();

        let bluez = Self::check_bluez();
        if bluez != ComponentStatus::Ok {
            issues.push(SetupIssue {
                description: match bluez {
                    ComponentStatus::NotInstalled => "BlueZ is not installed".to_string(),
                    ComponentStatus::NotRunning => "Bluetooth service is not running".to_string(),
                    _ => "BlueZ status unknown".to_string(),
                },
                fix_command: Some(match bluez {
                    ComponentStatus::NotInstalled => "sudo apt install bluez".to_string(),
                    ComponentStatus::NotRunning => "sudo systemctl start bluetooth".to_string(),
                    _ => "sudo systemctl status bluetooth".to_string(),
                }),
            });
        }

        let gstreamer = if Self::has_command("gst-inspect-1.0") {
            ComponentStatus::Ok
        } else {
            ComponentStatus::NotInstalled
        };

        let mut missing_elements = Vec::new();
        if gstreamer == ComponentStatus::Ok {
            for element in elements {
                if !Self::has_element(element) {
                    issues.push(SetupIssue {
                        description: format!("GStreamer element {} is missing", element),
                        fix_command: Some(format!("sudo apt install {}", package_for(element))),
                    });
                    missing_elements.push(element.to_string());
                }
            }
        } else {
            issues.push(SetupIssue {
                description: "GStreamer tools are not installed".to_string(),
                fix_command: Some("sudo apt install gstreamer1.0-tools".to_string()),
            });
        }

        let ready = issues.is_empty();

        SetupStatus {
            bluez,
            gstreamer,
            missing_elements,
            issues,
            ready,
        }
    }

    /// Check BlueZ daemon status.
    fn check_bluez() -> ComponentStatus {
        // bluetoothctl ships with BlueZ
        if !Self::has_command("bluetoothctl") {
            return ComponentStatus::NotInstalled;
        }

        let running = Command::new("systemctl")
            .args(["is-active", "--quiet", "bluetooth"])
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        if running {
            ComponentStatus::Ok
        } else {
            ComponentStatus::NotRunning
        }
    }

    fn has_command(name: &str) -> bool {
        Command::new("which")
            .arg(name)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn has_element(factory: &str) -> bool {
        Command::new("gst-inspect-1.0")
            .args(["--exists", factory])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}
