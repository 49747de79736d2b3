//! Open the OAuth consent URL in the default browser.
//!
//! The consent URL carries several `&`-joined query pairs. Anything that
//! goes through `cmd /c start` cuts it at the first `&`, so Windows (and
//! WSL) hand the URL to PowerShell as a single quoted literal instead.

use std::process::{Command, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Platform {
    Windows,
    MacOs,
    Wsl,
    Linux,
    Other,
}

impl Platform {
    fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            if is_wsl() {
                Platform::Wsl
            } else {
                Platform::Linux
            }
        } else {
            Platform::Other
        }
    }
}

/// Detect WSL by looking for "microsoft" or "WSL" in `/proc/version`.
fn is_wsl() -> bool {
    std::fs::read_to_string("/proc/version")
        .map(|v| {
            let v = v.to_lowercase();
            v.contains("microsoft") || v.contains("wsl")
        })
        .unwrap_or(false)
}

/// One way of launching a browser
#[derive(Debug, PartialEq, Eq)]
struct Launcher {
    program: &'static str,
    args: Vec<String>,
    current_dir: Option<&'static str>,
}

impl Launcher {
    fn new(program: &'static str, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            current_dir: None,
        }
    }

    fn spawn(&self) -> bool {
        let mut command = Command::new(self.program);
        command
            .args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = self.current_dir {
            command.current_dir(dir);
        }
        command.spawn().is_ok()
    }
}

/// `Start-Process '<url>'`, with single quotes doubled for PowerShell.
fn powershell_start(program: &'static str, url: &str) -> Launcher {
    let literal = url.replace('\'', "''");
    Launcher::new(
        program,
        vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
            format!("Start-Process '{}'", literal),
        ],
    )
}

/// Launchers to try in order for `platform`.
fn launchers(url: &str, platform: Platform) -> Vec<Launcher> {
    match platform {
        Platform::Windows => vec![
            powershell_start("powershell", url),
            // Receives the URL as one argument, no shell parsing
            Launcher::new(
                "rundll32",
                vec!["url.dll,FileProtocolHandler".to_string(), url.to_string()],
            ),
        ],
        Platform::MacOs => vec![Launcher::new("open", vec![url.to_string()])],
        Platform::Wsl => vec![
            Launcher::new("wslview", vec![url.to_string()]),
            Launcher {
                current_dir: Some("/mnt/c/"),
                ..powershell_start("powershell.exe", url)
            },
        ],
        Platform::Linux => vec![Launcher::new("xdg-open", vec![url.to_string()])],
        Platform::Other => Vec::new(),
    }
}

/// Open `url` in the default browser.
///
/// Returns `true` when a launcher process was spawned. A `false` return
/// means the caller should print the URL for the user to open by hand.
pub fn open_browser(url: &str) -> bool {
    let platform = Platform::current();
    for launcher in launchers(url, platform) {
        if launcher.spawn() {
            tracing::debug!("Browser launched with {}", launcher.program);
            return true;
        }
        tracing::debug!("{} not available", launcher.program);
    }
    false
}
