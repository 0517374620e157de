//! Side effects of a scan result: clipboard copy and link navigation.

use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;
use wl_clipboard_rs::copy::{MimeType, Options, ServeRequests, Source};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("cannot open link: {0}")]
    Navigation(String),
}

pub trait Clipboard: Send + Sync {
    fn copy_text(&self, text: &str) -> Result<(), ActionError>;
}

pub trait Navigator: Send + Sync {
    fn open(&self, url: &str) -> Result<(), ActionError>;
}

/// Copies through `wl-copy`, falling back to the `wl-clipboard-rs` library
/// when the command is missing or fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy_text(&self, text: &str) -> Result<(), ActionError> {
        match pipe_to("wl-copy", &[], text) {
            Ok(()) => {
                log::debug!("Copied {} bytes via wl-copy", text.len());
                Ok(())
            }
            Err(cmd_err) => {
                log::warn!(
                    "wl-copy failed ({}), falling back to wl-clipboard-rs",
                    cmd_err
                );
                copy_via_library(text).map_err(|lib_err| {
                    ActionError::Clipboard(format!(
                        "wl-copy failed: {} ; wl-clipboard-rs failed: {}",
                        cmd_err, lib_err
                    ))
                })?;
                log::debug!("Copied {} bytes via wl-clipboard-rs", text.len());
                Ok(())
            }
        }
    }
}

/// Offers `text` on the Wayland clipboard until it is pasted once.
fn copy_via_library(text: &str) -> Result<(), String> {
    let mut opts = Options::new();
    opts.serve_requests(ServeRequests::Only(1));
    opts.copy(Source::Bytes(text.as_bytes().into()), MimeType::Text)
        .map_err(|e| e.to_string())
}

fn pipe_to(program: &str, args: &[&str], text: &str) -> Result<(), String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn {} (is it installed?): {}", program, e))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| format!("failed to write to {} stdin: {}", program, e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("failed to wait for {}: {}", program, e))?;
    if !output.status.success() {
        return Err(format!(
            "{} failed: {}",
            program,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(())
}

/// Hands links to the desktop's default browser.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemNavigator;

impl Navigator for SystemNavigator {
    fn open(&self, url: &str) -> Result<(), ActionError> {
        let mut command = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        } else {
            Command::new("xdg-open")
        };

        let status = command
            .arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| ActionError::Navigation(format!("failed to launch browser: {}", e)))?;

        if status.success() {
            log::info!("Opened {}", url);
            Ok(())
        } else {
            Err(ActionError::Navigation(format!(
                "browser launcher exited with {}",
                status
            )))
        }
    }
}
