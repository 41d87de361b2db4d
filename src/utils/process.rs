//! Child-process setup shared by every encoder/probe invocation

use std::process::Stdio;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Prepare a command for a headless run: no console window on Windows,
/// no stdin, output discarded, killed if its handle is dropped.
pub fn configure_headless(cmd: &mut tokio::process::Command) {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    hide_console_window(cmd);
}

/// Suppress the console window console binaries get when started from a GUI
pub fn hide_console_window(cmd: &mut tokio::process::Command) {
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}
