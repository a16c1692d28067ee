//! Shell-outs to the file manager, the editor and the clipboard

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use which::which;

/// Editor used by `edit` when `$EDITOR` is unset
pub const FALLBACK_EDITOR: &str = "code";

fn folder_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

fn clipboard_command() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "macos") {
        ("pbcopy", &[])
    } else if cfg!(target_os = "windows") {
        ("clip", &[])
    } else {
        ("xclip", &["-selection", "clipboard"])
    }
}

/// Splits an editor setting such as `code --wait` into program and arguments
pub fn split_command(command: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Returns `$EDITOR` if set and not blank
pub fn env_editor() -> Option<String> {
    std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
}

/// Opens a directory in the platform file manager
pub fn open_folder(dir: &Path) -> Result<()> {
    let program = folder_opener();
    // explorer exits non-zero even on success
    Command::new(program)
        .arg(dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("Failed to run {}", program))?;
    Ok(())
}

/// Opens a file in an editor and waits for it to exit
pub fn open_in_editor(editor: &str, path: &Path) -> Result<()> {
    let Some((program, args)) = split_command(editor) else {
        bail!("Empty editor command");
    };

    let status = Command::new(program)
        .args(args)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", program))?;

    if !status.success() {
        bail!("Editor {} exited with {}", program, status);
    }
    Ok(())
}

/// Pipes `text` into the platform clipboard tool
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let (program, args) = clipboard_command();
    let path = which(program).with_context(|| format!("{} not found in PATH", program))?;

    let mut child = Command::new(path)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to run {}", program))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .context("Failed to write to clipboard")?;
    }

    let status = child.wait().context("Clipboard command failed")?;
    if !status.success() {
        bail!("{} exited with {}", program, status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_with_arguments() {
        assert_eq!(split_command("code --wait"), Some(("code", vec!["--wait"])));
        assert_eq!(split_command("  vim "), Some(("vim", vec![])));
        assert_eq!(split_command("   "), None);
    }
}
