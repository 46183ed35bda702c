//! Printing hand-off.
//!
//! The session writes a flattened copy of the document to a temp file; this
//! module passes that file to the platform's default PDF handler, whose own
//! print dialog takes over from there.

use anyhow::{bail, Context};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Program and arguments that open `path` with the default application.
pub fn open_command(path: &Path) -> (OsString, Vec<OsString>) {
    let file = path.as_os_str().to_os_string();
    if cfg!(target_os = "windows") {
        (
            "cmd".into(),
            vec!["/C".into(), "start".into(), "".into(), file],
        )
    } else if cfg!(target_os = "macos") {
        ("open".into(), vec![file])
    } else {
        ("xdg-open".into(), vec![file])
    }
}

/// Open the print copy in the system viewer.
pub fn print_pdf(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        bail!("print copy {} does not exist", path.display());
    }
    let (program, args) = open_command(path);
    tracing::info!("Handing {} to {:?}", path.display(), program);

    let status = Command::new(&program)
        .args(&args)
        .status()
        .with_context(|| format!("Failed to execute print command {:?}", program))?;
    if !status.success() {
        bail!("{:?} exited with {}", program, status);
    }
    Ok(())
}
