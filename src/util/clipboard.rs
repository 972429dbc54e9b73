//! Clipboard hand-off through whichever copy tool the desktop provides.

use anyhow::{bail, Context, Result};
use std::io::{self, Write};
use std::process::{Command, Stdio};

/// Tried in order; the first one that exists wins.
const COPY_TOOLS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
];

pub fn copy(text: &str) -> Result<()> {
    for (program, args) in COPY_TOOLS {
        if pipe_to(program, args, text)? {
            return Ok(());
        }
    }
    bail!("no clipboard tool found (install wl-copy, xclip, xsel or pbcopy)");
}

/// Feed `text` to `program` on stdin. `Ok(false)` if the program is missing.
fn pipe_to(program: &str, args: &[&str], text: &str) -> Result<bool> {
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("run {}", program)),
    };

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .with_context(|| format!("write to {}", program))?;
    }

    let status = child.wait().with_context(|| format!("wait for {}", program))?;
    if !status.success() {
        bail!("{} failed: {}", program, status);
    }
    Ok(true)
}
