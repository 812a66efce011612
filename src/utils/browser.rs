use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Open a documentation page, optionally at an anchor.
///
/// `browser` may carry arguments (`"firefox --new-tab"`); the target is
/// appended as the last argument.
pub fn open_page(browser: &str, page: &Path, anchor: Option<&str>) -> Result<()> {
    let page = page.canonicalize().unwrap_or_else(|_| page.to_path_buf());
    let target = page_url(&page, anchor);
    let mut parts = browser.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("Empty browser command");
    };

    Command::new(program)
        .args(parts)
        .arg(&target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to launch '{}'", program))?;

    Ok(())
}

/// `file://` URL for a local page, with the anchor appended
pub fn page_url(page: &Path, anchor: Option<&str>) -> String {
    let path = page.to_string_lossy().replace('\\', "/");
    let prefix = if path.starts_with('/') { "file://" } else { "file:///" };
    match anchor {
        Some(anchor) => format!("{}{}#{}", prefix, path, anchor),
        None => format!("{}{}", prefix, path),
    }
}
