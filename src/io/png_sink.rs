//! Debug-image sink.
//!
//! Files are written as `<root>/<path...>/<name>.png`; intermediate directories are
//! created on demand with [`std::fs::create_dir_all`], which tolerates several workers
//! creating the same directory concurrently.
use std::fmt::Display;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

use crate::hitsieve_errors::HitSieveError;

/// Build the target path `<root>/<path...>/<name>.png`.
pub fn png_path<S: AsRef<str>>(root: &Utf8Path, path: &[S], name: impl Display) -> Utf8PathBuf {
    let mut dir = root.to_path_buf();
    for part in path {
        dir.push(part.as_ref());
    }
    dir.join(format!("{name}.png"))
}

/// Write an already encoded PNG payload under `root`.
pub fn store_png<S: AsRef<str>>(
    root: &Utf8Path,
    path: &[S],
    name: impl Display,
    png: &[u8],
) -> Result<(), HitSieveError> {
    let file = png_path(root, path, name);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file, png)?;
    debug!("debug image written to {file}");
    Ok(())
}

#[cfg(test)]
mod png_sink_test {
    use super::*;

    #[test]
    fn test_png_path_layout() {
        let p = png_path(Utf8Path::new("/out"), &["reconstruct", "edge", "12"], 42);
        assert_eq!(p, Utf8PathBuf::from("/out/reconstruct/edge/12/42.png"));
    }

    #[test]
    fn test_store_png_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        store_png(&root, &["a", "b"], "frame", b"payload").unwrap();

        let written = fs::read(root.join("a/b/frame.png")).unwrap();
        assert_eq!(written, b"payload");
    }
}
