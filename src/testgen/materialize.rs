use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/* ============================================================
   Public entry
   ============================================================ */

/// Replace the test file with `test_code` in one step.
///
/// The code goes to a sibling temp file first and is renamed over the target,
/// so the compiler never sees a half-written file and a failed write leaves
/// the previous version in place.
pub fn materialize_test(path: &Path, test_code: &str) -> io::Result<()> {
    ensure_parent_dir(path)?;

    let tmp = temp_sibling(path);
    let written = write_all(&tmp, test_code.trim());

    if let Err(e) = written.and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    Ok(())
}

/* ============================================================
   Helpers
   ============================================================ */

fn write_all(path: &Path, content: &str) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("test");

    path.with_file_name(format!(".{name}.tmp"))
}

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrites_whole_file_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_sample.c");
        fs::write(&path, "old contents that are much longer than the new ones").unwrap();

        materialize_test(&path, "\n  int main() {}\n\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "int main() {}");
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input/nested/test_sample.c");

        materialize_test(&path, "x").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x");
    }
}
