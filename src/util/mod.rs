mod error;
pub mod queue;

pub use error::EditorError;

use std::io::Write;
use std::path::Path;

/// Writes `contents` next to `path` and moves it into place, so a crash halfway through never
/// leaves a truncated file behind
pub fn write_with_temp_file(path: &Path, contents: &[u8]) -> Result<(), EditorError> {
    let dirname = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = tempfile::NamedTempFile::new_in(dirname)?;
    temp_file.write_all(contents)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path)?;

    Ok(())
}

#[test]
fn test_write_with_temp_file() -> Result<(), EditorError> {
    let base_dir = tempfile::TempDir::new()?;
    let path = base_dir.path().join("bundle.toml");

    write_with_temp_file(&path, b"first")?;
    write_with_temp_file(&path, b"second")?;

    assert_eq!(std::fs::read_to_string(&path)?, "second");
    // only the real file should be left behind
    assert_eq!(std::fs::read_dir(base_dir.path())?.count(), 1);

    Ok(())
}
