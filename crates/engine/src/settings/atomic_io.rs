use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub(crate) fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path_for(path);
    fs::write(&staging, text.as_bytes())?;
    if let Err(error) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(error);
    }
    Ok(())
}

fn staging_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "settings".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_replaces_existing_file_and_leaves_no_staging() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("nested").join("prefs.json");

        write_text_atomic(&target, "first").expect("first write");
        write_text_atomic(&target, "second").expect("second write");

        assert_eq!(fs::read_to_string(&target).expect("read"), "second");
        assert!(!staging_path_for(&target).exists());
    }
}
