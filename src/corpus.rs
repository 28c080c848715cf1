//! Finding the training files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, WordVecError};

/// Lists the files to train on.
///
/// A file path is used as-is. For a directory, every regular file directly
/// inside it whose name starts with `prefix` is used, sorted by name so runs
/// are repeatable. An empty prefix matches every file.
pub fn collect_files(path: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let metadata = fs::metadata(path).map_err(|err| WordVecError::io(err, path))?;
    if metadata.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let io_err = |err: io::Error| WordVecError::io(err, path);
    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let entry_path = entry.path();
        let matches = entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.starts_with(prefix));
        if matches && entry_path.is_file() {
            files.push(entry_path);
        }
    }
    if files.is_empty() {
        return Err(WordVecError::InvalidConfig(format!(
            "no files starting with {prefix:?} in {path:?}"
        )));
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn single_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        fs::write(&path, "a b c\n").unwrap();
        assert_eq!(collect_files(&path, "ignored").unwrap(), vec![path]);
    }

    #[test]
    fn directory_with_prefix() {
        let dir = tempdir().unwrap();
        for name in ["part-2", "part-0", "part-1", "README"] {
            fs::write(dir.path().join(name), "x\n").unwrap();
        }
        fs::create_dir(dir.path().join("part-dir")).unwrap();

        let files = collect_files(dir.path(), "part-").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["part-0", "part-1", "part-2"]);

        assert_eq!(collect_files(dir.path(), "").unwrap().len(), 4);
    }

    #[test]
    fn no_matching_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("other"), "x\n").unwrap();
        assert!(matches!(
            collect_files(dir.path(), "part-"),
            Err(WordVecError::InvalidConfig(_))
        ));
        assert!(matches!(
            collect_files(&dir.path().join("missing"), ""),
            Err(WordVecError::Io { .. })
        ));
    }
}
