use std::path::PathBuf;

use anyhow::{Context, Result};
use glob::glob;

pub const TRANSCRIPT_EXTENSION: &str = "transcript";

/// Expand directories to the `*.transcript` files beneath them and keep
/// explicitly named transcript files. The result is sorted and deduplicated.
pub fn discover_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let pattern = format!("{}/**/*.{TRANSCRIPT_EXTENSION}", path.display());
            let entries =
                glob(&pattern).with_context(|| format!("invalid search path {}", path.display()))?;
            files.extend(entries.flatten());
        } else if path
            .extension()
            .is_some_and(|ext| ext == TRANSCRIPT_EXTENSION)
        {
            files.push(path.clone());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn finds_nested_transcripts_only() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("chapter");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("a.transcript"), "> 1\n1\n").unwrap();
        fs::write(nested.join("b.transcript"), "> 2\n2\n").unwrap();
        fs::write(nested.join("notes.txt"), "ignored").unwrap();

        let files = discover_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|f| f.file_name()?.to_str().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["a.transcript", "b.transcript"]);
    }

    #[test]
    fn explicit_files_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.transcript");
        fs::write(&file, "").unwrap();
        let files = discover_files(&[file.clone(), dir.path().to_path_buf()]).unwrap();
        assert_eq!(files, vec![file]);
    }
}
