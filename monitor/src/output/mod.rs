//! Append-only plain-text report file

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct ReportFile {
    path: PathBuf,
}

impl ReportFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one report block, creating the file (and its directory) if needed
    pub fn append(&self, block: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create report directory {:?}", parent))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open report file {:?}", self.path))?;

        file.write_all(block.as_bytes())?;
        if !block.ends_with('\n') {
            file.write_all(b"\n")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let report = ReportFile::new(dir.path().join("reports/daily_stats.log"));

        report.append("first block\n").unwrap();
        report.append("second block").unwrap();

        let contents = std::fs::read_to_string(report.path()).unwrap();
        assert_eq!(contents, "first block\nsecond block\n");
    }

    #[test]
    fn test_existing_content_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_stats.log");
        std::fs::write(&path, "older report\n").unwrap();

        ReportFile::new(&path).append("newer report\n").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("older report\n"));
        assert!(contents.ends_with("newer report\n"));
    }
}
