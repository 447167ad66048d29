use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated XDG config and data directories for one binary run
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        std::fs::create_dir_all(temp_dir.path().join("config"))?;
        std::fs::create_dir_all(temp_dir.path().join("data"))?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_home(&self) -> PathBuf {
        self.path().join("config")
    }

    pub fn data_home(&self) -> PathBuf {
        self.path().join("data")
    }

    /// Write `$XDG_CONFIG_HOME/pve-user/config.toml`
    pub fn write_config(&self, contents: &str) -> Result<PathBuf> {
        let dir = self.config_home().join("pve-user");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("config.toml");
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn api_log_file(&self) -> PathBuf {
        self.data_home()
            .join("pve-user")
            .join("api_logs")
            .join("api_calls.jsonl")
    }
}
