use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use boot_model::Config;
use tempfile::TempDir;
use tracing::warn;

use crate::BootError;

pub(crate) const CONFIG_FILE: &str = "config.yml";
const PREFIX: &str = "arvados-server-boot-";

/// Per-run scratch directory: generated config, certificates, volumes and installed binaries.
///
/// Removed when dropped; [`close`](Self::close) does the same but logs a failure.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Fresh directory under the system temp dir, with an empty `bin/`.
    pub fn create() -> Result<Self, BootError> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir()
            .map_err(|e| BootError::io("create workspace", e))?;
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).map_err(|e| BootError::io(bin.display().to_string(), e))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path().join("bin")
    }

    pub fn config_file(&self) -> PathBuf {
        self.path().join(CONFIG_FILE)
    }

    /// Write `config` as JSON to the config file and return its path.
    pub fn write_config(&self, config: &Config) -> Result<PathBuf, BootError> {
        let path = self.config_file();
        let file = File::create(&path).map_err(|e| BootError::io(path.display().to_string(), e))?;
        let mut w = BufWriter::new(file);
        config.write_json(&mut w)?;
        w.flush()
            .map_err(|e| BootError::io(path.display().to_string(), e))?;
        Ok(path)
    }

    /// Remove the directory; failure is logged, not returned.
    pub fn close(self) {
        let path = self.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(target: "boot.core", path = %path.display(), error = %e, "cannot remove workspace");
        }
    }
}
