use std::path::{Path, PathBuf};

use crate::config::Config;

/// On-disk copies of generated images, kept only in development for inspection.
#[derive(Debug, Clone)]
pub struct LocalCopies {
    dir: PathBuf,
    enabled: bool,
}

impl LocalCopies {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.generations_dir.clone(), config.is_development())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the directory if local copies are enabled.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        if self.enabled && !tokio::fs::try_exists(&self.dir).await? {
            tokio::fs::create_dir_all(&self.dir).await?;
            tracing::info!(dir = %self.dir.display(), "Created local generations directory");
        }
        Ok(())
    }

    /// Writes `data` to `<dir>/<file_name>`; does nothing when disabled.
    pub async fn save(&self, file_name: &str, data: &[u8]) -> std::io::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.ensure_dir().await?;

        let path = self.dir.join(file_name);
        tokio::fs::write(&path, data).await?;
        tracing::info!(path = %path.display(), "Saved local copy of generated image");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enabled_copies_are_written_under_dir() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let copies = LocalCopies::new(temp.path().join("generations"), true);

        copies.ensure_dir().await?;
        copies.ensure_dir().await?;
        assert!(copies.dir().is_dir());

        copies.save("generated-1.png", b"png-bytes").await?;
        let path = temp.path().join("generations").join("generated-1.png");
        assert_eq!(std::fs::read(&path)?, b"png-bytes");
        Ok(())
    }

    #[tokio::test]
    async fn disabled_copies_touch_nothing() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let dir = temp.path().join("generations");
        let copies = LocalCopies::new(&dir, false);

        copies.ensure_dir().await?;
        copies.save("generated-1.png", b"png-bytes").await?;
        assert!(!dir.exists());
        Ok(())
    }
}
