use std::path::{Path, PathBuf};

use fs_err as fs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use snafu::prelude::*;

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(transparent)]
    IoError { source: std::io::Error },
    #[snafu(display("invalid config {}: {source}", path.display()))]
    InvalidConfig {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    pub output_dir: PathBuf,
    /// Width of the `=` dividers around report sections.
    pub divider_width: usize,
    pub kinds: ExportKinds,
    /// Force the coordinate width instead of deriving it from the asset's version.
    pub large_world_coordinates: Option<bool>,
    /// Force the `SetArray` encoding instead of deriving it from the asset's version.
    pub legacy_set_array: Option<bool>,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            output_dir: "dump".into(),
            divider_width: 80,
            kinds: ExportKinds::default(),
            large_world_coordinates: None,
            legacy_set_array: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportKinds {
    pub classes: bool,
    pub functions: bool,
    pub structs: bool,
    pub enums: bool,
}

impl Default for ExportKinds {
    fn default() -> Self {
        Self {
            classes: true,
            functions: true,
            structs: true,
            enums: true,
        }
    }
}

/// A config together with the file it was read from.
pub struct ConfigFile<C: Default + Serialize + DeserializeOwned> {
    path: PathBuf,
    config: C,
}

impl<C: Default + Serialize + DeserializeOwned> ConfigFile<C> {
    pub fn new<P: AsRef<Path>>(path: P, config: C) -> Self {
        Self {
            config,
            path: path.as_ref().to_path_buf(),
        }
    }
    /// A missing file yields the default config; a malformed one is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match fs::read(path) {
            Ok(data) => serde_json::from_slice(&data).context(InvalidConfigSnafu { path })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => C::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::new(path, config))
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&self.config).context(InvalidConfigSnafu {
            path: &self.path,
        })?;
        fs::write(&self.path, data)?;
        Ok(())
    }
    pub fn into_inner(self) -> C {
        self.config
    }
}

impl<C: Default + Serialize + DeserializeOwned> std::ops::Deref for ConfigFile<C> {
    type Target = C;
    fn deref(&self) -> &Self::Target {
        &self.config
    }
}

impl<C: Default + Serialize + DeserializeOwned> std::ops::DerefMut for ConfigFile<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.config
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::<DumpConfig>::load_or_default(dir.path().join("c.json")).unwrap();
        assert_eq!(*config, DumpConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, r#"{ "divider_width": 40, "kinds": { "enums": false } }"#).unwrap();

        let config = ConfigFile::<DumpConfig>::load_or_default(&path).unwrap();
        assert_eq!(config.divider_width, 40);
        assert_eq!(config.output_dir, PathBuf::from("dump"));
        assert!(config.kinds.classes);
        assert!(!config.kinds.enums);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/c.json");
        let mut config = ConfigFile::new(&path, DumpConfig::default());
        config.large_world_coordinates = Some(true);
        config.save().unwrap();

        let loaded = ConfigFile::<DumpConfig>::load_or_default(&path).unwrap();
        assert_eq!(loaded.large_world_coordinates, Some(true));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ConfigFile::<DumpConfig>::load_or_default(&path),
            Err(ConfigError::InvalidConfig { .. })
        ));
    }
}
