use std::path::Path;

use figment::providers::{Env, Format, Yaml};

use crate::error::{RealignError, Result};
use crate::types::RealignConfig;

pub const DEFAULT_CONFIG_PATH: &str = "./chanalign.yaml";

impl RealignConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Layers `CHANALIGN_*` environment variables over the YAML file at `path`.
    ///
    /// The file is optional. Nested keys use a double underscore, so
    /// `CHANALIGN_SHAPE__CHANNELS=65` sets `shape.channels`.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut f = figment::Figment::from(
            Env::prefixed("CHANALIGN_").map(|k| k.as_str().replace("__", ".").into()),
        );
        if path.exists() {
            f = figment::Figment::from(Yaml::file(path)).merge(f);
        }

        f.extract().map_err(|e| RealignError::Config(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Shape, DEFAULT_ALIGN};
    use figment::Jail;
    use std::path::PathBuf;

    #[test]
    fn test_load_from_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "chanalign.yaml",
                r#"
                data_path: "data.txt"
                output_path: "data_channelast.txt"
                shape:
                    channels: 65
                    height: 4
                    width: 2
                group_dir: "groups"
                "#,
            )?;

            let config = RealignConfig::load().unwrap();
            assert_eq!(config.data_path, PathBuf::from("data.txt"));
            assert_eq!(config.shape, Shape::new(65, 4, 2));
            assert_eq!(config.group_dir, PathBuf::from("groups"));
            assert_eq!(config.align, DEFAULT_ALIGN);
            assert_eq!(config.group_prefix, "output_group_");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "realign.yaml",
                r#"
                data_path: "data.txt"
                output_path: "out.txt"
                shape:
                    channels: 3
                    height: 1
                    width: 1
                "#,
            )?;
            jail.set_env("CHANALIGN_ALIGN", "16");
            jail.set_env("CHANALIGN_SHAPE__CHANNELS", "40");

            let config = RealignConfig::load_from_path("realign.yaml").unwrap();
            assert_eq!(config.align, 16);
            assert_eq!(config.shape.channels, 40);
            assert_eq!(config.shape.height, 1);
            Ok(())
        });
    }

    #[test]
    fn test_missing_required_field() {
        Jail::expect_with(|jail| {
            jail.create_file("chanalign.yaml", "data_path: \"data.txt\"\n")?;

            assert!(matches!(RealignConfig::load(), Err(RealignError::Config(_))));
            Ok(())
        });
    }
}
