//! Run Configuration
//!
//! Determines where the generator reads its environment configuration from
//! and where it writes the scene.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Command line: `--config tag.toml --out scene/`
//! 2. Environment variables: `TAG_SCENE_OUT`, `TAG_ARENA_WIDTH`, `TAG_ARENA_HEIGHT`
//! 3. Defaults: built-in environment configuration, output to `./scene`

use std::path::PathBuf;
use tag_scene::{EnvironmentConfig, Result as SceneResult};

pub const USAGE: &str = "\
Usage: tag-scenegen [OPTIONS]

Options:
  --config PATH   Environment configuration (TOML)
  --out DIR       Output directory [default: scene]
  --stdout        Print the scene document instead of writing files
  -h, --help      Show this message

Environment:
  TAG_SCENE_OUT, TAG_ARENA_WIDTH, TAG_ARENA_HEIGHT";

const DEFAULT_OUT_DIR: &str = "scene";

/// Resolved options for one generator run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Environment configuration file
    pub config_path: Option<PathBuf>,
    /// Directory receiving the document and its assets
    pub out_dir: PathBuf,
    /// Print the document to stdout and write nothing
    pub stdout: bool,
    /// Arena inner width override
    pub arena_width: Option<f64>,
    /// Arena inner height override
    pub arena_height: Option<f64>,
    pub help: bool,
    out_from_args: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            stdout: false,
            arena_width: None,
            arena_height: None,
            help: false,
            out_from_args: false,
        }
    }
}

impl RunConfig {
    /// Parse command line arguments, program name excluded
    pub fn from_args<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().ok_or("--config needs a path")?;
                    config.config_path = Some(PathBuf::from(path));
                }
                "--out" => {
                    let dir = args.next().ok_or("--out needs a directory")?;
                    config.out_dir = PathBuf::from(dir);
                    config.out_from_args = true;
                }
                "--stdout" => config.stdout = true,
                "-h" | "--help" => config.help = true,
                other => return Err(format!("Unknown argument: {}", other)),
            }
        }

        Ok(config)
    }

    /// Apply overrides from a variable source such as the process environment
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_with<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.out_from_args {
            if let Some(dir) = var("TAG_SCENE_OUT").filter(|d| !d.is_empty()) {
                self.out_dir = PathBuf::from(dir);
                log::info!("Output directory from env: {}", self.out_dir.display());
            }
        }

        for (key, slot) in [
            ("TAG_ARENA_WIDTH", &mut self.arena_width),
            ("TAG_ARENA_HEIGHT", &mut self.arena_height),
        ] {
            if let Some(value) = var(key) {
                match value.trim().parse::<f64>() {
                    Ok(v) => {
                        *slot = Some(v);
                        log::info!("{} from env: {}", key, v);
                    }
                    Err(_) => log::warn!("Ignoring {}={:?}: not a number", key, value),
                }
            }
        }
    }

    /// Environment configuration with overrides applied
    pub fn environment(&self) -> SceneResult<EnvironmentConfig> {
        let mut config = match &self.config_path {
            Some(path) => EnvironmentConfig::load(path)?,
            None => EnvironmentConfig::default(),
        };
        if let Some(width) = self.arena_width {
            config.arena_width = width;
        }
        if let Some(height) = self.arena_height {
            config.arena_height = height;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_args(Vec::new()).unwrap();
        assert_eq!(config.out_dir, PathBuf::from("scene"));
        assert!(config.config_path.is_none());
        assert!(!config.stdout);
    }

    #[test]
    fn test_parse_flags() {
        let config =
            RunConfig::from_args(args(&["--config", "tag.toml", "--out", "/tmp/x", "--stdout"]))
                .unwrap();
        assert_eq!(config.config_path, Some(PathBuf::from("tag.toml")));
        assert_eq!(config.out_dir, PathBuf::from("/tmp/x"));
        assert!(config.stdout);
    }

    #[test]
    fn test_missing_value_and_unknown_flag() {
        assert!(RunConfig::from_args(args(&["--out"])).is_err());
        assert!(RunConfig::from_args(args(&["--frobnicate"])).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TAG_SCENE_OUT", "env_out"),
            ("TAG_ARENA_WIDTH", "4.5"),
            ("TAG_ARENA_HEIGHT", "wide"),
        ]
        .into_iter()
        .collect();
        let mut config = RunConfig::default();
        config.apply_env_with(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.out_dir, PathBuf::from("env_out"));
        assert_eq!(config.arena_width, Some(4.5));
        assert_eq!(config.arena_height, None);

        let env = config.environment().unwrap();
        assert_eq!(env.arena_width, 4.5);
        assert_eq!(env.arena_height, 2.0);
    }

    #[test]
    fn test_command_line_out_beats_env() {
        let mut config = RunConfig::from_args(args(&["--out", "cli_out"])).unwrap();
        config.apply_env_with(|k| (k == "TAG_SCENE_OUT").then(|| "env_out".to_string()));
        assert_eq!(config.out_dir, PathBuf::from("cli_out"));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let config = RunConfig {
            arena_width: Some(0.4),
            ..RunConfig::default()
        };
        assert!(config.environment().is_err());
    }
}
