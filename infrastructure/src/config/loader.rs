//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "script-bridge";
const PROJECT_FILES: [&str; 2] = ["bridge.toml", ".bridge.toml"];
const ENV_PREFIX: &str = "SCRIPT_BRIDGE_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Explicit config path (if provided)
    /// 2. Environment: `SCRIPT_BRIDGE_CONTEXT__SANDBOX=false` and the like
    /// 3. Project root: `./bridge.toml` or `./.bridge.toml`
    /// 4. Global config under the XDG config directory
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        Self::load_from(Path::new("."), Self::global_config_path(), config_path)
    }

    /// Same as [`load`](Self::load) with an explicit project root and
    /// global config file.
    pub fn load_from(
        project_root: &Path,
        global_path: Option<PathBuf>,
        config_path: Option<&PathBuf>,
    ) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = global_path.filter(|p| p.exists()) {
            figment = figment.merge(Toml::file(global_path));
        }

        if let Some(path) = Self::find_project_config(project_root) {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.extract().map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/script-bridge/config.toml if set,
    /// otherwise falls back to ~/.config/script-bridge/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        Self::find_project_config(Path::new("."))
    }

    fn find_project_config(root: &Path) -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources() {
        println!("Configuration sources (in priority order):");

        // Project config
        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./bridge.toml or ./.bridge.toml");
        }

        // Global config
        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                println!("  [FOUND] Global:  {}", path.display());
            } else {
                println!("  [     ] Global:  {}", path.display());
            }
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_domain::OutputFormat;
    use std::fs;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert!(config.context.sandbox);
        assert_eq!(config.context.chunk_name, "script");
    }

    #[test]
    fn test_global_config_path_returns_some() {
        // Should return a path (even if file doesn't exist)
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("script-bridge"));
    }

    #[test]
    fn test_empty_project_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::load_from(dir.path(), None, None).unwrap();
        assert!(config.context.sandbox);
        assert_eq!(config.output.format, OutputFormat::Plain);
    }

    #[test]
    fn test_project_overrides_global() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        fs::write(&global, "[context]\nchunk_name = \"global\"\ndefault_timeout_ms = 100\n").unwrap();
        fs::write(dir.path().join(".bridge.toml"), "[context]\nchunk_name = \"project\"\n").unwrap();

        let config = ConfigLoader::load_from(dir.path(), Some(global), None).unwrap();
        assert_eq!(config.context.chunk_name, "project");
        assert_eq!(config.context.default_timeout_ms, 100);
    }

    #[test]
    fn test_plain_name_wins_over_hidden() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bridge.toml"), "[output]\ncolor = false\n").unwrap();
        fs::write(dir.path().join(".bridge.toml"), "[output]\nformat = \"json\"\n").unwrap();

        let config = ConfigLoader::load_from(dir.path(), None, None).unwrap();
        assert!(!config.output.color);
        assert_eq!(config.output.format, OutputFormat::Plain);
    }

    #[test]
    fn test_explicit_file_has_highest_priority() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bridge.toml"), "[output]\nformat = \"plain\"\n").unwrap();
        let explicit = dir.path().join("custom.toml");
        fs::write(&explicit, "[output]\nformat = \"json\"\n").unwrap();

        let config = ConfigLoader::load_from(dir.path(), None, Some(&explicit)).unwrap();
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("broken.toml");
        fs::write(&explicit, "[context]\nsandbox = \"maybe\"\n").unwrap();
        assert!(ConfigLoader::load_from(dir.path(), None, Some(&explicit)).is_err());
    }
}
