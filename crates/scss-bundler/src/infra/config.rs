//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
pub const WORKSPACE_CONFIG_FILE: &str = "scss-bundle.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bundle: BundleSettings,
    #[serde(default)]
    pub logging: Logging,
}

/// Inputs of a bundling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BundleSettings {
    /// Entry files, relative to `project_directory` when one is set.
    #[serde(default)]
    pub entries: Vec<PathBuf>,
    /// Output file, or output directory when several entries are bundled.
    #[serde(default)]
    pub dest: Option<PathBuf>,
    /// Base for entry files and `~` package-root imports.
    #[serde(default)]
    pub project_directory: Option<PathBuf>,
    /// Files matched by these globs are inlined at most once per bundle tree.
    #[serde(default)]
    pub dedupe_globs: Vec<String>,
    /// Ordered fallback directories for imports that do not resolve next to the importer.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    /// Regular expressions matched against derived import names; matches are never inlined.
    #[serde(default)]
    pub ignored_imports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Logging {
    #[serde(default)]
    level: Option<String>,
}

impl Logging {
    fn default_level() -> &'static str {
        "info"
    }

    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(Self::default_level())
    }

    pub fn set_level(&mut self, level: impl Into<String>) {
        self.level = Some(level.into());
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    project_directory: Option<String>,
    log_level: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            project_directory: env::var("SCSS_BUNDLER_PROJECT_DIR").ok(),
            log_level: env::var("SCSS_BUNDLER_LOG").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(project_directory: &str, log_level: &str) -> Self {
        Self {
            project_directory: Some(project_directory.to_owned()),
            log_level: Some(log_level.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    ///
    /// `explicit` replaces the workspace `scss-bundle.toml` lookup and must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let workspace = match explicit {
            Some(path) if !path.exists() => {
                bail!("config file {} does not exist", path.display())
            }
            Some(path) => Some(path.to_path_buf()),
            None => workspace_config_path()?,
        };
        Self::load_with_layers(global_config_path(), workspace, EnvOverrides::from_env())
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    /// Parse a config file, rebasing its relative paths on the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.rebased(base))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn rebased(mut self, base: &Path) -> Self {
        let rebase = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                base.join(path)
            }
        };
        let bundle = &mut self.bundle;
        match bundle.project_directory.take() {
            Some(project) => bundle.project_directory = Some(rebase(project)),
            // Entries and dedupe globs follow the project directory when one is configured.
            None => {
                bundle.entries = bundle.entries.drain(..).map(rebase).collect();
                bundle.dedupe_globs = bundle
                    .dedupe_globs
                    .drain(..)
                    .map(|glob| rebase(PathBuf::from(glob)).to_string_lossy().into_owned())
                    .collect();
            }
        }
        bundle.dest = bundle.dest.take().map(rebase);
        bundle.include_paths = bundle.include_paths.drain(..).map(rebase).collect();
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            bundle: merge_bundle(self.bundle, other.bundle),
            logging: Logging {
                level: other.logging.level.or(self.logging.level),
            },
        }
    }
}

fn merge_bundle(base: BundleSettings, overlay: BundleSettings) -> BundleSettings {
    BundleSettings {
        entries: if overlay.entries.is_empty() {
            base.entries
        } else {
            overlay.entries
        },
        dest: overlay.dest.or(base.dest),
        project_directory: overlay.project_directory.or(base.project_directory),
        dedupe_globs: concat_unique(base.dedupe_globs, overlay.dedupe_globs),
        include_paths: concat_unique(base.include_paths, overlay.include_paths),
        ignored_imports: concat_unique(base.ignored_imports, overlay.ignored_imports),
    }
}

/// Concatenate two lists, dropping later duplicates while keeping order.
pub fn concat_unique<T: PartialEq>(base: Vec<T>, overlay: Vec<T>) -> Vec<T> {
    let mut merged = base;
    for item in overlay {
        if !merged.contains(&item) {
            merged.push(item);
        }
    }
    merged
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("scss-bundler/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    Ok(Some(cwd.join(WORKSPACE_CONFIG_FILE)))
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(project_directory) = env.project_directory {
        config.bundle.project_directory = Some(PathBuf::from(project_directory));
    }
    if let Some(level) = env.log_level {
        config.logging.level = Some(level);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_defaults_when_no_files() {
        let config = Config::load_with_layers(None, None, EnvOverrides::default())
            .expect("load default config");
        assert_eq!(config.logging.level(), "info");
        assert!(config.bundle.entries.is_empty());
        assert!(config.bundle.project_directory.is_none());
    }

    #[test]
    fn merge_global_and_workspace() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let global = temp.path().join("config.toml");
        fs::write(
            &global,
            r#"
[bundle]
include_paths = ["/shared/styles"]
ignored_imports = ["^~@angular"]
[logging]
level = "debug"
"#,
        )?;

        let workspace_dir = temp.path().join("repo");
        fs::create_dir_all(&workspace_dir)?;
        let workspace = workspace_dir.join(WORKSPACE_CONFIG_FILE);
        fs::write(
            &workspace,
            r#"
[bundle]
entries = ["src/main.scss"]
dest = "dist/main.scss"
include_paths = ["vendor", "/shared/styles"]
dedupe_globs = ["node_modules/**/*.scss"]
"#,
        )?;

        let config =
            Config::load_with_layers(Some(global), Some(workspace), EnvOverrides::default())?;

        assert_eq!(config.logging.level(), "debug");
        assert_eq!(
            config.bundle.entries,
            vec![workspace_dir.join("src/main.scss")]
        );
        assert_eq!(config.bundle.dest, Some(workspace_dir.join("dist/main.scss")));
        assert_eq!(
            config.bundle.include_paths,
            vec![PathBuf::from("/shared/styles"), workspace_dir.join("vendor")]
        );
        assert_eq!(config.bundle.ignored_imports, vec!["^~@angular".to_owned()]);
        assert_eq!(
            config.bundle.dedupe_globs,
            vec![workspace_dir.join("node_modules/**/*.scss").display().to_string()]
        );
        Ok(())
    }

    #[test]
    fn entries_stay_relative_to_project_directory() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join(WORKSPACE_CONFIG_FILE);
        fs::write(
            &file,
            r#"
[bundle]
project_directory = "web"
entries = ["styles/app.scss"]
"#,
        )?;

        let config = Config::from_file(&file)?;
        assert_eq!(
            config.bundle.project_directory,
            Some(temp.path().join("web"))
        );
        assert_eq!(config.bundle.entries, vec![PathBuf::from("styles/app.scss")]);
        Ok(())
    }

    #[test]
    fn dedupe_globs_are_rebased_without_project_directory() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let nested = temp.path().join("other");
        fs::create_dir_all(&nested)?;
        let file = nested.join(WORKSPACE_CONFIG_FILE);
        fs::write(
            &file,
            r#"
[bundle]
dedupe_globs = ["node_modules/**/*.scss", "/abs/*.scss"]
"#,
        )?;

        let config = Config::from_file(&file)?;
        assert_eq!(
            config.bundle.dedupe_globs,
            vec![
                nested.join("node_modules/**/*.scss").display().to_string(),
                "/abs/*.scss".to_owned(),
            ]
        );
        Ok(())
    }

    #[test]
    fn level_falls_back_to_default() {
        assert_eq!(Logging::default().level(), "info");
    }

    #[test]
    fn env_overrides_take_precedence() -> Result<()> {
        let overrides = EnvOverrides::for_tests("/srv/site", "trace");
        let config = Config::load_with_layers(None, None, overrides)?;
        assert_eq!(
            config.bundle.project_directory,
            Some(PathBuf::from("/srv/site"))
        );
        assert_eq!(config.logging.level(), "trace");
        Ok(())
    }

    #[test]
    fn invalid_config_returns_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("broken.toml");
        fs::write(&file, "this is not toml")?;
        let result = Config::from_file(&file);
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let result = Config::load(Some(Path::new("/no/such/scss-bundle.toml")));
        assert!(result.is_err());
    }
}
