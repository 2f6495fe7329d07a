use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use codegen::{CompileOptions, DEFAULT_STYLESHEET};
use tasse::parser::{DEFAULT_MAX_DEPTH, ParseOptions, TrimMode};

/// Name of the project file looked up in the working directory.
pub const CONFIG_FILE: &str = "tasse.toml";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, message: String },
    Invalid { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "cannot read config '{}': {}", path.display(), source)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "invalid TOML in '{}': {}", path.display(), message)
            }
            ConfigError::Invalid { path, message } => {
                write!(f, "invalid setting in '{}': {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// On-disk layout of `tasse.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    /// Source document to compile.
    source: Option<PathBuf>,
    /// Where the HTML is written.
    output: Option<PathBuf>,
    /// Stylesheet linked from the document head.
    stylesheet: Option<String>,
    /// "legacy" or "delimited".
    trim: Option<String>,
    /// Deepest allowed component nesting.
    max_depth: Option<usize>,
    /// Quiet period `watch` waits for before rebuilding.
    debounce_ms: Option<u64>,
}

/// Resolved project settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub source: PathBuf,
    pub output: PathBuf,
    pub stylesheet: String,
    pub trim: TrimMode,
    pub max_depth: usize,
    pub debounce: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: PathBuf::from("src/example.tasse"),
            output: PathBuf::from("dist/out.html"),
            stylesheet: DEFAULT_STYLESHEET.to_string(),
            trim: TrimMode::Legacy,
            max_depth: DEFAULT_MAX_DEPTH,
            debounce: Duration::from_millis(100),
        }
    }
}

impl Config {
    /// Load `explicit` if given (it must exist), otherwise `tasse.toml` in
    /// the working directory if present, otherwise the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(CONFIG_FILE);
                if !path.exists() {
                    log::debug!("no {} found, using defaults", CONFIG_FILE);
                    return Ok(Config::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&content, &path)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config text. Relative paths are resolved against the
    /// directory containing `path`.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let defaults = Config::default();

        let trim = match file.trim {
            Some(s) => s.parse::<TrimMode>().map_err(|message| ConfigError::Invalid {
                path: path.to_path_buf(),
                message,
            })?,
            None => defaults.trim,
        };

        let max_depth = file.max_depth.unwrap_or(defaults.max_depth);
        if max_depth == 0 {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                message: "max_depth must be at least 1".to_string(),
            });
        }

        Ok(Config {
            source: base.join(file.source.unwrap_or(defaults.source)),
            output: base.join(file.output.unwrap_or(defaults.output)),
            stylesheet: file.stylesheet.unwrap_or(defaults.stylesheet),
            trim,
            max_depth,
            debounce: file
                .debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
        })
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            trim: self.trim,
            max_depth: self.max_depth,
        }
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            parse: self.parse_options(),
            stylesheet: self.stylesheet.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("", Path::new("tasse.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn paths_resolve_against_config_dir() {
        let config = Config::from_toml(
            "source = \"pages/home.tasse\"\noutput = \"out/home.html\"\ntrim = \"delimited\"\n",
            Path::new("site/tasse.toml"),
        )
        .unwrap();
        assert_eq!(config.source, PathBuf::from("site/pages/home.tasse"));
        assert_eq!(config.output, PathBuf::from("site/out/home.html"));
        assert_eq!(config.trim, TrimMode::Delimited);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml("sauce = 1", Path::new("tasse.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn bad_trim_mode_is_invalid() {
        let err = Config::from_toml("trim = \"tight\"", Path::new("tasse.toml")).unwrap_err();
        assert!(err.to_string().contains("unknown trim mode"));
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "stylesheet = \"site.css\"\ndebounce_ms = 50\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.stylesheet, "site.css");
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert_eq!(config.source, dir.path().join("src/example.tasse"));
    }

    #[test]
    fn demo_project_compiles() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demo/tasse.toml");
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.trim, TrimMode::Delimited);

        let source = std::fs::read_to_string(&config.source).unwrap();
        let compiled = codegen::Compiler::new(config.compile_options())
            .compile(&source, 0)
            .unwrap();
        assert_eq!(compiled.element_count, 3);
        assert!(compiled.html.contains("<div id=\"id3\" class=\"count\">0</div>"));
        assert!(compiled.warnings.is_empty());
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
