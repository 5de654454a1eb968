//! Configuration file parsing for silc.toml.

use serde::Deserialize;
use silc_core::ContextConfig;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Heap settings
    #[serde(default)]
    pub heap: HeapConfig,

    /// Argument stack and evaluation depth
    #[serde(default)]
    pub stack: StackConfig,

    /// Symbol table settings
    #[serde(default)]
    pub symbols: SymbolsConfig,

    /// Interactive front end
    #[serde(default)]
    pub repl: ReplConfig,
}

/// Heap configuration.
#[derive(Debug, Default, Deserialize)]
pub struct HeapConfig {
    /// Heap size in words
    pub words: Option<usize>,
}

/// Stack configuration.
#[derive(Debug, Default, Deserialize)]
pub struct StackConfig {
    /// Argument stack capacity in values
    pub size: Option<usize>,

    /// Maximum nesting of evaluation frames
    pub max_depth: Option<usize>,
}

/// Symbol table configuration.
#[derive(Debug, Default, Deserialize)]
pub struct SymbolsConfig {
    /// Bucket count of the symbol table
    pub buckets: Option<usize>,
}

/// REPL configuration.
#[derive(Debug, Deserialize)]
pub struct ReplConfig {
    /// Prompt printed before each input line
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Line printed when the REPL starts
    #[serde(default = "default_banner")]
    pub banner: String,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            banner: default_banner(),
        }
    }
}

fn default_prompt() -> String {
    "? ".to_string()
}

fn default_banner() -> String {
    ";; SilcLisp".to_string()
}

impl Config {
    /// Context settings, falling back to the runtime defaults
    pub fn context_config(&self) -> ContextConfig {
        let defaults = ContextConfig::default();
        ContextConfig {
            heap_words: self.heap.words.unwrap_or(defaults.heap_words),
            stack_size: self.stack.size.unwrap_or(defaults.stack_size),
            max_eval_depth: self.stack.max_depth.unwrap_or(defaults.max_eval_depth),
            symbol_table_buckets: self.symbols.buckets.unwrap_or(defaults.symbol_table_buckets),
        }
    }
}

/// Load configuration from a file or search for default config files.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = path.map(PathBuf::from).or_else(find_config_file);

    match config_path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "loaded configuration");
            Ok(config)
        }
        Some(path) => Err(anyhow::anyhow!(
            "Config file {} does not exist",
            path.display()
        )),
        None => Ok(Config::default()),
    }
}

/// Config file names to search for
const CONFIG_NAMES: &[&str] = &["silc.toml", ".silcrc.toml"];

/// Search the current directory and its parents, then the user config dir.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_ancestors(&cwd).or_else(|| {
        let path = dirs::config_dir()?.join("silc").join("silc.toml");
        path.exists().then_some(path)
    })
}

fn find_config_in_ancestors(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.repl.prompt, "? ");
        assert_eq!(config.repl.banner, ";; SilcLisp");
        let ctx = config.context_config();
        let defaults = ContextConfig::default();
        assert_eq!(ctx.heap_words, defaults.heap_words);
        assert_eq!(ctx.symbol_table_buckets, 8179);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[heap]
words = 65536

[stack]
size = 256
max_depth = 64

[repl]
prompt = "> "
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let ctx = config.context_config();
        assert_eq!(ctx.heap_words, 65536);
        assert_eq!(ctx.stack_size, 256);
        assert_eq!(ctx.max_eval_depth, 64);
        assert_eq!(config.repl.prompt, "> ");
        assert_eq!(config.repl.banner, ";; SilcLisp");
    }

    #[test]
    fn test_find_config_in_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("silc.toml"), "[symbols]\nbuckets = 97\n").unwrap();

        let found = find_config_in_ancestors(&nested).unwrap();
        assert_eq!(found, dir.path().join("silc.toml"));

        let config = load_config(Some(&found)).unwrap();
        assert_eq!(config.symbols.buckets, Some(97));
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silc.toml");
        std::fs::write(&path, "[heap]\nwords = \"lots\"\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse"));
    }
}
