//! Grammar source configuration from `grammars.toml`.
//!
//! ```toml
//! [[grammar]]
//! name = "essence"
//! path = "../tree-sitter-essence"
//!
//! [[grammar]]
//! name = "essence_tester"
//! path = "../tree-sitter-essence-tester"
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::grammar::{GrammarId, UnknownGrammar};

/// Conventional name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "grammars.toml";

/// Errors from reading grammar configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to parse grammar configuration: {0}")]
	Parse(#[from] toml::de::Error),
	#[error(transparent)]
	UnknownGrammar(#[from] UnknownGrammar),
}

/// Where the source tree of one grammar lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarConfig {
	pub grammar: GrammarId,
	/// Grammar root; generated sources are expected under `src/`.
	pub path: PathBuf,
}

impl GrammarConfig {
	pub fn new(grammar: GrammarId, path: impl Into<PathBuf>) -> Self {
		Self {
			grammar,
			path: path.into(),
		}
	}

	/// Directory holding `parser.c` and any scanner.
	pub fn src_dir(&self) -> PathBuf {
		self.path.join("src")
	}
}

#[derive(Debug, Deserialize)]
struct GrammarsFile {
	#[serde(default)]
	grammar: Vec<GrammarEntry>,
}

#[derive(Debug, Deserialize)]
struct GrammarEntry {
	name: String,
	path: PathBuf,
}

/// Reads grammar configuration from `path`.
pub fn load_config(path: &Path) -> Result<Vec<GrammarConfig>, ConfigError> {
	let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	let base = path.parent().unwrap_or_else(|| Path::new("."));
	parse_config(&input, base)
}

/// Parses grammar configuration, resolving relative paths against `base`.
pub fn parse_config(input: &str, base: &Path) -> Result<Vec<GrammarConfig>, ConfigError> {
	let file: GrammarsFile = toml::from_str(input)?;

	file.grammar
		.into_iter()
		.map(|entry| {
			let grammar = entry.name.parse::<GrammarId>()?;
			let path = if entry.path.is_absolute() { entry.path } else { base.join(entry.path) };
			Ok::<_, ConfigError>(GrammarConfig { grammar, path })
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn test_parse_config() {
		let input = r#"
[[grammar]]
name = "essence"
path = "grammars/essence"

[[grammar]]
name = "essence-tester"
path = "/abs/essence_tester"
"#;
		let configs = parse_config(input, Path::new("/workspace")).unwrap();

		assert_eq!(
			configs,
			vec![
				GrammarConfig::new(GrammarId::Essence, "/workspace/grammars/essence"),
				GrammarConfig::new(GrammarId::EssenceTester, "/abs/essence_tester"),
			]
		);
		assert_eq!(configs[0].src_dir(), PathBuf::from("/workspace/grammars/essence/src"));
	}

	#[test]
	fn test_empty_config() {
		let configs = parse_config("", Path::new(".")).unwrap();
		assert!(configs.is_empty());
	}

	#[test]
	fn test_unknown_grammar_rejected() {
		let input = "[[grammar]]\nname = \"minizinc\"\npath = \"x\"\n";
		let err = parse_config(input, Path::new(".")).unwrap_err();
		assert!(matches!(err, ConfigError::UnknownGrammar(UnknownGrammar(ref name)) if name == "minizinc"));
	}

	#[test]
	fn test_malformed_config_rejected() {
		let err = parse_config("[[grammar]]\nname = 3\n", Path::new(".")).unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[test]
	fn test_load_config_resolves_against_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(CONFIG_FILE_NAME);
		fs::write(&path, "[[grammar]]\nname = \"essence\"\npath = \"tree-sitter-essence\"\n").unwrap();

		let configs = load_config(&path).unwrap();
		assert_eq!(configs, vec![GrammarConfig::new(GrammarId::Essence, dir.path().join("tree-sitter-essence"))]);
	}

	#[test]
	fn test_load_config_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let err = load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}
}
