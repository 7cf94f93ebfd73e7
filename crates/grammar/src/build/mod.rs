//! Grammar building system.
//!
//! Compiles generated tree-sitter grammar sources (`src/parser.c` plus an
//! optional external scanner) into shared libraries that the loader can open.
//! Generating `parser.c` from a grammar definition is not done here.

mod compile;
mod config;
mod parallel;

use std::path::PathBuf;

pub use compile::{BuildStatus, build_grammar};
pub use config::{CONFIG_FILE_NAME, ConfigError, GrammarConfig, load_config, parse_config};
pub use parallel::{ProgressCallback, build_all_grammars};
use thiserror::Error;

/// Errors that can occur while building a grammar.
#[derive(Debug, Error)]
pub enum GrammarBuildError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("compilation failed: {0}")]
	Compilation(String),
	#[error("no parser.c found in {0}")]
	NoParserSource(PathBuf),
}

/// Result type for grammar build operations.
pub type Result<T> = std::result::Result<T, GrammarBuildError>;
