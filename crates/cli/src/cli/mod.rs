use std::path::PathBuf;

use clap::{Parser, Subcommand};
use essence_grammar::GrammarId;

#[derive(Parser, Debug)]
#[command(name = "essence-grammar")]
#[command(about = "Load, check and build the Essence tree-sitter grammars")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Check that every grammar loads into the tree-sitter runtime
	Check {
		/// Only check specific grammars (comma-separated)
		#[arg(long, value_delimiter = ',')]
		only: Option<Vec<GrammarId>>,
	},
	/// Build grammar shared libraries from generated sources
	Build {
		/// Grammar source configuration
		#[arg(long, short, value_name = "PATH", default_value = essence_grammar::build::CONFIG_FILE_NAME)]
		config: PathBuf,

		/// Directory to write libraries to (defaults to the first search path)
		#[arg(long, short, value_name = "DIR")]
		out: Option<PathBuf>,

		/// Only build specific grammars (comma-separated)
		#[arg(long, value_delimiter = ',')]
		only: Option<Vec<GrammarId>>,
	},
	/// Parse a file and report syntax errors
	Parse {
		/// Grammar to parse with
		grammar: GrammarId,

		/// File to parse
		file: PathBuf,
	},
	/// Show grammar search paths and where each grammar resolves from
	Paths,
}

/// Keeps the grammars named in `only`, or all of them.
pub fn selected(only: Option<Vec<GrammarId>>) -> Vec<GrammarId> {
	match only {
		Some(mut ids) => {
			ids.sort();
			ids.dedup();
			ids
		}
		None => GrammarId::ALL.to_vec(),
	}
}
