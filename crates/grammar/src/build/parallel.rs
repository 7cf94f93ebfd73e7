//! Parallel grammar building.

use std::path::Path;
use std::sync::mpsc;
use std::thread;

use super::Result;
use super::compile::{BuildStatus, build_grammar};
use super::config::GrammarConfig;
use crate::grammar::GrammarId;

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(GrammarId, &str) + Send + Sync>;

/// Builds all grammars in parallel, writing libraries into `lib_dir`.
///
/// Results arrive in completion order.
pub fn build_all_grammars(
	grammars: Vec<GrammarConfig>,
	lib_dir: &Path,
	on_progress: Option<ProgressCallback>,
) -> Vec<(GrammarConfig, Result<BuildStatus>)> {
	let (tx, rx) = mpsc::channel();
	let num_jobs = thread::available_parallelism().map(|n| n.get()).unwrap_or(4).min(8);

	let chunk_size = grammars.len().div_ceil(num_jobs).max(1);

	thread::scope(|scope| {
		for chunk in grammars.chunks(chunk_size) {
			let tx = tx.clone();

			scope.spawn(move || {
				for grammar in chunk {
					let result = build_grammar(grammar, lib_dir);
					let _ = tx.send((grammar.clone(), result));
				}
			});
		}

		drop(tx);

		let mut results = Vec::new();
		for (grammar, result) in rx {
			if let Some(ref cb) = on_progress {
				let status = match &result {
					Ok(BuildStatus::AlreadyBuilt) => "up to date",
					Ok(BuildStatus::Built) => "built",
					Err(_) => "error",
				};
				cb(grammar.grammar, status);
			}
			results.push((grammar, result));
		}

		results
	})
}
