//! Grammar identity, search paths and shared library loading.
//!
//! Grammars are compiled tree-sitter parsers packaged as shared libraries. This
//! module knows which grammars exist, where their libraries are looked up and
//! how the language function is pulled out of a library.
//!
//! # Search Paths
//!
//! Libraries are searched, in order, in:
//!
//! * `$ESSENCE_GRAMMAR_DIR`
//! * `$ESSENCE_RUNTIME/grammars`
//! * `<workspace>/target/grammars` when running under cargo
//! * `~/.cache/essence-grammar/grammars`
//! * `~/.local/share/essence-grammar/grammars`

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use libloading::Library;
use thiserror::Error;
use tracing::debug;

/// Signature of the language function exported by a compiled grammar.
pub type RawLanguageFn = unsafe extern "C" fn() -> *const ();

/// Errors that can occur when locating or loading a grammar.
#[derive(Error, Debug)]
pub enum GrammarError {
	/// Grammar library not found in any search path.
	#[error("grammar not found: {0}")]
	NotFound(String),

	/// Failed to load the dynamic library.
	#[error("failed to load grammar library: {0}")]
	LoadError(String),

	/// Grammar library exists but doesn't export the expected symbol.
	#[error("grammar library missing language function: {0}")]
	MissingSymbol(String),
}

/// The grammars shipped by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GrammarId {
	/// The Essence modelling language.
	Essence,
	/// The EssenceTester language used by the conformance suite.
	EssenceTester,
}

impl GrammarId {
	/// Every registered grammar, in registration order.
	pub const ALL: [GrammarId; 2] = [GrammarId::Essence, GrammarId::EssenceTester];

	/// Human readable name, used in failure messages.
	pub const fn display_name(self) -> &'static str {
		match self {
			Self::Essence => "Essence",
			Self::EssenceTester => "EssenceTester",
		}
	}

	/// Name used for library files and configuration entries.
	pub const fn grammar_name(self) -> &'static str {
		match self {
			Self::Essence => "essence",
			Self::EssenceTester => "essence_tester",
		}
	}

	/// Symbol exported by the compiled grammar.
	pub const fn symbol_name(self) -> &'static str {
		match self {
			Self::Essence => "tree_sitter_essence",
			Self::EssenceTester => "tree_sitter_essence_tester",
		}
	}

	/// Platform-specific library file name.
	pub fn library_name(self) -> String {
		grammar_library_name(self.grammar_name())
	}
}

impl fmt::Display for GrammarId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.display_name())
	}
}

/// Returned when a string names no known grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown grammar: {0}")]
pub struct UnknownGrammar(pub String);

impl FromStr for GrammarId {
	type Err = UnknownGrammar;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
			"essence" => Ok(Self::Essence),
			"essence_tester" | "essencetester" => Ok(Self::EssenceTester),
			_ => Err(UnknownGrammar(s.to_string())),
		}
	}
}

/// A grammar library that has been opened and resolved.
///
/// The language function is only valid while `library` stays loaded.
pub struct LoadedGrammar {
	/// Path the library was loaded from.
	pub path: PathBuf,
	/// The exported language function.
	pub language_fn: RawLanguageFn,
	library: Library,
}

impl LoadedGrammar {
	/// Splits the grammar into its language function, the owning library and its path.
	pub fn into_parts(self) -> (RawLanguageFn, Library, PathBuf) {
		(self.language_fn, self.library, self.path)
	}
}

impl fmt::Debug for LoadedGrammar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LoadedGrammar").field("path", &self.path).finish_non_exhaustive()
	}
}

/// Finds the library for `id` in the default search paths.
pub fn find_grammar(id: GrammarId) -> Result<PathBuf, GrammarError> {
	find_grammar_in(id, &grammar_search_paths())
}

/// Finds the library for `id` in `dirs`, first match wins.
pub fn find_grammar_in(id: GrammarId, dirs: &[PathBuf]) -> Result<PathBuf, GrammarError> {
	let lib_name = id.library_name();

	dirs.iter()
		.map(|dir| dir.join(&lib_name))
		.find(|path| path.is_file())
		.ok_or_else(|| GrammarError::NotFound(id.grammar_name().to_string()))
}

/// Locates and loads the library for `id`.
pub fn load_grammar(id: GrammarId) -> Result<LoadedGrammar, GrammarError> {
	let path = find_grammar(id)?;
	load_grammar_from_path(&path, id)
}

/// Loads the library at `path` and resolves the language function for `id`.
pub fn load_grammar_from_path(path: &Path, id: GrammarId) -> Result<LoadedGrammar, GrammarError> {
	debug!(grammar = %id, path = %path.display(), "Opening grammar library");

	// SAFETY: grammar libraries contain generated parse tables and run no initialisers of their own.
	let library = unsafe { Library::new(path) }.map_err(|e| GrammarError::LoadError(format!("{}: {e}", path.display())))?;

	let language_fn = {
		// SAFETY: tree-sitter grammars export `const TSLanguage *tree_sitter_<name>(void)`.
		let symbol = unsafe { library.get::<RawLanguageFn>(id.symbol_name().as_bytes()) }
			.map_err(|e| GrammarError::MissingSymbol(format!("{} in {}: {e}", id.symbol_name(), path.display())))?;
		*symbol
	};

	Ok(LoadedGrammar {
		path: path.to_path_buf(),
		language_fn,
		library,
	})
}

/// Returns the platform-specific library filename for a grammar.
pub fn grammar_library_name(name: &str) -> String {
	let safe_name = name.replace('-', "_");
	#[cfg(target_os = "macos")]
	{
		format!("lib{safe_name}.dylib")
	}
	#[cfg(target_os = "windows")]
	{
		format!("{safe_name}.dll")
	}
	#[cfg(not(any(target_os = "macos", target_os = "windows")))]
	{
		format!("lib{safe_name}.so")
	}
}

/// Returns directories to search for compiled grammar libraries.
pub fn grammar_search_paths() -> Vec<PathBuf> {
	search_paths_with(|key| std::env::var_os(key))
}

/// Returns the directory freshly built grammars are written to.
///
/// This is the first search path that already exists, or the first search path
/// when none do.
pub fn grammar_lib_dir() -> PathBuf {
	lib_dir_from(grammar_search_paths())
}

fn lib_dir_from(paths: Vec<PathBuf>) -> PathBuf {
	let existing = paths.iter().find(|dir| dir.is_dir()).cloned();
	existing
		.or_else(|| paths.into_iter().next())
		.unwrap_or_else(|| PathBuf::from("grammars"))
}

fn search_paths_with(var: impl Fn(&str) -> Option<OsString>) -> Vec<PathBuf> {
	let mut dirs = Vec::new();

	if let Some(dir) = var("ESSENCE_GRAMMAR_DIR") {
		dirs.push(PathBuf::from(dir));
	}

	if let Some(runtime) = var("ESSENCE_RUNTIME") {
		dirs.push(PathBuf::from(runtime).join("grammars"));
	}

	if let Some(manifest) = var("CARGO_MANIFEST_DIR") {
		let manifest = PathBuf::from(manifest);
		if let Some(workspace) = manifest.ancestors().nth(2) {
			dirs.push(workspace.join("target").join("grammars"));
		}
	}

	if let Some(cache) = cache_dir(&var) {
		dirs.push(cache.join("grammars"));
	}

	if let Some(data) = data_local_dir(&var) {
		dirs.push(data.join("essence-grammar").join("grammars"));
	}

	dirs
}

/// Returns the cache directory: `~/.cache/essence-grammar/`.
fn cache_dir(var: &impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
	#[cfg(unix)]
	{
		var("XDG_CACHE_HOME")
			.map(PathBuf::from)
			.or_else(|| var("HOME").map(|h| PathBuf::from(h).join(".cache")))
			.map(|p| p.join("essence-grammar"))
	}
	#[cfg(windows)]
	{
		var("LOCALAPPDATA").map(|p| PathBuf::from(p).join("essence-grammar").join("cache"))
	}
	#[cfg(not(any(unix, windows)))]
	{
		let _ = var;
		None
	}
}

/// Returns the platform-specific local data directory.
fn data_local_dir(var: &impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
	#[cfg(unix)]
	{
		var("XDG_DATA_HOME")
			.map(PathBuf::from)
			.or_else(|| var("HOME").map(|h| PathBuf::from(h).join(".local").join("share")))
	}
	#[cfg(windows)]
	{
		var("LOCALAPPDATA").map(PathBuf::from)
	}
	#[cfg(not(any(unix, windows)))]
	{
		let _ = var;
		None
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
		let map: HashMap<String, OsString> = pairs.iter().map(|(k, v)| (k.to_string(), OsString::from(v))).collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn test_grammar_names() {
		assert_eq!(GrammarId::Essence.display_name(), "Essence");
		assert_eq!(GrammarId::EssenceTester.display_name(), "EssenceTester");
		assert_eq!(GrammarId::EssenceTester.grammar_name(), "essence_tester");
		assert_eq!(GrammarId::EssenceTester.symbol_name(), "tree_sitter_essence_tester");
		assert_eq!(GrammarId::Essence.to_string(), "Essence");
	}

	#[test]
	fn test_grammar_id_from_str() {
		assert_eq!("essence".parse::<GrammarId>(), Ok(GrammarId::Essence));
		assert_eq!("Essence".parse::<GrammarId>(), Ok(GrammarId::Essence));
		assert_eq!("essence-tester".parse::<GrammarId>(), Ok(GrammarId::EssenceTester));
		assert_eq!("EssenceTester".parse::<GrammarId>(), Ok(GrammarId::EssenceTester));
		assert_eq!("savile_row".parse::<GrammarId>(), Err(UnknownGrammar("savile_row".to_string())));
	}

	#[test]
	fn test_grammar_library_name() {
		let name = GrammarId::EssenceTester.library_name();
		#[cfg(target_os = "linux")]
		assert_eq!(name, "libessence_tester.so");
		#[cfg(target_os = "macos")]
		assert_eq!(name, "libessence_tester.dylib");
		#[cfg(target_os = "windows")]
		assert_eq!(name, "essence_tester.dll");
	}

	#[test]
	fn test_grammar_search_paths_not_empty() {
		let dirs = grammar_search_paths();
		assert!(!dirs.is_empty());
	}

	#[cfg(unix)]
	#[test]
	fn test_search_path_order() {
		let dirs = search_paths_with(env(&[
			("ESSENCE_GRAMMAR_DIR", "/opt/grammars"),
			("ESSENCE_RUNTIME", "/opt/runtime"),
			("CARGO_MANIFEST_DIR", "/src/ws/crates/grammar"),
			("HOME", "/home/user"),
		]));

		assert_eq!(
			dirs,
			vec![
				PathBuf::from("/opt/grammars"),
				PathBuf::from("/opt/runtime/grammars"),
				PathBuf::from("/src/ws/target/grammars"),
				PathBuf::from("/home/user/.cache/essence-grammar/grammars"),
				PathBuf::from("/home/user/.local/share/essence-grammar/grammars"),
			]
		);
	}

	#[cfg(unix)]
	#[test]
	fn test_xdg_overrides_home() {
		let dirs = search_paths_with(env(&[
			("HOME", "/home/user"),
			("XDG_CACHE_HOME", "/xdg/cache"),
			("XDG_DATA_HOME", "/xdg/data"),
		]));

		assert_eq!(
			dirs,
			vec![
				PathBuf::from("/xdg/cache/essence-grammar/grammars"),
				PathBuf::from("/xdg/data/essence-grammar/grammars"),
			]
		);
	}

	#[test]
	fn test_find_grammar_first_match_wins() {
		let first = tempfile::tempdir().unwrap();
		let second = tempfile::tempdir().unwrap();
		let lib_name = GrammarId::Essence.library_name();
		std::fs::write(first.path().join(&lib_name), b"").unwrap();
		std::fs::write(second.path().join(&lib_name), b"").unwrap();

		let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
		let found = find_grammar_in(GrammarId::Essence, &dirs).unwrap();
		assert_eq!(found, first.path().join(lib_name));
	}

	#[test]
	fn test_find_grammar_not_found() {
		let empty = tempfile::tempdir().unwrap();
		let err = find_grammar_in(GrammarId::EssenceTester, &[empty.path().to_path_buf()]).unwrap_err();
		assert!(matches!(err, GrammarError::NotFound(ref name) if name == "essence_tester"));
	}

	#[test]
	fn test_load_rejects_non_library() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(GrammarId::Essence.library_name());
		std::fs::write(&path, b"not a shared library").unwrap();

		let err = load_grammar_from_path(&path, GrammarId::Essence).unwrap_err();
		assert!(matches!(err, GrammarError::LoadError(_)), "unexpected error: {err}");
	}

	#[cfg(unix)]
	#[test]
	fn test_lib_dir_prefers_existing_search_path() {
		let home = tempfile::tempdir().unwrap();
		let data_dir = home.path().join(".local/share/essence-grammar/grammars");
		std::fs::create_dir_all(&data_dir).unwrap();

		let home_str = home.path().to_str().unwrap();
		let paths = search_paths_with(env(&[("HOME", home_str)]));
		assert!(!paths[0].exists());

		assert_eq!(lib_dir_from(paths), data_dir);
	}

	#[test]
	fn test_lib_dir_falls_back_to_first_search_path() {
		let paths = search_paths_with(env(&[("ESSENCE_GRAMMAR_DIR", "/nonexistent/grammars"), ("HOME", "/nonexistent/home")]));
		assert_eq!(lib_dir_from(paths), PathBuf::from("/nonexistent/grammars"));
		assert_eq!(lib_dir_from(Vec::new()), PathBuf::from("grammars"));
	}
}
