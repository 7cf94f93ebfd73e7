//! Grammar compilation into dynamic libraries.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use tracing::info;

use super::config::GrammarConfig;
use super::{GrammarBuildError, Result};

/// Returns the first compiler from `candidates` that executes successfully.
fn find_compiler<'a>(candidates: &[&'a str]) -> Option<&'a str> {
	candidates
		.iter()
		.copied()
		.find(|name| Command::new(name).arg("--version").stdout(Stdio::null()).stderr(Stdio::null()).status().is_ok())
}

/// Resolves C and C++ compilers, preferring `CC`/`CXX` then probing common names.
fn resolve_compilers() -> (Option<&'static str>, Option<&'static str>) {
	static COMPILERS: OnceLock<(Option<&'static str>, Option<&'static str>)> = OnceLock::new();
	*COMPILERS.get_or_init(|| {
		#[cfg(windows)]
		const CC_CANDIDATES: &[&str] = &["cl", "clang-cl", "clang", "gcc"];
		#[cfg(windows)]
		const CXX_CANDIDATES: &[&str] = &["cl", "clang-cl", "clang++", "g++"];
		#[cfg(not(windows))]
		const CC_CANDIDATES: &[&str] = &["cc", "clang", "gcc"];
		#[cfg(not(windows))]
		const CXX_CANDIDATES: &[&str] = &["c++", "clang++", "g++"];

		let cc = std::env::var("CC").ok().map(|s| s.leak() as &str).or_else(|| find_compiler(CC_CANDIDATES));
		let cxx = std::env::var("CXX").ok().map(|s| s.leak() as &str).or_else(|| find_compiler(CXX_CANDIDATES));
		(cc, cxx)
	})
}

/// Status of a build operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
	/// Grammar was already built and up to date.
	AlreadyBuilt,
	/// Grammar was newly built.
	Built,
}

/// Returns true if any source file is newer than the compiled library.
fn needs_recompile(src_dir: &Path, lib_path: &Path) -> bool {
	let Ok(lib_mtime) = fs::metadata(lib_path).and_then(|m| m.modified()) else {
		return true;
	};

	["parser.c", "scanner.c", "scanner.cc"].iter().any(|file| {
		fs::metadata(src_dir.join(file))
			.and_then(|m| m.modified())
			.is_ok_and(|src_mtime| src_mtime > lib_mtime)
	})
}

/// Compiles a grammar into a shared library inside `lib_dir`.
///
/// 1. Verifies the presence of `src/parser.c`.
/// 2. Skips the build when the library is newer than every source.
/// 3. Compiles object files with [`cc`].
/// 4. Links the objects into a platform-specific shared library named after the grammar.
///
/// # Errors
///
/// * [`GrammarBuildError::NoParserSource`] if the grammar source is incomplete.
/// * [`GrammarBuildError::Compilation`] if no compiler is found or compiling or linking fails.
pub fn build_grammar(grammar: &GrammarConfig, lib_dir: &Path) -> Result<BuildStatus> {
	let src_dir = grammar.src_dir();
	if !src_dir.join("parser.c").exists() {
		return Err(GrammarBuildError::NoParserSource(src_dir));
	}

	fs::create_dir_all(lib_dir)?;
	let lib_path = lib_dir.join(grammar.grammar.library_name());

	tracing::debug!(
		grammar = %grammar.grammar,
		lib_path = %lib_path.display(),
		lib_exists = lib_path.exists(),
		"Grammar library path"
	);

	if !needs_recompile(&src_dir, &lib_path) {
		return Ok(BuildStatus::AlreadyBuilt);
	}

	info!(grammar = %grammar.grammar, lib_path = %lib_path.display(), "Compiling grammar");

	let needs_cxx = src_dir.join("scanner.cc").exists();
	let (cc, cxx) = resolve_compilers();
	let compiler = if needs_cxx {
		cxx.ok_or_else(|| {
			GrammarBuildError::Compilation(format!(
				"C++ compiler required for {} but none found. Install clang++/g++ or set CXX env var.",
				grammar.grammar.grammar_name()
			))
		})?
	} else {
		cc.ok_or_else(|| GrammarBuildError::Compilation("C compiler required but none found. Install clang/gcc or set CC env var.".into()))?
	};

	let objects = compile_objects(&src_dir, lib_dir, grammar.grammar.grammar_name(), compiler, needs_cxx)?;
	link_shared_library(&objects, &lib_path, compiler, needs_cxx)?;

	if !lib_path.exists() {
		return Err(GrammarBuildError::Compilation(format!(
			"compilation succeeded but library not found at {}",
			lib_path.display()
		)));
	}

	tracing::debug!(grammar = %grammar.grammar, lib_path = %lib_path.display(), "Successfully compiled grammar");
	Ok(BuildStatus::Built)
}

fn compile_objects(src_dir: &Path, lib_dir: &Path, grammar_name: &str, compiler: &str, needs_cxx: bool) -> Result<Vec<PathBuf>> {
	let target = std::env::var("TARGET").unwrap_or_else(|_| {
		let arch = std::env::consts::ARCH;
		if cfg!(target_os = "windows") {
			format!("{arch}-pc-windows-msvc")
		} else if cfg!(target_os = "macos") {
			format!("{arch}-apple-darwin")
		} else {
			format!("{arch}-unknown-linux-gnu")
		}
	});

	let scanner_cc = src_dir.join("scanner.cc");
	let scanner_c = src_dir.join("scanner.c");

	let mut build = cc::Build::new();
	build
		.opt_level(3)
		.debug(false)
		.pic(true)
		.cargo_metadata(false)
		.warnings(false)
		.include(src_dir)
		.host(&target)
		.target(&target)
		.compiler(compiler)
		.file(src_dir.join("parser.c"));

	if needs_cxx && scanner_cc.exists() {
		build.cpp(true).file(&scanner_cc).std("c++14");
	} else if scanner_c.exists() {
		build.file(&scanner_c);
	}

	let obj_dir = lib_dir.join("obj").join(grammar_name);
	fs::create_dir_all(&obj_dir)?;
	build.out_dir(&obj_dir);

	build.try_compile_intermediates().map_err(|e| GrammarBuildError::Compilation(e.to_string()))
}

/// Links object files into a shared library using the system compiler.
fn link_shared_library(objects: &[PathBuf], lib_path: &Path, compiler: &str, needs_cxx: bool) -> Result<()> {
	#[cfg(windows)]
	{
		let _ = (compiler, needs_cxx);
		let mut cmd = Command::new("cl.exe");
		cmd.args(["/nologo", "/LD"]).args(objects).arg(format!("/Fe:{}", lib_path.display()));
		run_compiler(cmd)
	}

	#[cfg(not(windows))]
	{
		let mut cmd = Command::new(compiler);
		cmd.arg("-shared").args(objects).arg("-o").arg(lib_path);

		if needs_cxx {
			cmd.arg("-lstdc++");
		}

		#[cfg(target_os = "linux")]
		cmd.arg("-Wl,-z,relro,-z,now");

		run_compiler(cmd)
	}
}

fn run_compiler(mut cmd: Command) -> Result<()> {
	let output = cmd.output().map_err(|e| GrammarBuildError::Compilation(e.to_string()))?;

	if output.status.success() {
		Ok(())
	} else {
		Err(GrammarBuildError::Compilation(String::from_utf8_lossy(&output.stderr).into()))
	}
}
