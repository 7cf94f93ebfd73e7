//! Essence grammar command-line front end.

mod cli;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, selected};
use essence_grammar::build::{BuildStatus, GrammarConfig, build_all_grammars, load_config};
use essence_grammar::{
	GrammarId, GrammarSource, LanguageBuilder, TreeSitterRuntime, check_grammars, collect_diagnostics, grammar_lib_dir, grammar_search_paths,
	grammar_source, language, parse,
};
use tracing::info;

fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();

	setup_tracing(cli.verbose);

	match cli.command {
		Command::Check { only } => Ok(check(&selected(only))),
		Command::Build { config, out, only } => build(&config, out.as_deref(), &selected(only)),
		Command::Parse { grammar, file } => parse_file(grammar, &file),
		Command::Paths => {
			paths();
			Ok(ExitCode::SUCCESS)
		}
	}
}

fn check(grammars: &[GrammarId]) -> ExitCode {
	let reports = check_grammars(&TreeSitterRuntime, grammars);
	let mut failed = false;

	for report in &reports {
		match &report.result {
			Ok(()) => println!("{}: ok", report.grammar),
			Err(failure) => {
				failed = true;
				println!("{}: {failure} ({})", report.grammar, failure.kind());
			}
		}
	}

	if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn build(config_path: &Path, out: Option<&Path>, grammars: &[GrammarId]) -> anyhow::Result<ExitCode> {
	let configs: Vec<GrammarConfig> = load_config(config_path)
		.with_context(|| format!("loading {}", config_path.display()))?
		.into_iter()
		.filter(|c| grammars.contains(&c.grammar))
		.collect();

	if configs.is_empty() {
		anyhow::bail!("no grammars selected in {}", config_path.display());
	}

	let lib_dir = out.map(Path::to_path_buf).unwrap_or_else(grammar_lib_dir);
	info!(lib_dir = %lib_dir.display(), count = configs.len(), "Building grammars");

	let results = build_all_grammars(configs, &lib_dir, None);
	let mut failed = false;

	for (config, result) in results {
		match result {
			Ok(BuildStatus::Built) => println!("{}: built", config.grammar),
			Ok(BuildStatus::AlreadyBuilt) => println!("{}: up to date", config.grammar),
			Err(e) => {
				failed = true;
				println!("{}: {e}", config.grammar);
			}
		}
	}

	Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn parse_file(grammar: GrammarId, file: &Path) -> anyhow::Result<ExitCode> {
	let source = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
	let runtime_language = TreeSitterRuntime.build(language(grammar))?;
	let tree = parse(&runtime_language, &source)?;

	let diagnostics = collect_diagnostics(&tree, &source);
	let file_name = file.display().to_string();
	for diagnostic in &diagnostics {
		println!("{}", diagnostic.render(&source, &file_name));
	}

	Ok(if diagnostics.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn paths() {
	println!("search paths:");
	for dir in grammar_search_paths() {
		let marker = if dir.is_dir() { "" } else { " (missing)" };
		println!("  {}{marker}", dir.display());
	}

	println!("grammars:");
	for id in GrammarId::ALL {
		match grammar_source(id) {
			GrammarSource::Library(path) => println!("  {id}: {}", path.display()),
			GrammarSource::Builtin => println!("  {id}: builtin"),
			GrammarSource::Unavailable(reason) => println!("  {id}: unavailable ({reason})"),
		}
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("essence_grammar=debug,info")
		} else {
			EnvFilter::new("warn")
		}
	});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}
