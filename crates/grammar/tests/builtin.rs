#![allow(unused_crate_dependencies)]

//! Runs in its own process: registering a builtin grammar fills a global slot.

use essence_grammar::{GrammarId, GrammarSource, LanguageBuilder, TreeSitterRuntime, collect_diagnostics, essence, grammar_source, parse, register_builtin};

#[test]
fn builtin_grammar_is_served_by_accessor() {
	assert!(register_builtin(GrammarId::Essence, tree_sitter_json::LANGUAGE));
	assert!(!register_builtin(GrammarId::Essence, tree_sitter_json::LANGUAGE));

	assert_eq!(grammar_source(GrammarId::Essence), &GrammarSource::Builtin);
	assert!(essence::language().is_present());

	let language = TreeSitterRuntime.build(essence::language()).unwrap();
	let source = "[1, 2, 3]";
	let tree = parse(&language, source).unwrap();
	assert!(collect_diagnostics(&tree, source).is_empty());
}
