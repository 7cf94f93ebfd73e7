// Host applications render their own output; the library reports through tracing only.
#![deny(clippy::print_stderr)]

//! Tree-sitter grammar bindings for Essence
//!
//! This crate hands host applications the compiled grammars for the Essence
//! constraint modelling language and its EssenceTester companion.
//!
//! # Architecture
//!
//! * [`grammar`]: Grammar identity, search paths and shared library loading
//! * [`handle`]: Process-wide grammar handles, resolved once
//! * [`builder`]: The [`LanguageBuilder`] capability and the tree-sitter runtime behind it
//! * [`smoke`]: Checks that each grammar turns into a runtime language
//! * [`build`]: Compiling generated grammar sources into shared libraries
//! * [`syntax`]: Parsing and syntax diagnostics
//!
//! # Usage
//!
//! ```no_run
//! use essence_grammar::{LanguageBuilder, TreeSitterRuntime, essence};
//!
//! let _language = TreeSitterRuntime.build(essence::language())?;
//! # Ok::<(), essence_grammar::LoadFailure>(())
//! ```

pub mod build;
pub mod builder;
pub mod grammar;
pub mod handle;
pub mod smoke;
pub mod syntax;

pub use builder::{LanguageBuilder, LoadFailure, LoadFailureKind, TreeSitterRuntime};
pub use grammar::{GrammarError, GrammarId, UnknownGrammar, grammar_lib_dir, grammar_search_paths};
pub use handle::{GrammarHandle, GrammarSource, grammar_source, language, preload, register_builtin};
pub use smoke::{SmokeReport, can_load_grammar, check_all, check_grammars};
pub use syntax::{Diagnostic, DiagnosticKind, Position, SyntaxError, collect_diagnostics, parse};

/// The Essence grammar.
pub mod essence {
	use crate::{GrammarHandle, GrammarId};

	/// Returns the handle for the Essence grammar.
	pub fn language() -> GrammarHandle {
		crate::handle::language(GrammarId::Essence)
	}
}

/// The EssenceTester grammar.
pub mod essence_tester {
	use crate::{GrammarHandle, GrammarId};

	/// Returns the handle for the EssenceTester grammar.
	pub fn language() -> GrammarHandle {
		crate::handle::language(GrammarId::EssenceTester)
	}
}
