//! Turning grammar handles into runtime language objects.

use thiserror::Error;
use tree_sitter::{LANGUAGE_VERSION, Language, MIN_COMPATIBLE_LANGUAGE_VERSION};
use tree_sitter_language::LanguageFn;

use crate::grammar::GrammarId;
use crate::handle::GrammarHandle;

/// Why a handle could not be turned into a language.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailureKind {
	/// The handle carries no language function.
	#[error("grammar library was not found or could not be loaded")]
	Absent,
	/// The language function returned a null pointer.
	#[error("language function returned a null pointer")]
	NullLanguage,
	/// The grammar was generated for an ABI the runtime does not speak.
	#[error("ABI version {found} is outside the supported range {min}..={max}")]
	IncompatibleAbi { found: usize, min: usize, max: usize },
}

/// The runtime could not construct a language from a grammar handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error loading {grammar} grammar")]
pub struct LoadFailure {
	grammar: GrammarId,
	#[source]
	kind: LoadFailureKind,
}

impl LoadFailure {
	pub fn new(grammar: GrammarId, kind: LoadFailureKind) -> Self {
		Self { grammar, kind }
	}

	/// The grammar that failed to load.
	pub fn grammar(&self) -> GrammarId {
		self.grammar
	}

	pub fn kind(&self) -> &LoadFailureKind {
		&self.kind
	}
}

/// Capability that constructs runtime language objects from grammar handles.
///
/// [`TreeSitterRuntime`] is the real implementation; tests substitute fakes.
pub trait LanguageBuilder {
	/// The language object produced on success.
	type Language;

	/// Constructs the language for `handle`.
	fn build(&self, handle: GrammarHandle) -> Result<Self::Language, LoadFailure>;
}

impl<B: LanguageBuilder + ?Sized> LanguageBuilder for &B {
	type Language = B::Language;

	fn build(&self, handle: GrammarHandle) -> Result<Self::Language, LoadFailure> {
		(**self).build(handle)
	}
}

/// Builds [`tree_sitter::Language`]s, checking the grammar's ABI version.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterRuntime;

impl LanguageBuilder for TreeSitterRuntime {
	type Language = Language;

	fn build(&self, handle: GrammarHandle) -> Result<Language, LoadFailure> {
		let grammar = handle.id();
		let Some(language_fn) = handle.raw() else {
			return Err(LoadFailure::new(grammar, LoadFailureKind::Absent));
		};

		// SAFETY: handles only carry functions honouring the `GrammarHandle::from_raw` contract.
		if unsafe { language_fn() }.is_null() {
			return Err(LoadFailure::new(grammar, LoadFailureKind::NullLanguage));
		}

		// SAFETY: as above, and the pointer was just checked to be non-null.
		let language = Language::new(unsafe { LanguageFn::from_raw(language_fn) });

		let found = language.abi_version();
		if !(MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&found) {
			return Err(LoadFailure::new(
				grammar,
				LoadFailureKind::IncompatibleAbi {
					found,
					min: MIN_COMPATIBLE_LANGUAGE_VERSION,
					max: LANGUAGE_VERSION,
				},
			));
		}

		Ok(language)
	}
}
