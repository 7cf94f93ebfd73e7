//! Process-wide grammar handles.
//!
//! Each grammar owns one slot, resolved on first access and kept for the rest
//! of the process. A slot that loaded a shared library keeps that library open,
//! so the language function inside a [`GrammarHandle`] never dangles.

use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use libloading::Library;
use tracing::{debug, warn};
use tree_sitter_language::LanguageFn;

use crate::grammar::{GrammarId, RawLanguageFn, load_grammar};

/// Opaque reference to compiled grammar data.
///
/// A handle is either present (it carries the grammar's language function) or
/// absent (the grammar could not be resolved). Both are valid values; turning a
/// handle into a usable language is the job of a
/// [`LanguageBuilder`](crate::LanguageBuilder).
#[derive(Clone, Copy)]
pub struct GrammarHandle {
	id: GrammarId,
	language_fn: Option<RawLanguageFn>,
}

impl GrammarHandle {
	/// A handle for a grammar that could not be resolved.
	pub const fn absent(id: GrammarId) -> Self {
		Self { id, language_fn: None }
	}

	/// A handle backed by a statically linked language function.
	pub fn from_language_fn(id: GrammarId, language: LanguageFn) -> Self {
		Self {
			id,
			language_fn: Some(language.into_raw()),
		}
	}

	/// A handle backed by a raw language function.
	///
	/// # Safety
	///
	/// `language_fn` must be safe to call at any time for the rest of the
	/// process, and must return either null or a pointer to a tree-sitter
	/// `TSLanguage`.
	pub const unsafe fn from_raw(id: GrammarId, language_fn: RawLanguageFn) -> Self {
		Self {
			id,
			language_fn: Some(language_fn),
		}
	}

	/// The grammar this handle refers to.
	pub fn id(&self) -> GrammarId {
		self.id
	}

	/// Whether the handle carries a language function.
	pub fn is_present(&self) -> bool {
		self.language_fn.is_some()
	}

	/// The language function in the form the tree-sitter runtime consumes.
	pub fn language_fn(&self) -> Option<LanguageFn> {
		// SAFETY: every constructor upholds the `from_raw` contract.
		self.language_fn.map(|f| unsafe { LanguageFn::from_raw(f) })
	}

	pub(crate) fn raw(&self) -> Option<RawLanguageFn> {
		self.language_fn
	}
}

impl PartialEq for GrammarHandle {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
			&& match (self.language_fn, other.language_fn) {
				(Some(a), Some(b)) => std::ptr::fn_addr_eq(a, b),
				(None, None) => true,
				_ => false,
			}
	}
}

impl Eq for GrammarHandle {}

impl fmt::Debug for GrammarHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GrammarHandle")
			.field("id", &self.id)
			.field("present", &self.is_present())
			.finish()
	}
}

/// Where a slot's handle came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarSource {
	/// Grammar loaded from a shared library file.
	Library(PathBuf),
	/// Grammar registered from a statically linked language function.
	Builtin,
	/// Grammar could not be resolved; holds the reason.
	Unavailable(String),
}

struct GrammarSlot {
	handle: GrammarHandle,
	source: GrammarSource,
	_library: Option<Library>,
}

static ESSENCE: OnceLock<GrammarSlot> = OnceLock::new();
static ESSENCE_TESTER: OnceLock<GrammarSlot> = OnceLock::new();

fn slot_cell(id: GrammarId) -> &'static OnceLock<GrammarSlot> {
	match id {
		GrammarId::Essence => &ESSENCE,
		GrammarId::EssenceTester => &ESSENCE_TESTER,
	}
}

fn slot(id: GrammarId) -> &'static GrammarSlot {
	slot_cell(id).get_or_init(|| resolve(id))
}

fn resolve(id: GrammarId) -> GrammarSlot {
	match load_grammar(id) {
		Ok(loaded) => {
			let (language_fn, library, path) = loaded.into_parts();
			debug!(grammar = %id, path = %path.display(), "Loaded grammar");
			GrammarSlot {
				// SAFETY: the library is stored next to the handle and never unloaded.
				handle: unsafe { GrammarHandle::from_raw(id, language_fn) },
				source: GrammarSource::Library(path),
				_library: Some(library),
			}
		}
		Err(e) => {
			warn!(grammar = %id, error = %e, "Grammar unavailable");
			GrammarSlot {
				handle: GrammarHandle::absent(id),
				source: GrammarSource::Unavailable(e.to_string()),
				_library: None,
			}
		}
	}
}

/// Returns the handle for `id`, resolving the grammar on first use.
///
/// Never fails: an unresolvable grammar yields an absent handle.
pub fn language(id: GrammarId) -> GrammarHandle {
	slot(id).handle
}

/// Returns where the handle for `id` came from, resolving it if needed.
pub fn grammar_source(id: GrammarId) -> &'static GrammarSource {
	&slot(id).source
}

/// Resolves every grammar now instead of on first access.
pub fn preload() {
	for id in GrammarId::ALL {
		let _ = slot(id);
	}
}

/// Installs a statically linked grammar into the slot for `id`.
///
/// Returns `false` if the slot was already resolved; the existing handle is kept.
pub fn register_builtin(id: GrammarId, language: LanguageFn) -> bool {
	let mut installed = false;
	slot_cell(id).get_or_init(|| {
		installed = true;
		GrammarSlot {
			handle: GrammarHandle::from_language_fn(id, language),
			source: GrammarSource::Builtin,
			_library: None,
		}
	});

	if installed {
		debug!(grammar = %id, "Registered builtin grammar");
	}
	installed
}
