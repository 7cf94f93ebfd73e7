//! Grammar smoke checks.
//!
//! A smoke check asks a grammar accessor for its handle and feeds it to a
//! [`LanguageBuilder`]. The check passes when a language comes back.

use tracing::{debug, warn};

use crate::builder::{LanguageBuilder, LoadFailure};
use crate::grammar::GrammarId;
use crate::handle::{GrammarHandle, language};

/// Outcome of the smoke check for one grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeReport {
	pub grammar: GrammarId,
	pub result: Result<(), LoadFailure>,
}

impl SmokeReport {
	pub fn passed(&self) -> bool {
		self.result.is_ok()
	}
}

/// Loads the grammar returned by `get_language` through `builder`.
///
/// # Errors
///
/// Returns the builder's [`LoadFailure`], whose message names the grammar.
pub fn can_load_grammar<B, F>(builder: &B, get_language: F) -> Result<B::Language, LoadFailure>
where
	B: LanguageBuilder + ?Sized,
	F: FnOnce() -> GrammarHandle,
{
	let handle = get_language();
	let grammar = handle.id();

	match builder.build(handle) {
		Ok(language) => {
			debug!(grammar = %grammar, "Grammar loaded");
			Ok(language)
		}
		Err(failure) => {
			warn!(grammar = %grammar, cause = %failure.kind(), "{failure}");
			Err(failure)
		}
	}
}

/// Runs the smoke check for every registered grammar.
pub fn check_all<B: LanguageBuilder + ?Sized>(builder: &B) -> Vec<SmokeReport> {
	check_grammars(builder, &GrammarId::ALL)
}

/// Runs the smoke check for each grammar in `grammars`, independently.
pub fn check_grammars<B: LanguageBuilder + ?Sized>(builder: &B, grammars: &[GrammarId]) -> Vec<SmokeReport> {
	grammars
		.iter()
		.map(|&grammar| SmokeReport {
			grammar,
			result: can_load_grammar(builder, || language(grammar)).map(drop),
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;
	use crate::builder::LoadFailureKind;

	/// Stands in for a runtime that accepts every handle.
	struct AcceptAll {
		calls: Cell<usize>,
	}

	impl LanguageBuilder for AcceptAll {
		type Language = GrammarId;

		fn build(&self, handle: GrammarHandle) -> Result<GrammarId, LoadFailure> {
			self.calls.set(self.calls.get() + 1);
			Ok(handle.id())
		}
	}

	/// Stands in for a runtime whose construction routine returns null.
	struct RejectAll;

	impl LanguageBuilder for RejectAll {
		type Language = ();

		fn build(&self, handle: GrammarHandle) -> Result<(), LoadFailure> {
			Err(LoadFailure::new(handle.id(), LoadFailureKind::NullLanguage))
		}
	}

	/// Rejects only one grammar.
	struct RejectOne(GrammarId);

	impl LanguageBuilder for RejectOne {
		type Language = ();

		fn build(&self, handle: GrammarHandle) -> Result<(), LoadFailure> {
			if handle.id() == self.0 {
				Err(LoadFailure::new(handle.id(), LoadFailureKind::Absent))
			} else {
				Ok(())
			}
		}
	}

	#[test]
	fn test_essence_passes() {
		let builder = AcceptAll { calls: Cell::new(0) };
		let loaded = can_load_grammar(&builder, || GrammarHandle::absent(GrammarId::Essence)).unwrap();
		assert_eq!(loaded, GrammarId::Essence);
		assert_eq!(builder.calls.get(), 1);
	}

	#[test]
	fn test_essence_tester_passes() {
		let builder = AcceptAll { calls: Cell::new(0) };
		let loaded = can_load_grammar(&builder, || GrammarHandle::absent(GrammarId::EssenceTester)).unwrap();
		assert_eq!(loaded, GrammarId::EssenceTester);
	}

	#[test]
	fn test_failure_names_grammar() {
		let err = can_load_grammar(&RejectAll, || GrammarHandle::absent(GrammarId::Essence)).unwrap_err();
		assert_eq!(err.to_string(), "Error loading Essence grammar");

		let err = can_load_grammar(&RejectAll, || GrammarHandle::absent(GrammarId::EssenceTester)).unwrap_err();
		assert_eq!(err.to_string(), "Error loading EssenceTester grammar");
	}

	#[test]
	fn test_check_all_covers_every_grammar() {
		let builder = AcceptAll { calls: Cell::new(0) };
		let reports = check_all(&builder);

		assert_eq!(builder.calls.get(), GrammarId::ALL.len());
		assert_eq!(reports.iter().map(|r| r.grammar).collect::<Vec<_>>(), GrammarId::ALL.to_vec());
		assert!(reports.iter().all(SmokeReport::passed));
	}

	#[test]
	fn test_failure_does_not_abort_others() {
		let reports = check_all(&RejectOne(GrammarId::Essence));

		assert_eq!(reports.len(), 2);
		assert!(!reports[0].passed());
		assert_eq!(reports[0].result.as_ref().unwrap_err().to_string(), "Error loading Essence grammar");
		assert!(reports[1].passed());
	}

	#[test]
	fn test_check_selected_grammars() {
		let reports = check_grammars(&RejectAll, &[GrammarId::EssenceTester]);
		assert_eq!(reports.len(), 1);
		assert_eq!(reports[0].grammar, GrammarId::EssenceTester);
		assert!(!reports[0].passed());
	}
}
