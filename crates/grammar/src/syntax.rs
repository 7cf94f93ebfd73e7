//! Parsing source text and collecting syntax diagnostics.

use std::collections::HashSet;
use std::fmt;
use std::ops::Range;

use thiserror::Error;
use tree_sitter::{Language, LanguageError, Node, Parser, Point, Tree};

/// Errors from running the parser.
#[derive(Debug, Error)]
pub enum SyntaxError {
	/// The parser rejected the language.
	#[error("language rejected by parser: {0}")]
	Language(#[from] LanguageError),
	/// The parser returned no tree.
	#[error("parsing was cancelled")]
	Cancelled,
}

/// Parses `source` with `language`.
pub fn parse(language: &Language, source: &str) -> Result<Tree, SyntaxError> {
	let mut parser = Parser::new();
	parser.set_language(language)?;
	parser.parse(source, None).ok_or(SyntaxError::Cancelled)
}

/// Zero-based line and column (in bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
	pub line: usize,
	pub column: usize,
}

impl From<Point> for Position {
	fn from(point: Point) -> Self {
		Self {
			line: point.row,
			column: point.column,
		}
	}
}

/// What a [`Diagnostic`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
	/// The parser inserted a token that is absent from the source.
	Missing,
	/// An error node covers all text on its line.
	Malformed,
	/// Any other error node.
	Unexpected,
}

/// A syntax problem found in a parsed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	pub kind: DiagnosticKind,
	pub message: String,
	pub start: Position,
	pub end: Position,
	pub byte_range: Range<usize>,
}

impl Diagnostic {
	fn from_node(node: Node<'_>, kind: DiagnosticKind, message: String) -> Self {
		Self {
			kind,
			message,
			start: node.start_position().into(),
			end: node.end_position().into(),
			byte_range: node.byte_range(),
		}
	}

	/// Renders the diagnostic with the offending line and a caret under its start.
	pub fn render(&self, source: &str, file_name: &str) -> String {
		let line = source.lines().nth(self.start.line).unwrap_or("");
		let indent = line.get(..self.start.column).unwrap_or(line).chars().count();
		format!(
			"{file_name}:{}:{}: {}\n  {line}\n  {}^",
			self.start.line + 1,
			self.start.column + 1,
			self.message,
			" ".repeat(indent)
		)
	}
}

impl fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}: {}", self.start.line + 1, self.start.column + 1, self.message)
	}
}

const MAX_SNIPPET_LEN: usize = 32;

/// Walks `tree` and reports missing tokens and error nodes.
///
/// Subtrees below a reported node are not visited. A line holding a malformed
/// error node gets no other error diagnostic, whatever other error nodes it holds.
pub fn collect_diagnostics(tree: &Tree, source: &str) -> Vec<Diagnostic> {
	let mut diagnostics = Vec::new();
	let mut malformed_lines = HashSet::new();
	let mut cursor = tree.walk();

	'walk: loop {
		let node = cursor.node();

		let reported = if node.is_missing() {
			diagnostics.push(Diagnostic::from_node(node, DiagnosticKind::Missing, missing_message(node)));
			true
		} else if node.is_error() {
			let line = node.start_position().row;
			if is_malformed_line(node, source) {
				if malformed_lines.insert(line) {
					let text = source.lines().nth(line).unwrap_or("");
					let message = format!("Malformed line {}: '{text}'", line + 1);
					diagnostics.push(Diagnostic::from_node(node, DiagnosticKind::Malformed, message));
				}
			} else {
				diagnostics.push(Diagnostic::from_node(node, DiagnosticKind::Unexpected, unexpected_message(node, source)));
			}
			true
		} else {
			false
		};

		if !reported && node.has_error() && cursor.goto_first_child() {
			continue;
		}

		loop {
			if cursor.goto_next_sibling() {
				break;
			}
			if !cursor.goto_parent() {
				break 'walk;
			}
		}
	}

	diagnostics.retain(|d| d.kind != DiagnosticKind::Unexpected || !malformed_lines.contains(&d.start.line));
	diagnostics
}

fn missing_message(node: Node<'_>) -> String {
	if node.is_named() {
		format!("Missing {}", node.kind())
	} else {
		format!("Missing '{}'", node.kind())
	}
}

fn unexpected_message(node: Node<'_>, source: &str) -> String {
	let text = node.utf8_text(source.as_bytes()).unwrap_or("");
	let first_line = text.lines().next().unwrap_or("").trim();
	let snippet: String = first_line.chars().take(MAX_SNIPPET_LEN).collect();
	if snippet.len() < first_line.len() {
		format!("Unexpected '{snippet}...'")
	} else {
		format!("Unexpected '{snippet}'")
	}
}

/// An error node is a malformed line when it covers all non-blank text of a single line.
fn is_malformed_line(node: Node<'_>, source: &str) -> bool {
	let start = node.start_position();
	let end = node.end_position();
	if start.row != end.row {
		return false;
	}

	let Some(line) = source.lines().nth(start.row) else {
		return false;
	};
	let Ok(text) = node.utf8_text(source.as_bytes()) else {
		return false;
	};

	!line.trim().is_empty() && text.trim() == line.trim()
}
