//! Non-fatal diagnostics
//!
//! Every recoverable condition found while extracting (unknown units,
//! inconsistent units, volumes below the lattice minimum, unknown phenotype
//! codes, ...) is pushed into a [`Diagnostics`] sink owned by the caller.
//! Nothing in this channel ever aborts an extraction; fatal conditions are
//! [`crate::ExtractError`]s instead.

use serde::{Deserialize, Serialize};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Output was adjusted or a conversion was disabled
    Warning,
    /// Informational, output is unaffected
    Hint,
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Entity the message is about (cell type, substrate, `domain`, ...).
    pub scope: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            scope: None,
            message: message.into(),
        }
    }

    pub fn hint(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Hint,
            scope: None,
            message: message.into(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// Ordered collection of diagnostics from one extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and mirror it to the log.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        let scope = diagnostic.scope.as_deref().unwrap_or("model");
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(scope, "{}", diagnostic.message),
            Severity::Hint => tracing::debug!(scope, "{}", diagnostic.message),
        }
        self.items.push(diagnostic);
    }

    /// Shorthand for a scoped warning.
    pub fn warn(&mut self, scope: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::warning(message).with_scope(scope));
    }

    /// Shorthand for a scoped hint.
    pub fn hint(&mut self, scope: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::hint(message).with_scope(scope));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Warning)
    }

    /// Diagnostics about one entity.
    pub fn for_scope<'a>(&'a self, scope: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.items
            .iter()
            .filter(move |d| d.scope.as_deref() == Some(scope))
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        for diagnostic in iter {
            self.push(diagnostic);
        }
    }
}
