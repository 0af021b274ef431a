//! Warnings and errors collected during an import.

use std::fmt;

/// Severity of a message reported to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// Keeps the first warning of an import.
///
/// Every warning is logged; later ones only bump the counter.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    first_warning: Option<String>,
    warnings: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings += 1;
        if self.first_warning.is_none() {
            self.first_warning = Some(message);
        }
    }

    pub fn first_warning(&self) -> Option<&str> {
        self.first_warning.as_deref()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }
}
