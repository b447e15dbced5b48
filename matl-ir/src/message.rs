#![forbid(unsafe_code)]

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub fn display(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }
}

/// Where a message originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Reported by the compiler or the DAG generator.
    Compiler,
    /// Reported by the integration layer itself.
    Integration,
}

/// A human-readable diagnostic appended to a caller-supplied sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    pub fn new(severity: Severity, kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Severity::Error, MessageKind::Integration, text)
    }

    pub fn compiler_error(text: impl Into<String>) -> Self {
        Self::new(Severity::Error, MessageKind::Compiler, text)
    }

    pub fn compiler_warning(text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, MessageKind::Compiler, text)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity.display(), self.text)
    }
}

pub fn error_count(messages: &[Message]) -> usize {
    messages.iter().filter(|m| m.is_error()).count()
}
