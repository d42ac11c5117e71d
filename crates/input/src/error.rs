//! Control signals.
//!
//! Every condition that has to unwind past the current command travels as a
//! [`Signal`] in the `Err` arm of a `Result`. End of input is not a signal:
//! the parser reports it as [`crate::Parsed::EndOfInput`].

/// A value thrown to unwind to a top-level handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// A user-visible failure: parse errors, source I/O failures, failed
    /// builtins. `origin` names the primitive that raised it.
    Error { origin: String, message: String },
    /// Terminate the shell with the given status.
    Exit(i32),
    /// An asynchronous interrupt was dispatched at a safe point.
    Interrupt,
    /// An internal invariant was violated; not recoverable by the user.
    Internal(String),
}

impl Signal {
    pub fn error(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Signal::Error {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Whether an interactive session may report this and keep reading.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Signal::Error { .. } | Signal::Interrupt)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Error { message, .. } => write!(f, "{}", message),
            Signal::Exit(status) => write!(f, "exit {}", status),
            Signal::Interrupt => write!(f, "interrupted"),
            Signal::Internal(message) => write!(f, "internal error: {}", message),
        }
    }
}

impl std::error::Error for Signal {}

impl From<std::io::Error> for Signal {
    fn from(e: std::io::Error) -> Self {
        Signal::error("xs", e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_message_only() {
        let sig = Signal::error("$&parse", "stdin:1-1:0-3 syntax error");
        assert_eq!(sig.to_string(), "stdin:1-1:0-3 syntax error");
        assert_eq!(Signal::Exit(3).to_string(), "exit 3");
    }

    #[test]
    fn test_recoverable() {
        assert!(Signal::error("x", "y").is_recoverable());
        assert!(Signal::Interrupt.is_recoverable());
        assert!(!Signal::Exit(0).is_recoverable());
        assert!(!Signal::Internal("boom".into()).is_recoverable());
    }
}
