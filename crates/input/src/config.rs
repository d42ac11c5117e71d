//! Input engine configuration
//!
//! ```rust,ignore
//! use xs_input::InputConfig;
//!
//! let config = InputConfig::new()
//!     .with_prompts("; ", "")
//!     .with_history("/home/me/.xs_history");
//! ```

use bitflags::bitflags;
use std::path::PathBuf;

/// Size of the read buffer for descriptor sources
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Environment variable naming the history file
pub const HISTORY_ENV: &str = "XS_HISTORY";

/// Environment variable that disables history logging when set
pub const NO_HISTORY_ENV: &str = "XS_NOHISTORY";

bitflags! {
    /// Run-mode flags attached to a source for the duration of its run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RunFlags: u8 {
        /// Read through the line editor and log history
        const INTERACTIVE = 1 << 0;
        /// Echo every consumed byte to the diagnostic sink (-v)
        const ECHO_INPUT = 1 << 1;
        /// Print each command before running it (-x)
        const PRINT_COMMANDS = 1 << 2;
        /// Parse but do not evaluate (-n)
        const NO_EXEC = 1 << 3;
        /// Exit as soon as a command yields false (-e)
        const EXIT_ON_FALSE = 1 << 4;
    }
}

/// Configuration for an [`crate::Input`] context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputConfig {
    /// Initial buffer size for descriptor sources
    pub buffer_size: usize,

    /// Primary prompt used by the interactive loop
    pub prompt: String,

    /// Prompt shown while a command continues onto another line
    pub continuation_prompt: String,

    /// History file; `None` disables logging
    pub history: Option<PathBuf>,

    /// Session-wide history toggle
    pub history_enabled: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            buffer_size: DEFAULT_BUFFER_SIZE,
            prompt: "; ".to_string(),
            continuation_prompt: String::new(),
            history: None,
            history_enabled: true,
        }
    }
}

impl InputConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `XS_HISTORY` / `XS_NOHISTORY`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var(HISTORY_ENV)
            && !path.is_empty()
        {
            config.history = Some(PathBuf::from(path));
        }
        if std::env::var_os(NO_HISTORY_ENV).is_some() {
            config.history_enabled = false;
        }
        config
    }

    /// Set the descriptor buffer size (at least one byte)
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn with_prompts(
        mut self,
        prompt: impl Into<String>,
        continuation: impl Into<String>,
    ) -> Self {
        self.prompt = prompt.into();
        self.continuation_prompt = continuation.into();
        self
    }

    pub fn with_history(mut self, path: impl Into<PathBuf>) -> Self {
        self.history = Some(path.into());
        self
    }

    pub fn without_history(mut self) -> Self {
        self.history_enabled = false;
        self
    }
}
