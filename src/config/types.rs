use std::time::Duration;

// -------------------------------------------------------------------------------------------------
// ---- LogLevel -----------------------------------------------------------------------------------

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

// -------------------------------------------------------------------------------------------------
// ---- AcceptErrorPolicy --------------------------------------------------------------------------

/// What an accept loop does when `accept()` fails.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AcceptErrorPolicy {
    /// Stop the accept loop and let the process exit with the error.
    #[default]
    Exit,
    /// Log the error, back off briefly, keep accepting.
    Continue,
}

// -------------------------------------------------------------------------------------------------
// ---- Deadlines ----------------------------------------------------------------------------------

/// Optional per-session deadlines. All unset means every phase may block forever.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Deadlines {
    pub queue: Option<Duration>,
    pub dial: Option<Duration>,
    pub transfer: Option<Duration>,
}

// -------------------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------
