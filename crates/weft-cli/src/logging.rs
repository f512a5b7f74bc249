// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Log configuration and subscriber setup.
//!
//! Options come from `WEFT_LOG_FORMAT` / `WEFT_LOG_LEVEL`, then command-line
//! flags. `RUST_LOG`, when set, replaces the level with its own directives.

use std::env;
use std::fmt;

/// Output format for log events on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Auto,
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "text" | "plain" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Auto => "auto",
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "error" | "err" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" | "verbose" => Some(Self::Trace),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogOptions {
    pub const DEFAULT: Self = Self { format: LogFormat::Auto, level: LogLevel::Warn };

    pub fn from_env() -> Self {
        let format = env::var("WEFT_LOG_FORMAT").ok();
        let level = env::var("WEFT_LOG_LEVEL").ok();
        apply_overrides(Self::DEFAULT, format.as_deref(), level.as_deref())
    }

    /// `Auto` picks JSON when stderr is not a terminal.
    pub fn resolved(self, stderr_is_terminal: bool) -> Self {
        let format = match self.format {
            LogFormat::Auto if stderr_is_terminal => LogFormat::Text,
            LogFormat::Auto => LogFormat::Json,
            other => other,
        };
        Self { format, ..self }
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Command-line overrides, applied over the environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSettings {
    pub format: Option<LogFormat>,
    pub level: Option<LogLevel>,
}

impl LogSettings {
    pub fn merged_with_env(self) -> LogOptions {
        let env = LogOptions::from_env();
        LogOptions {
            format: self.format.unwrap_or(env.format),
            level: self.level.unwrap_or(env.level),
        }
    }
}

fn apply_overrides(mut options: LogOptions, format: Option<&str>, level: Option<&str>) -> LogOptions {
    if let Some(parsed) = format.and_then(LogFormat::parse) {
        options.format = parsed;
    }
    if let Some(parsed) = level.and_then(LogLevel::parse) {
        options.level = parsed;
    }
    options
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(options: LogOptions) {
    use std::io::IsTerminal;
    use std::sync::OnceLock;
    use tracing_subscriber::{fmt, EnvFilter};

    static INITIALISED: OnceLock<()> = OnceLock::new();

    INITIALISED.get_or_init(|| {
        let is_terminal = std::io::stderr().is_terminal();
        let options = options.resolved(is_terminal);
        let use_ansi = is_terminal && env::var_os("NO_COLOR").is_none();
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(options.level.to_string()));

        let builder = fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_ansi(use_ansi);
        let installed = match options.format {
            LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
            _ => tracing::subscriber::set_global_default(builder.compact().finish()),
        };
        if installed.is_ok() {
            tracing::debug!(target: "weft", format = %options.format, level = %options.level, "logging ready");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_and_level_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("plain"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("yaml"), None);
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("loud"), None);
        assert!(LogLevel::Debug > LogLevel::Info);
    }

    #[test]
    fn environment_values_override_defaults() {
        let opts = apply_overrides(LogOptions::DEFAULT, Some("text"), Some("debug"));
        assert_eq!(opts, LogOptions { format: LogFormat::Text, level: LogLevel::Debug });

        let opts = apply_overrides(LogOptions::DEFAULT, Some("nonsense"), None);
        assert_eq!(opts, LogOptions::DEFAULT);
    }

    #[test]
    fn auto_follows_the_terminal() {
        let auto = LogOptions::DEFAULT;
        assert_eq!(auto.resolved(true).format, LogFormat::Text);
        assert_eq!(auto.resolved(false).format, LogFormat::Json);
        let text = LogOptions { format: LogFormat::Text, ..auto };
        assert_eq!(text.resolved(false).format, LogFormat::Text);
    }
}
