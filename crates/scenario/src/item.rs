//! Scenario elements: expected status words, commands and log entries

use std::collections::BTreeSet;

use cardware_apdu_core::CommandApdu;
use tracing::{Level, debug, error, info, trace, warn};

use crate::{Error, Result};

/// Severity of a recorded log entry.
///
/// The integer values are the ones used on the DER wire and match the
/// ordering of `tracing`'s levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    /// Finest-grained detail.
    #[default]
    Trace,
    /// Diagnostic detail.
    Debug,
    /// Informational messages.
    Info,
    /// Something surprising but recoverable.
    Warn,
    /// Something went wrong.
    Error,
}

impl LogLevel {
    /// The wire integer of this level.
    pub const fn as_u32(&self) -> u32 {
        match self {
            Self::Trace => 0,
            Self::Debug => 1,
            Self::Info => 2,
            Self::Warn => 3,
            Self::Error => 4,
        }
    }

    /// The matching `tracing` level.
    pub const fn as_tracing(&self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

impl TryFrom<u32> for LogLevel {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Trace),
            1 => Ok(Self::Debug),
            2 => Ok(Self::Info),
            3 => Ok(Self::Warn),
            4 => Ok(Self::Error),
            n => Err(Error::InvalidLogLevel(n)),
        }
    }
}

/// A log message recorded into a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogEntry {
    level: LogLevel,
    message: String,
}

impl LogEntry {
    /// Create a log entry.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// The recorded level.
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    /// The recorded message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Re-emit this entry through `tracing` at its recorded level.
    pub fn emit(&self) {
        match self.level {
            LogLevel::Trace => trace!("{}", self.message),
            LogLevel::Debug => debug!("{}", self.message),
            LogLevel::Info => info!("{}", self.message),
            LogLevel::Warn => warn!("{}", self.message),
            LogLevel::Error => error!("{}", self.message),
        }
    }
}

/// One element of a recorded scenario.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScenarioItem {
    /// Replace the set of status words accepted from subsequent commands.
    ExpectedStatus(BTreeSet<u16>),
    /// Send this command.
    Command(CommandApdu),
    /// Emit this log entry.
    Log(LogEntry),
}

impl ScenarioItem {
    /// Expect subsequent commands to return one of these status words.
    pub fn expect(status_words: impl IntoIterator<Item = u16>) -> Self {
        Self::ExpectedStatus(status_words.into_iter().collect())
    }

    /// Emit `message` at `level` during replay.
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log(LogEntry::new(level, message))
    }
}

impl From<CommandApdu> for ScenarioItem {
    fn from(command: CommandApdu) -> Self {
        Self::Command(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_integers_round_trip() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            assert_eq!(LogLevel::try_from(level.as_u32()).unwrap(), level);
        }
        assert!(matches!(
            LogLevel::try_from(5).unwrap_err(),
            Error::InvalidLogLevel(5)
        ));
    }

    #[test]
    fn test_level_default_is_trace() {
        assert_eq!(LogLevel::default(), LogLevel::Trace);
    }

    #[test]
    fn test_tracing_mapping() {
        assert_eq!(LogLevel::Trace.as_tracing(), Level::TRACE);
        assert_eq!(LogLevel::Error.as_tracing(), Level::ERROR);
    }

    #[test]
    fn test_expect_collects_into_a_set() {
        let item = ScenarioItem::expect([0x9000, 0x6100, 0x9000]);
        let ScenarioItem::ExpectedStatus(set) = item else {
            panic!("wrong variant");
        };
        assert_eq!(set.len(), 2);
        assert!(set.contains(&0x9000));
    }
}
