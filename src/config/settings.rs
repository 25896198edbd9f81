//! Matchmaking settings
//!
//! This module defines the recognized configuration options for the queue
//! engine, including environment variable loading and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Recognized matchmaking options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Balance team sizes when assembling and backfilling matches
    pub invitation_balancing: bool,
    /// Allow sessions to start with a single participant (diagnostics)
    pub testing_mode: bool,
    /// Force arena team sizes to 1 (diagnostics)
    pub arena_testing_mode: bool,
    /// Half-width of the rated matching window, in rating points
    pub max_rating_difference: u32,
    /// Age after which a queued entry bypasses the rating window, in seconds
    pub rating_discard_timer_secs: u64,
    /// Wait after which a premade entry is demoted to the normal queue, in seconds
    pub premade_wait_expiry_secs: u64,
    /// Length of the invitation acceptance window, in seconds
    pub invite_window_secs: u64,
    /// Offset from invitation to the reminder notification, in seconds
    pub invite_reminder_after_secs: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            invitation_balancing: true,
            testing_mode: false,
            arena_testing_mode: false,
            max_rating_difference: 150,
            rating_discard_timer_secs: 600,     // 10 minutes
            premade_wait_expiry_secs: 1800,     // 30 minutes
            invite_window_secs: 80,
            invite_reminder_after_secs: 20,
        }
    }
}

impl QueueSettings {
    /// Load settings from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(balancing) = env::var("INVITATION_BALANCING") {
            settings.invitation_balancing = balancing
                .parse()
                .map_err(|_| anyhow!("Invalid INVITATION_BALANCING value: {}", balancing))?;
        }
        if let Ok(testing) = env::var("TESTING_MODE") {
            settings.testing_mode = testing
                .parse()
                .map_err(|_| anyhow!("Invalid TESTING_MODE value: {}", testing))?;
        }
        if let Ok(arena_testing) = env::var("ARENA_TESTING_MODE") {
            settings.arena_testing_mode = arena_testing
                .parse()
                .map_err(|_| anyhow!("Invalid ARENA_TESTING_MODE value: {}", arena_testing))?;
        }
        if let Ok(diff) = env::var("MAX_RATING_DIFFERENCE") {
            settings.max_rating_difference = diff
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_RATING_DIFFERENCE value: {}", diff))?;
        }
        if let Ok(discard) = env::var("RATING_DISCARD_TIMER_SECONDS") {
            settings.rating_discard_timer_secs = discard
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_DISCARD_TIMER_SECONDS value: {}", discard))?;
        }
        if let Ok(expiry) = env::var("PREMADE_WAIT_EXPIRY_SECONDS") {
            settings.premade_wait_expiry_secs = expiry
                .parse()
                .map_err(|_| anyhow!("Invalid PREMADE_WAIT_EXPIRY_SECONDS value: {}", expiry))?;
        }
        if let Ok(window) = env::var("INVITE_WINDOW_SECONDS") {
            settings.invite_window_secs = window
                .parse()
                .map_err(|_| anyhow!("Invalid INVITE_WINDOW_SECONDS value: {}", window))?;
        }
        if let Ok(reminder) = env::var("INVITE_REMINDER_SECONDS") {
            settings.invite_reminder_after_secs = reminder
                .parse()
                .map_err(|_| anyhow!("Invalid INVITE_REMINDER_SECONDS value: {}", reminder))?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate option values
    pub fn validate(&self) -> Result<()> {
        if self.invite_window_secs == 0 {
            return Err(anyhow!("Invite window must be greater than 0"));
        }
        if self.invite_reminder_after_secs >= self.invite_window_secs {
            return Err(anyhow!(
                "Invite reminder offset must be smaller than the invite window"
            ));
        }
        if self.max_rating_difference == 0 {
            return Err(anyhow!("Max rating difference must be greater than 0"));
        }
        if self.premade_wait_expiry_secs == 0 {
            return Err(anyhow!("Premade wait expiry must be greater than 0"));
        }
        Ok(())
    }

    /// Get the invitation acceptance window as milliseconds
    pub fn invite_window_ms(&self) -> u64 {
        self.invite_window_secs * 1000
    }

    /// Get the reminder offset as milliseconds
    pub fn invite_reminder_after_ms(&self) -> u64 {
        self.invite_reminder_after_secs * 1000
    }

    /// Get the rating discard threshold as milliseconds
    pub fn rating_discard_timer_ms(&self) -> u64 {
        self.rating_discard_timer_secs * 1000
    }

    /// Get the premade demotion threshold as milliseconds
    pub fn premade_wait_expiry_ms(&self) -> u64 {
        self.premade_wait_expiry_secs * 1000
    }

    /// Get the invitation acceptance window as a Duration
    pub fn invite_window(&self) -> Duration {
        Duration::from_secs(self.invite_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = QueueSettings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.invitation_balancing);
        assert_eq!(settings.invite_window_ms(), 80_000);
        assert_eq!(settings.invite_reminder_after_ms(), 20_000);
    }

    #[test]
    fn reminder_must_precede_deadline() {
        let settings = QueueSettings {
            invite_reminder_after_secs: 80,
            ..QueueSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_window_rejected() {
        let settings = QueueSettings {
            invite_window_secs: 0,
            ..QueueSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn settings_round_trip_through_toml() {
        let settings = QueueSettings::default();
        let raw = toml::to_string(&settings).unwrap();
        let parsed: QueueSettings = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.max_rating_difference, settings.max_rating_difference);
        assert_eq!(parsed.invite_window_secs, settings.invite_window_secs);
    }
}
