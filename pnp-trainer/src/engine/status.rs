//! Transient status line shown in both windows.
//!
//! A message fades linearly from full opacity to nothing over its timeout and
//! is dropped once invisible. Expiry is checked every frame against the app
//! clock, nothing is scheduled.

use std::time::Duration;

use bevy::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub colour: Color,
    pub shown_at: Duration,
    pub timeout: Duration,
}

impl StatusMessage {
    /// `1 - elapsed / timeout`, clamped to `[0, 1]`.
    pub fn alpha(&self, now: Duration) -> f32 {
        if self.timeout.is_zero() {
            return 0.0;
        }
        let elapsed = now.saturating_sub(self.shown_at).as_secs_f32();
        (1.0 - elapsed / self.timeout.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn is_expired(&self, now: Duration) -> bool {
        self.alpha(now) <= 0.0
    }
}

/// Holds at most one message; posting replaces the current one.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    current: Option<StatusMessage>,
}

impl StatusBoard {
    pub fn post(&mut self, text: impl Into<String>, colour: Color, timeout: Duration, now: Duration) {
        let text = text.into();
        info!("Status: {}", text);
        self.current = Some(StatusMessage {
            text,
            colour,
            shown_at: now,
            timeout,
        });
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.current.as_ref()
    }

    /// Drop the message once it has faded out.
    pub fn expire(&mut self, now: Duration) {
        if self.current.as_ref().is_some_and(|m| m.is_expired(now)) {
            self.current = None;
        }
    }

    /// Text and faded colour to draw this frame, if any.
    pub fn visible(&self, now: Duration) -> Option<(&str, Color)> {
        let message = self.current.as_ref()?;
        let alpha = message.alpha(now);
        (alpha > 0.0).then(|| (message.text.as_str(), message.colour.with_alpha(alpha)))
    }
}
