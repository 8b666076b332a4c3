// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Explicit session context for capture and sync.
//!
//! The employee identity and credential are passed into each call rather than
//! looked up from ambient state.

use serde::{Deserialize, Serialize};

/// Identity of the employee using the time clock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    /// Credential presented to the remote endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl SessionContext {
    /// Creates a session without a credential.
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        SessionContext {
            user_id: user_id.into(),
            user_name: user_name.into(),
            auth_token: None,
        }
    }

    /// Attaches a credential.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Returns true when both identity fields are filled in.
    pub fn has_identity(&self) -> bool {
        !self.user_id.trim().is_empty() && !self.user_name.trim().is_empty()
    }

    /// Returns the credential if one is present and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Returns true when the session can talk to the remote endpoint.
    pub fn is_authenticated(&self) -> bool {
        self.has_identity() && self.token().is_some()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
