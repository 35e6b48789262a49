use std::sync::Arc;

use rogaine_core::consent::{self, ConsentFlags, GateDecision};
use rogaine_core::view::View;
use storage::repository::PreferenceRepository;

use crate::Clock;
use crate::error::ConsentServiceError;

pub const CONSENT_SAFETY_KEY: &str = "rogaine_consent_safety_v1";
pub const CONSENT_TERMS_KEY: &str = "rogaine_consent_terms_v1";
pub const CONSENT_BLOCKED_KEY: &str = "rogaine_consent_blocked";

const FLAG_ON: &str = "1";

fn at_key(key: &str) -> String {
    format!("{key}_at")
}

/// Persisted consent flags and the navigation gate built on them.
#[derive(Clone)]
pub struct ConsentService {
    clock: Clock,
    preferences: Arc<dyn PreferenceRepository>,
}

impl ConsentService {
    #[must_use]
    pub fn new(clock: Clock, preferences: Arc<dyn PreferenceRepository>) -> Self {
        Self { clock, preferences }
    }

    async fn is_set(&self, key: &str) -> Result<bool, ConsentServiceError> {
        Ok(self.preferences.get_preference(key).await?.as_deref() == Some(FLAG_ON))
    }

    async fn set_acknowledged(&self, key: &str, on: bool) -> Result<(), ConsentServiceError> {
        if on {
            self.preferences.put_preference(key, FLAG_ON).await?;
            let now = self.clock.now_ms().to_string();
            self.preferences.put_preference(&at_key(key), &now).await?;
        } else {
            self.preferences.delete_preference(key).await?;
            self.preferences.delete_preference(&at_key(key)).await?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ConsentServiceError::Storage` on read failures.
    pub async fn flags(&self) -> Result<ConsentFlags, ConsentServiceError> {
        Ok(ConsentFlags {
            blocked: self.is_set(CONSENT_BLOCKED_KEY).await?,
            safety_acknowledged: self.is_set(CONSENT_SAFETY_KEY).await?,
            terms_acknowledged: self.is_set(CONSENT_TERMS_KEY).await?,
        })
    }

    /// Record or withdraw the safety notice acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns `ConsentServiceError::Storage` if the flag cannot be written.
    pub async fn set_safety_acknowledged(&self, on: bool) -> Result<(), ConsentServiceError> {
        self.set_acknowledged(CONSENT_SAFETY_KEY, on).await
    }

    /// Record or withdraw agreement to the terms.
    ///
    /// # Errors
    ///
    /// Returns `ConsentServiceError::Storage` if the flag cannot be written.
    pub async fn set_terms_acknowledged(&self, on: bool) -> Result<(), ConsentServiceError> {
        self.set_acknowledged(CONSENT_TERMS_KEY, on).await
    }

    /// Declining the terms withdraws agreement and blocks play.
    ///
    /// # Errors
    ///
    /// Returns `ConsentServiceError::Storage` if the flags cannot be written.
    pub async fn decline_terms(&self) -> Result<(), ConsentServiceError> {
        self.set_terms_acknowledged(false).await?;
        self.preferences
            .put_preference(CONSENT_BLOCKED_KEY, FLAG_ON)
            .await?;
        log::info!("terms declined, play blocked");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ConsentServiceError::Storage` if the flag cannot be removed.
    pub async fn clear_block(&self) -> Result<(), ConsentServiceError> {
        self.preferences.delete_preference(CONSENT_BLOCKED_KEY).await?;
        Ok(())
    }

    /// Decide whether navigation to `target` may proceed.
    ///
    /// # Errors
    ///
    /// Returns `ConsentServiceError::Storage` if the flags cannot be read.
    pub async fn guard(&self, target: View) -> Result<GateDecision, ConsentServiceError> {
        if target.bypasses_consent() {
            return Ok(GateDecision::Allow);
        }
        Ok(consent::evaluate(target, self.flags().await?))
    }

    /// The view navigation actually lands on.
    ///
    /// # Errors
    ///
    /// Returns `ConsentServiceError::Storage` if the flags cannot be read.
    pub async fn resolve(&self, target: View) -> Result<View, ConsentServiceError> {
        Ok(match self.guard(target).await? {
            GateDecision::Allow => target,
            GateDecision::Redirect(view) => view,
        })
    }
}
