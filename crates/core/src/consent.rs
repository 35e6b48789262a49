use crate::view::View;

/// Persisted consent answers, as read at navigation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsentFlags {
    pub blocked: bool,
    pub safety_acknowledged: bool,
    pub terms_acknowledged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// The player declined the terms; stays here until the block is cleared.
    Blocked,
    NeedsSafetyAck,
    NeedsTermsAck,
    Allowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(View),
}

impl ConsentFlags {
    #[must_use]
    pub fn state(&self) -> GateState {
        if self.blocked {
            GateState::Blocked
        } else if !self.safety_acknowledged {
            GateState::NeedsSafetyAck
        } else if !self.terms_acknowledged {
            GateState::NeedsTermsAck
        } else {
            GateState::Allowed
        }
    }
}

/// Decide whether navigation to `target` may proceed.
#[must_use]
pub fn evaluate(target: View, flags: ConsentFlags) -> GateDecision {
    if target.bypasses_consent() {
        return GateDecision::Allow;
    }
    match flags.state() {
        GateState::Blocked => GateDecision::Redirect(View::Exit),
        GateState::NeedsSafetyAck => GateDecision::Redirect(View::NoticeSafety),
        GateState::NeedsTermsAck => GateDecision::Redirect(View::Terms),
        GateState::Allowed => GateDecision::Allow,
    }
}
