use std::fmt;
use std::str::FromStr;

/// Top-level screens of the app, addressed by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Setup,
    Play,
    Result,
    Rules,
    Achievements,
    NoticeSafety,
    Terms,
    Privacy,
    Support,
    Exit,
}

impl View {
    pub const ALL: [View; 11] = [
        View::Home,
        View::Setup,
        View::Play,
        View::Result,
        View::Rules,
        View::Achievements,
        View::NoticeSafety,
        View::Terms,
        View::Privacy,
        View::Support,
        View::Exit,
    ];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            View::Home => "/",
            View::Setup => "/setup",
            View::Play => "/play",
            View::Result => "/result",
            View::Rules => "/rules",
            View::Achievements => "/achievements",
            View::NoticeSafety => "/notice-safety",
            View::Terms => "/terms",
            View::Privacy => "/privacy",
            View::Support => "/support",
            View::Exit => "/exit",
        }
    }

    /// Views reachable without any consent, so the player can always read them.
    #[must_use]
    pub fn bypasses_consent(self) -> bool {
        matches!(
            self,
            View::NoticeSafety
                | View::Terms
                | View::Privacy
                | View::Support
                | View::Rules
                | View::Exit
        )
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownViewError(pub String);

impl fmt::Display for UnknownViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown view path: {}", self.0)
    }
}

impl std::error::Error for UnknownViewError {}

impl FromStr for View {
    type Err = UnknownViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };
        View::ALL
            .into_iter()
            .find(|v| v.path() == normalized)
            .ok_or_else(|| UnknownViewError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_parse_back() {
        for view in View::ALL {
            assert_eq!(view.path().parse::<View>(), Ok(view));
        }
        assert_eq!("/terms/".parse::<View>(), Ok(View::Terms));
        assert!("/admin/import".parse::<View>().is_err());
    }
}
