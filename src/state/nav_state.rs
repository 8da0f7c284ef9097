/// Navigation state definitions for the list-page crawl
///
/// This module defines the states the Navigator moves through while driving a
/// browsing session: load, search, scroll, paginate, and the stall/terminal states.
use std::fmt;

/// Represents the current state of the Navigator's session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavState {
    /// No session page loaded yet (also the state after a session recreation)
    Idle,

    /// The start URL (or a refreshed page) has been loaded
    Loaded,

    /// The search trigger has been invoked and results requested
    Searched,

    /// Scrolling to force lazily loaded items to render
    Scrolling,

    /// Advancing to the next page failed after every attempt
    Stalled,

    /// Trying the "next page" controls
    Paginating,

    /// Terminal: the crawl is finished
    Done,
}

impl NavState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Whether moving from `self` to `next` is a legal step of the crawl
    ///
    /// Any live state may fall back to `Idle` (session recreated) or jump to
    /// `Done` (crawl ended).
    pub fn can_transition_to(&self, next: NavState) -> bool {
        use NavState::*;

        if self.is_terminal() {
            return false;
        }
        if matches!(next, Idle | Done) {
            return true;
        }

        matches!(
            (self, next),
            (Idle, Loaded)
                | (Loaded, Searched)
                | (Loaded, Scrolling)
                | (Loaded, Paginating)
                | (Searched, Scrolling)
                | (Searched, Paginating)
                | (Scrolling, Paginating)
                | (Paginating, Loaded)
                | (Paginating, Stalled)
                | (Stalled, Loaded)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Searched => "searched",
            Self::Scrolling => "scrolling",
            Self::Stalled => "stalled",
            Self::Paginating => "paginating",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_legal() {
        let path = [
            NavState::Idle,
            NavState::Loaded,
            NavState::Searched,
            NavState::Scrolling,
            NavState::Paginating,
            NavState::Loaded,
            NavState::Scrolling,
            NavState::Paginating,
            NavState::Stalled,
            NavState::Loaded,
            NavState::Scrolling,
            NavState::Paginating,
            NavState::Stalled,
            NavState::Done,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!NavState::Idle.can_transition_to(NavState::Scrolling));
        assert!(!NavState::Scrolling.can_transition_to(NavState::Stalled));
        assert!(!NavState::Done.can_transition_to(NavState::Idle));
        assert!(!NavState::Done.can_transition_to(NavState::Loaded));
    }

    #[test]
    fn test_recovery_and_termination_from_any_live_state() {
        for state in [
            NavState::Loaded,
            NavState::Searched,
            NavState::Scrolling,
            NavState::Paginating,
            NavState::Stalled,
        ] {
            assert!(state.can_transition_to(NavState::Idle));
            assert!(state.can_transition_to(NavState::Done));
            assert!(!state.is_terminal());
        }
        assert!(NavState::Done.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", NavState::Paginating), "paginating");
        assert_eq!(format!("{}", NavState::Done), "done");
    }
}
