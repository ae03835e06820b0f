//! Transfer FSM State Definitions

use std::fmt;

/// Transfer FSM States
///
/// Terminal states: COMMITTED (40), FAILED (-10), ROLLED_BACK (-30), UNRESOLVED (-40)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum TransferState {
    /// Request validated and authorized, nothing moved yet
    Init = 0,

    /// Sender debited - funds are IN-FLIGHT
    /// CRITICAL: Must eventually reach COMMITTED, ROLLED_BACK or UNRESOLVED
    Debited = 20,

    /// Terminal: recipient credited
    Committed = 40,

    /// Terminal: rejected before any balance moved
    Failed = -10,

    /// Credit failed, returning the debit to the sender
    Compensating = -20,

    /// Terminal: debit returned to the sender
    RolledBack = -30,

    /// Terminal: debit could not be returned, operators alerted
    Unresolved = -40,
}

impl TransferState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Committed
                | TransferState::Failed
                | TransferState::RolledBack
                | TransferState::Unresolved
        )
    }

    /// Check if funds are in-flight (sender debited, recipient not credited)
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TransferState::Debited | TransferState::Compensating)
    }

    /// Whether the FSM allows `self -> next`.
    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        matches!(
            (self, next),
            (Init, Debited)
                | (Init, Failed)
                | (Debited, Committed)
                | (Debited, Compensating)
                | (Compensating, RolledBack)
                | (Compensating, Unresolved)
        )
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TransferState::Init),
            20 => Some(TransferState::Debited),
            40 => Some(TransferState::Committed),
            -10 => Some(TransferState::Failed),
            -20 => Some(TransferState::Compensating),
            -30 => Some(TransferState::RolledBack),
            -40 => Some(TransferState::Unresolved),
            _ => None,
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Init => "INIT",
            TransferState::Debited => "DEBITED",
            TransferState::Committed => "COMMITTED",
            TransferState::Failed => "FAILED",
            TransferState::Compensating => "COMPENSATING",
            TransferState::RolledBack => "ROLLED_BACK",
            TransferState::Unresolved => "UNRESOLVED",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TransferState; 7] = [
        TransferState::Init,
        TransferState::Debited,
        TransferState::Committed,
        TransferState::Failed,
        TransferState::Compensating,
        TransferState::RolledBack,
        TransferState::Unresolved,
    ];

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Committed.is_terminal());
        assert!(TransferState::Failed.is_terminal());
        assert!(TransferState::RolledBack.is_terminal());
        assert!(TransferState::Unresolved.is_terminal());

        assert!(!TransferState::Init.is_terminal());
        assert!(!TransferState::Debited.is_terminal());
        assert!(!TransferState::Compensating.is_terminal());
    }

    #[test]
    fn test_in_flight_states() {
        assert!(TransferState::Debited.is_in_flight());
        assert!(TransferState::Compensating.is_in_flight());

        assert!(!TransferState::Init.is_in_flight());
        assert!(!TransferState::Committed.is_in_flight());
        assert!(!TransferState::RolledBack.is_in_flight());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
        assert!(TransferState::Init.can_transition_to(TransferState::Debited));
        assert!(!TransferState::Init.can_transition_to(TransferState::Committed));
        assert!(!TransferState::Debited.can_transition_to(TransferState::RolledBack));
    }

    #[test]
    fn test_state_id_roundtrip() {
        for state in ALL {
            assert_eq!(TransferState::from_id(state.id()), Some(state));
        }
        assert!(TransferState::from_id(999).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferState::Debited.to_string(), "DEBITED");
        assert_eq!(TransferState::RolledBack.to_string(), "ROLLED_BACK");
    }
}
