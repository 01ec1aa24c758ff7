use econos_types::TaskStatus;

/// Authoritative transition table (C8), used by both the task manager and
/// the lifecycle monitor. A pure function over `(from, to) -> bool`,
/// generalizing the reducer pattern of returning a decision from state
/// plus event rather than mutating in place.
pub fn is_legal_transition(from: TaskStatus, to: TaskStatus) -> bool {
    use TaskStatus::*;
    matches!(
        (from, to),
        (Pending, Created)
            | (Pending, Failed)
            | (Created, Authorized)
            | (Created, Refunded)
            | (Created, Failed)
            | (Authorized, Running)
            | (Authorized, Refunded)
            | (Authorized, Failed)
            | (Running, Completed)
            | (Running, Refunded)
            | (Running, Failed)
    )
}

pub fn is_terminal(status: TaskStatus) -> bool {
    status.is_terminal()
}

pub fn can_refund(status: TaskStatus) -> bool {
    matches!(status, TaskStatus::Created | TaskStatus::Authorized | TaskStatus::Running)
}

pub fn can_complete(status: TaskStatus) -> bool {
    matches!(status, TaskStatus::Running)
}

pub fn is_active(status: TaskStatus) -> bool {
    !is_terminal(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::*;

    #[test]
    fn terminal_states_have_no_legal_successors() {
        for terminal in [Completed, Refunded, Failed] {
            for candidate in [Pending, Created, Authorized, Running, Completed, Refunded, Failed] {
                assert!(!is_legal_transition(terminal, candidate));
            }
        }
    }

    #[test]
    fn running_can_only_reach_its_three_successors() {
        assert!(is_legal_transition(Running, Completed));
        assert!(is_legal_transition(Running, Refunded));
        assert!(is_legal_transition(Running, Failed));
        assert!(!is_legal_transition(Running, Authorized));
        assert!(!is_legal_transition(Running, Pending));
    }

    #[test]
    fn can_complete_only_from_running() {
        assert!(can_complete(Running));
        assert!(!can_complete(Authorized));
        assert!(!can_complete(Created));
    }

    #[test]
    fn can_refund_from_created_authorized_running() {
        assert!(can_refund(Created));
        assert!(can_refund(Authorized));
        assert!(can_refund(Running));
        assert!(!can_refund(Pending));
        assert!(!can_refund(Completed));
    }
}
