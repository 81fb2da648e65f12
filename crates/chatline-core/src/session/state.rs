/// Where the session is in its request lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AttachmentsLoading,
    AwaitingResponse,
}

/// Inputs that can move the session between states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    FilesSelected,
    DecodeSettled,
    SendRequested,
    ResponseSettled,
}

impl SessionState {
    /// Transition table. `None` means the event is not accepted in this state.
    pub fn on(self, event: SessionEvent) -> Option<SessionState> {
        use SessionEvent::*;
        use SessionState::*;

        match (self, event) {
            (Idle, FilesSelected) => Some(AttachmentsLoading),
            (AttachmentsLoading, DecodeSettled) => Some(Idle),
            (Idle, SendRequested) => Some(AwaitingResponse),
            (AwaitingResponse, ResponseSettled) => Some(Idle),
            _ => None,
        }
    }

    pub fn is_idle(self) -> bool {
        self == SessionState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [SessionState; 3] = [
        SessionState::Idle,
        SessionState::AttachmentsLoading,
        SessionState::AwaitingResponse,
    ];
    const EVENTS: [SessionEvent; 4] = [
        SessionEvent::FilesSelected,
        SessionEvent::DecodeSettled,
        SessionEvent::SendRequested,
        SessionEvent::ResponseSettled,
    ];

    #[test]
    fn test_full_transition_table() {
        let accepted: Vec<_> = STATES
            .iter()
            .flat_map(|s| EVENTS.iter().map(move |e| (*s, *e)))
            .filter_map(|(s, e)| s.on(e).map(|next| (s, e, next)))
            .collect();

        assert_eq!(
            accepted,
            vec![
                (
                    SessionState::Idle,
                    SessionEvent::FilesSelected,
                    SessionState::AttachmentsLoading
                ),
                (
                    SessionState::Idle,
                    SessionEvent::SendRequested,
                    SessionState::AwaitingResponse
                ),
                (
                    SessionState::AttachmentsLoading,
                    SessionEvent::DecodeSettled,
                    SessionState::Idle
                ),
                (
                    SessionState::AwaitingResponse,
                    SessionEvent::ResponseSettled,
                    SessionState::Idle
                ),
            ]
        );
    }

    #[test]
    fn test_no_send_while_loading_or_awaiting() {
        assert_eq!(SessionState::AttachmentsLoading.on(SessionEvent::SendRequested), None);
        assert_eq!(SessionState::AwaitingResponse.on(SessionEvent::SendRequested), None);
    }
}
