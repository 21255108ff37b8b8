//! Pure view derivation from store state.

use crate::models::{Appointment, AppointmentStatus, ConnectionRequest, Role};
use crate::workflow::{available_actions, CardAction};

use super::store::{ListState, StoreState};

pub const NO_PENDING_REQUESTS: &str = "No pending connection requests.";
pub const LOAD_ERROR: &str = "Error loading. Please refresh.";

#[derive(Debug, Clone, PartialEq)]
pub enum PendingConnectionsView {
    Loading,
    /// Inline error text; the rest of the page stays usable.
    Error(String),
    /// Explicit placeholder, never a blank list.
    Placeholder(&'static str),
    Items(Vec<ConnectionRequest>),
}

pub fn pending_connections_view(state: &StoreState) -> PendingConnectionsView {
    match &state.pending_connections {
        ListState::NotLoaded => PendingConnectionsView::Loading,
        ListState::Failed(_) => PendingConnectionsView::Error(LOAD_ERROR.to_string()),
        ListState::Loaded(items) if items.is_empty() => {
            PendingConnectionsView::Placeholder(NO_PENDING_REQUESTS)
        }
        ListState::Loaded(items) => PendingConnectionsView::Items(items.clone()),
    }
}

/// One appointment and the controls its viewer gets.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentCard {
    pub appointment: Appointment,
    pub actions: Vec<CardAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardSection {
    pub title: &'static str,
    pub cards: Vec<AppointmentCard>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentBoard {
    Loading,
    Error(String),
    Sections(Vec<BoardSection>),
}

/// Doctors get pending requests apart from upcoming/history; patients get
/// everything in one list.
pub fn appointment_board(role: Role, state: &StoreState) -> AppointmentBoard {
    let appointments = match &state.appointments {
        ListState::NotLoaded => return AppointmentBoard::Loading,
        ListState::Failed(_) => return AppointmentBoard::Error(LOAD_ERROR.to_string()),
        ListState::Loaded(items) => items,
    };

    let cards = |keep: &dyn Fn(AppointmentStatus) -> bool| -> Vec<AppointmentCard> {
        appointments
            .iter()
            .filter(|a| keep(a.status))
            .map(|a| AppointmentCard {
                appointment: a.clone(),
                actions: available_actions(role, a.status, a.is_link_active),
            })
            .collect()
    };

    let sections = match role {
        Role::Doctor => vec![
            BoardSection {
                title: "Pending Requests",
                cards: cards(&|s| s == AppointmentStatus::Pending),
            },
            BoardSection {
                title: "Upcoming & History",
                cards: cards(&|s| {
                    matches!(s, AppointmentStatus::Confirmed | AppointmentStatus::Completed)
                }),
            },
        ],
        Role::Patient => vec![BoardSection {
            title: "My Appointments",
            cards: cards(&|_| true),
        }],
    };
    AppointmentBoard::Sections(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use chrono::Utc;
    use uuid::Uuid;

    fn appointment(status: AppointmentStatus, is_link_active: bool) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_email: "ravi@mail.in".into(),
            doctor_email: "meera@clinic.in".into(),
            reason: "fever".into(),
            patient_notes: None,
            predicted_severity: Severity::Moderate,
            status,
            appointment_time: None,
            meeting_link: None,
            is_link_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn with_appointments(items: Vec<Appointment>) -> StoreState {
        StoreState {
            appointments: ListState::Loaded(items),
            ..StoreState::default()
        }
    }

    #[test]
    fn empty_pending_list_shows_placeholder() {
        let state = StoreState {
            pending_connections: ListState::Loaded(Vec::new()),
            ..StoreState::default()
        };
        assert_eq!(
            pending_connections_view(&state),
            PendingConnectionsView::Placeholder(NO_PENDING_REQUESTS)
        );
        assert_eq!(
            pending_connections_view(&StoreState::default()),
            PendingConnectionsView::Loading
        );
    }

    #[test]
    fn failed_list_degrades_to_inline_error() {
        let state = StoreState {
            pending_connections: ListState::Failed("boom".into()),
            ..StoreState::default()
        };
        assert_eq!(
            pending_connections_view(&state),
            PendingConnectionsView::Error(LOAD_ERROR.to_string())
        );
    }

    #[test]
    fn doctor_board_splits_pending_from_history() {
        let state = with_appointments(vec![
            appointment(AppointmentStatus::Pending, false),
            appointment(AppointmentStatus::Confirmed, true),
            appointment(AppointmentStatus::Completed, false),
            appointment(AppointmentStatus::Rejected, false),
        ]);
        let AppointmentBoard::Sections(sections) = appointment_board(Role::Doctor, &state) else {
            panic!("expected sections");
        };
        assert_eq!(sections[0].cards.len(), 1);
        assert_eq!(sections[0].cards[0].actions, vec![CardAction::Confirm, CardAction::Reject]);
        assert_eq!(sections[1].cards.len(), 2);
        assert_eq!(
            sections[1].cards[0].actions,
            vec![CardAction::Join, CardAction::LinkActiveBadge, CardAction::Complete]
        );
        assert!(sections[1].cards[1].actions.is_empty());
    }

    #[test]
    fn patient_joins_only_when_link_is_live() {
        let state = with_appointments(vec![
            appointment(AppointmentStatus::Confirmed, false),
            appointment(AppointmentStatus::Confirmed, true),
        ]);
        let AppointmentBoard::Sections(sections) = appointment_board(Role::Patient, &state) else {
            panic!("expected sections");
        };
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].cards[0].actions, vec![CardAction::WaitingForLink]);
        assert_eq!(sections[0].cards[1].actions, vec![CardAction::Join]);
    }
}
