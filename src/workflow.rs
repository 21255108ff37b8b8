//! Connection and appointment lifecycles.
//!
//! Every status change in the crate goes through [`apply`] or [`resolve`].
//! The server runs them before its conditional UPDATE; the client store
//! runs the same functions for optimistic updates, so both sides agree on
//! what is reachable.

use serde::{Deserialize, Serialize};

use crate::models::{AppointmentAction, AppointmentStatus, ConnectionStatus, ResolveAction, Role};

/// The slice of an appointment the lifecycle cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentState {
    pub status: AppointmentStatus,
    pub is_link_active: bool,
}

impl AppointmentState {
    pub fn pending() -> Self {
        Self {
            status: AppointmentStatus::Pending,
            is_link_active: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {action} an appointment that is {from}")]
    Illegal {
        from: AppointmentStatus,
        action: AppointmentAction,
    },
    #[error("cannot {action} a connection request that is {from}")]
    AlreadyResolved {
        from: ConnectionStatus,
        action: ResolveAction,
    },
}

impl AppointmentAction {
    /// Status an appointment must have for this action to apply.
    pub fn required_status(&self) -> AppointmentStatus {
        match self {
            Self::Confirm | Self::Reject => AppointmentStatus::Pending,
            Self::ActivateLink | Self::Complete => AppointmentStatus::Confirmed,
        }
    }

    /// Only the target doctor drives appointment transitions.
    pub fn actor(&self) -> Role {
        Role::Doctor
    }
}

impl ResolveAction {
    /// Only the addressed patient resolves a connection request.
    pub fn actor(&self) -> Role {
        Role::Patient
    }
}

/// The single appointment transition function.
///
/// Activating an active link and completing a completed appointment are
/// accepted as no-ops. Completion always clears the link flag.
pub fn apply(
    state: AppointmentState,
    action: AppointmentAction,
) -> Result<AppointmentState, TransitionError> {
    use AppointmentAction as A;
    use AppointmentStatus as S;

    let next = match (state.status, action) {
        (S::Pending, A::Confirm) => AppointmentState {
            status: S::Confirmed,
            is_link_active: false,
        },
        (S::Pending, A::Reject) => AppointmentState {
            status: S::Rejected,
            is_link_active: false,
        },
        (S::Confirmed, A::ActivateLink) => AppointmentState {
            status: S::Confirmed,
            is_link_active: true,
        },
        (S::Confirmed, A::Complete) | (S::Completed, A::Complete) => AppointmentState {
            status: S::Completed,
            is_link_active: false,
        },
        (from, action) => return Err(TransitionError::Illegal { from, action }),
    };
    Ok(next)
}

/// Connection requests resolve exactly once, from pending.
pub fn resolve(
    status: ConnectionStatus,
    action: ResolveAction,
) -> Result<ConnectionStatus, TransitionError> {
    match (status, action) {
        (ConnectionStatus::Pending, ResolveAction::Accept) => Ok(ConnectionStatus::Accepted),
        (ConnectionStatus::Pending, ResolveAction::Reject) => Ok(ConnectionStatus::Rejected),
        (from, action) => Err(TransitionError::AlreadyResolved { from, action }),
    }
}

// ── Action selection ────────────────────────────────────────

/// What an appointment card offers its viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardAction {
    Confirm,
    Reject,
    Join,
    ActivateLink,
    /// Shown in place of `ActivateLink` once the link is live.
    LinkActiveBadge,
    Complete,
    /// Patient side of a confirmed appointment whose link is not live yet.
    WaitingForLink,
    AwaitingConfirmation,
}

impl CardAction {
    /// The transition this control dispatches, if it is a button.
    pub fn transition(&self) -> Option<AppointmentAction> {
        match self {
            Self::Confirm => Some(AppointmentAction::Confirm),
            Self::Reject => Some(AppointmentAction::Reject),
            Self::ActivateLink => Some(AppointmentAction::ActivateLink),
            Self::Complete => Some(AppointmentAction::Complete),
            _ => None,
        }
    }
}

/// Pure selection of what a card shows, from role, status and link flag.
pub fn available_actions(
    role: Role,
    status: AppointmentStatus,
    is_link_active: bool,
) -> Vec<CardAction> {
    use AppointmentStatus as S;

    match (role, status) {
        (Role::Doctor, S::Pending) => vec![CardAction::Confirm, CardAction::Reject],
        (Role::Doctor, S::Confirmed) => vec![
            CardAction::Join,
            if is_link_active {
                CardAction::LinkActiveBadge
            } else {
                CardAction::ActivateLink
            },
            CardAction::Complete,
        ],
        (Role::Patient, S::Confirmed) if is_link_active => vec![CardAction::Join],
        (Role::Patient, S::Confirmed) => vec![CardAction::WaitingForLink],
        (Role::Patient, S::Pending) => vec![CardAction::AwaitingConfirmation],
        (_, S::Rejected | S::Completed) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    const ALL_ACTIONS: [AppointmentAction; 4] = [
        AppointmentAction::Confirm,
        AppointmentAction::Reject,
        AppointmentAction::ActivateLink,
        AppointmentAction::Complete,
    ];

    fn state(status: AppointmentStatus, is_link_active: bool) -> AppointmentState {
        AppointmentState { status, is_link_active }
    }

    #[test]
    fn confirm_leaves_link_inactive() {
        let next = apply(AppointmentState::pending(), AppointmentAction::Confirm).unwrap();
        assert_eq!(next, state(AppointmentStatus::Confirmed, false));
    }

    #[test]
    fn activate_then_complete_clears_link() {
        let active = apply(
            state(AppointmentStatus::Confirmed, false),
            AppointmentAction::ActivateLink,
        )
        .unwrap();
        assert!(active.is_link_active);
        let done = apply(active, AppointmentAction::Complete).unwrap();
        assert_eq!(done, state(AppointmentStatus::Completed, false));
    }

    #[test]
    fn activate_is_idempotent() {
        let once =
            apply(state(AppointmentStatus::Confirmed, false), AppointmentAction::ActivateLink).unwrap();
        let twice = apply(once, AppointmentAction::ActivateLink).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn complete_on_completed_is_a_no_op() {
        let done = state(AppointmentStatus::Completed, false);
        assert_eq!(apply(done, AppointmentAction::Complete).unwrap(), done);
    }

    #[test]
    fn rejected_is_terminal() {
        let rejected = state(AppointmentStatus::Rejected, false);
        for action in ALL_ACTIONS {
            assert_eq!(
                apply(rejected, action),
                Err(TransitionError::Illegal {
                    from: AppointmentStatus::Rejected,
                    action
                })
            );
        }
    }

    #[test]
    fn pending_actions_on_confirmed_are_illegal() {
        let confirmed = state(AppointmentStatus::Confirmed, true);
        assert!(apply(confirmed, AppointmentAction::Confirm).is_err());
        assert!(apply(confirmed, AppointmentAction::Reject).is_err());
        assert!(apply(AppointmentState::pending(), AppointmentAction::ActivateLink).is_err());
        assert!(apply(AppointmentState::pending(), AppointmentAction::Complete).is_err());
    }

    #[test]
    fn connection_resolves_once() {
        assert_eq!(
            resolve(ConnectionStatus::Pending, ResolveAction::Accept),
            Ok(ConnectionStatus::Accepted)
        );
        assert_eq!(
            resolve(ConnectionStatus::Pending, ResolveAction::Reject),
            Ok(ConnectionStatus::Rejected)
        );
        assert!(resolve(ConnectionStatus::Accepted, ResolveAction::Reject).is_err());
        assert!(resolve(ConnectionStatus::Rejected, ResolveAction::Accept).is_err());
    }

    /// Random action sequences never leave the documented graph and never
    /// leave an active link outside the confirmed state.
    #[test]
    fn random_sequences_stay_on_the_lifecycle_graph() {
        let mut rng = StdRng::seed_from_u64(0x5eed_a11);
        for _ in 0..500 {
            let mut current = AppointmentState::pending();
            for _ in 0..12 {
                let action = *ALL_ACTIONS.choose(&mut rng).unwrap();
                match apply(current, action) {
                    Ok(next) => {
                        let edge = (current.status, next.status);
                        assert!(
                            matches!(
                                edge,
                                (AppointmentStatus::Pending, AppointmentStatus::Confirmed)
                                    | (AppointmentStatus::Pending, AppointmentStatus::Rejected)
                                    | (AppointmentStatus::Confirmed, AppointmentStatus::Confirmed)
                                    | (AppointmentStatus::Confirmed, AppointmentStatus::Completed)
                                    | (AppointmentStatus::Completed, AppointmentStatus::Completed)
                            ),
                            "unexpected edge {edge:?} via {action}"
                        );
                        assert!(!next.is_link_active || next.status == AppointmentStatus::Confirmed);
                        if action == AppointmentAction::Complete {
                            assert!(!next.is_link_active);
                        }
                        current = next;
                    }
                    Err(TransitionError::Illegal { from, action: refused }) => {
                        assert_eq!(from, current.status);
                        assert_eq!(refused, action);
                        let allowed = refused.required_status() == from
                            || (from == AppointmentStatus::Completed
                                && refused == AppointmentAction::Complete);
                        assert!(!allowed, "{refused} refused from {from}");
                    }
                    Err(other) => panic!("unexpected error {other:?}"),
                }
            }
        }
    }

    #[test]
    fn doctor_card_actions() {
        assert_eq!(
            available_actions(Role::Doctor, AppointmentStatus::Pending, false),
            vec![CardAction::Confirm, CardAction::Reject]
        );
        assert_eq!(
            available_actions(Role::Doctor, AppointmentStatus::Confirmed, false),
            vec![CardAction::Join, CardAction::ActivateLink, CardAction::Complete]
        );
        assert_eq!(
            available_actions(Role::Doctor, AppointmentStatus::Confirmed, true),
            vec![CardAction::Join, CardAction::LinkActiveBadge, CardAction::Complete]
        );
        assert!(available_actions(Role::Doctor, AppointmentStatus::Completed, false).is_empty());
    }

    #[test]
    fn patient_card_actions() {
        assert_eq!(
            available_actions(Role::Patient, AppointmentStatus::Confirmed, true),
            vec![CardAction::Join]
        );
        assert_eq!(
            available_actions(Role::Patient, AppointmentStatus::Confirmed, false),
            vec![CardAction::WaitingForLink]
        );
        assert_eq!(
            available_actions(Role::Patient, AppointmentStatus::Pending, false),
            vec![CardAction::AwaitingConfirmation]
        );
        assert!(available_actions(Role::Patient, AppointmentStatus::Rejected, false).is_empty());
    }

    #[test]
    fn only_doctors_drive_appointments() {
        for action in ALL_ACTIONS {
            assert_eq!(action.actor(), Role::Doctor);
        }
        assert_eq!(ResolveAction::Accept.actor(), Role::Patient);
        assert_eq!(CardAction::Join.transition(), None);
        assert_eq!(CardAction::Complete.transition(), Some(AppointmentAction::Complete));
    }
}
