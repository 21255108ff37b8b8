//! Meeting link provisioning on appointment confirmation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait MeetingLinkProvider: Send + Sync {
    fn provision(&self, appointment_id: &Uuid, appointment_time: &DateTime<Utc>) -> String;
}

/// Deterministic room per appointment under a fixed base URL. Stands in
/// for a calendar integration that creates the room remotely.
#[derive(Debug, Clone)]
pub struct PlaceholderMeetingLinks {
    base_url: String,
}

impl PlaceholderMeetingLinks {
    pub const DEFAULT_BASE: &'static str = "https://meet.google.com";

    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for PlaceholderMeetingLinks {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE)
    }
}

impl MeetingLinkProvider for PlaceholderMeetingLinks {
    fn provision(&self, appointment_id: &Uuid, _appointment_time: &DateTime<Utc>) -> String {
        format!("{}/aarogya-{appointment_id}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_is_stable_per_appointment() {
        let provider = PlaceholderMeetingLinks::default();
        let id = Uuid::new_v4();
        let now = Utc::now();
        let link = provider.provision(&id, &now);
        assert_eq!(link, format!("https://meet.google.com/aarogya-{id}"));
        assert_eq!(provider.provision(&id, &now), link);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = PlaceholderMeetingLinks::new("https://meet.example/");
        let id = Uuid::nil();
        assert_eq!(
            provider.provision(&id, &Utc::now()),
            "https://meet.example/aarogya-00000000-0000-0000-0000-000000000000"
        );
    }
}
