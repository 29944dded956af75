use serde::{Deserialize, Serialize};

/// One page of a Graph list endpoint: the `data` array plus paging cursors.
/// A missing `data` key decodes to an empty list, matching how the harvester
/// treats "no data" responses.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    pub paging: Option<Paging>,
}

impl<T> Page<T> {
    /// Cursor for the next page. Present only when the endpoint reports more
    /// data (`paging.next` set); the final page still carries cursors, so
    /// `next` is the signal, `after` is the value.
    pub fn next_cursor(&self) -> Option<&str> {
        let paging = self.paging.as_ref()?;
        paging.next.as_ref()?;
        paging.cursors.as_ref()?.after.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paging {
    pub cursors: Option<Cursors>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cursors {
    pub before: Option<String>,
    pub after: Option<String>,
}

/// A conversation thread between the page and one or more participants.
/// `updated_time` is kept as the raw wire string; the harvester parses it
/// when applying the recency window.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub updated_time: String,
    #[serde(default)]
    pub participants: ParticipantList,
    pub message_count: Option<u64>,
    pub unread_count: Option<u64>,
}

/// A single message inside a conversation. Serialized back out verbatim by
/// the serving layer, so field names mirror the wire exactly and absent
/// optionals stay absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<ParticipantList>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The Graph API nests participant arrays one level down (`{"data": [..]}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantList {
    #[serde(default)]
    pub data: Vec<Participant>,
}

/// Body of the two token-exchange endpoints. `access_token` is optional so a
/// 200 response without it surfaces as a missing-field error instead of a
/// decode failure.
#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: Option<String>,
}
