use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: String,
    #[serde(rename = "threadId", default)]
    pub thread_id: Option<String>,
    #[serde(rename = "labelIds", default)]
    pub label_ids: Option<Vec<String>>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub payload: Option<RawPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPayload {
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Option<Vec<RawHeader>>,
    #[serde(default)]
    pub body: Option<RawBody>,
    #[serde(default)]
    pub parts: Option<Vec<RawPayload>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBody {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageListResource {
    pub messages: Option<Vec<MessageListEntry>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageListEntry {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryListResource {
    pub history: Option<Vec<HistoryRecord>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
    #[serde(rename = "historyId")]
    pub history_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryRecord {
    #[serde(rename = "messagesAdded")]
    pub messages_added: Option<Vec<HistoryMessageAdded>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryMessageAdded {
    pub message: MessageListEntry,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileResource {
    #[serde(rename = "historyId")]
    pub history_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModifyLabelsRequest {
    #[serde(rename = "addLabelIds")]
    pub add_label_ids: Vec<String>,
    #[serde(rename = "removeLabelIds")]
    pub remove_label_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModifiedMessage {}

#[derive(Debug, Clone, Default)]
pub struct HistoryDelta {
    pub message_ids: Vec<String>,
    pub history_id: Option<String>,
}
