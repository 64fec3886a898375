use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The two upstream messaging providers this service aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Microsoft,
    Linkedin,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Microsoft, Provider::Linkedin];

    /// Route-path name, e.g. `/login/microsoft`.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Microsoft => "microsoft",
            Provider::Linkedin => "linkedin",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Microsoft => "Office 365",
            Provider::Linkedin => "LinkedIn",
        }
    }

    /// Fixed response-cache key; one slot per provider.
    pub fn cache_key(&self) -> &'static str {
        match self {
            Provider::Microsoft => "office365_emails",
            Provider::Linkedin => "linkedin_messages",
        }
    }

    /// Name of the JSON array field holding the page's messages.
    pub fn items_field(&self) -> &'static str {
        match self {
            Provider::Microsoft => "value",
            Provider::Linkedin => "elements",
        }
    }

    /// Field used for date sorting. ISO-8601 strings, so lexicographic
    /// order equals chronological order.
    pub fn timestamp_field(&self) -> &'static str {
        match self {
            Provider::Microsoft => "receivedDateTime",
            Provider::Linkedin => "created",
        }
    }

    /// Extract the opaque next-page cursor from a response body, if any.
    pub fn next_cursor(&self, body: &Value) -> Option<String> {
        let cursor = match self {
            Provider::Microsoft => body.get("@odata.nextLink"),
            Provider::Linkedin => body.get("paging").and_then(|p| p.get("next")),
        };
        cursor.and_then(Value::as_str).map(str::to_string)
    }

    pub fn parse(name: &str) -> Option<Provider> {
        match name {
            "microsoft" => Some(Provider::Microsoft),
            "linkedin" => Some(Provider::Linkedin),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single provider message. No unified schema is enforced: the upstream
/// object is carried verbatim and fields are decoded on access, defaulting
/// to the empty string when absent or non-string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(pub Value);

impl Message {
    pub fn subject(&self) -> &str {
        self.0.get("subject").and_then(Value::as_str).unwrap_or("")
    }

    /// The provider-specific timestamp used for date sorting.
    pub fn timestamp(&self, provider: Provider) -> &str {
        self.0
            .get(provider.timestamp_field())
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// One fetched page: the messages plus the cursor for the next page, if
/// the provider reported one. The cursor always reflects the unfiltered
/// upstream page boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub items: Vec<Message>,
    pub next_cursor: Option<String>,
}
