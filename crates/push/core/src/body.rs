//! Provider-agnostic push bodies.

/// Generic push body accepted from upstream callers.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PushBody {
    /// Sequence number. Zero means unset.
    #[serde(default)]
    pub seq: i64,
    /// Collapse key, overriding the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
    /// The message. `None` when the caller set no variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PushKind>,
}

impl PushBody {
    /// Create a body with the given variant.
    pub fn new(kind: PushKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Set the sequence number.
    pub fn with_seq(mut self, seq: i64) -> Self {
        self.seq = seq;
        self
    }

    /// Set the collapse key.
    pub fn with_collapse_key(mut self, key: impl Into<String>) -> Self {
        self.collapse_key = Some(key.into());
        self
    }
}

/// The message variants a push body can carry.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushKind {
    /// Call signaling, delivered over the VoIP channel.
    Voip(VoipPush),
    /// User-visible alert.
    Alerting(AlertingPush),
    /// End-to-end encrypted payload with an optional public preview.
    Encrypted(EncryptedPush),
    /// Nothing to deliver.
    Silent,
}

/// VoIP call signaling push.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VoipPush {
    pub call_id: i64,
    pub call_id_str: String,
    pub attempt_index: i32,
    pub display_name: String,
    pub event_bus_id: String,
    pub update_type: String,
    pub disposal_reason: String,
    pub video: bool,
    pub token: String,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<Peer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_peer: Option<OutPeer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<Merge>,
}

/// Conversation peer type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerType {
    #[default]
    Unknown,
    Private,
    Group,
    Sip,
}

/// Peer of a call.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Peer {
    pub id: i32,
    #[serde(rename = "type")]
    pub peer_type: PeerType,
    pub str_id: String,
}

/// Peer of a call, with the access hash required to reach it.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OutPeer {
    pub id: i32,
    #[serde(rename = "type")]
    pub peer_type: PeerType,
    pub access_hash: i64,
    pub str_id: String,
}

/// Client-side merge hint for call pushes.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Merge {
    pub key: String,
    pub merge: bool,
}

/// Alert text, either localized on device or sent as-is.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum AlertText {
    /// Localization key and format arguments.
    Localized {
        loc_key: String,
        #[serde(default)]
        loc_args: Vec<String>,
    },
    /// Literal text.
    Plain(String),
}

impl AlertText {
    /// Literal text.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    /// Localization key with arguments.
    pub fn localized(loc_key: impl Into<String>, loc_args: Vec<String>) -> Self {
        Self::Localized {
            loc_key: loc_key.into(),
            loc_args,
        }
    }
}

/// User-visible alert push.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AlertingPush {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<AlertText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<AlertText>,
    pub badge: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl AlertingPush {
    /// Alert with plain title and body.
    pub fn plain(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(AlertText::plain(title)),
            body: Some(AlertText::plain(body)),
            ..Default::default()
        }
    }

    /// Set the badge count.
    pub fn with_badge(mut self, badge: i32) -> Self {
        self.badge = badge;
        self
    }

    /// Set the category tag.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Badge count when positive.
    pub fn badge(&self) -> Option<u32> {
        u32::try_from(self.badge).ok().filter(|b| *b > 0)
    }
}

/// Encrypted push.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncryptedPush {
    /// Preview shown before the app decrypts the payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_alerting_push: Option<AlertingPush>,
    pub nonce: i64,
    /// Ciphertext, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub encrypted_data: Vec<u8>,
}

mod base64_bytes {
    use base64::Engine as _;
    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}
