//! Per-dispatch capability context.

/// What the current credential and delivery environment permit.
///
/// Supplied by configuration, never by the push body itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The credential can deliver VoIP pushes.
    pub supports_voip: bool,
    /// User-visible alerts are currently permitted.
    pub allow_alerts: bool,
    /// Sound override for alerting pushes.
    pub sound: Option<String>,
    /// Provider routing topic (APNs bundle id).
    pub topic: Option<String>,
    /// Default collapse key when the body carries none.
    pub collapse_key: Option<String>,
}

impl Capabilities {
    /// Alerts allowed, no VoIP, no overrides.
    pub fn alerting() -> Self {
        Self {
            allow_alerts: true,
            ..Default::default()
        }
    }

    /// Enable VoIP delivery.
    pub fn with_voip(mut self) -> Self {
        self.supports_voip = true;
        self
    }

    /// Set the sound override.
    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    /// Set the routing topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Sound override, ignoring empty strings.
    pub fn sound(&self) -> Option<&str> {
        self.sound.as_deref().filter(|s| !s.is_empty())
    }

    /// Topic, ignoring empty strings.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref().filter(|s| !s.is_empty())
    }
}
