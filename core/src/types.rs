//! Push payload and display options.

use serde::Serialize;

/// Sound played when no other sound is chosen.
pub const DEFAULT_SOUND: &str = "shake.caf";

/// Badge count used when no other badge is chosen.
pub const DEFAULT_BADGE: u32 = 1;

/// Display attributes for a push. Start from `PushOptions::default()` and
/// chain `with_*` calls; a later call for the same field replaces the
/// earlier value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOptions {
    pub badge: u32,
    pub sound: String,
    pub icon: String,
    pub group: String,
    pub url: String,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            badge: DEFAULT_BADGE,
            sound: DEFAULT_SOUND.to_string(),
            icon: String::new(),
            group: String::new(),
            url: String::new(),
        }
    }
}

impl PushOptions {
    /// Badge count. Zero removes the badge from the payload.
    pub fn with_badge(mut self, badge: u32) -> Self {
        self.badge = badge;
        self
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = sound.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Key used by the notification center to cluster related pushes.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Link opened when the notification is tapped.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// JSON body posted to `<server>push`. Empty strings and a zero badge are
/// left out of the serialized object.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub device_key: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub badge: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sound: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl Message {
    pub fn new(device_key: &str, title: &str, body: &str, options: PushOptions) -> Self {
        Self {
            device_key: device_key.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            badge: options.badge,
            sound: options.sound,
            icon: options.icon,
            group: options.group,
            url: options.url,
        }
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}
