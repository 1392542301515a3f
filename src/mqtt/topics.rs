//! Topic naming.
//!
//! ```text
//!   home / <role> / <device id> / <suffix>
//!          sensor                 data | status | info | command
//!          relay
//! ```
//!
//! Topics are derived only from the role, the suffix and the device id.
//! Because a valid device id never contains `/`, every topic splits back
//! into exactly four levels and distinct `(role, suffix)` pairs never
//! collide.

use core::fmt::Write;

use crate::config::NodeRole;

/// Fixed-capacity topic string. Worst case is
/// `home/sensor/` + 32-byte id + `/command` = 52 bytes.
pub type Topic = heapless::String<64>;

const ROOT: &str = "home";

/// Last topic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicSuffix {
    Data,
    Status,
    Info,
    Command,
}

impl TopicSuffix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Status => "status",
            Self::Info => "info",
            Self::Command => "command",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "data" => Some(Self::Data),
            "status" => Some(Self::Status),
            "info" => Some(Self::Info),
            "command" => Some(Self::Command),
            _ => None,
        }
    }
}

/// The pieces of a topic this node family understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicParts<'a> {
    pub role: NodeRole,
    pub device_id: &'a str,
    pub suffix: TopicSuffix,
}

impl TopicParts<'_> {
    /// Whether this is the command topic of device `id` in `role`.
    pub fn is_command_for(&self, role: NodeRole, id: &str) -> bool {
        self.suffix == TopicSuffix::Command && self.role == role && self.device_id == id
    }
}

/// Build the topic for `role`/`suffix` of device `id`.
///
/// `id` must already be validated (see
/// [`DeviceIdentity`](crate::config::DeviceIdentity)); an over-long id is
/// truncated by capacity, never panics.
pub fn topic_for(role: NodeRole, suffix: TopicSuffix, id: &str) -> Topic {
    let mut t = Topic::new();
    let _ = write!(t, "{ROOT}/{}/{id}/{}", role.as_str(), suffix.as_str());
    t
}

/// Split a topic back into its parts. `None` for anything outside the
/// `home/<role>/<id>/<suffix>` scheme.
pub fn parse_topic(topic: &str) -> Option<TopicParts<'_>> {
    let mut levels = topic.split('/');
    if levels.next()? != ROOT {
        return None;
    }
    let role = match levels.next()? {
        "sensor" => NodeRole::Sensor,
        "relay" => NodeRole::Relay,
        _ => return None,
    };
    let device_id = levels.next()?;
    if device_id.is_empty() {
        return None;
    }
    let suffix = TopicSuffix::parse(levels.next()?)?;
    if levels.next().is_some() {
        return None;
    }
    Some(TopicParts {
        role,
        device_id,
        suffix,
    })
}

/// The full topic set of one node, computed once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTopics {
    pub data: Topic,
    pub status: Topic,
    pub info: Topic,
    pub command: Topic,
}

impl NodeTopics {
    pub fn new(role: NodeRole, id: &str) -> Self {
        Self {
            data: topic_for(role, TopicSuffix::Data, id),
            status: topic_for(role, TopicSuffix::Status, id),
            info: topic_for(role, TopicSuffix::Info, id),
            command: topic_for(role, TopicSuffix::Command, id),
        }
    }
}
