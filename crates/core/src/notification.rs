//! Notification channel, delivery status, and device kind enums.
//!
//! Each enum is stored as uppercase/lowercase text in the database; the
//! `TryFrom<String>` impls let `sqlx` decode rows straight into them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The channel a provider delivers through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelKind {
    Smtp,
    Sms,
    #[serde(alias = "FIREBASE")]
    Push,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [ChannelKind::Smtp, ChannelKind::Sms, ChannelKind::Push];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Smtp => "SMTP",
            ChannelKind::Sms => "SMS",
            ChannelKind::Push => "PUSH",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SMTP" => Ok(ChannelKind::Smtp),
            "SMS" => Ok(ChannelKind::Sms),
            "PUSH" | "FIREBASE" => Ok(ChannelKind::Push),
            other => Err(format!("unknown channel kind: {other}")),
        }
    }
}

impl TryFrom<String> for ChannelKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Lifecycle of a delivery log row.
///
/// `Pending` only exists between the insert at dispatch start and the
/// terminal update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Sent => "SENT",
            DeliveryStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, DeliveryStatus::Pending)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(DeliveryStatus::Pending),
            "SENT" => Ok(DeliveryStatus::Sent),
            "FAILED" => Ok(DeliveryStatus::Failed),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

impl TryFrom<String> for DeliveryStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Platform of a registered push device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Ios,
    Android,
    Web,
}

impl DeviceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Ios => "ios",
            DeviceKind::Android => "android",
            DeviceKind::Web => "web",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(DeviceKind::Ios),
            "android" => Ok(DeviceKind::Android),
            "web" => Ok(DeviceKind::Web),
            other => Err(format!("unknown device type: {other}")),
        }
    }
}

impl TryFrom<String> for DeviceKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_kind_accepts_legacy_firebase_name() {
        assert_eq!("FIREBASE".parse::<ChannelKind>().unwrap(), ChannelKind::Push);
        let parsed: ChannelKind = serde_json::from_str("\"FIREBASE\"").unwrap();
        assert_eq!(parsed, ChannelKind::Push);
    }

    #[test]
    fn channel_kind_round_trips_through_text() {
        for kind in ChannelKind::ALL {
            assert_eq!(kind.as_str().parse::<ChannelKind>().unwrap(), kind);
        }
        assert!("PIGEON".parse::<ChannelKind>().is_err());
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!DeliveryStatus::Pending.is_terminal());
        assert!(DeliveryStatus::Sent.is_terminal());
        assert!(DeliveryStatus::Failed.is_terminal());
    }

    #[test]
    fn device_kind_is_case_insensitive() {
        assert_eq!("iOS".parse::<DeviceKind>().unwrap(), DeviceKind::Ios);
        assert!("blackberry".parse::<DeviceKind>().is_err());
    }
}
