use crate::collect::{format_for_storage, GeolocationResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use valeapp_model::{DeviceKind, DeviceSnapshot};

static TABLET: OnceLock<Option<Regex>> = OnceLock::new();
static MOBILE: OnceLock<Option<Regex>> = OnceLock::new();

fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, text: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(text))
}

/// Tablet patterns win over mobile ones: iPad and Silk agents also say "mobile".
#[must_use]
pub fn classify_device(user_agent: &str) -> DeviceKind {
    if matches(&TABLET, r"(?i)tablet|ipad|playbook|silk", user_agent) {
        return DeviceKind::Tablet;
    }
    if matches(
        &MOBILE,
        r"(?i)mobile|iphone|ipod|android|blackberry|opera|mini|windows\sce|palm|smartphone|iemobile",
        user_agent,
    ) {
        return DeviceKind::Mobile;
    }
    DeviceKind::Desktop
}

/// Facts only the client can report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDevice {
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub screen_resolution: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[must_use]
pub fn device_snapshot(client: &ClientDevice, geo: &GeolocationResult) -> DeviceSnapshot {
    let clean = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let user_agent = clean(&client.user_agent);
    DeviceSnapshot {
        ip: geo.ip_address.clone(),
        device_type: user_agent
            .as_deref()
            .map(classify_device)
            .unwrap_or_default(),
        user_agent,
        location: format_for_storage(geo),
        screen_resolution: clean(&client.screen_resolution),
        timezone: clean(&client.timezone),
    }
}
