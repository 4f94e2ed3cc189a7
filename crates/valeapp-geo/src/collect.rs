use crate::lookup::{Address, GeoLookup};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::{debug, warn};

/// High-accuracy fix budget; no cached fix is ever reused.
pub const GPS_TIMEOUT: Duration = Duration::from_secs(10);
/// Accuracy recorded for IP-derived positions.
pub const IP_ACCURACY_SENTINEL_METERS: f64 = 99_999.0;
pub const LOCATION_UNAVAILABLE: &str = "Localização não disponível";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
}

impl PositionFix {
    fn is_plausible(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsError {
    PermissionDenied,
    Unavailable,
    Timeout,
}

impl Display for GpsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PermissionDenied => "permission denied",
            Self::Unavailable => "position unavailable",
            Self::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn current_position(&self) -> Result<PositionFix, GpsError>;
}

/// A fix the client obtained on its own and sent along with the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportedPosition(pub Option<PositionFix>);

#[async_trait]
impl PositionProvider for ReportedPosition {
    async fn current_position(&self) -> Result<PositionFix, GpsError> {
        self.0.ok_or(GpsError::Unavailable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeoSource {
    Gps,
    Ip,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocationResult {
    pub timestamp: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_meters: Option<f64>,
    pub source: GeoSource,
    pub ip_address: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub country: Option<String>,
}

impl GeolocationResult {
    #[must_use]
    pub fn failed(ip_address: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            latitude: None,
            longitude: None,
            accuracy_meters: None,
            source: GeoSource::Failed,
            ip_address,
            city: None,
            state_province: None,
            country: None,
        }
    }

    fn with_address(mut self, address: Address) -> Self {
        self.city = address.city;
        self.state_province = address.state_province;
        self.country = address.country;
        self
    }
}

async fn resolve_ip(lookup: &dyn GeoLookup, reported_ip: Option<&str>) -> Option<String> {
    if let Some(ip) = reported_ip.map(str::trim).filter(|ip| !ip.is_empty()) {
        return Some(ip.to_string());
    }
    match lookup.public_ip().await {
        Ok(ip) => Some(ip),
        Err(e) => {
            debug!(error = %e, "public ip lookup failed");
            None
        }
    }
}

/// GPS first, then IP, then FAILED. Never returns an error: every failed
/// step degrades the result instead.
pub async fn collect_geolocation(
    position: &dyn PositionProvider,
    lookup: &dyn GeoLookup,
    reported_ip: Option<&str>,
) -> GeolocationResult {
    let gps = match tokio::time::timeout(GPS_TIMEOUT, position.current_position()).await {
        Ok(Ok(fix)) if fix.is_plausible() => Ok(fix),
        Ok(Ok(_)) => Err(GpsError::Unavailable),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(GpsError::Timeout),
    };

    match gps {
        Ok(fix) => {
            let address = match lookup.reverse_geocode(fix.latitude, fix.longitude).await {
                Ok(address) => address,
                Err(e) => {
                    debug!(error = %e, "reverse geocode failed; keeping bare coordinates");
                    Address::default()
                }
            };
            let ip = resolve_ip(lookup, reported_ip).await;
            GeolocationResult {
                timestamp: Utc::now(),
                latitude: Some(fix.latitude),
                longitude: Some(fix.longitude),
                accuracy_meters: fix.accuracy.filter(|a| a.is_finite() && *a >= 0.0),
                source: GeoSource::Gps,
                ip_address: ip,
                city: None,
                state_province: None,
                country: None,
            }
            .with_address(address)
        }
        Err(gps_error) => {
            debug!(reason = %gps_error, "gps unavailable; falling back to ip");
            let Some(ip) = resolve_ip(lookup, reported_ip).await else {
                warn!("no ip available; location unavailable");
                return GeolocationResult::failed(None);
            };
            match lookup.ip_location(&ip).await {
                Ok(loc) => GeolocationResult {
                    timestamp: Utc::now(),
                    latitude: loc.latitude,
                    longitude: loc.longitude,
                    accuracy_meters: Some(IP_ACCURACY_SENTINEL_METERS),
                    source: GeoSource::Ip,
                    ip_address: Some(ip),
                    city: None,
                    state_province: None,
                    country: None,
                }
                .with_address(loc.address),
                Err(e) => {
                    warn!(error = %e, "ip geolocation failed; location unavailable");
                    GeolocationResult::failed(Some(ip))
                }
            }
        }
    }
}

fn format_meters(meters: f64) -> String {
    if meters.fract() == 0.0 {
        format!("{meters:.0}")
    } else {
        format!("{meters}")
    }
}

/// Single-string rendering kept in the `justified_by_location` column.
#[must_use]
pub fn format_for_storage(result: &GeolocationResult) -> String {
    if result.source == GeoSource::Failed {
        return LOCATION_UNAVAILABLE.to_string();
    }
    let mut parts = Vec::new();
    if let (Some(lat), Some(lon)) = (result.latitude, result.longitude) {
        parts.push(format!("{lat:.6},{lon:.6}"));
    }
    parts.extend(
        [&result.city, &result.state_province, &result.country]
            .into_iter()
            .flatten()
            .cloned(),
    );
    let (method, accuracy) = match (result.source, result.accuracy_meters) {
        (GeoSource::Gps, Some(m)) => ("GPS", format!("±{}m", format_meters(m))),
        (GeoSource::Gps, None) => ("GPS", "Baixa precisão".to_string()),
        _ => ("IP", "Baixa precisão".to_string()),
    };
    if parts.is_empty() {
        format!("({method}, {accuracy})")
    } else {
        format!("{} ({method}, {accuracy})", parts.join(", "))
    }
}
