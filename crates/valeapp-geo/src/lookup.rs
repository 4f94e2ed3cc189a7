use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLookupError(pub String);

impl Display for GeoLookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for GeoLookupError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IpLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Address,
}

/// The three outbound services consulted while locating a submission.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn public_ip(&self) -> Result<String, GeoLookupError>;
    async fn ip_location(&self, ip: &str) -> Result<IpLocation, GeoLookupError>;
    async fn reverse_geocode(&self, latitude: f64, longitude: f64)
        -> Result<Address, GeoLookupError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoEndpoints {
    pub ipify_url: String,
    pub ipapi_url: String,
    pub nominatim_url: String,
    pub ipify_timeout: Duration,
    pub ipapi_timeout: Duration,
    pub nominatim_timeout: Duration,
    pub user_agent: String,
}

impl Default for GeoEndpoints {
    fn default() -> Self {
        Self {
            ipify_url: "https://api.ipify.org".to_string(),
            ipapi_url: "https://ipapi.co".to_string(),
            nominatim_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            ipify_timeout: Duration::from_secs(5),
            ipapi_timeout: Duration::from_secs(10),
            nominatim_timeout: Duration::from_secs(8),
            user_agent: "VALEAPP-Geolocation/1.0".to_string(),
        }
    }
}

impl GeoEndpoints {
    #[must_use]
    pub fn from_env() -> Self {
        let mut out = Self::default();
        if let Some(v) = valeapp_core::env_non_empty(valeapp_core::ENV_VALEAPP_IPIFY_URL) {
            out.ipify_url = v;
        }
        if let Some(v) = valeapp_core::env_non_empty(valeapp_core::ENV_VALEAPP_IPAPI_URL) {
            out.ipapi_url = v;
        }
        if let Some(v) = valeapp_core::env_non_empty(valeapp_core::ENV_VALEAPP_NOMINATIM_URL) {
            out.nominatim_url = v;
        }
        out
    }
}

#[derive(Deserialize)]
struct IpifyBody {
    ip: Option<String>,
}

pub fn parse_ipify(body: &str) -> Result<String, GeoLookupError> {
    let parsed: IpifyBody = serde_json::from_str(body)
        .map_err(|e| GeoLookupError(format!("ipify response: {e}")))?;
    parsed
        .ip
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .ok_or_else(|| GeoLookupError("ipify response has no ip".to_string()))
}

#[derive(Deserialize)]
struct IpapiBody {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Zero coordinates mean "unknown" for this service.
fn non_zero(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x != 0.0)
}

pub fn parse_ipapi(body: &str) -> Result<IpLocation, GeoLookupError> {
    let parsed: IpapiBody = serde_json::from_str(body)
        .map_err(|e| GeoLookupError(format!("ipapi response: {e}")))?;
    if parsed.error {
        return Err(GeoLookupError(format!(
            "ipapi refused lookup: {}",
            parsed.reason.unwrap_or_else(|| "unknown reason".to_string())
        )));
    }
    Ok(IpLocation {
        latitude: non_zero(parsed.latitude),
        longitude: non_zero(parsed.longitude),
        address: Address {
            city: non_blank(parsed.city),
            state_province: non_blank(parsed.region),
            country: non_blank(parsed.country_name),
        },
    })
}

#[derive(Deserialize, Default)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

#[derive(Deserialize)]
struct NominatimBody {
    #[serde(default)]
    address: Option<NominatimAddress>,
}

pub fn parse_nominatim(body: &str) -> Result<Address, GeoLookupError> {
    let parsed: NominatimBody = serde_json::from_str(body)
        .map_err(|e| GeoLookupError(format!("nominatim response: {e}")))?;
    let a = parsed.address.unwrap_or_default();
    Ok(Address {
        city: non_blank(a.city)
            .or_else(|| non_blank(a.town))
            .or_else(|| non_blank(a.village)),
        state_province: non_blank(a.state).or_else(|| non_blank(a.region)),
        country: non_blank(a.country),
    })
}

/// Lookups over HTTPS with the per-service timeouts of [`GeoEndpoints`].
pub struct HttpGeoLookup {
    endpoints: GeoEndpoints,
    client: reqwest::Client,
}

impl HttpGeoLookup {
    pub fn new(endpoints: GeoEndpoints) -> Result<Self, GeoLookupError> {
        let client = reqwest::Client::builder()
            .user_agent(endpoints.user_agent.clone())
            .build()
            .map_err(|e| GeoLookupError(format!("http client: {e}")))?;
        Ok(Self { endpoints, client })
    }

    async fn get_text(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<String, GeoLookupError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| GeoLookupError(format!("GET {url} failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GeoLookupError(format!("GET {url} returned HTTP {status}")));
        }
        resp.text()
            .await
            .map_err(|e| GeoLookupError(format!("read body failed: {e}")))
    }
}

#[async_trait]
impl GeoLookup for HttpGeoLookup {
    #[instrument(name = "geo_public_ip", skip(self))]
    async fn public_ip(&self) -> Result<String, GeoLookupError> {
        let body = self
            .get_text(
                &self.endpoints.ipify_url,
                &[("format", "json".to_string())],
                self.endpoints.ipify_timeout,
            )
            .await?;
        parse_ipify(&body)
    }

    #[instrument(name = "geo_ip_location", skip(self))]
    async fn ip_location(&self, ip: &str) -> Result<IpLocation, GeoLookupError> {
        let ip: std::net::IpAddr = ip
            .trim()
            .parse()
            .map_err(|e| GeoLookupError(format!("invalid ip `{ip}`: {e}")))?;
        let url = format!("{}/{ip}/json/", self.endpoints.ipapi_url.trim_end_matches('/'));
        let body = self
            .get_text(&url, &[], self.endpoints.ipapi_timeout)
            .await?;
        parse_ipapi(&body)
    }

    #[instrument(name = "geo_reverse", skip(self))]
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Address, GeoLookupError> {
        let body = self
            .get_text(
                &self.endpoints.nominatim_url,
                &[
                    ("format", "json".to_string()),
                    ("lat", latitude.to_string()),
                    ("lon", longitude.to_string()),
                    ("zoom", "10".to_string()),
                    ("addressdetails", "1".to_string()),
                ],
                self.endpoints.nominatim_timeout,
            )
            .await?;
        parse_nominatim(&body)
    }
}

/// Used when outbound lookups are switched off; every call fails, so only a
/// client-reported fix can produce a location.
pub struct DisabledGeoLookup;

#[async_trait]
impl GeoLookup for DisabledGeoLookup {
    async fn public_ip(&self) -> Result<String, GeoLookupError> {
        Err(GeoLookupError("geolocation lookups disabled".to_string()))
    }

    async fn ip_location(&self, _ip: &str) -> Result<IpLocation, GeoLookupError> {
        Err(GeoLookupError("geolocation lookups disabled".to_string()))
    }

    async fn reverse_geocode(&self, _lat: f64, _lon: f64) -> Result<Address, GeoLookupError> {
        Err(GeoLookupError("geolocation lookups disabled".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipify_body_yields_trimmed_ip() {
        assert_eq!(parse_ipify(r#"{"ip":" 200.1.2.3 "}"#).expect("ip"), "200.1.2.3");
        let err = parse_ipify(r#"{"ip":""}"#).expect_err("blank ip");
        assert!(err.0.contains("no ip"), "unexpected error: {}", err.0);
    }

    #[test]
    fn ipapi_error_flag_is_a_failure() {
        let err = parse_ipapi(r#"{"error":true,"reason":"RateLimited"}"#).expect_err("limited");
        assert!(err.0.contains("RateLimited"), "unexpected error: {}", err.0);
    }

    #[test]
    fn ipapi_zero_coordinates_are_unknown() {
        let loc = parse_ipapi(
            r#"{"latitude":0,"longitude":-46.6,"city":"São Paulo","region":"","country_name":"Brazil"}"#,
        )
        .expect("location");
        assert_eq!(loc.latitude, None);
        assert_eq!(loc.longitude, Some(-46.6));
        assert_eq!(loc.address.state_province, None);
        assert_eq!(loc.address.country.as_deref(), Some("Brazil"));
    }

    #[test]
    fn nominatim_falls_back_through_town_and_village() {
        let addr = parse_nominatim(
            r#"{"address":{"village":"Vila Nova","region":"Sudeste","country":"Brasil"}}"#,
        )
        .expect("address");
        assert_eq!(addr.city.as_deref(), Some("Vila Nova"));
        assert_eq!(addr.state_province.as_deref(), Some("Sudeste"));

        let empty = parse_nominatim(r#"{"error":"Unable to geocode"}"#).expect("address");
        assert_eq!(empty, Address::default());
    }
}
