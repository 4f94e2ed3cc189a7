#![forbid(unsafe_code)]
//! Device facts and best-effort location for a justification submission.

mod collect;
mod device;
mod lookup;

pub use collect::{
    collect_geolocation, format_for_storage, GeoSource, GeolocationResult, GpsError, PositionFix,
    PositionProvider, ReportedPosition, GPS_TIMEOUT, IP_ACCURACY_SENTINEL_METERS,
    LOCATION_UNAVAILABLE,
};
pub use device::{classify_device, device_snapshot, ClientDevice};
pub use lookup::{
    parse_ipapi, parse_ipify, parse_nominatim, Address, DisabledGeoLookup, GeoEndpoints,
    GeoLookup, GeoLookupError, HttpGeoLookup, IpLocation,
};

pub const CRATE_NAME: &str = "valeapp-geo";
