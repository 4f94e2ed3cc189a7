use std::net::SocketAddr;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    /// Largest request body accepted, workbook uploads included.
    pub max_upload_bytes: usize,
    /// When false, justifications never call the external geolocation services.
    pub geo_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            geo_enabled: true,
        }
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, String> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Ok(false),
        other => Err(format!("{name} must be a boolean, got `{other}`")),
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(valeapp_core::env_non_empty)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut cfg = Self::default();
        if let Some(bind) = lookup(valeapp_core::ENV_VALEAPP_BIND) {
            bind.parse::<SocketAddr>()
                .map_err(|e| format!("invalid bind addr {bind}: {e}"))?;
            cfg.bind = bind;
        }
        if let Some(raw) = lookup(valeapp_core::ENV_VALEAPP_MAX_UPLOAD_BYTES) {
            cfg.max_upload_bytes = raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    format!(
                        "{} must be a positive byte count, got `{raw}`",
                        valeapp_core::ENV_VALEAPP_MAX_UPLOAD_BYTES
                    )
                })?;
        }
        if let Some(raw) = lookup(valeapp_core::ENV_VALEAPP_GEO_ENABLED) {
            cfg.geo_enabled = parse_bool(valeapp_core::ENV_VALEAPP_GEO_ENABLED, &raw)?;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(
        pairs: &'static [(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = ServerConfig::from_lookup(|_| None).expect("defaults");
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn overrides_are_validated() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            ("VALEAPP_BIND", "127.0.0.1:9000"),
            ("VALEAPP_MAX_UPLOAD_BYTES", "1024"),
            ("VALEAPP_GEO_ENABLED", "false"),
        ]))
        .expect("config");
        assert_eq!(cfg.bind, "127.0.0.1:9000");
        assert_eq!(cfg.max_upload_bytes, 1024);
        assert!(!cfg.geo_enabled);

        let err = ServerConfig::from_lookup(lookup_from(&[("VALEAPP_BIND", "localhost")]))
            .expect_err("bad bind");
        assert!(err.contains("invalid bind addr"), "unexpected error: {err}");
        let err = ServerConfig::from_lookup(lookup_from(&[("VALEAPP_MAX_UPLOAD_BYTES", "0")]))
            .expect_err("zero limit");
        assert!(err.contains("positive"), "unexpected error: {err}");
        let err = ServerConfig::from_lookup(lookup_from(&[("VALEAPP_GEO_ENABLED", "maybe")]))
            .expect_err("bad flag");
        assert!(err.contains("boolean"), "unexpected error: {err}");
    }
}
