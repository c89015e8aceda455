use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::layout::LayoutConfig;

/// Source of raw configuration values, keyed by variable name.
pub trait ConfigSource {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads configuration from process environment variables.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, name: &str) -> Option<String> {
        env_string(name)
    }
}

impl<F> ConfigSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub layout: LayoutEngineConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self::from_source(&EnvSource)
    }

    pub fn from_source(source: &impl ConfigSource) -> Self {
        Self {
            api: ApiConfig::from_source(source),
            layout: LayoutEngineConfig::from_source(source),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "WAREHOUSE_LAYOUT_API_HOST";
    const PORT_VAR: &'static str = "WAREHOUSE_LAYOUT_API_PORT";

    fn from_source(source: &impl ConfigSource) -> Self {
        let host_value = source
            .get(Self::HOST_VAR)
            .unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                tracing::warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match source.get(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    tracing::warn!(
                        "{} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    tracing::warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the layout engine and the mass-to-volume conversion in front of it.
#[derive(Clone, Debug)]
pub struct LayoutEngineConfig {
    layout: LayoutConfig,
    density_kg_per_m3: f64,
}

impl LayoutEngineConfig {
    /// Bulk density used when a category is reported by mass (water, 1 t/m³).
    pub const DEFAULT_DENSITY_KG_PER_M3: f64 = 1000.0;

    const SPACING_VAR: &'static str = "WAREHOUSE_LAYOUT_SPACING";
    const MIN_SIZE_VAR: &'static str = "WAREHOUSE_LAYOUT_MIN_VISIBLE_SIZE";
    const HORIZONTAL_MARGIN_VAR: &'static str = "WAREHOUSE_LAYOUT_HORIZONTAL_MARGIN";
    const VERTICAL_MARGIN_VAR: &'static str = "WAREHOUSE_LAYOUT_VERTICAL_MARGIN";
    const FOOTPRINT_DIVISOR_VAR: &'static str = "WAREHOUSE_LAYOUT_FOOTPRINT_DIVISOR";
    const DENSITY_VAR: &'static str = "WAREHOUSE_LAYOUT_DENSITY_KG_M3";

    fn from_source(source: &impl ConfigSource) -> Self {
        let spacing = load_f64_with_warning(
            source,
            Self::SPACING_VAR,
            LayoutConfig::DEFAULT_SPACING,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted spacing changes how densely categories are drawn",
        );

        let min_visible_size = load_f64_with_warning(
            source,
            Self::MIN_SIZE_VAR,
            LayoutConfig::DEFAULT_MIN_VISIBLE_SIZE,
            |value| value > 0.0,
            "must be greater than 0",
            "Adjusted minimum box size may hide small categories",
        );

        let horizontal_margin_ratio = load_f64_with_warning(
            source,
            Self::HORIZONTAL_MARGIN_VAR,
            LayoutConfig::DEFAULT_HORIZONTAL_MARGIN_RATIO,
            |value| value > 0.0 && value <= 1.0,
            "must be in (0, 1]",
            "Adjusted horizontal margin changes the usable floor area",
        );

        let vertical_margin_ratio = load_f64_with_warning(
            source,
            Self::VERTICAL_MARGIN_VAR,
            LayoutConfig::DEFAULT_VERTICAL_MARGIN_RATIO,
            |value| value > 0.0 && value <= 1.0,
            "must be in (0, 1]",
            "Adjusted vertical margin changes the headroom above stacked boxes",
        );

        let footprint_divisor = load_f64_with_warning(
            source,
            Self::FOOTPRINT_DIVISOR_VAR,
            LayoutConfig::DEFAULT_FOOTPRINT_DIVISOR,
            |value| value >= 1.0,
            "must be at least 1",
            "Adjusted footprint divisor changes the largest box a category can get",
        );

        let density_kg_per_m3 = load_f64_with_warning(
            source,
            Self::DENSITY_VAR,
            Self::DEFAULT_DENSITY_KG_PER_M3,
            |value| value > 0.0,
            "must be greater than 0",
            "Mass-based categories use a custom bulk density",
        );

        let layout = LayoutConfig::builder()
            .spacing(spacing)
            .min_visible_size(min_visible_size)
            .horizontal_margin_ratio(horizontal_margin_ratio)
            .vertical_margin_ratio(vertical_margin_ratio)
            .footprint_divisor(footprint_divisor)
            .build();

        Self {
            layout,
            density_kg_per_m3,
        }
    }

    pub fn layout_config(&self) -> LayoutConfig {
        self.layout
    }

    pub fn density_kg_per_m3(&self) -> f64 {
        self.density_kg_per_m3
    }
}

impl Default for LayoutEngineConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            density_kg_per_m3: Self::DEFAULT_DENSITY_KG_PER_M3,
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            tracing::warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn load_f64_with_warning(
    source: &impl ConfigSource,
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match source.get(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && validator(value) => {
                let tolerance = (default.abs().max(1.0)) * 1e-9;
                if (value - default).abs() > tolerance {
                    tracing::info!("{} ({} = {}).", warning, var_name, value);
                }
                value
            }
            Ok(_) => {
                tracing::warn!(
                    "{} contains invalid value '{}': {}. Using {}.",
                    var_name,
                    raw,
                    invalid_hint,
                    default
                );
                default
            }
            Err(err) => {
                tracing::warn!(
                    "Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name,
                    raw,
                    err,
                    default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_source(&source(&[]));
        assert_eq!(config.layout.layout_config(), LayoutConfig::default());
        assert_eq!(
            config.layout.density_kg_per_m3(),
            LayoutEngineConfig::DEFAULT_DENSITY_KG_PER_M3
        );
        assert_eq!(config.api.port(), 8080);
        assert!(config.api.binds_to_all_interfaces());
        assert!(config.api.uses_default_host());
    }

    #[test]
    fn valid_overrides_are_applied() {
        let config = AppConfig::from_source(&source(&[
            ("WAREHOUSE_LAYOUT_API_HOST", "127.0.0.1"),
            ("WAREHOUSE_LAYOUT_API_PORT", "9000"),
            ("WAREHOUSE_LAYOUT_SPACING", "0.25"),
            ("WAREHOUSE_LAYOUT_FOOTPRINT_DIVISOR", "3"),
            ("WAREHOUSE_LAYOUT_DENSITY_KG_M3", "1600"),
        ]));

        assert_eq!(config.api.socket_addr().to_string(), "127.0.0.1:9000");
        assert!(!config.api.binds_to_all_interfaces());
        let layout = config.layout.layout_config();
        assert_eq!(layout.spacing, 0.25);
        assert_eq!(layout.footprint_divisor, 3.0);
        assert_eq!(layout.min_visible_size, LayoutConfig::DEFAULT_MIN_VISIBLE_SIZE);
        assert_eq!(config.layout.density_kg_per_m3(), 1600.0);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = AppConfig::from_source(&source(&[
            ("WAREHOUSE_LAYOUT_API_HOST", "not-an-ip"),
            ("WAREHOUSE_LAYOUT_API_PORT", "0"),
            ("WAREHOUSE_LAYOUT_SPACING", "-1"),
            ("WAREHOUSE_LAYOUT_MIN_VISIBLE_SIZE", "abc"),
            ("WAREHOUSE_LAYOUT_VERTICAL_MARGIN", "1.5"),
            ("WAREHOUSE_LAYOUT_DENSITY_KG_M3", "inf"),
        ]));

        assert!(config.api.uses_default_host());
        assert_eq!(config.api.port(), 8080);
        assert_eq!(config.layout.layout_config(), LayoutConfig::default());
        assert_eq!(
            config.layout.density_kg_per_m3(),
            LayoutEngineConfig::DEFAULT_DENSITY_KG_PER_M3
        );
    }
}
