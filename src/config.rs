use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::model::TruckDims;
use crate::placement::{PlacementConfig, ScanOrder};

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub planner: PlannerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            planner: PlannerConfig::from_env(),
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

    fn from_env() -> Self {
        let host_value =
            env_string("LADEMETER_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse LADEMETER_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    Self::DEFAULT_HOST
                        .parse::<IpAddr>()
                        .expect("Default host must be valid"),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("LADEMETER_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    eprintln!(
                        "⚠️ LADEMETER_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    eprintln!(
                        "⚠️ Could not parse LADEMETER_API_PORT ('{}'): {}. Using {}.",
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

    /// Configured port.
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

/// Configuration for the placement engine.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    placement: PlacementConfig,
}

impl PlannerConfig {
    const TRUCK_LENGTH_VAR: &'static str = "LADEMETER_TRUCK_LENGTH_CM";
    const TRUCK_WIDTH_VAR: &'static str = "LADEMETER_TRUCK_WIDTH_CM";
    const SCAN_ORDER_VAR: &'static str = "LADEMETER_SCAN_ORDER";
    const ALLOW_ROTATION_VAR: &'static str = "LADEMETER_ALLOW_ROTATION";

    fn from_env() -> Self {
        let truck_length = load_i32_with_warning(
            Self::TRUCK_LENGTH_VAR,
            TruckDims::DEFAULT_LENGTH_CM,
            |value| value > 0,
            "must be greater than 0",
            "Warning: Non-standard bed length changes every LDM figure",
        );

        let truck_width = load_i32_with_warning(
            Self::TRUCK_WIDTH_VAR,
            TruckDims::DEFAULT_WIDTH_CM,
            |value| value > 0,
            "must be greater than 0",
            "Warning: Non-standard bed width changes which pallets fit at all",
        );

        let scan_order = env_string(Self::SCAN_ORDER_VAR)
            .and_then(|raw| parse_scan_order(&raw, Self::SCAN_ORDER_VAR))
            .unwrap_or_default();

        let allow_rotation = env_string(Self::ALLOW_ROTATION_VAR)
            .and_then(|raw| parse_bool(&raw, Self::ALLOW_ROTATION_VAR))
            .unwrap_or(PlacementConfig::DEFAULT_ALLOW_ROTATION);

        let placement = PlacementConfig::builder()
            .truck(TruckDims::new(truck_length, truck_width))
            .scan_order(scan_order)
            .allow_rotation(allow_rotation)
            .build();

        Self { placement }
    }

    /// Returns the configured PlacementConfig.
    pub fn placement_config(&self) -> PlacementConfig {
        self.placement
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
            eprintln!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            eprintln!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn parse_scan_order(raw: &str, var_name: &str) -> Option<ScanOrder> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "width_first" | "widthfirst" | "width" => Some(ScanOrder::WidthFirst),
        "length_first" | "lengthfirst" | "length" => Some(ScanOrder::LengthFirst),
        other => {
            eprintln!(
                "⚠️ Could not interpret {} ('{}') as scan order (width_first or length_first). Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_i32_with_warning(
    var_name: &str,
    default: i32,
    validator: impl Fn(i32) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> i32 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<i32>() {
            Ok(value) => {
                if !validator(value) {
                    eprintln!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    if value != default {
                        println!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}
