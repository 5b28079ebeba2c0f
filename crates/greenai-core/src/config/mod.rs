//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod auth;
pub mod logging;
pub mod membership;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::auth::AuthConfig;
pub use self::logging::LoggingConfig;
pub use self::membership::{MembershipConfig, PlanConfig};
pub use self::realtime::{InboundRateLimitConfig, NotificationRealtimeConfig, RealtimeConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Token verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Real-time coordination settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Membership plans and usage limits.
    #[serde(default)]
    pub membership: MembershipConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `GREENAI__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("GREENAI")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.realtime.presence_ttl_seconds, 300);
        assert_eq!(config.realtime.typing_timeout_ms, 5000);
        assert_eq!(config.membership.default_plan, "free");
        assert!(config.membership.plans.contains_key("corporate"));
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = AppConfig::from_toml(
            r#"
            [realtime]
            typing_timeout_ms = 2500

            [realtime.rate_limit]
            max_events = 10

            [membership.plans.free.limits]
            forum_posts_daily = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.realtime.typing_timeout_ms, 2500);
        assert_eq!(config.realtime.rate_limit.max_events, 10);
        assert_eq!(config.realtime.rate_limit.window_seconds, 60);
        assert_eq!(
            config.membership.plans["free"].limits.get("forum_posts_daily"),
            Some(&5)
        );
    }

    #[test]
    fn test_shipped_default_file_matches_defaults() {
        let shipped = AppConfig::from_toml(include_str!("../../../../config/default.toml")).unwrap();
        let builtin = AppConfig::default();

        assert_eq!(shipped.server.port, builtin.server.port);
        assert_eq!(shipped.realtime.typing_timeout_ms, builtin.realtime.typing_timeout_ms);
        assert_eq!(shipped.realtime.presence_ttl_seconds, builtin.realtime.presence_ttl_seconds);
        assert_eq!(shipped.membership.plans.len(), builtin.membership.plans.len());
        assert_eq!(
            shipped.membership.plans["free"].limits,
            builtin.membership.plans["free"].limits
        );
        assert!(shipped.membership.plans["corporate"].limits.is_empty());
    }
}
