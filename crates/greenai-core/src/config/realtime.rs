//! Real-time coordination configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) coordination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Per-connection outbound queue capacity.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Presence record lifetime without renewal, in seconds.
    #[serde(default = "default_presence_ttl")]
    pub presence_ttl_seconds: u64,
    /// Interval between presence expiry sweeps, in seconds.
    #[serde(default = "default_presence_sweep")]
    pub presence_sweep_interval_seconds: u64,
    /// Typing indicator auto-stop delay, in milliseconds.
    #[serde(default = "default_typing_timeout")]
    pub typing_timeout_ms: u64,
    /// Connections idle longer than this are force-closed, in minutes.
    #[serde(default = "default_inactivity_timeout")]
    pub inactivity_timeout_minutes: u64,
    /// Interval between inactivity checks, in minutes.
    #[serde(default = "default_inactivity_check")]
    pub inactivity_check_interval_minutes: u64,
    /// Server keepalive ping interval, in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Inbound event rate limiting.
    #[serde(default)]
    pub rate_limit: InboundRateLimitConfig,
    /// Notification delivery settings.
    #[serde(default)]
    pub notifications: NotificationRealtimeConfig,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            presence_ttl_seconds: default_presence_ttl(),
            presence_sweep_interval_seconds: default_presence_sweep(),
            typing_timeout_ms: default_typing_timeout(),
            inactivity_timeout_minutes: default_inactivity_timeout(),
            inactivity_check_interval_minutes: default_inactivity_check(),
            ping_interval_seconds: default_ping_interval(),
            rate_limit: InboundRateLimitConfig::default(),
            notifications: NotificationRealtimeConfig::default(),
        }
    }
}

impl RealtimeConfig {
    /// Presence TTL as a [`Duration`].
    pub fn presence_ttl(&self) -> Duration {
        Duration::from_secs(self.presence_ttl_seconds)
    }

    /// Presence sweep interval as a [`Duration`].
    pub fn presence_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.presence_sweep_interval_seconds)
    }

    /// Typing auto-stop delay as a [`Duration`].
    pub fn typing_timeout(&self) -> Duration {
        Duration::from_millis(self.typing_timeout_ms)
    }

    /// Inactivity threshold as a [`Duration`].
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_minutes * 60)
    }

    /// Inactivity check interval as a [`Duration`].
    pub fn inactivity_check_interval(&self) -> Duration {
        Duration::from_secs(self.inactivity_check_interval_minutes * 60)
    }

    /// Keepalive ping interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds.max(1))
    }
}

/// Per-user inbound event rate limiting at the transport boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundRateLimitConfig {
    /// Whether inbound events are rate limited.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum inbound events per user per window.
    #[serde(default = "default_max_events")]
    pub max_events: u64,
    /// Window length in seconds.
    #[serde(default = "default_window")]
    pub window_seconds: u64,
}

impl Default for InboundRateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_events: default_max_events(),
            window_seconds: default_window(),
        }
    }
}

/// Notification delivery settings for the real-time engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRealtimeConfig {
    /// Whether to use the offline push channel when a user has no connections.
    #[serde(default = "default_true")]
    pub push_enabled: bool,
    /// Whether a new connection receives its unread notifications.
    #[serde(default = "default_true")]
    pub send_unread_on_connect: bool,
    /// Maximum unread notifications sent on connect.
    #[serde(default = "default_unread_limit")]
    pub unread_on_connect_limit: usize,
}

impl Default for NotificationRealtimeConfig {
    fn default() -> Self {
        Self {
            push_enabled: true,
            send_unread_on_connect: true,
            unread_on_connect_limit: default_unread_limit(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_presence_ttl() -> u64 {
    300
}

fn default_presence_sweep() -> u64 {
    60
}

fn default_typing_timeout() -> u64 {
    5000
}

fn default_inactivity_timeout() -> u64 {
    30
}

fn default_inactivity_check() -> u64 {
    5
}

fn default_ping_interval() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_max_events() -> u64 {
    100
}

fn default_window() -> u64 {
    60
}

fn default_unread_limit() -> usize {
    50
}
