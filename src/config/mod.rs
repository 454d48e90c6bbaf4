use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
    pub security: SecurityConfig,
    pub payment: PaymentConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// One fixed-window preset per endpoint class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RatePreset {
    pub window_ms: u64,
    pub max_requests: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub read: RatePreset,
    pub write: RatePreset,
    pub auth: RatePreset,
    pub ai: RatePreset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub session_secret: String,
    pub session_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Environment profile first, then specific env vars on top
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        if let Ok(v) = env::var("RATE_LIMIT_ENABLED") {
            self.rate_limit.enabled = v.parse().unwrap_or(self.rate_limit.enabled);
        }
        override_preset(&mut self.rate_limit.read, "RATE_LIMIT_READ");
        override_preset(&mut self.rate_limit.write, "RATE_LIMIT_WRITE");
        override_preset(&mut self.rate_limit.auth, "RATE_LIMIT_AUTH");
        override_preset(&mut self.rate_limit.ai, "RATE_LIMIT_AI");

        if let Ok(v) = env::var("SESSION_SECRET") {
            self.security.session_secret = v;
        }
        if let Ok(v) = env::var("SESSION_EXPIRY_HOURS") {
            self.security.session_expiry_hours = v.parse().unwrap_or(self.security.session_expiry_hours);
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(v) = env::var("PAYMENT_KEY_ID") {
            self.payment.key_id = v;
        }
        if let Ok(v) = env::var("PAYMENT_KEY_SECRET") {
            self.payment.key_secret = v;
        }
        if let Ok(v) = env::var("PAYMENT_BASE_URL") {
            self.payment.base_url = v;
        }

        if let Ok(v) = env::var("AI_API_KEY") {
            self.ai.api_key = v;
        }
        if let Ok(v) = env::var("AI_BASE_URL") {
            self.ai.base_url = v;
        }
        if let Ok(v) = env::var("AI_MODEL") {
            self.ai.model = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                read: RatePreset { window_ms: 60_000, max_requests: 300 },
                write: RatePreset { window_ms: 60_000, max_requests: 60 },
                auth: RatePreset { window_ms: 60_000, max_requests: 10 },
                ai: RatePreset { window_ms: 60_000, max_requests: 5 },
            },
            security: SecurityConfig {
                session_secret: String::new(),
                session_expiry_hours: 24 * 7,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
            payment: PaymentConfig {
                key_id: String::new(),
                key_secret: String::new(),
                base_url: "https://api.razorpay.com/v1".to_string(),
            },
            ai: AiConfig {
                api_key: String::new(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.rate_limit.read = RatePreset { window_ms: 60_000, max_requests: 120 };
        config.rate_limit.write = RatePreset { window_ms: 60_000, max_requests: 30 };
        config.security.session_expiry_hours = 24;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config
    }

    fn production() -> Self {
        let mut config = Self::staging();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.rate_limit.read = RatePreset { window_ms: 60_000, max_requests: 60 };
        config.rate_limit.write = RatePreset { window_ms: 60_000, max_requests: 20 };
        config.rate_limit.auth = RatePreset { window_ms: 60_000, max_requests: 5 };
        config.rate_limit.ai = RatePreset { window_ms: 60_000, max_requests: 3 };
        config.security.session_expiry_hours = 4;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config
    }
}

fn override_preset(preset: &mut RatePreset, prefix: &str) {
    if let Ok(v) = env::var(format!("{}_WINDOW_MS", prefix)) {
        preset.window_ms = v.parse().unwrap_or(preset.window_ms);
    }
    if let Ok(v) = env::var(format!("{}_MAX_REQUESTS", prefix)) {
        preset.max_requests = v.parse().unwrap_or(preset.max_requests);
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_profile_defaults() {
        let config = AppConfig::development();
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.auth.max_requests, 10);
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn production_tightens_limits() {
        let config = AppConfig::production();
        assert_eq!(config.rate_limit.auth.max_requests, 5);
        assert_eq!(config.rate_limit.ai.max_requests, 3);
        assert_eq!(config.security.session_expiry_hours, 4);
    }
}
