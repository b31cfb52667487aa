//! Configuration management for the message authentication service
//!
//! Loads settings from environment variables, with a `.env` file picked up
//! in local development. Every variable has a workable default except the
//! strict-mode verification key, which is simply absent unless configured.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::info;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub kafka: KafkaSettings,
    pub auth: AuthSettings,
    pub server: ServerSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        // Load .env file in development
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            kafka: KafkaSettings::from_env()?,
            auth: AuthSettings::from_env()?,
            server: ServerSettings::from_env()?,
        })
    }
}

/// Kafka consumer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaSettings {
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
}

impl KafkaSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            brokers: env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string()),
            group_id: env::var("KAFKA_GROUP_ID")
                .unwrap_or_else(|_| "message-auth-service".to_string()),
            topic: env::var("KAFKA_TOPIC").unwrap_or_else(|_| "messaging".to_string()),
        })
    }
}

/// Trust policy settings for the authentication gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Issuers accepted in the `iss` claim. Empty means any issuer.
    pub trusted_issuers: Vec<String>,
    /// Subjects rejected outright (disabled accounts).
    pub denied_subjects: Vec<String>,
    /// Key material for strict-mode signature verification. Absent by
    /// default: tokens on this topic were verified at the edge.
    pub verification_key: Option<String>,
    /// RS256 (PEM public key) or HS256 (shared secret, development).
    pub verification_algorithm: String,
}

impl AuthSettings {
    fn from_env() -> Result<Self> {
        let algorithm =
            env::var("AUTH_VERIFICATION_ALGORITHM").unwrap_or_else(|_| "RS256".to_string());
        match algorithm.as_str() {
            "RS256" | "HS256" => {}
            other => anyhow::bail!(
                "Invalid AUTH_VERIFICATION_ALGORITHM: {other} (expected RS256 or HS256)"
            ),
        }

        Ok(Self {
            trusted_issuers: comma_list(env::var("AUTH_TRUSTED_ISSUERS").ok()),
            denied_subjects: comma_list(env::var("AUTH_DENIED_SUBJECTS").ok()),
            verification_key: env::var("AUTH_VERIFICATION_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            verification_algorithm: algorithm,
        })
    }
}

/// HTTP ops surface settings (/health, /metrics)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid SERVER_PORT")?,
        })
    }
}

fn comma_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_env() {
        env::remove_var("KAFKA_BROKERS");
        env::remove_var("KAFKA_GROUP_ID");
        env::remove_var("KAFKA_TOPIC");
        env::remove_var("AUTH_TRUSTED_ISSUERS");
        env::remove_var("AUTH_DENIED_SUBJECTS");
        env::remove_var("AUTH_VERIFICATION_KEY");
        env::remove_var("AUTH_VERIFICATION_ALGORITHM");
        env::remove_var("SERVER_HOST");
        env::remove_var("SERVER_PORT");
    }

    #[test]
    #[serial_test::serial]
    fn test_defaults_without_env() {
        clear_env();

        let kafka = KafkaSettings::from_env().unwrap();
        assert_eq!(kafka.brokers, "localhost:9092");
        assert_eq!(kafka.group_id, "message-auth-service");
        assert_eq!(kafka.topic, "messaging");

        let auth = AuthSettings::from_env().unwrap();
        assert!(auth.trusted_issuers.is_empty());
        assert!(auth.denied_subjects.is_empty());
        assert!(auth.verification_key.is_none());
        assert_eq!(auth.verification_algorithm, "RS256");

        let server = ServerSettings::from_env().unwrap();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8080);
    }

    #[test]
    #[serial_test::serial]
    fn test_auth_settings_from_env() {
        clear_env();
        env::set_var(
            "AUTH_TRUSTED_ISSUERS",
            "https://sso.example, https://sso2.example",
        );
        env::set_var("AUTH_DENIED_SUBJECTS", "mallory");
        env::set_var("AUTH_VERIFICATION_KEY", "test-secret");
        env::set_var("AUTH_VERIFICATION_ALGORITHM", "HS256");

        let auth = AuthSettings::from_env().unwrap();

        assert_eq!(
            auth.trusted_issuers,
            vec!["https://sso.example", "https://sso2.example"]
        );
        assert_eq!(auth.denied_subjects, vec!["mallory"]);
        assert_eq!(auth.verification_key.as_deref(), Some("test-secret"));
        assert_eq!(auth.verification_algorithm, "HS256");

        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_rejects_unknown_verification_algorithm() {
        clear_env();
        env::set_var("AUTH_VERIFICATION_ALGORITHM", "ES512");

        assert!(AuthSettings::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_empty_verification_key_means_no_strict_mode() {
        clear_env();
        env::set_var("AUTH_VERIFICATION_KEY", "");

        let auth = AuthSettings::from_env().unwrap();
        assert!(auth.verification_key.is_none());

        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_port_is_an_error() {
        clear_env();
        env::set_var("SERVER_PORT", "not-a-port");

        assert!(ServerSettings::from_env().is_err());

        clear_env();
    }
}
