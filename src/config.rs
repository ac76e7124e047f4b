//! Configuration management for the PDF Summarizer server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub auth: AuthConfig,
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub summaries_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Base URL of an OpenAI-compatible completion API
    pub base_url: String,
    pub api_key: String,
    pub default_model: String,
    /// Sent as the HTTP-Referer header (required by OpenRouter)
    pub referer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the identity provider (Supabase-style GoTrue endpoint)
    pub provider_url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Base URL of the payment provider's API
    pub api_base: String,
    pub api_key: String,
    /// Shared secret for webhook HMAC signatures
    pub webhook_secret: String,
    /// Bearer secret guarding the admin cleanup endpoint
    pub admin_secret: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./pdfsummarizer.db".to_string(),
            },
            storage: StorageConfig {
                uploads_dir: PathBuf::from("./uploads"),
                summaries_dir: PathBuf::from("./summaries"),
            },
            ai: AiConfig {
                base_url: "https://openrouter.ai/api/v1".to_string(),
                api_key: String::new(),
                default_model: "openai/gpt-4o-mini".to_string(),
                referer: "http://localhost:3000".to_string(),
            },
            auth: AuthConfig {
                provider_url: "http://localhost:9999".to_string(),
                anon_key: String::new(),
            },
            billing: BillingConfig {
                api_base: "https://api.creem.com/v1".to_string(),
                api_key: String::new(),
                webhook_secret: String::new(),
                admin_secret: String::new(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:./pdfsummarizer.db".to_string()),
            },
            storage: StorageConfig {
                uploads_dir: env::var("UPLOADS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./uploads")),
                summaries_dir: env::var("SUMMARIES_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./summaries")),
            },
            ai: AiConfig {
                base_url: env::var("AI_BASE_URL")
                    .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
                api_key: env::var("OPENROUTER_API_KEY").or_else(|_| env::var("OPENAI_API_KEY"))?,
                default_model: env::var("AI_DEFAULT_MODEL")
                    .unwrap_or_else(|_| "openai/gpt-4o-mini".to_string()),
                referer: env::var("SITE_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            auth: AuthConfig {
                provider_url: env::var("AUTH_PROVIDER_URL")?,
                anon_key: env::var("AUTH_ANON_KEY").unwrap_or_default(),
            },
            billing: BillingConfig {
                api_base: env::var("BILLING_API_BASE")
                    .unwrap_or_else(|_| "https://api.creem.com/v1".to_string()),
                api_key: env::var("BILLING_API_KEY").unwrap_or_default(),
                webhook_secret: env::var("BILLING_WEBHOOK_SECRET")?,
                admin_secret: env::var("ADMIN_SECRET").unwrap_or_default(),
            },
        })
    }
}
