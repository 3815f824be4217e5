use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;

use crate::mods::{ChecksumHandling, ModsSettings};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Values that only show up in responses to clients.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// prefix of the download file name: "<prefix>-mods-<version>.zip"
    pub archive_prefix: String,
    /// where this service is reachable, used for example URLs in responses
    pub public_base_url: String,
    /// human-facing link to the repository holding the mods
    pub public_repository_url: String,
}
impl Default for SiteSettings {
    fn default() -> Self {
        SiteSettings {
            archive_prefix: "endxel".to_string(),
            public_base_url: "https://api.endxel.com".to_string(),
            public_repository_url: "https://github.com/Endxel-Network/Mods".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub github_api_base: String,
    /// "owner/name"
    pub repository: String,
    pub user_agent: String,
    /// absent means unauthenticated upstream access
    pub github_token: Option<String>,
    pub mods: ModsSettings,
    pub site: SiteSettings,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let string_or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let bind_addr = string_or("BIND_ADDR", "0.0.0.0:3000");
        let bind_addr = SocketAddr::from_str(&bind_addr)
            .with_context(|| format!("invalid BIND_ADDR {:?}", bind_addr))?;

        let mut member_extension = string_or("MODS_MEMBER_EXTENSION", ".jar");
        if !member_extension.starts_with('.') {
            member_extension.insert(0, '.');
        }

        let checksum_handling = if env_bool(var("MODS_VERIFY_CHECKSUMS"), true) {
            ChecksumHandling::VerifyIfPresent
        }
        else {
            ChecksumHandling::Ignore
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let site_defaults = SiteSettings::default();

        Ok(Config {
            bind_addr,
            github_api_base: string_or("GITHUB_API_BASE", "https://api.github.com"),
            repository: string_or("MODS_REPOSITORY", "Endxel-Network/api.endxel.com"),
            user_agent: string_or("MODS_USER_AGENT", "Endxel-Mods-API"),
            github_token: var("GITHUB_TOKEN"),
            mods: ModsSettings {
                root_path: string_or("MODS_ROOT_PATH", "mods/version").trim_matches('/').to_string(),
                member_extension,
                checksum_handling,
            },
            site: SiteSettings {
                archive_prefix: string_or("MODS_ARCHIVE_PREFIX", &site_defaults.archive_prefix),
                public_base_url: string_or("MODS_PUBLIC_BASE_URL", &site_defaults.public_base_url)
                    .trim_end_matches('/')
                    .to_string(),
                public_repository_url: string_or("MODS_PUBLIC_REPOSITORY_URL", &site_defaults.public_repository_url),
            },
            log_format,
        })
    }
}

fn env_bool(value: Option<String>, default: bool) -> bool {
    value
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}
