use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub cache: CacheConfig,
    pub node_id: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root: String,
    pub public_url: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of feed views kept per presentation controller.
    pub view_capacity: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let node_id = parse_node_id(env::var("NODE_ID").ok().as_deref())?;

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string()),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            storage: StorageConfig {
                root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "data/storage".to_string()),
                public_url: env::var("STORAGE_PUBLIC_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/storage".to_string()),
                bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "Social".to_string()),
            },
            session: SessionConfig {
                ttl_secs: env::var("SESSION_TTL_SECS")
                    .unwrap_or_else(|_| "604800".to_string())
                    .parse()
                    .unwrap_or(604_800),
            },
            cache: CacheConfig {
                view_capacity: env::var("VIEW_CACHE_CAPACITY")
                    .unwrap_or_else(|_| "8".to_string())
                    .parse()
                    .unwrap_or(8),
            },
            node_id,
        })
    }

    /// In-memory configuration used by tests and local demos.
    pub fn for_testing(storage_root: &str) -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            storage: StorageConfig {
                root: storage_root.to_string(),
                public_url: "http://localhost/storage".to_string(),
                bucket: "Social".to_string(),
            },
            session: SessionConfig { ttl_secs: 3600 },
            cache: CacheConfig { view_capacity: 4 },
            node_id: 1,
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Node ids occupy 10 bits of every generated id
fn parse_node_id(raw: Option<&str>) -> anyhow::Result<u16> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(0);
    };
    let node_id: u64 = raw
        .parse()
        .map_err(|_| anyhow::anyhow!("NODE_ID must be a number, got {:?}", raw))?;
    if node_id >= 1024 {
        anyhow::bail!("NODE_ID must be less than 1024, got {}", node_id);
    }
    Ok(node_id as u16)
}
