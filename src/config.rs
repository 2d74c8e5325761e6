use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration, read from the environment (after `.env` is loaded).
///
/// | Variable          | Default                   |
/// |-------------------|---------------------------|
/// | `DATABASE_URL`    | required                  |
/// | `JWT_SECRET`      | required                  |
/// | `HOST`            | `0.0.0.0`                 |
/// | `PORT`            | `5000`                    |
/// | `BARCODE_DIR`     | `public/uploads/barcodes` |
/// | `PUBLIC_BASE_URL` | unset                     |
/// | `BIN_CAPACITY`    | unset (unlimited)         |
/// | `BCRYPT_COST`     | `12`                      |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub barcode_dir: PathBuf,
    /// Prepended to barcode URLs handed to clients, e.g. `https://stock.example.com`.
    pub public_base_url: Option<String>,
    /// Maximum number of assets one bin may hold. `None` lets bins be shared freely.
    pub bin_capacity: Option<u32>,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => 5000,
        };

        let barcode_dir = var("BARCODE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("public/uploads/barcodes"));

        let public_base_url = var("PUBLIC_BASE_URL").map(|url| url.trim_end_matches('/').to_string());

        let bin_capacity = match var("BIN_CAPACITY") {
            Some(raw) => {
                let capacity = raw.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
                    name: "BIN_CAPACITY",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                if capacity == 0 {
                    return Err(ConfigError::Invalid {
                        name: "BIN_CAPACITY",
                        value: raw,
                        reason: "must be at least 1".to_string(),
                    });
                }
                Some(capacity)
            }
            None => None,
        };

        let bcrypt_cost = match var("BCRYPT_COST") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => cost,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "BCRYPT_COST",
                        value: raw,
                        reason: "must be an integer between 4 and 31".to_string(),
                    })
                }
            },
            None => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            host,
            port,
            barcode_dir,
            public_base_url,
            bin_capacity,
            bcrypt_cost,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
