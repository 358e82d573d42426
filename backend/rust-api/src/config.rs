use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub bind_addr: String,
    /// How often the deadline enforcer sweeps for overdue attempts.
    pub deadline_sweep_interval_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load environment variables from root .env file (two levels up)
        // Try root .env first, then fallback to local .env
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            // Fallback to current directory .env for backward compatibility
            dotenvy::dotenv().ok();
        }

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: MONGO_URI must be set in production!");
                }
                eprintln!("WARNING: Using default local MongoDB URI (dev mode only!)");
                "mongodb://localhost:27017/studyhall".to_string()
            });

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "studyhall".to_string());

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let deadline_sweep_interval_secs = settings
            .get_int("attempts.deadline_sweep_interval_secs")
            .ok()
            .or_else(|| {
                env::var("DEADLINE_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .filter(|v| *v > 0)
            .unwrap_or(5) as u64;

        Ok(Config {
            mongo_uri,
            mongo_database,
            bind_addr,
            deadline_sweep_interval_secs,
        })
    }

    /// Fixed config for tests: no files, no env, no live services implied.
    pub fn for_tests() -> Self {
        Self {
            mongo_uri: String::new(),
            mongo_database: "studyhall_test".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            deadline_sweep_interval_secs: 1,
        }
    }
}
