use anyhow::Result;
use figment::{
    providers::{Data, Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::forecast::{FeatureSchema, DEFAULT_WINDOW_CAPACITY};
use crate::ml::{ArtifactPaths, TrainingConfig};
use crate::simulation::WorkloadSimulatorConfig;

pub const CONFIG_FILE: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "LOADCAST__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub model: ModelConfig,
    pub serving: ServingConfig,
    pub accuracy: AccuracyConfig,
    pub simulation: WorkloadSimulatorConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    /// Single allowed browser origin; CORS is off when unset
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            request_timeout_secs: 10,
            cors_origin: None,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub artifact_dir: PathBuf,
    /// Pin the persisted feature order; startup fails on any difference
    pub expected_feature_order: Option<FeatureSchema>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("models"),
            expected_feature_order: None,
        }
    }
}

impl ModelConfig {
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.artifact_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServingConfig {
    /// Used when a request omits `confidence_level`
    pub confidence_level: f64,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccuracyConfig {
    pub window_capacity: usize,
}

impl Default for AccuracyConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

impl Config {
    /// Defaults, then `config/default.toml`, then `LOADCAST__*` env vars
    pub fn load() -> Result<Self> {
        Self::figment(Toml::file(CONFIG_FILE)).extract().map_err(Into::into)
    }

    pub fn figment(file: Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::ModelType;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.serving.confidence_level, 0.95);
        assert_eq!(cfg.accuracy.window_capacity, 1000);
        assert_eq!(cfg.training.model_type, ModelType::RandomForest);
        assert_eq!(cfg.training.features.len(), 8);
        assert_eq!(cfg.simulation.seed, 42);
        assert!(cfg.model.expected_feature_order.is_none());
    }

    #[test]
    fn test_toml_and_env_layers() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "loadcast.toml",
                r#"
                [server]
                port = 8080

                [training]
                model_type = "linear_regression"
                features = ["hour_of_day", "load_1h_ago"]

                [model]
                expected_feature_order = ["hour_of_day", "load_1h_ago"]
                "#,
            )?;
            jail.set_env("LOADCAST__SERVER__HOST", "0.0.0.0");
            jail.set_env("LOADCAST__ACCURACY__WINDOW_CAPACITY", "50");

            let cfg: Config = Config::figment(Toml::file("loadcast.toml")).extract()?;
            assert_eq!(cfg.server.port, 8080);
            assert_eq!(cfg.server.host, "0.0.0.0");
            assert_eq!(cfg.accuracy.window_capacity, 50);
            assert_eq!(cfg.training.model_type, ModelType::LinearRegression);
            assert_eq!(cfg.training.features.names(), vec!["hour_of_day", "load_1h_ago"]);
            assert_eq!(
                cfg.model.expected_feature_order.map(|s| s.len()),
                Some(2)
            );
            // Untouched sections keep defaults
            assert_eq!(cfg.serving.confidence_level, 0.95);
            Ok(())
        });
    }

    #[test]
    fn test_unknown_feature_in_config_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "[training]\nfeatures = [\"phase_of_moon\"]\n")?;
            let result: Result<Config, _> = Config::figment(Toml::file("bad.toml")).extract();
            assert!(result.is_err());
            Ok(())
        });
    }
}
