use member_router::config::{Config as RouterConfig, ValidationError};
use serde::Deserialize;
use std::fs::File;

#[derive(Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: Option<String>,
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub router: RouterConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data: Config = serde_yaml::from_reader(file)?;
        data.router.validate()?;

        Ok(data)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    ValidationError(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            listener:
                host: 0.0.0.0
                port: 3000
            admin_listener:
                host: 127.0.0.1
                port: 3001
            projects:
                path: /var/lib/headless/headless-config.json
            upstream:
                base_url: https://upstream.example.com
                timeout_secs: 20
            next_handler:
                url: http://127.0.0.1:5173
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            logging:
                sentry_dsn: https://key@sentry.example.com/1
                level: debug
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.router.listener.port, 3000);
        assert_eq!(
            config.router.projects.path,
            std::path::PathBuf::from("/var/lib/headless/headless-config.json")
        );
        assert_eq!(config.router.upstream.timeout_secs, Some(20));
        assert_eq!(config.router.upstream.page_size, 1000);
        assert_eq!(
            config.router.next_handler.expect("next handler").timeout_secs,
            30
        );
        assert_eq!(
            config.common.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125,
            })
        );
        let logging = config.common.logging.expect("logging config");
        assert_eq!(logging.level.as_deref(), Some("debug"));
        assert!(logging.sentry_dsn.is_some());
    }

    #[test]
    fn minimal_config() {
        let yaml = r#"
            listener:
                host: 0.0.0.0
                port: 3000
            admin_listener:
                host: 0.0.0.0
                port: 3001
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.common, CommonConfig { metrics: None, logging: None });
        assert!(config.router.next_handler.is_none());
        assert_eq!(
            config.router.upstream.base_url.as_str(),
            "https://www.wixapis.com/"
        );
    }

    #[test]
    fn invalid_config_rejected() {
        let yaml = r#"
            listener:
                host: 0.0.0.0
                port: 3000
            admin_listener:
                host: 0.0.0.0
                port: 3000
            "#;
        let tmp = write_tmp_file(yaml);
        assert!(matches!(
            Config::from_file(tmp.path()).unwrap_err(),
            ConfigError::ValidationError(ValidationError::ListenerConflict)
        ));

        assert!(matches!(
            Config::from_file(std::path::Path::new("/nonexistent/headless.yaml")).unwrap_err(),
            ConfigError::LoadError(_)
        ));
    }
}
