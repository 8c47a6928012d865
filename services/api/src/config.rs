use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported backend providers for the coaching model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Azure,
}

/// Holds all configuration loaded from the environment at startup.
///
/// Credentials and endpoints are read exactly once here and passed by
/// reference afterwards; nothing else in the service touches the
/// environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub chat_model: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_region: String,
    pub report_bucket: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "azure" => Provider::Azure,
            _ => Provider::OpenAI,
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let azure_api_key = std::env::var("AZURE_OPENAI_API_KEY").ok();
        let azure_endpoint = std::env::var("AZURE_OPENAI_ENDPOINT").ok();

        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let aws_access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| ConfigError::MissingVar("AWS_ACCESS_KEY_ID".to_string()))?;
        let aws_secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| ConfigError::MissingVar("AWS_SECRET_ACCESS_KEY".to_string()))?;
        let aws_region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let report_bucket =
            std::env::var("REPORT_BUCKET").unwrap_or_else(|_| "englishly-reports".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        match provider {
            Provider::OpenAI => {
                if openai_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "OPENAI_API_KEY must be set for 'openai' provider".to_string(),
                    ));
                }
            }
            Provider::Azure => {
                if azure_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "AZURE_OPENAI_API_KEY must be set for 'azure' provider".to_string(),
                    ));
                }
                if azure_endpoint.is_none() {
                    return Err(ConfigError::MissingVar(
                        "AZURE_OPENAI_ENDPOINT must be set for 'azure' provider".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            bind_address,
            provider,
            openai_api_key,
            azure_api_key,
            azure_endpoint,
            chat_model,
            aws_access_key_id,
            aws_secret_access_key,
            aws_region,
            report_bucket,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("LLM_PROVIDER");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("AZURE_OPENAI_API_KEY");
            env::remove_var("AZURE_OPENAI_ENDPOINT");
            env::remove_var("CHAT_MODEL");
            env::remove_var("AWS_ACCESS_KEY_ID");
            env::remove_var("AWS_SECRET_ACCESS_KEY");
            env::remove_var("AWS_REGION");
            env::remove_var("REPORT_BUCKET");
            env::remove_var("RUST_LOG");
        }
    }

    fn set_minimal_env_openai() {
        unsafe {
            env::set_var("LLM_PROVIDER", "openai");
            env::set_var("OPENAI_API_KEY", "test-openai-key");
            env::set_var("AWS_ACCESS_KEY_ID", "test-access-key");
            env::set_var("AWS_SECRET_ACCESS_KEY", "test-secret-key");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal_openai() {
        clear_env_vars();
        set_minimal_env_openai();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.openai_api_key, Some("test-openai-key".to_string()));
        assert_eq!(config.azure_api_key, None);
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.aws_access_key_id, "test-access-key");
        assert_eq!(config.aws_region, "us-east-1");
        assert_eq!(config.report_bucket, "englishly-reports");
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_azure_provider() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "azure");
            env::set_var("AZURE_OPENAI_API_KEY", "test-azure-key");
            env::set_var("AZURE_OPENAI_ENDPOINT", "https://coach.openai.azure.com");
            env::set_var("AWS_ACCESS_KEY_ID", "test-access-key");
            env::set_var("AWS_SECRET_ACCESS_KEY", "test-secret-key");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.provider, Provider::Azure);
        assert_eq!(config.azure_api_key, Some("test-azure-key".to_string()));
        assert_eq!(
            config.azure_endpoint,
            Some("https://coach.openai.azure.com".to_string())
        );
        assert_eq!(config.openai_api_key, None);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("LLM_PROVIDER", "openai");
            env::set_var("OPENAI_API_KEY", "custom-openai-key");
            env::set_var("CHAT_MODEL", "gpt-4o");
            env::set_var("AWS_ACCESS_KEY_ID", "custom-access-key");
            env::set_var("AWS_SECRET_ACCESS_KEY", "custom-secret-key");
            env::set_var("AWS_REGION", "eu-west-1");
            env::set_var("REPORT_BUCKET", "custom-reports");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.chat_model, "gpt-4o");
        assert_eq!(config.aws_access_key_id, "custom-access-key");
        assert_eq!(config.aws_secret_access_key, "custom-secret-key");
        assert_eq!(config.aws_region, "eu-west-1");
        assert_eq!(config.report_bucket, "custom-reports");
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_openai_key() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "openai");
            env::set_var("AWS_ACCESS_KEY_ID", "test-access-key");
            env::set_var("AWS_SECRET_ACCESS_KEY", "test-secret-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => {
                assert!(msg.contains("OPENAI_API_KEY"));
            }
            _ => panic!("Expected MissingVar for OPENAI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_azure_endpoint() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "azure");
            env::set_var("AZURE_OPENAI_API_KEY", "test-azure-key");
            env::set_var("AWS_ACCESS_KEY_ID", "test-access-key");
            env::set_var("AWS_SECRET_ACCESS_KEY", "test-secret-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => {
                assert!(msg.contains("AZURE_OPENAI_ENDPOINT"));
            }
            _ => panic!("Expected MissingVar for AZURE_OPENAI_ENDPOINT"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_storage_credentials() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "openai");
            env::set_var("OPENAI_API_KEY", "test-openai-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => {
                assert!(msg.contains("AWS_ACCESS_KEY_ID"));
            }
            _ => panic!("Expected MissingVar for AWS_ACCESS_KEY_ID"),
        }
    }
}
