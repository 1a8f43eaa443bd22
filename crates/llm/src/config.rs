use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};

use crate::error::{GatewayResult, LoadConfigSnafu, MissingApiKeySnafu};

/// Environment variable holding the Gemini credential.
pub const API_KEY_ENV: &str = "API_KEY";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. Keep your responses concise and clear, suitable for reading on an e-ink screen.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model_id: default_model_id(),
            system_instruction: default_system_instruction(),
        }
    }
}

impl GatewayConfig {
    /// Layers the credential from the process environment over built-in defaults.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(
            Env::raw()
                .only(&[API_KEY_ENV])
                .map(|_| "api_key".into()),
        )
    }

    /// Loads the startup configuration, failing when no usable credential is present.
    pub fn from_env() -> GatewayResult<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> GatewayResult<Self> {
        let config = figment
            .extract::<Self>()
            .context(LoadConfigSnafu {
                stage: "extract-gateway-config",
            })?
            .normalized();

        ensure!(
            !config.api_key.is_empty(),
            MissingApiKeySnafu {
                stage: "validate-gateway-config",
            }
        );

        Ok(config)
    }

    fn normalized(mut self) -> Self {
        self.api_key = self.api_key.trim().to_string();
        self.model_id = if self.model_id.trim().is_empty() {
            default_model_id()
        } else {
            self.model_id.trim().to_string()
        };
        self
    }
}

fn default_model_id() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_system_instruction() -> String {
    SYSTEM_INSTRUCTION.to_string()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn credential_comes_from_api_key_variable() {
        Jail::expect_with(|jail| {
            jail.set_env(API_KEY_ENV, "  test-key  ");

            let config = GatewayConfig::from_env().map_err(|error| error.to_string())?;
            assert_eq!(config.api_key, "test-key");
            assert_eq!(config.model_id, DEFAULT_GEMINI_MODEL);
            assert_eq!(config.system_instruction, SYSTEM_INSTRUCTION);
            Ok(())
        });
    }

    #[test]
    fn blank_credential_is_a_configuration_error() {
        Jail::expect_with(|jail| {
            jail.set_env(API_KEY_ENV, "   ");

            let error = match GatewayConfig::from_env() {
                Ok(_) => return Err("blank key must be rejected".to_string().into()),
                Err(error) => error,
            };
            assert_eq!(error.kind(), ErrorKind::Configuration);
            assert_eq!(error.stage(), "validate-gateway-config");
            Ok(())
        });
    }

    #[test]
    fn unrelated_variables_do_not_leak_into_config() {
        Jail::expect_with(|jail| {
            jail.set_env(API_KEY_ENV, "key");
            jail.set_env("MODEL_ID", "some-other-model");

            let config = GatewayConfig::from_env().map_err(|error| error.to_string())?;
            assert_eq!(config.model_id, DEFAULT_GEMINI_MODEL);
            Ok(())
        });
    }

    #[test]
    fn defaults_carry_fixed_model_and_instruction() {
        let config = GatewayConfig::default();

        assert!(config.api_key.is_empty());
        assert_eq!(config.model_id, "gemini-2.5-flash");
        assert!(config.system_instruction.contains("e-ink"));
    }
}
