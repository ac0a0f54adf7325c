use serde::Deserialize;

/// What the error router does when a chain error has neither an explicit
/// error handler nor a trailing callback to go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnhandledPolicy {
    /// Invoke the operation itself with `[Value::Error(err)]` as its only argument.
    #[default]
    SelfHeal,
    /// Return `HookError::Unhandled` to whichever call is driving the chain.
    Surface,
}

/// Registry-level configuration for chain execution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Last-resort routing for chain errors.
    pub unhandled: UnhandledPolicy,
    /// Pad call and interceptor arguments with `Null` up to the declared arity.
    pub pad_missing_args: bool,
    /// Deadline applied by the service pipeline to calls that carry none.
    pub default_deadline_ms: u64,
}

impl HookConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid JSON or a field has the wrong type.
    pub fn from_json(input: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            unhandled: UnhandledPolicy::SelfHeal,
            pad_missing_args: true,
            default_deadline_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_config_defaults() {
        let config = HookConfig::default();
        assert_eq!(config.unhandled, UnhandledPolicy::SelfHeal);
        assert!(config.pad_missing_args);
        assert_eq!(config.default_deadline_ms, 30_000);
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let config = HookConfig::from_json(r#"{ "unhandled": "surface" }"#).unwrap();
        assert_eq!(config.unhandled, UnhandledPolicy::Surface);
        assert!(config.pad_missing_args);
        assert_eq!(config.default_deadline_ms, 30_000);
    }

    #[test]
    fn from_json_rejects_unknown_policy() {
        assert!(HookConfig::from_json(r#"{ "unhandled": "retry" }"#).is_err());
    }
}
