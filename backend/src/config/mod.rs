//! Business configuration for CWR generation.
//!
//! The configuration is an explicit, immutable value handed to the composer
//! for one run. It is loaded either from a JSON file (checked against the
//! embedded Draft-7 schema `schemas/business-config.json`) or from
//! environment variables.
//!
//! # Environment
//!
//! | Variable          | Meaning                                   |
//! |-------------------|-------------------------------------------|
//! | `CWR_CONFIG`      | Path to a JSON config file (wins if set)  |
//! | `CWR_SENDER_NAME` | Submitter name                            |
//! | `CWR_SENDER_IPI`  | Submitter IPI                             |
//! | `CWR_TERRITORY`   | Territory code                            |
//! | `CWR_AGREEMENTS`  | JSON object of entity name → agreement ID |
//!
//! # Example
//!
//! ```rust,ignore
//! use cwrgen::config::BusinessConfig;
//!
//! let config = BusinessConfig::from_file("config/business.json")?;
//! println!("Sending as {}", config.sender_name);
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::path::Path;

use crate::compose::derive::pad_ipi;
use crate::compose::AgreementMap;
use crate::error::{ConfigError, ConfigResult};

/// Embedded JSON Schema for the configuration file.
pub const CONFIG_SCHEMA: &str = include_str!("../../schemas/business-config.json");

/// Sender identity and agreement table for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessConfig {
    pub sender_name: String,
    pub sender_ipi: String,
    pub territory: String,
    #[serde(default = "default_sender_code")]
    pub sender_code: String,
    #[serde(default = "default_receiver_code")]
    pub receiver_code: String,
    /// Catalog code used when a row has none.
    #[serde(default = "default_catalog")]
    pub default_catalog: String,
    /// Label used when a row has none.
    #[serde(default = "default_label")]
    pub default_label: String,
    #[serde(default)]
    pub agreements: AgreementMap,
}

fn default_sender_code() -> String {
    "LUM".to_string()
}

fn default_receiver_code() -> String {
    "319".to_string()
}

fn default_catalog() -> String {
    "RC055".to_string()
}

fn default_label() -> String {
    "RED COLA".to_string()
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self::new("LUMINA PUBLISHING UK", "01254514077", "0826")
    }
}

impl BusinessConfig {
    /// Configuration with default codes and an empty agreement map.
    pub fn new(sender_name: &str, sender_ipi: &str, territory: &str) -> Self {
        Self {
            sender_name: sender_name.to_string(),
            sender_ipi: sender_ipi.to_string(),
            territory: territory.to_string(),
            sender_code: default_sender_code(),
            receiver_code: default_receiver_code(),
            default_catalog: default_catalog(),
            default_label: default_label(),
            agreements: AgreementMap::new(),
        }
    }

    pub fn with_agreements(mut self, agreements: AgreementMap) -> Self {
        self.agreements = agreements;
        self
    }

    /// Load a JSON file and check it against the embedded schema.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let document: Value = serde_json::from_str(content)?;
        let schema: Value = serde_json::from_str(CONFIG_SCHEMA)?;
        validate(&schema, &document).map_err(|errors| ConfigError::SchemaError { errors })?;

        // Deserialize from the text, not the Value, so agreement order survives
        let config: Self = serde_json::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Load from the environment (a `.env` file is read first if present).
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any variable source; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CWR_CONFIG") {
            return Self::from_file(path);
        }

        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingEnv(key.to_string()));

        let mut config = Self::new(
            &required("CWR_SENDER_NAME")?,
            &required("CWR_SENDER_IPI")?,
            &required("CWR_TERRITORY")?,
        );

        if let Some(agreements) = lookup("CWR_AGREEMENTS") {
            config.agreements = serde_json::from_str(&agreements)?;
        }

        config.check()?;
        Ok(config)
    }

    /// Field checks the schema cannot express for env-sourced values.
    fn check(&self) -> ConfigResult<()> {
        let invalid = |field: &str, message: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        };

        if self.sender_name.trim().is_empty() {
            return Err(invalid("sender_name", "must not be empty"));
        }
        let ipi = self.sender_ipi.trim();
        if ipi.is_empty() || ipi.len() > 11 || !ipi.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("sender_ipi", "must be 1 to 11 digits"));
        }
        let territory = self.territory.trim();
        if territory.len() != 4 || !territory.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("territory", "must be 4 digits"));
        }
        Ok(())
    }

    /// The sender IPI as written in the header: last 9 digits of the padded IPI.
    pub fn header_ipi(&self) -> String {
        let padded = pad_ipi(Some(&self.sender_ipi));
        padded[padded.len() - 9..].to_string()
    }

    /// Delivery file name, e.g. `CW260001LUM_319.V22`.
    pub fn output_file_name(&self, now: NaiveDateTime, sequence: u32) -> String {
        format!(
            "CW{}{:04}{}_{}.V22",
            now.format("%y"),
            sequence,
            self.sender_code,
            self.receiver_code
        )
    }
}

/// Validate a JSON document against a Draft-7 schema.
///
/// Returns every violation message on failure.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EXAMPLE: &str = include_str!("../../config/business.example.json");

    #[test]
    fn test_example_config_is_valid() {
        let config = BusinessConfig::from_json_str(EXAMPLE).unwrap();
        assert_eq!(config.sender_name, "LUMINA PUBLISHING UK");
        assert_eq!(config.agreements.len(), 13);
        assert_eq!(config.agreements.resolve("Pashalina Music"), Some("4316161"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = BusinessConfig::from_json_str(
            r#"{"sender_name": "ACME", "sender_ipi": "123", "territory": "0826"}"#,
        )
        .unwrap();
        assert_eq!(config.default_catalog, "RC055");
        assert_eq!(config.default_label, "RED COLA");
        assert_eq!(config.sender_code, "LUM");
        assert!(config.agreements.is_empty());
    }

    #[test]
    fn test_schema_violations_reported() {
        let err = BusinessConfig::from_json_str(
            r#"{"sender_name": "ACME", "sender_ipi": "12AB", "territory": "826", "extra": 1}"#,
        )
        .unwrap_err();
        match err {
            ConfigError::SchemaError { errors } => assert!(errors.len() >= 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_territory_must_be_four_digits() {
        let err = BusinessConfig::from_json_str(
            r#"{"sender_name": "ACME", "sender_ipi": "123", "territory": "826"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::SchemaError { .. }));

        let err = BusinessConfig::new("ACME", "123", "826").check().unwrap_err();
        match err {
            ConfigError::InvalidValue { field, message } => {
                assert_eq!(field, "territory");
                assert_eq!(message, "must be 4 digits");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_field() {
        let err = BusinessConfig::from_json_str(r#"{"sender_name": "ACME"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaError { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();
        let config = BusinessConfig::from_file(file.path()).unwrap();
        assert_eq!(config.territory, "0826");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CWR_SENDER_NAME", "ACME MUSIC"),
            ("CWR_SENDER_IPI", "987654321"),
            ("CWR_TERRITORY", "0826"),
            ("CWR_AGREEMENTS", r#"{"ACME": "111", "OTHER": 222}"#),
        ]
        .into_iter()
        .collect();

        let config = BusinessConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.sender_name, "ACME MUSIC");
        assert_eq!(config.agreements.resolve("other records"), Some("222"));
    }

    #[test]
    fn test_from_lookup_missing_variable() {
        let err = BusinessConfig::from_lookup(|k| {
            (k == "CWR_SENDER_NAME").then(|| "ACME".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ref k) if k == "CWR_SENDER_IPI"));
    }

    #[test]
    fn test_from_lookup_rejects_bad_ipi() {
        let err = BusinessConfig::from_lookup(|k| match k {
            "CWR_SENDER_NAME" => Some("ACME".into()),
            "CWR_SENDER_IPI" => Some("not-a-number".into()),
            "CWR_TERRITORY" => Some("0826".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "sender_ipi"));
    }

    #[test]
    fn test_header_ipi() {
        assert_eq!(BusinessConfig::default().header_ipi(), "254514077");
        assert_eq!(BusinessConfig::new("A", "123", "0826").header_ipi(), "000000123");
    }

    #[test]
    fn test_output_file_name() {
        let now = NaiveDate::from_ymd_opt(2026, 3, 9)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(
            BusinessConfig::default().output_file_name(now, 1),
            "CW260001LUM_319.V22"
        );
    }

    #[test]
    fn test_generic_validate() {
        let schema = serde_json::json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        });
        assert!(validate(&schema, &serde_json::json!({ "name": "x" })).is_ok());
        assert!(validate(&schema, &serde_json::json!({ "age": 1 })).is_err());
    }
}
