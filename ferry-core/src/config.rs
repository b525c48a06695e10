use crate::err::{Context, Result};

pub use serde_yaml::{from_value, Mapping, Value};

/// Parses a YAML document into a config value
pub fn parse_config(yaml: &str) -> Result<Value> {
    serde_yaml::from_str(yaml).context("Failed to parse configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let value = parse_config("key: value").unwrap();

        assert_eq!(value["key"].as_str(), Some("value"));
    }

    #[test]
    fn test_parse_config_invalid() {
        parse_config("key: [unterminated").unwrap_err();
    }
}
