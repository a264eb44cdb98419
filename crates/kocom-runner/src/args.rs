//! `key=value` action arguments from the command line.

use crate::{RunnerError, RunnerResult};
use kocom_common::Value;

/// Parse `key=value`, typing the value as bool, integer, float or string.
pub fn parse_arg(text: &str) -> RunnerResult<(String, Value)> {
    let (key, raw) = text
        .split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| RunnerError::InvalidArgument(text.to_string()))?;

    let value = if let Ok(flag) = raw.parse::<bool>() {
        Value::Bool(flag)
    } else if let Ok(int) = raw.parse::<i64>() {
        Value::Integer(int)
    } else if let Ok(float) = raw.parse::<f64>() {
        Value::Float(float)
    } else {
        Value::String(raw.to_string())
    };
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg_types() {
        assert_eq!(parse_arg("hvac_mode=cool").unwrap(), ("hvac_mode".to_string(), Value::from("cool")));
        assert_eq!(parse_arg("target_temp=22.5").unwrap().1, Value::Float(22.5));
        assert_eq!(parse_arg("speed=64").unwrap().1, Value::Integer(64));
        assert_eq!(parse_arg("enabled=true").unwrap().1, Value::Bool(true));
        assert_eq!(parse_arg("preset_mode=").unwrap().1, Value::from(""));
    }

    #[test]
    fn test_parse_arg_rejects() {
        assert!(matches!(parse_arg("speed"), Err(RunnerError::InvalidArgument(_))));
        assert!(parse_arg("=1").is_err());
    }
}
