//! Pass-through for host commands without a dedicated subcommand.

use serde_json::{Map, Value};

use acectl_core::{AceCommand, ControllerConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::util;

pub async fn handle(
    config: ControllerConfig,
    name: String,
    params: &[String],
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let params = parse_params(params)?;
    util::run_command(config, AceCommand::Raw { name, params }, global).await
}

/// `KEY=VALUE` pairs; values that parse as JSON keep their type.
fn parse_params(raw: &[String]) -> Result<Map<String, Value>, CliError> {
    raw.iter()
        .map(|pair| {
            let (key, value) = pair.split_once('=').ok_or_else(|| CliError::Validation {
                field: "params".into(),
                reason: format!("expected KEY=VALUE, got '{pair}'"),
            })?;
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
            Ok((key.to_ascii_uppercase(), value))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_keep_json_types() {
        let params = parse_params(&["index=1".into(), "MODE=fast".into()]).unwrap();
        assert_eq!(Value::Object(params), json!({"INDEX": 1, "MODE": "fast"}));
    }

    #[test]
    fn missing_separator_is_rejected() {
        assert!(matches!(
            parse_params(&["INDEX".into()]),
            Err(CliError::Validation { .. })
        ));
    }
}
