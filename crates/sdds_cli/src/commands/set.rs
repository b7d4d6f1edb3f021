//! Set command implementation.

use super::{Command, Engine, Step};
use crate::error::CliError;
use sdds_sync_engine::EngineEvent;
use serde_json::Value;

/// Assigns one leaf once the schema is known, then exits.
pub struct Set {
    path: String,
    value: Value,
}

impl Set {
    /// Assigns `raw` to the leaf at `path`.
    pub fn new(path: String, raw: &str) -> Self {
        Self {
            path,
            value: parse_value(raw),
        }
    }
}

impl Command for Set {
    fn on_event(&mut self, engine: &mut Engine, event: &EngineEvent) -> Result<Step, CliError> {
        if !matches!(event, EngineEvent::SchemaRebuilt { .. }) {
            return Ok(Step::Continue);
        }
        if !engine.set_value(&self.path, self.value.clone())? {
            return Err(CliError::Rejected {
                path: self.path.clone(),
                value: self.value.to_string(),
            });
        }
        let node = engine.resolve(&self.path)?;
        if let Some(node) = engine.tree().get(node) {
            println!("{} = {}", self.path, node.display_value());
        }
        Ok(Step::Done)
    }
}

/// JSON if it parses, otherwise the raw text.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_parse_as_json_first() {
        assert_eq!(parse_value("12"), json!(12));
        assert_eq!(parse_value("-0.5"), json!(-0.5));
        assert_eq!(parse_value("\"on\""), json!("on"));
        assert_eq!(parse_value("on"), json!("on"));
        assert_eq!(parse_value("hello world"), json!("hello world"));
    }
}
