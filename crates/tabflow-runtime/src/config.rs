use std::collections::HashMap;

use serde::Deserialize;
use tabflow_core::{DType, Error, Result};

/// The slice of the host model config this backend consumes: declared inputs
/// and outputs with their dtypes, plus free-form string parameters. Unknown
/// keys in the document are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub input: Vec<IoConfig>,
    #[serde(default)]
    pub output: Vec<IoConfig>,
    #[serde(default)]
    pub parameters: HashMap<String, ParameterValue>,
}

#[derive(Debug, Deserialize)]
pub struct IoConfig {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub dims: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ParameterValue {
    #[serde(default)]
    pub string_value: String,
}

impl ModelConfig {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .map(|p| p.string_value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Module-name override for the default on-disk workflow convention.
    pub fn python_module(&self) -> Option<&str> {
        self.parameter("python_module")
    }

    /// Per-column dtype map across inputs and outputs, handed to the workflow
    /// at load time.
    pub fn column_dtypes(&self) -> Result<HashMap<String, DType>> {
        let mut dtypes = HashMap::new();
        for io in self.input.iter().chain(self.output.iter()) {
            dtypes.insert(io.name.clone(), DType::from_config_str(&io.data_type)?);
        }
        Ok(dtypes)
    }

    /// Declared outputs in config order.
    pub fn output_columns(&self) -> Result<Vec<(String, DType)>> {
        self.output
            .iter()
            .map(|io| Ok((io.name.clone(), DType::from_config_str(&io.data_type)?)))
            .collect()
    }
}
