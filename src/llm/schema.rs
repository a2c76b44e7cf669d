//! Capability descriptor → model function schema.

use serde::{Deserialize, Serialize};

use crate::mcp::types::CapabilityDescriptor;

/// A tool as the model sees it.
///
/// Same content as [`CapabilityDescriptor`] under the function-call field
/// names; always derived, never edited on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Project a backend descriptor into the model's function schema.
pub fn to_model_schema(descriptor: &CapabilityDescriptor) -> ModelFunctionSchema {
    ModelFunctionSchema {
        name: descriptor.name.clone(),
        description: descriptor.description.clone(),
        parameters: descriptor.input_schema.clone(),
    }
}

impl ModelFunctionSchema {
    /// The descriptor this schema was derived from.
    pub fn to_descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.parameters.clone(),
        }
    }

    /// `{"type": "function", "function": {...}}` envelope for the request body.
    pub fn to_tool_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters
            }
        })
    }
}

impl From<&CapabilityDescriptor> for ModelFunctionSchema {
    fn from(descriptor: &CapabilityDescriptor) -> Self {
        to_model_schema(descriptor)
    }
}
