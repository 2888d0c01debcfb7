use std::collections::HashMap;

use anyhow::Context;

const BUILTIN: &str = include_str!("../../data/steps.json");

pub const STEPS_NOT_AVAILABLE: &str = "Steps not available.";

/// Practice instructions keyed by item name (`"balasana.jpg"` etc.).
#[derive(Debug, Clone, Default)]
pub struct StepsCatalog {
    steps: HashMap<String, Vec<String>>,
}

impl StepsCatalog {
    /// Catalogue bundled with the binary.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_json(BUILTIN).context("parse builtin steps catalogue")
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(Self {
            steps: serde_json::from_str(raw)?,
        })
    }

    pub fn steps_for(&self, item: &str) -> Vec<String> {
        self.steps
            .get(item)
            .cloned()
            .unwrap_or_else(|| vec![STEPS_NOT_AVAILABLE.to_string()])
    }
}
