mod validate;

pub use validate::validate_params;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::core::error::CatalogError;
use crate::core::permission::PermissionTier;
use crate::core::tool::{Tool, ToolDefinition, ToolSchema};

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub struct CatalogEntry {
    pub definition: ToolDefinition,
    pub tool: Arc<dyn Tool>,
}

/// Registry of invocable tools keyed by name. Definitions are captured once at registration and
/// never change afterwards.
#[derive(Default)]
pub struct ToolCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), CatalogError> {
        let definition = tool.definition();
        if self.entries.contains_key(&definition.name) {
            tracing::warn!(tool = %definition.name, "Rejected duplicate tool registration");
            return Err(CatalogError::DuplicateTool(definition.name));
        }

        tracing::debug!(
            tool = %definition.name,
            risk = %definition.risk_level,
            "Registered tool"
        );
        self.entries
            .insert(definition.name.clone(), CatalogEntry { definition, tool });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn export_schemas(&self) -> Vec<ToolSchema> {
        self.entries
            .values()
            .map(|entry| entry.definition.to_schema())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Default permission tier for every registered tool, from its risk level.
    pub fn default_tiers(&self) -> HashMap<String, PermissionTier> {
        self.entries
            .values()
            .map(|entry| {
                (
                    entry.definition.name.clone(),
                    PermissionTier::default_for(entry.definition.risk_level),
                )
            })
            .collect()
    }
}
