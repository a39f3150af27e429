use std::sync::Arc;

use crate::error::{RegistryError, ToolError};

use super::handler::{CallBudget, ToolDescriptor, ToolHandler};

/// One registered tool: what the client sees, how long it may run, and the
/// handler that does the work.
pub struct ToolEntry {
    pub descriptor: ToolDescriptor,
    pub budget: CallBudget,
    pub(crate) handler: Arc<dyn ToolHandler>,
}

/// Catalog of available tools, in registration order.
///
/// Built during startup, then frozen behind an `Arc` before the front-end
/// accepts calls, so lookups never need a lock.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Names must be unique.
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        budget: CallBudget,
        handler: impl ToolHandler + 'static,
    ) -> Result<(), RegistryError> {
        if self.tools.iter().any(|t| t.descriptor.name == descriptor.name) {
            return Err(RegistryError::DuplicateToolName(descriptor.name));
        }
        self.tools.push(ToolEntry {
            descriptor,
            budget,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(
        mut self,
        descriptor: ToolDescriptor,
        budget: CallBudget,
        handler: impl ToolHandler + 'static,
    ) -> Result<Self, RegistryError> {
        self.register(descriptor, budget, handler)?;
        Ok(self)
    }

    /// The catalogue, in registration order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolEntry, ToolError> {
        self.tools
            .iter()
            .find(|t| t.descriptor.name == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.descriptor.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}
