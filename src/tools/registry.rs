//! Tool set - the ordered, name-keyed tools owned by one agent
//!
//! Declaration order is kept so the backend sees tools in the order they were
//! registered; names are unique and enforced on registration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{AgencyError, Result, ToolDefinition};
use crate::tools::tool::Tool;

/// Ordered set of tools indexed by name
#[derive(Clone, Default)]
pub struct ToolSet {
    /// Tools in declaration order
    tools: Vec<Arc<dyn Tool>>,
    /// Position of each tool indexed by name
    index: HashMap<String, usize>,
}

impl ToolSet {
    /// Create an empty tool set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, rejecting a name that is already taken
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(AgencyError::config(format!(
                "Tool '{}' is already registered",
                name
            )));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Look up a tool by exact name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Whether a tool with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Function definitions in declaration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Get tool count
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::OperationTool;
    use async_trait::async_trait;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }

        async fn run(
            &self,
            parameters: serde_json::Value,
            _context: crate::tools::ToolContext,
        ) -> String {
            parameters.to_string()
        }
    }

    #[test]
    fn test_declaration_order_kept() {
        let mut tools = ToolSet::new();
        tools.register(Arc::new(Echo("zeta"))).unwrap();
        tools.register(Arc::new(OperationTool::new())).unwrap();
        tools.register(Arc::new(Echo("alpha"))).unwrap();

        assert_eq!(tools.names(), vec!["zeta", "OperationTool", "alpha"]);
        assert_eq!(tools.definitions()[1].function.name, "OperationTool");
        assert!(tools.get("alpha").is_some());
        assert!(tools.get("Alpha").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut tools = ToolSet::new();
        tools.register(Arc::new(Echo("echo"))).unwrap();
        let err = tools.register(Arc::new(Echo("echo"))).unwrap_err();

        assert!(matches!(err, AgencyError::Config(_)));
        assert_eq!(tools.len(), 1);
    }
}
