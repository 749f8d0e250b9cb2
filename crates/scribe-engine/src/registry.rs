use std::collections::HashMap;
use std::sync::Arc;

use scribe_core::tools::TurnTool;

/// Registry of tools available to a turn.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn TurnTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool under its own name.
    pub fn register(&mut self, tool: Arc<dyn TurnTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TurnTool>> {
        self.tools.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::agent::ToolCallRequest;
    use scribe_core::context::TurnContext;
    use scribe_core::emitter::Emitter;
    use scribe_core::tools::{ToolError, ToolFamily};

    struct DummyTool {
        name: String,
    }

    impl TurnTool for DummyTool {
        fn name(&self) -> &str {
            &self.name
        }
        fn family(&self) -> ToolFamily {
            ToolFamily::Custom
        }
        fn invoke(
            &self,
            _call: &ToolCallRequest,
            _turn: &mut TurnContext,
            _emitter: &Emitter,
        ) -> Result<(), ToolError> {
            Ok(())
        }
    }

    #[test]
    fn register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool {
            name: "search".into(),
        }));

        assert!(registry.contains("search"));
        assert!(!registry.contains("web"));
        assert_eq!(registry.count(), 1);
        assert!(registry.get("search").is_some());
    }

    #[test]
    fn names_sorted() {
        let mut registry = ToolRegistry::new();
        for name in ["web", "search", "image"] {
            registry.register(Arc::new(DummyTool { name: name.into() }));
        }
        assert_eq!(registry.names(), vec!["image", "search", "web"]);
    }
}
