use std::sync::Arc;

use dashmap::DashSet;

/// Layout tool paths that could not be launched during this process.
///
/// Once a path lands here the pipeline stops trying to spawn it and returns
/// no artifact instead. Clones share the same set; the render service receives
/// one at construction so tests can start from a clean slate.
#[derive(Debug, Default, Clone)]
pub struct UnavailableTools {
    tools: Arc<DashSet<String>>,
}

impl UnavailableTools {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(DashSet::new()),
        }
    }

    pub fn contains(&self, tool: &str) -> bool {
        self.tools.contains(tool)
    }

    /// Remember `tool` as unavailable. Returns `true` the first time.
    pub fn mark(&self, tool: &str) -> bool {
        self.tools.insert(tool.to_string())
    }

    pub fn reset(&self) {
        self.tools.clear();
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
