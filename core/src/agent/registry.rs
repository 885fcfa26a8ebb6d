use crate::error::{LoopError, Result};
use crate::traits::{Tool, ToolOutput, ToolSpec};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Name → tool mapping, populated at startup and read-only afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        if self.contains(tool.name()) {
            return Err(LoopError::DuplicateTool(tool.name().to_string()));
        }
        tracing::debug!(tool = tool.name(), "registered tool");
        self.tools.push(tool);
        Ok(())
    }

    pub fn register_fn<F, Fut>(&mut self, spec: ToolSpec, handler: F) -> Result<()>
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolOutput>> + Send + 'static,
    {
        self.register(Arc::new(FnTool::new(spec, handler)))
    }

    /// Descriptors in registration order.
    pub fn describe_all(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| LoopError::UnknownTool(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

type Handler = dyn Fn(serde_json::Value) -> BoxFuture<'static, anyhow::Result<ToolOutput>>
    + Send
    + Sync;

/// A tool assembled from a static descriptor and an async closure.
pub struct FnTool {
    spec: ToolSpec,
    handler: Box<Handler>,
}

impl FnTool {
    pub fn new<F, Fut>(spec: ToolSpec, handler: F) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolOutput>> + Send + 'static,
    {
        Self {
            spec,
            handler: Box::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn input_schema(&self) -> serde_json::Value {
        self.spec.input_schema.clone()
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolOutput> {
        (self.handler)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(name: &str) -> ToolSpec {
        ToolSpec {
            name: name.into(),
            description: format!("{name} tool"),
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    fn echo_registry(names: &[&str]) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for name in names {
            registry
                .register_fn(spec(name), |args| async move {
                    Ok(ToolOutput::success(args.to_string()))
                })
                .unwrap();
        }
        registry
    }

    #[test]
    fn describe_all_keeps_registration_order() {
        let registry = echo_registry(&["get_weather", "fetch", "search_database"]);
        let names: Vec<String> = registry.describe_all().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["get_weather", "fetch", "search_database"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = echo_registry(&["get_weather"]);
        let err = registry
            .register_fn(spec("get_weather"), |_| async { Ok(ToolOutput::success("")) })
            .unwrap_err();
        assert!(matches!(err, LoopError::DuplicateTool(name) if name == "get_weather"));
        assert_eq!(registry.describe_all().len(), 1);
    }

    #[test]
    fn one_descriptor_per_name() {
        let registry = echo_registry(&["a", "b", "c"]);
        let specs = registry.describe_all();
        for name in registry.names() {
            assert_eq!(specs.iter().filter(|s| s.name == name).count(), 1);
        }
    }

    #[test]
    fn unknown_lookup_fails() {
        let registry = echo_registry(&["a"]);
        assert!(matches!(registry.get("b"), Err(LoopError::UnknownTool(name)) if name == "b"));
        assert!(registry.get("a").is_ok());
    }

    #[tokio::test]
    async fn fn_tool_invokes_closure() {
        let registry = echo_registry(&["echo"]);
        let tool = registry.get("echo").unwrap();
        let output = tool.execute(json!({"x": 1})).await.unwrap();
        assert_eq!(output.text(), r#"{"x":1}"#);
    }
}
