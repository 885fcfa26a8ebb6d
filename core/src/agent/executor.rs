use crate::agent::ToolRegistry;
use crate::agent::validate::validate_arguments;
use crate::error::{LoopError, Result};
use crate::traits::{ToolCall, ToolOutput, ToolResult};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Runs one call. Lookup and argument errors are returned before the handler
    /// is touched; a failing handler still yields a result, flagged as an error.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self.registry.get(&call.name)?;
        let args = parse_arguments(call)?;
        validate_arguments(&call.name, &tool.input_schema(), &args)?;

        info!(tool = %call.name, args = %args, "calling tool");

        let output = match tool.execute(args).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.name, "tool failed: {e:#}");
                ToolOutput::error(format!("Execution failed: {e:#}"))
            }
        };

        Ok(ToolResult::new(call.id.clone(), output))
    }
}

fn parse_arguments(call: &ToolCall) -> Result<serde_json::Value> {
    if call.arguments.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    serde_json::from_str(&call.arguments).map_err(|e| {
        LoopError::validation(&call.name, format!("arguments are not valid JSON: {e}"))
    })
}
