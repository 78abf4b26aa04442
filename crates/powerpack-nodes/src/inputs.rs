//! Typed access to a task's ports in the shared context

use graph_flow::Context;
use node_engine::ContextKeys;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PowerpackError, Result};

/// Integer reading of a JSON value: integers as-is, floats truncated,
/// integer strings parsed. Anything else (including booleans) is `None`.
pub fn coerce_int(value: &serde_json::Value) -> Option<i128> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i128)),
        serde_json::Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
}

/// Reads `{task_id}.input.{port}` values
pub struct NodeInputs<'a> {
    context: &'a Context,
    task_id: &'a str,
}

impl<'a> NodeInputs<'a> {
    pub fn new(context: &'a Context, task_id: &'a str) -> Self {
        Self { context, task_id }
    }

    /// Typed value of a port; `None` when absent or of another type
    pub async fn get<T: DeserializeOwned>(&self, port: &str) -> Option<T> {
        self.context
            .get(&ContextKeys::input(self.task_id, port))
            .await
    }

    /// Typed value of a port, or `default`
    pub async fn get_or<T: DeserializeOwned>(&self, port: &str, default: T) -> T {
        self.get(port).await.unwrap_or(default)
    }

    /// Integer value of a port via [`coerce_int`]
    pub async fn int(&self, port: &str) -> Option<i128> {
        self.value(port).await.as_ref().and_then(coerce_int)
    }

    /// Integer value of a port, saturated to `i64`, or `default`
    pub async fn int_or(&self, port: &str, default: i64) -> i64 {
        self.int(port)
            .await
            .map(|v| v.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
            .unwrap_or(default)
    }

    /// Raw JSON value of a port; explicit nulls count as absent
    pub async fn value(&self, port: &str) -> Option<serde_json::Value> {
        self.get::<serde_json::Value>(port)
            .await
            .filter(|v| !v.is_null())
    }

    /// Typed value of a required port
    pub async fn require<T: DeserializeOwned>(&self, port: &str) -> Result<T> {
        let key = ContextKeys::input(self.task_id, port);
        self.context
            .get(&key)
            .await
            .ok_or_else(|| PowerpackError::MissingInput {
                port: port.to_string(),
                key,
            })
    }
}

/// Writes `{task_id}.output.{port}` values
pub struct NodeOutputs<'a> {
    context: &'a Context,
    task_id: &'a str,
}

impl<'a> NodeOutputs<'a> {
    pub fn new(context: &'a Context, task_id: &'a str) -> Self {
        Self { context, task_id }
    }

    pub async fn set<T: Serialize>(&self, port: &str, value: T) {
        self.context
            .set(ContextKeys::output(self.task_id, port), value)
            .await;
    }
}
