//! ---
//! utr_section: "04-lifecycle-engine"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit lifecycle engine and collaborator seams."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
//! Hook return values and their normalisation into futures.

use std::fmt;
use std::future::{Future, IntoFuture};

use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display};

/// What a hook resolves to.
pub type HookResult = anyhow::Result<Value>;

/// Lifecycle extension points a unit type can override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HookKind {
    /// Constructor.
    Construct,
    /// Synchronous initialisation.
    Initialize,
    /// `load`.
    Load,
    /// `show`.
    Show,
    /// `hide`.
    Hide,
    /// `enable`.
    Enable,
    /// `disable`.
    Disable,
    /// `error`.
    Error,
    /// `transform_data`.
    TransformData,
}

/// Value returned by an asynchronous hook.
///
/// Hooks that finish synchronously return `Ready`; hooks with real async work
/// return `Deferred`. Both are awaited the same way by the engine.
pub enum HookOutput {
    /// Already settled.
    Ready(HookResult),
    /// Still running; the engine awaits it.
    Deferred(BoxFuture<'static, HookResult>),
}

impl HookOutput {
    /// Completed successfully with no value.
    pub fn ready() -> Self {
        HookOutput::Ready(Ok(Value::Null))
    }

    /// Completed successfully with `value`.
    pub fn value(value: impl Into<Value>) -> Self {
        HookOutput::Ready(Ok(value.into()))
    }

    /// Completed with an error.
    pub fn fail(err: impl Into<anyhow::Error>) -> Self {
        HookOutput::Ready(Err(err.into()))
    }

    /// Wrap asynchronous hook work.
    pub fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = HookResult> + Send + 'static,
    {
        HookOutput::Deferred(fut.boxed())
    }

    /// Whether the hook is still running.
    pub fn is_deferred(&self) -> bool {
        matches!(self, HookOutput::Deferred(_))
    }
}

impl IntoFuture for HookOutput {
    type Output = HookResult;
    type IntoFuture = BoxFuture<'static, HookResult>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            HookOutput::Ready(result) => future::ready(result).boxed(),
            HookOutput::Deferred(fut) => fut,
        }
    }
}

impl fmt::Debug for HookOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookOutput::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            HookOutput::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<()> for HookOutput {
    fn from(_: ()) -> Self {
        HookOutput::ready()
    }
}

impl From<Value> for HookOutput {
    fn from(value: Value) -> Self {
        HookOutput::Ready(Ok(value))
    }
}

impl From<HookResult> for HookOutput {
    fn from(result: HookResult) -> Self {
        HookOutput::Ready(result)
    }
}

impl From<anyhow::Result<()>> for HookOutput {
    fn from(result: anyhow::Result<()>) -> Self {
        HookOutput::Ready(result.map(|_| Value::Null))
    }
}

impl From<BoxFuture<'static, HookResult>> for HookOutput {
    fn from(fut: BoxFuture<'static, HookResult>) -> Self {
        HookOutput::Deferred(fut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn plain_values_are_awaitable() {
        assert_eq!(HookOutput::from(()).await.unwrap(), Value::Null);
        assert_eq!(HookOutput::from(Value::Null).await.unwrap(), Value::Null);
        assert_eq!(HookOutput::value(json!({"a": 1})).await.unwrap(), json!({"a": 1}));
        let unit_ok: anyhow::Result<()> = Ok(());
        assert_eq!(HookOutput::from(unit_ok).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn deferred_work_runs_when_awaited() {
        let output = HookOutput::deferred(async {
            tokio::task::yield_now().await;
            Ok(json!("done"))
        });
        assert!(output.is_deferred());
        assert_eq!(output.await.unwrap(), json!("done"));
    }

    #[tokio::test]
    async fn failures_surface_as_errors() {
        let err = HookOutput::fail(anyhow::anyhow!("nope")).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn hook_kinds_render_snake_case() {
        assert_eq!(HookKind::TransformData.to_string(), "transform_data");
        assert_eq!(HookKind::Load.as_ref(), "load");
    }
}
