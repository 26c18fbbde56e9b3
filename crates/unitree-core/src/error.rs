//! ---
//! utr_section: "04-lifecycle-engine"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit lifecycle engine and collaborator seams."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::hook::HookKind;

/// Shared result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, UnitError>;

/// Errors surfaced by lifecycle operations.
#[derive(Debug, Error)]
pub enum UnitError {
    /// A hook returned an error that the engine does not recover from.
    #[error("{hook} hook of unit `{unit}` failed: {source}")]
    Hook {
        /// Key of the failing unit.
        unit: String,
        /// Hook that failed.
        hook: HookKind,
        /// Error the hook returned.
        source: Fault,
    },
    /// A child failed while its parent was loading; the parent's own load hook did not run.
    #[error("child `{child}` of unit `{unit}` failed to load")]
    ChildLoad {
        /// Key of the parent being loaded.
        unit: String,
        /// Key of the first child that failed.
        child: String,
        /// The child's own load error.
        source: Box<UnitError>,
    },
    /// The unit was torn down by `destroy()`.
    #[error("unit `{unit}` has been destroyed")]
    Destroyed {
        /// Key of the destroyed unit.
        unit: String,
    },
}

impl UnitError {
    /// The hook fault at the bottom of a (possibly nested) child-load failure.
    pub fn root_fault(&self) -> Option<&Fault> {
        match self {
            UnitError::Hook { source, .. } => Some(source),
            UnitError::ChildLoad { source, .. } => source.root_fault(),
            UnitError::Destroyed { .. } => None,
        }
    }
}

/// Error value handed to the error hook and kept as a unit's last error.
///
/// Cloning shares the underlying error.
#[derive(Clone)]
pub struct Fault(Arc<anyhow::Error>);

impl Fault {
    /// Wrap any error.
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self(Arc::new(err.into()))
    }

    /// Fault carrying only a message.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self(Arc::new(anyhow::Error::msg(message)))
    }

    /// The wrapped error.
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    /// Whether two faults share the same underlying error.
    pub fn same_as(&self, other: &Fault) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<anyhow::Error> for Fault {
    fn from(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_fault_unwraps_nested_child_failures() {
        let fault = Fault::msg("template missing");
        let err = UnitError::ChildLoad {
            unit: "page".into(),
            child: "sidebar".into(),
            source: Box::new(UnitError::ChildLoad {
                unit: "sidebar".into(),
                child: "menu".into(),
                source: Box::new(UnitError::Hook {
                    unit: "menu".into(),
                    hook: HookKind::Show,
                    source: fault.clone(),
                }),
            }),
        };
        assert!(err.root_fault().unwrap().same_as(&fault));
        assert_eq!(err.to_string(), "child `sidebar` of unit `page` failed to load");
        assert!(UnitError::Destroyed { unit: "x".into() }.root_fault().is_none());
    }

    #[test]
    fn fault_displays_underlying_message() {
        let fault = Fault::new(anyhow::anyhow!("network down"));
        assert_eq!(fault.to_string(), "network down");
        let err = UnitError::Hook {
            unit: "feed".into(),
            hook: HookKind::Load,
            source: fault,
        };
        assert_eq!(err.to_string(), "load hook of unit `feed` failed: network down");
    }
}
