use crate::api::types::EntityId;

/// Errors produced while compiling specs into bodies or editing the scene graph.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The shape kind has no collider representation.
    #[error("unsupported shape kind `{0}`")]
    UnsupportedShape(&'static str),
    /// The shape geometry cannot be turned into a collider.
    #[error("invalid {kind} geometry: {reason}")]
    InvalidGeometry {
        kind: &'static str,
        reason: &'static str,
    },
    /// No live entity carries this id.
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),
    /// The requested parent/child link would break the ownership tree.
    #[error("invalid hierarchy: {0}")]
    InvalidHierarchy(&'static str),
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    /// Spec or config JSON failed to parse.
    #[error("spec parse error: {0}")]
    Spec(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
