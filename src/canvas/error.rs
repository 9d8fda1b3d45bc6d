use thiserror::Error;

use crate::model::EndpointKind;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CanvasError {
    #[error("unknown card `{0}`")]
    UnknownCard(String),
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("unknown relation `{0}`")]
    UnknownRelation(String),
    #[error("unknown virtual ticket `{0}`")]
    UnknownVirtualTicket(String),
    #[error("no {kind:?} endpoint with id `{id}`")]
    UnknownEndpoint { kind: EndpointKind, id: String },
    #[error("relation endpoints must be two different elements")]
    SelfRelation,
    #[error("a relation between these elements already exists")]
    DuplicateRelation,
    #[error("group `{group}` would sit at depth {depth}; at most {max} levels are allowed")]
    DepthExceeded {
        group: String,
        depth: usize,
        max: usize,
    },
    #[error("group `{group}` cannot be nested inside its own descendant `{parent}`")]
    GroupCycle { group: String, parent: String },
    #[error("waypoint index {index} out of range for {len} waypoints")]
    WaypointOutOfRange { index: usize, len: usize },
    #[error("a drag session is already active")]
    DragInProgress,
}
