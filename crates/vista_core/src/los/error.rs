use crate::entity::EntityId;
use crate::terrain::TerrainError;
use thiserror::Error;

/// Errors surfaced by the line-of-sight cache.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LosError {
    #[error("entity {id} cannot be tested against itself")]
    SelfPair { id: EntityId },

    #[error("entity {id} was not registered at the last reset")]
    UnknownEntity { id: EntityId },

    #[error("line-of-sight cache queried before reset")]
    NotReset,

    #[error("pair index {index} out of range for {count} entities")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("no pair slot exists for index {index} against itself")]
    DiagonalSlot { index: usize },

    #[error(transparent)]
    Terrain(#[from] TerrainError),
}
