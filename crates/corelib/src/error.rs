//! Core shared errors (renderer-agnostic).

use thiserror::Error;

use crate::params::Param;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{param:?} = {value} is outside [{min}, {max}]")]
    ParamOutOfRange {
        param: Param,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
