use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("prediction for player {player_id} is not finite ({stage})")]
    NonFinite { player_id: u32, stage: &'static str },

    #[error("tree node {path} has a non-finite {field}")]
    InvalidNode { path: String, field: &'static str },

    #[error("tree node {path} is neither a leaf nor a split")]
    MalformedNode { path: String },
}

pub type ScoringResult<T> = std::result::Result<T, ScoringError>;
