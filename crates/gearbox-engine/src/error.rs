use thiserror::Error;

/// Errors raised while evaluating or generating from a definition.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] gearbox_store::StoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
