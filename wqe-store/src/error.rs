use thiserror::Error;

/// Errors raised while building or installing a [`crate::SampleStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("sample store already installed")]
    AlreadyInstalled,
}
