use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] nyx_store::StoreError),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<LmdbError> for nyx_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Store(inner) => inner,
            other => nyx_store::StoreError::Backend(other.to_string()),
        }
    }
}
