use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("s3 error: {0}")]
    S3(String),

    #[error("image decode/encode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid signed url: {0}")]
    InvalidSignature(String),
}
