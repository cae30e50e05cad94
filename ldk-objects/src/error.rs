use ldk_core::error::FleetError;

#[derive(Debug)]
pub enum ObjError {
    NoSuchBucket(String),
    BucketAlreadyExists(String),
    NoSuchKey(String),
    NoSuchUpload(String),
    InvalidPart(String),
    Validation(String),
    Io(String),
}

impl std::fmt::Display for ObjError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjError::NoSuchBucket(name) => write!(f, "bucket '{name}' does not exist"),
            ObjError::BucketAlreadyExists(name) => write!(f, "bucket '{name}' already exists"),
            ObjError::NoSuchKey(key) => write!(f, "key '{key}' does not exist"),
            ObjError::NoSuchUpload(id) => write!(f, "upload '{id}' does not exist"),
            ObjError::InvalidPart(msg) => write!(f, "invalid part: {msg}"),
            ObjError::Validation(msg) => write!(f, "validation error: {msg}"),
            ObjError::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for ObjError {}

impl From<std::io::Error> for ObjError {
    fn from(err: std::io::Error) -> Self {
        ObjError::Io(err.to_string())
    }
}

impl From<ObjError> for FleetError {
    fn from(err: ObjError) -> Self {
        match err {
            ObjError::NoSuchBucket(name) => FleetError::not_found("NoSuchBucket", format!("bucket '{name}' does not exist")),
            ObjError::BucketAlreadyExists(name) => {
                FleetError::already_exists("BucketAlreadyExists", format!("bucket '{name}' already exists"))
            }
            ObjError::NoSuchKey(key) => FleetError::not_found("NoSuchKey", format!("key '{key}' does not exist")),
            ObjError::NoSuchUpload(id) => FleetError::not_found("NoSuchUpload", format!("upload '{id}' does not exist")),
            ObjError::InvalidPart(msg) => FleetError::validation(msg),
            ObjError::Validation(msg) => FleetError::validation(msg),
            ObjError::Io(msg) => FleetError::internal(msg),
        }
    }
}
