use thiserror::Error;

/// type alias for all operations on the stores that could fail with a [`KvsError`]
pub type Result<T> = std::result::Result<T, KvsError>;

/// The Error variants used by the backing structures, the router and the executables.
///
/// The first three variants are the "recoverable" outcomes of a store operation. They are turned
/// into a [`Status`](crate::Status) by the router and never terminate the process.
#[derive(Error, Debug)]
pub enum KvsError {
    /// a SET was issued for a key that is already present
    #[error("Key already exists")]
    KeyExists,

    /// GET, DEL or UPDATE of a key that is not present
    #[error("Key not found")]
    KeyNotFound,

    /// the structure holds `capacity` live records and the key is new
    #[error("storage full")]
    StoreFull,

    /// a malformed command: unknown verb, missing key or missing value
    #[error("{0}")]
    Command(String),

    /// invalid store configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// errors that occur when parsing command line options
    #[error("parsing error: {0}")]
    Parsing(String),

    /// a structural invariant of a backing structure does not hold
    #[error("corrupted store: {0}")]
    Corrupted(String),

    /// variant for errors caused from file IO
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Serde Error
    #[error("{0}")]
    Serde(#[from] serde_json::Error),

    /// an error message produced by a worker thread
    #[error("{0}")]
    StringErr(String),
}
