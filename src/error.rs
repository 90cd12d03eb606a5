use camino::Utf8PathBuf;
use std::fmt;

/// Which of the two GeoIP databases an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    City,
    Asn,
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::City => write!(f, "city"),
            DatabaseKind::Asn => write!(f, "ASN"),
        }
    }
}

/// The reason a database file could not be used.
#[derive(Debug, thiserror::Error)]
pub enum OpenFailure {
    /// The reader could not map or parse the file.
    #[error(transparent)]
    Reader(#[from] maxminddb::MaxMindDBError),

    /// The file is a valid MMDB but holds a different kind of database.
    #[error("expected {expected} database, found {found:?}")]
    WrongType {
        expected: DatabaseKind,
        found: String,
    },
}

/// Error types for the geoipenrich library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An enabled database could not be opened at its configured path.
    #[error("error opening GeoIP {database} database at {path}")]
    DatabaseOpen {
        database: DatabaseKind,
        path: Utf8PathBuf,
        #[source]
        source: OpenFailure,
    },

    /// Configuration parsed but cannot be used.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Processor was not found in the registry.
    #[error("unknown processor: {name}")]
    UnknownProcessor { name: String },

    /// Configuration text is not valid TOML or has the wrong shape.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using the library error.
pub type Result<T> = std::result::Result<T, Error>;
