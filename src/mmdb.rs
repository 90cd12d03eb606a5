use std::fmt;
use std::net::IpAddr;

use camino::Utf8Path;
use maxminddb::{geoip2, MaxMindDBError, Mmap, Reader};

use crate::error::{DatabaseKind, Error, OpenFailure, Result};

// Constants for default field values
const EMPTY_STR: &str = "";

/// City-level attributes for an address. Attributes missing from the
/// database record are left at their zero value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityInfo {
    pub country_iso: String,
    /// English city name.
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Autonomous system that owns an address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsnInfo {
    pub number: u32,
    pub organization: String,
}

/// Failure of a single lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The address is not covered by the database. Expected for private and
    /// unassigned ranges.
    #[error("not found")]
    NotFound,

    /// Anything else the reader reported, e.g. a corrupt data section.
    #[error("{0}")]
    Other(String),
}

impl From<MaxMindDBError> for LookupError {
    fn from(err: MaxMindDBError) -> Self {
        match err {
            MaxMindDBError::AddressNotFoundError(_) => LookupError::NotFound,
            other => LookupError::Other(other.to_string()),
        }
    }
}

/// Source of city-level data for an IP address.
///
/// Implementations are shared across batch workers, so lookups must be safe
/// to run concurrently through `&self`.
pub trait CityLookup: fmt::Debug + Send + Sync {
    fn lookup_city(&self, ip: IpAddr) -> std::result::Result<CityInfo, LookupError>;
}

/// Source of autonomous-system data for an IP address.
pub trait AsnLookup: fmt::Debug + Send + Sync {
    fn lookup_asn(&self, ip: IpAddr) -> std::result::Result<AsnInfo, LookupError>;
}

/// Memory-mapped MaxMind City database.
pub struct MaxMindCity {
    reader: Reader<Mmap>,
}

/// Memory-mapped MaxMind ASN database.
pub struct MaxMindAsn {
    reader: Reader<Mmap>,
}

impl fmt::Debug for MaxMindCity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaxMindCity")
            .field("database_type", &self.reader.metadata.database_type)
            .finish()
    }
}

impl fmt::Debug for MaxMindAsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaxMindAsn")
            .field("database_type", &self.reader.metadata.database_type)
            .finish()
    }
}

/// Map a database file and confirm its metadata names the expected kind.
///
/// MaxMind names its products e.g. `GeoLite2-City`, `GeoIP2-City`,
/// `GeoLite2-ASN`, `GeoIP2-ISP`. ISP databases carry the ASN fields too.
fn open_reader(path: &Utf8Path, kind: DatabaseKind) -> Result<Reader<Mmap>> {
    let open_err = |source: OpenFailure| Error::DatabaseOpen {
        database: kind,
        path: path.to_owned(),
        source,
    };

    let reader = Reader::open_mmap(path).map_err(|e| open_err(e.into()))?;

    let db_type = reader.metadata.database_type.as_str();
    let matches = match kind {
        DatabaseKind::City => db_type.contains("City"),
        DatabaseKind::Asn => db_type.contains("ASN") || db_type.contains("ISP"),
    };
    if !matches {
        return Err(open_err(OpenFailure::WrongType {
            expected: kind,
            found: db_type.to_string(),
        }));
    }

    tracing::debug!(
        database = %kind,
        %path,
        db_type,
        build_epoch = reader.metadata.build_epoch,
        "opened GeoIP database"
    );
    Ok(reader)
}

impl MaxMindCity {
    pub fn open(path: &Utf8Path) -> Result<Self> {
        Ok(Self {
            reader: open_reader(path, DatabaseKind::City)?,
        })
    }
}

impl MaxMindAsn {
    pub fn open(path: &Utf8Path) -> Result<Self> {
        Ok(Self {
            reader: open_reader(path, DatabaseKind::Asn)?,
        })
    }
}

impl CityLookup for MaxMindCity {
    fn lookup_city(&self, ip: IpAddr) -> std::result::Result<CityInfo, LookupError> {
        let record = self.reader.lookup::<geoip2::City>(ip)?;

        let country_iso = record
            .country
            .and_then(|c| c.iso_code)
            .unwrap_or(EMPTY_STR);

        // get city name, hard coded for en language currently
        let city = record
            .city
            .and_then(|c| c.names)
            .and_then(|names| names.get("en").copied())
            .unwrap_or(EMPTY_STR);

        let (latitude, longitude) = match record.location {
            Some(loc) => (loc.latitude.unwrap_or(0.0), loc.longitude.unwrap_or(0.0)),
            None => (0.0, 0.0),
        };

        Ok(CityInfo {
            country_iso: country_iso.to_string(),
            city: city.to_string(),
            latitude,
            longitude,
        })
    }
}

impl AsnLookup for MaxMindAsn {
    fn lookup_asn(&self, ip: IpAddr) -> std::result::Result<AsnInfo, LookupError> {
        let record = self.reader.lookup::<geoip2::Asn>(ip)?;
        Ok(AsnInfo {
            number: record.autonomous_system_number.unwrap_or(0),
            organization: record
                .autonomous_system_organization
                .unwrap_or(EMPTY_STR)
                .to_string(),
        })
    }
}
