use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// Database paths
pub const DEFAULT_CITY_DB_PATH: &str = "/var/lib/GeoIP/GeoLite2-City.mmdb";
pub const DEFAULT_ASN_DB_PATH: &str = "/var/lib/GeoIP/GeoLite2-ASN.mmdb";

/// Sample plugin configuration, printed by `--sample-config`.
pub const SAMPLE_CONFIG: &str = r#"
  ## city_db_path is the location of the MaxMind GeoIP2 City database
  city_db_path = "/var/lib/GeoIP/GeoLite2-City.mmdb"
  ## asn_db_path is the location of the MaxMind GeoIP2 ASN database
  asn_db_path = "/var/lib/GeoIP/GeoLite2-ASN.mmdb"

  [[lookup]]
    ## get the ip from the field "source_ip" and put the lookup results in the
    ## respective destination fields (if specified)
    field = "source_ip"
    dest_country = "source_country"
    dest_city = "source_city"
    dest_lat = "source_lat"
    dest_lon = "source_lon"
    # dest_asn = "source_asn"
    # dest_asnorg = "source_asnorg"
"#;

/// One source field to enrich and the fields its lookup results go to.
///
/// An empty destination name means the attribute is not written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupRule {
    pub field: String,
    pub dest_country: String,
    pub dest_city: String,
    pub dest_lat: String,
    pub dest_lon: String,
    pub dest_asn: String,
    pub dest_asnorg: String,
}

impl LookupRule {
    /// A rule reading the IP from `field` with no destinations set.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    fn has_destination(&self) -> bool {
        [
            &self.dest_country,
            &self.dest_city,
            &self.dest_lat,
            &self.dest_lon,
            &self.dest_asn,
            &self.dest_asnorg,
        ]
        .iter()
        .any(|d| !d.is_empty())
    }
}

/// Process-wide enrichment settings. Immutable once the enricher is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnricherConfig {
    /// City database location; empty disables city lookups.
    pub city_db_path: Utf8PathBuf,
    /// ASN database location; empty disables ASN lookups.
    pub asn_db_path: Utf8PathBuf,
    /// Rules in evaluation order.
    pub lookup: Vec<LookupRule>,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            city_db_path: Utf8PathBuf::from(DEFAULT_CITY_DB_PATH),
            asn_db_path: Utf8PathBuf::from(DEFAULT_ASN_DB_PATH),
            lookup: Vec::new(),
        }
    }
}

impl EnricherConfig {
    /// Config with both databases disabled and no rules.
    pub fn disabled() -> Self {
        Self {
            city_db_path: Utf8PathBuf::new(),
            asn_db_path: Utf8PathBuf::new(),
            lookup: Vec::new(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    #[inline]
    pub fn city_enabled(&self) -> bool {
        !self.city_db_path.as_str().is_empty()
    }

    #[inline]
    pub fn asn_enabled(&self) -> bool {
        !self.asn_db_path.as_str().is_empty()
    }

    /// Reject database paths that name a directory and log rules that can
    /// never write anything. Inert rules are legal.
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("city_db_path", &self.city_db_path),
            ("asn_db_path", &self.asn_db_path),
        ];
        for (name, path) in paths {
            if !path.as_str().is_empty() && path.is_dir() {
                return Err(Error::InvalidConfig {
                    reason: format!("{name} {path} is a directory, expected an .mmdb file"),
                });
            }
        }

        for (idx, rule) in self.lookup.iter().enumerate() {
            if rule.field.is_empty() {
                tracing::debug!(rule = idx, "lookup rule has no source field and will be skipped");
            } else if !rule.has_destination() {
                tracing::warn!(
                    rule = idx,
                    field = %rule.field,
                    "lookup rule has no destination fields"
                );
            }
        }
        Ok(())
    }
}
