//! The geoipenrich library: a pipeline processor that adds GeoIP metadata to
//! telemetry records.
//!
//! Each configured lookup rule names a field holding an IP address. The
//! address is resolved against a MaxMind City database and/or ASN database
//! and selected attributes are written back onto the same record.
//!
//! # Examples
//!
//! Enriching a batch with an in-memory lookup source:
//!
//! ```rust
//! use std::net::IpAddr;
//! use geoipenrich::{CityInfo, CityLookup, GeoEnricher, LookupError, LookupRule, Record};
//!
//! #[derive(Debug)]
//! struct Static;
//!
//! impl CityLookup for Static {
//!     fn lookup_city(&self, _ip: IpAddr) -> Result<CityInfo, LookupError> {
//!         Ok(CityInfo { country_iso: "US".into(), ..Default::default() })
//!     }
//! }
//!
//! let rule = LookupRule { dest_country: "country".into(), ..LookupRule::new("ip") };
//! let enricher = GeoEnricher::with_readers(vec![rule], Some(Box::new(Static)), None);
//!
//! let out = enricher.apply(vec![Record::new("conn").with_field("ip", "8.8.8.8")]);
//! assert_eq!(out[0].field("country").and_then(|v| v.as_str()), Some("US"));
//! ```

pub mod config;
pub mod error;
pub mod geoip;
pub mod input;
pub mod mmdb;
pub mod processor;
pub mod record;

pub use crate::config::{EnricherConfig, LookupRule};
pub use crate::error::{DatabaseKind, Error, Result};
pub use crate::geoip::GeoEnricher;
pub use crate::mmdb::{AsnInfo, AsnLookup, CityInfo, CityLookup, LookupError};
pub use crate::processor::{GeoIp, Processor, ProcessorRegistry};
pub use crate::record::{FieldValue, Record};
