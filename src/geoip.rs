use std::net::IpAddr;

use crate::config::{EnricherConfig, LookupRule};
use crate::error::Result;
use crate::mmdb::{AsnLookup, CityLookup, LookupError, MaxMindAsn, MaxMindCity};
use crate::record::Record;

/// Adds GeoIP city and ASN fields to records according to lookup rules.
///
/// The database handles are opened once and owned by the enricher. `apply`
/// only reads them, so one enricher can serve several batch workers.
#[derive(Debug)]
pub struct GeoEnricher {
    city: Option<Box<dyn CityLookup>>,
    asn: Option<Box<dyn AsnLookup>>,
    rules: Vec<LookupRule>,
}

impl GeoEnricher {
    /// Open every enabled database named in `config`.
    ///
    /// An empty path disables that database. A database that is enabled but
    /// cannot be opened fails the whole call; nothing is half-initialized.
    pub fn open(config: &EnricherConfig) -> Result<Self> {
        config.validate()?;

        let city = if config.city_enabled() {
            Some(Box::new(MaxMindCity::open(&config.city_db_path)?) as Box<dyn CityLookup>)
        } else {
            None
        };

        let asn = if config.asn_enabled() {
            Some(Box::new(MaxMindAsn::open(&config.asn_db_path)?) as Box<dyn AsnLookup>)
        } else {
            None
        };

        Ok(Self {
            city,
            asn,
            rules: config.lookup.clone(),
        })
    }

    /// Build an enricher from already opened lookup sources.
    pub fn with_readers(
        rules: Vec<LookupRule>,
        city: Option<Box<dyn CityLookup>>,
        asn: Option<Box<dyn AsnLookup>>,
    ) -> Self {
        Self { city, asn, rules }
    }

    pub fn rules(&self) -> &[LookupRule] {
        &self.rules
    }

    pub fn city_enabled(&self) -> bool {
        self.city.is_some()
    }

    pub fn asn_enabled(&self) -> bool {
        self.asn.is_some()
    }

    /// Enrich a batch in place and hand it back.
    ///
    /// Lookup failures never fail the batch. A failure other than "not
    /// found" is logged and ends the current rule for the current record.
    pub fn apply(&self, mut records: Vec<Record>) -> Vec<Record> {
        for record in records.iter_mut() {
            self.enrich(record);
        }
        records
    }

    /// Run every rule against one record.
    pub fn enrich(&self, record: &mut Record) {
        for rule in &self.rules {
            if let Err(err) = self.apply_rule(rule, record) {
                tracing::warn!(field = %rule.field, error = %err, "GeoIP lookup error");
            }
        }
    }

    fn apply_rule(
        &self,
        rule: &LookupRule,
        record: &mut Record,
    ) -> std::result::Result<(), LookupError> {
        if rule.field.is_empty() {
            return Ok(());
        }
        let Some(value) = record.field(&rule.field) else {
            return Ok(());
        };
        // Non-text or malformed addresses behave like a miss in every database.
        let Some(ip) = value.as_str().and_then(|s| s.parse::<IpAddr>().ok()) else {
            return Ok(());
        };

        if let Some(city) = &self.city {
            match city.lookup_city(ip) {
                Ok(info) => {
                    if !rule.dest_country.is_empty() {
                        record.add_field(rule.dest_country.as_str(), info.country_iso);
                    }
                    if !rule.dest_city.is_empty() {
                        record.add_field(rule.dest_city.as_str(), info.city);
                    }
                    if !rule.dest_lat.is_empty() {
                        record.add_field(rule.dest_lat.as_str(), info.latitude);
                    }
                    if !rule.dest_lon.is_empty() {
                        record.add_field(rule.dest_lon.as_str(), info.longitude);
                    }
                }
                Err(LookupError::NotFound) => {}
                Err(err) => return Err(err),
            }
        }

        if let Some(asn) = &self.asn {
            match asn.lookup_asn(ip) {
                // ASN outputs are switched on by the country/city destination
                // names. Existing configs depend on this.
                Ok(info) => {
                    if !rule.dest_country.is_empty() && !rule.dest_asn.is_empty() {
                        record.add_field(rule.dest_asn.as_str(), info.number);
                    }
                    if !rule.dest_city.is_empty() && !rule.dest_asnorg.is_empty() {
                        record.add_field(rule.dest_asnorg.as_str(), info.organization);
                    }
                }
                Err(LookupError::NotFound) => {}
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}
