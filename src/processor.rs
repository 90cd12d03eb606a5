use std::collections::HashMap;
use std::fmt;

use crate::config::{EnricherConfig, SAMPLE_CONFIG};
use crate::error::{Error, Result};
use crate::geoip::GeoEnricher;
use crate::record::Record;

const DESCRIPTION: &str = "GeoIP looks up the country code, city name and latitude/longitude \
for IP addresses in the MaxMind GeoIP database";

/// A batch transform stage the host pipeline can configure and run.
///
/// `init` is called once before the first `apply`. After that the host may
/// call `apply` from several workers at once.
pub trait Processor: fmt::Debug + Send + Sync {
    /// Name the processor is registered under.
    fn name(&self) -> &str;

    /// One-line summary for plugin listings.
    fn description(&self) -> &'static str;

    /// Commented example of the plugin's configuration.
    fn sample_config(&self) -> &'static str;

    /// Acquire resources. An error here must keep the stage from starting.
    fn init(&mut self) -> Result<()>;

    /// Transform a batch of records.
    fn apply(&self, records: Vec<Record>) -> Vec<Record>;
}

/// The `geoip` pipeline processor.
#[derive(Debug, Default)]
pub struct GeoIp {
    config: EnricherConfig,
    enricher: Option<GeoEnricher>,
}

impl GeoIp {
    pub fn new(config: EnricherConfig) -> Self {
        Self {
            config,
            enricher: None,
        }
    }

    pub fn config(&self) -> &EnricherConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.enricher.is_some()
    }
}

impl Processor for GeoIp {
    fn name(&self) -> &str {
        "geoip"
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn sample_config(&self) -> &'static str {
        SAMPLE_CONFIG
    }

    fn init(&mut self) -> Result<()> {
        let enricher = GeoEnricher::open(&self.config)?;
        tracing::info!(
            city = enricher.city_enabled(),
            asn = enricher.asn_enabled(),
            rules = enricher.rules().len(),
            "geoip processor initialized"
        );
        self.enricher = Some(enricher);
        Ok(())
    }

    fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        match &self.enricher {
            Some(enricher) => enricher.apply(records),
            None => {
                tracing::warn!("geoip processor used before init, passing records through");
                records
            }
        }
    }
}

/// Builds a processor from its TOML configuration table.
pub type ProcessorFactory = fn(toml::Table) -> Result<Box<dyn Processor>>;

fn geoip_factory(table: toml::Table) -> Result<Box<dyn Processor>> {
    let config: EnricherConfig = toml::Value::Table(table).try_into()?;
    Ok(Box::new(GeoIp::new(config)))
}

/// Registry of available processors, keyed by name.
#[derive(Debug)]
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        // Register default processors
        registry.register("geoip", geoip_factory);
        registry
    }
}

impl ProcessorRegistry {
    /// Register a processor, replacing any earlier one with the same name.
    pub fn register(&mut self, name: impl Into<String>, factory: ProcessorFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Names of all registered processors, sorted.
    pub fn available(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Create an uninitialized processor from its configuration table.
    pub fn create(&self, name: &str, table: toml::Table) -> Result<Box<dyn Processor>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownProcessor {
                name: name.to_string(),
            })?;
        factory(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_table() -> toml::Table {
        toml::from_str(
            r#"
            city_db_path = ""
            asn_db_path = ""

            [[lookup]]
            field = "ip"
            dest_country = "country"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn registry_knows_geoip() {
        let registry = ProcessorRegistry::default();
        assert_eq!(registry.available(), ["geoip"]);

        let p = registry.create("geoip", disabled_table()).unwrap();
        assert_eq!(p.name(), "geoip");
        assert!(p.description().contains("MaxMind"));
        assert!(p.sample_config().contains("[[lookup]]"));
    }

    #[test]
    fn unknown_processor() {
        let registry = ProcessorRegistry::default();
        let err = registry.create("rename", toml::Table::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownProcessor { name } if name == "rename"));
    }

    #[test]
    fn bad_table_is_config_error() {
        let registry = ProcessorRegistry::default();
        let table: toml::Table = toml::from_str("lookup = \"ip\"").unwrap();
        assert!(matches!(
            registry.create("geoip", table),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn apply_before_init_passes_through() {
        let p = GeoIp::new(EnricherConfig::disabled());
        let records = vec![Record::new("m").with_field("ip", "8.8.8.8")];
        assert_eq!(p.apply(records.clone()), records);
        assert!(!p.is_initialized());
    }

    #[test]
    fn init_with_databases_disabled() {
        let registry = ProcessorRegistry::default();
        let mut p = registry.create("geoip", disabled_table()).unwrap();
        p.init().unwrap();

        let records = vec![Record::new("m").with_field("ip", "8.8.8.8")];
        assert_eq!(p.apply(records.clone()), records);
    }

    #[test]
    fn init_fails_on_missing_database() {
        let mut p = GeoIp::new(EnricherConfig {
            city_db_path: "/no/such/GeoLite2-City.mmdb".into(),
            ..EnricherConfig::disabled()
        });
        assert!(matches!(p.init(), Err(Error::DatabaseOpen { .. })));
        assert!(!p.is_initialized());
    }
}
