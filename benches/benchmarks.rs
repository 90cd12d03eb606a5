use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geoipenrich::{
    AsnInfo, AsnLookup, CityInfo, CityLookup, GeoEnricher, LookupError, LookupRule, Record,
};
use std::hint::black_box;
use std::net::IpAddr;

// Answers every public IPv4 address, misses everything else
#[derive(Debug)]
struct SyntheticCity;

impl CityLookup for SyntheticCity {
    fn lookup_city(&self, ip: IpAddr) -> Result<CityInfo, LookupError> {
        match ip {
            IpAddr::V4(v4) if !v4.is_private() => Ok(CityInfo {
                country_iso: "US".to_string(),
                city: "Mountain View".to_string(),
                latitude: 37.386,
                longitude: -122.084,
            }),
            _ => Err(LookupError::NotFound),
        }
    }
}

#[derive(Debug)]
struct SyntheticAsn;

impl AsnLookup for SyntheticAsn {
    fn lookup_asn(&self, ip: IpAddr) -> Result<AsnInfo, LookupError> {
        match ip {
            IpAddr::V4(v4) => Ok(AsnInfo {
                number: u32::from(v4.octets()[0]) * 100,
                organization: "EXAMPLE-NET".to_string(),
            }),
            IpAddr::V6(_) => Err(LookupError::NotFound),
        }
    }
}

// Generate a batch mixing public, private, IPv6 and junk source values
fn generate_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let ip = match i % 4 {
                0 => format!("{}.{}.{}.{}", (i % 223) + 1, (i * 7) % 256, (i * 13) % 256, 1),
                1 => format!("10.{}.{}.{}", (i * 3) % 256, (i * 5) % 256, (i * 11) % 256),
                2 => format!("2001:db8:{:x}::{:x}", i % 65536, (i * 7) % 65536),
                _ => format!("host-{i}"),
            };
            Record::new("conn")
                .with_tag("host", "bench")
                .with_field("src_ip", ip)
                .with_field("bytes", i as u64)
        })
        .collect()
}

fn rule() -> LookupRule {
    LookupRule {
        dest_country: "src_country".into(),
        dest_city: "src_city".into(),
        dest_lat: "src_lat".into(),
        dest_lon: "src_lon".into(),
        dest_asn: "src_asn".into(),
        dest_asnorg: "src_asnorg".into(),
        ..LookupRule::new("src_ip")
    }
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply");
    let enricher = GeoEnricher::with_readers(
        vec![rule()],
        Some(Box::new(SyntheticCity)),
        Some(Box::new(SyntheticAsn)),
    );
    let passthrough = GeoEnricher::with_readers(vec![rule()], None, None);

    for size in [100usize, 1_000, 10_000] {
        let records = generate_records(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("city_asn", size), &records, |b, r| {
            b.iter(|| enricher.apply(black_box(r.clone())))
        });
        group.bench_with_input(BenchmarkId::new("disabled", size), &records, |b, r| {
            b.iter(|| passthrough.apply(black_box(r.clone())))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_apply);
criterion_main!(benches);
