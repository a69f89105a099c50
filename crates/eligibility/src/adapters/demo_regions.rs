// Rust guideline compliant 2026-10-17

//! Offline `RegionLookup` adapter for the demo binary.
//!
//! Serves a small fixed slice of the Indonesian region hierarchy so the demo
//! runs without network access. Unknown endpoints fail like an unreachable
//! API would, which exercises the resolver's raw-code fallback.

use domain::{LookupError, Region, RegionLookup};

/// `(endpoint, [(id, name)])` pairs served by [`DemoRegionLookup`].
const TABLE: &[(&str, &[(&str, &str)])] = &[
    ("provinces.json", &[("11", "ACEH"), ("31", "DKI JAKARTA"), ("33", "JAWA TENGAH")]),
    ("regencies/11.json", &[("1101", "KAB. SIMEULUE"), ("1171", "KOTA BANDA ACEH")]),
    ("regencies/31.json", &[("3171", "KOTA JAKARTA SELATAN")]),
    ("regencies/33.json", &[("3374", "KOTA SEMARANG")]),
    ("districts/1101.json", &[("1101010", "TEUPAH SELATAN")]),
    ("districts/1171.json", &[("1171010", "MEURAXA")]),
    ("districts/3171.json", &[("3171010", "JAGAKARSA")]),
    ("districts/3374.json", &[("3374010", "SEMARANG TENGAH")]),
    ("villages/1101010.json", &[("1101010001", "LATIUNG")]),
    ("villages/1171010.json", &[("1171010001", "DEAH GLUMPANG")]),
    ("villages/3171010.json", &[("3171010001", "CIPEDAK")]),
    ("villages/3374010.json", &[("3374010001", "PEKUNDEN")]),
];

/// Location codes known to the demo table, `(province, regency, district, village)`.
pub const DEMO_LOCATIONS: &[(&str, &str, &str, &str)] = &[
    ("11", "1101", "1101010", "1101010001"),
    ("11", "1171", "1171010", "1171010001"),
    ("31", "3171", "3171010", "3171010001"),
    ("33", "3374", "3374010", "3374010001"),
    // Not in the table: resolves to raw codes.
    ("35", "3578", "3578010", "3578010001"),
];

/// `RegionLookup` adapter serving [`TABLE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoRegionLookup;

impl RegionLookup for DemoRegionLookup {
    async fn fetch(&self, endpoint: &str) -> Result<Vec<Region>, LookupError> {
        TABLE
            .iter()
            .find(|(key, _)| *key == endpoint)
            .map(|(_, rows)| {
                rows.iter()
                    .map(|(id, name)| Region { id: (*id).to_owned(), name: (*name).to_owned() })
                    .collect()
            })
            .ok_or_else(|| LookupError::Unavailable { reason: format!("no demo data for {endpoint}") })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{DEMO_LOCATIONS, DemoRegionLookup};
    use domain::{LookupError, RegionLookup as _};

    #[tokio::test]
    async fn known_endpoint_lists_regions() {
        let provinces = DemoRegionLookup.fetch("provinces.json").await.unwrap();
        assert!(provinces.iter().any(|r| r.id == "11" && r.name == "ACEH"));
    }

    #[tokio::test]
    async fn unknown_endpoint_is_unavailable() {
        assert!(matches!(
            DemoRegionLookup.fetch("regencies/35.json").await,
            Err(LookupError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn every_listed_location_but_the_last_resolves_fully() {
        for &(province, regency, district, village) in &DEMO_LOCATIONS[..DEMO_LOCATIONS.len() - 1] {
            for (endpoint, code) in [
                ("provinces.json".to_owned(), province),
                (format!("regencies/{province}.json"), regency),
                (format!("districts/{regency}.json"), district),
                (format!("villages/{district}.json"), village),
            ] {
                let rows = DemoRegionLookup.fetch(&endpoint).await.unwrap();
                assert!(rows.iter().any(|r| r.id == code), "{code} missing from {endpoint}");
            }
        }
    }
}
