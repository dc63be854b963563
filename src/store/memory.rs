//! In-memory store loaded from CSV exports of the census tables.

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::{GeoFilter, GeoSession, GeoStore, YouthRow};
use crate::error::Result;
use crate::models::{GeoLevel, Geography, LevelDetail, Parents, DEFAULT_YEAR};

const GEOGRAPHIES_FILE: &str = "geographies.csv";
const POPULATION_FILE: &str = "population_group.csv";
const YOUTH_FILE: &str = "youth.csv";

/// Tables backing a [`MemoryStore`].
#[derive(Debug, Default)]
pub struct MemoryTables {
    /// Keyed by (level, year, code)
    geographies: BTreeMap<(GeoLevel, String, String), Geography>,
    population: HashMap<(GeoLevel, String), Vec<(String, f64)>>,
    youth: HashMap<(GeoLevel, String), YouthRow>,
}

impl MemoryTables {
    pub fn insert_geography(&mut self, geo: Geography) {
        let key = (geo.level, geo.year.clone(), geo.code.clone());
        self.geographies.insert(key, geo);
    }

    pub fn insert_population(&mut self, level: GeoLevel, code: &str, group: &str, total: f64) {
        self.population
            .entry((level, code.to_string()))
            .or_default()
            .push((group.to_string(), total));
    }

    pub fn insert_youth(&mut self, level: GeoLevel, code: &str, row: YouthRow) {
        self.youth.insert((level, code.to_string()), row);
    }

    fn in_year<'a>(
        &'a self,
        level: GeoLevel,
        year: &'a str,
    ) -> impl Iterator<Item = &'a Geography> + 'a {
        self.geographies
            .values()
            .filter(move |g| g.level == level && g.year == year)
    }
}

/// Store over immutable in-memory tables. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<MemoryTables>,
}

impl MemoryStore {
    pub fn new(tables: MemoryTables) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    /// Load `geographies.csv`, `population_group.csv` and `youth.csv` from a
    /// directory. Each file may instead be gzip-compressed (`.csv.gz`).
    /// Only the geographies file is required.
    pub fn load_dir(dir: &Path) -> AnyResult<Self> {
        info!("Loading census tables from {}", dir.display());

        let mut tables = MemoryTables::default();

        let geo_path = find_table(dir, GEOGRAPHIES_FILE)
            .with_context(|| format!("{} not found in {}", GEOGRAPHIES_FILE, dir.display()))?;
        for record in read_records::<GeographyRecord>(&geo_path)? {
            tables.insert_geography(record.into_geography());
        }

        if let Some(path) = find_table(dir, POPULATION_FILE) {
            for record in read_records::<PopulationRecord>(&path)? {
                tables.insert_population(
                    record.geo_level,
                    &record.geo_code,
                    &record.population_group,
                    record.total.unwrap_or(0.0),
                );
            }
        }

        if let Some(path) = find_table(dir, YOUTH_FILE) {
            for record in read_records::<YouthRecord>(&path)? {
                let (level, code) = (record.geo_level, record.geo_code.clone());
                tables.insert_youth(level, &code, record.into_row());
            }
        }

        info!(
            "Loaded {} geographies, population for {} geographies, youth rows for {}",
            tables.geographies.len(),
            tables.population.len(),
            tables.youth.len()
        );

        Ok(Self::new(tables))
    }
}

#[async_trait]
impl GeoStore for MemoryStore {
    async fn open_session(&self) -> Result<Box<dyn GeoSession>> {
        Ok(Box::new(MemorySession {
            tables: Arc::clone(&self.tables),
        }))
    }
}

struct MemorySession {
    tables: Arc<MemoryTables>,
}

#[async_trait]
impl GeoSession for MemorySession {
    async fn geography(
        &mut self,
        level: GeoLevel,
        code: &str,
        year: &str,
    ) -> Result<Option<Geography>> {
        let key = (level, year.to_string(), code.to_string());
        Ok(self.tables.geographies.get(&key).cloned())
    }

    async fn find_matching(
        &mut self,
        level: GeoLevel,
        filter: &GeoFilter,
        year: &str,
        limit: usize,
    ) -> Result<Vec<Geography>> {
        let found: Vec<Geography> = self
            .tables
            .in_year(level, year)
            .filter(|g| filter.matches(g))
            .take(limit)
            .cloned()
            .collect();
        debug!("{} {} records match {:?}", found.len(), level, filter);
        Ok(found)
    }

    async fn wards_for_subplaces(
        &mut self,
        filter: &GeoFilter,
        year: &str,
        limit: usize,
    ) -> Result<Vec<Geography>> {
        let tables = &self.tables;
        let wards: Vec<Geography> = tables
            .in_year(GeoLevel::Subplace, year)
            .filter(|s| filter.matches(s))
            .filter_map(|s| {
                let ward_code = s.parents.ward_code.as_ref()?;
                tables
                    .geographies
                    .get(&(GeoLevel::Ward, s.year.clone(), ward_code.clone()))
            })
            .take(limit)
            .cloned()
            .collect();
        debug!("{} wards own subplaces matching {:?}", wards.len(), filter);
        Ok(wards)
    }

    async fn population_groups(
        &mut self,
        level: GeoLevel,
        code: &str,
    ) -> Result<Vec<(String, f64)>> {
        Ok(self
            .tables
            .population
            .get(&(level, code.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn youth_row(&mut self, level: GeoLevel, code: &str) -> Result<Option<YouthRow>> {
        Ok(self.tables.youth.get(&(level, code.to_string())).cloned())
    }
}

#[derive(Debug, Deserialize)]
struct GeographyRecord {
    level: GeoLevel,
    code: String,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    name: Option<String>,
    long_name: String,
    #[serde(default)]
    square_kms: Option<f64>,
    #[serde(default)]
    ward_no: Option<i64>,
    #[serde(default)]
    subplace_name: Option<String>,
    #[serde(default)]
    mainplace_name: Option<String>,
    #[serde(default)]
    ward_code: Option<String>,
    #[serde(default)]
    municipality_code: Option<String>,
    #[serde(default)]
    district_code: Option<String>,
    #[serde(default)]
    province_code: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

impl GeographyRecord {
    fn into_geography(self) -> Geography {
        let detail = match self.level {
            GeoLevel::Ward => LevelDetail::Ward {
                ward_no: self.ward_no,
            },
            GeoLevel::Subplace => LevelDetail::Subplace {
                subplace_name: self.subplace_name,
                mainplace_name: self.mainplace_name,
            },
            _ => LevelDetail::None,
        };

        Geography {
            level: self.level,
            code: self.code,
            year: self.year.unwrap_or_else(|| DEFAULT_YEAR.to_string()),
            name: self.name,
            long_name: self.long_name,
            square_kms: self.square_kms,
            parents: Parents {
                ward_code: self.ward_code,
                municipality_code: self.municipality_code,
                district_code: self.district_code,
                province_code: self.province_code,
                country_code: self.country_code,
            },
            detail,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PopulationRecord {
    geo_level: GeoLevel,
    geo_code: String,
    population_group: String,
    total: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YouthRecord {
    geo_level: GeoLevel,
    geo_code: String,
    youth_pop: Option<f64>,
    youth_proportion: Option<f64>,
    edu_dep: Option<f64>,
    disab_dep: Option<f64>,
    light_dep: Option<f64>,
    heat_dep: Option<f64>,
    cook_dep: Option<f64>,
    toilet_dep: Option<f64>,
    water_dep: Option<f64>,
    dwell_dep: Option<f64>,
    asset_dep: Option<f64>,
    emp_dep: Option<f64>,
    neets_dep: Option<f64>,
    prop_multid_poor: Option<f64>,
    youth_mpi: Option<f64>,
}

impl YouthRecord {
    fn into_row(self) -> YouthRow {
        YouthRow {
            youth_pop: self.youth_pop,
            youth_prop: self.youth_proportion,
            edu_dep: self.edu_dep,
            disab_dep: self.disab_dep,
            light_dep: self.light_dep,
            heat_dep: self.heat_dep,
            cook_dep: self.cook_dep,
            toilet_dep: self.toilet_dep,
            water_dep: self.water_dep,
            dwell_dep: self.dwell_dep,
            asset_dep: self.asset_dep,
            emp_dep: self.emp_dep,
            neets_dep: self.neets_dep,
            prop_multid_poor: self.prop_multid_poor,
            youth_mpi: self.youth_mpi,
        }
    }
}

/// Locate `name` or `name.gz` in `dir`.
fn find_table(dir: &Path, name: &str) -> Option<PathBuf> {
    let plain = dir.join(name);
    if plain.is_file() {
        return Some(plain);
    }
    let gz = dir.join(format!("{}.gz", name));
    gz.is_file().then_some(gz)
}

fn read_records<T: DeserializeOwned>(path: &Path) -> AnyResult<Vec<T>> {
    debug!("Reading {}", path.display());

    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let mut records = Vec::new();
    for (i, result) in csv_reader.deserialize::<T>().enumerate() {
        let record: T =
            result.with_context(|| format!("Bad row {} in {}", i + 1, path.display()))?;
        records.push(record);
    }
    Ok(records)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_geography_lookup_by_year() {
        let store = fixtures::store();
        let mut session = store.open_session().await.unwrap();

        let current = session
            .geography(GeoLevel::Municipality, "CPT", DEFAULT_YEAR)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.long_name, "City of Cape Town");

        let old = session
            .geography(GeoLevel::Municipality, "CPT", "2006")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.long_name, "Cape Town Unicity");

        assert!(session
            .geography(GeoLevel::Province, "CPT", DEFAULT_YEAR)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_find_matching_respects_limit() {
        let store = fixtures::store();
        let mut session = store.open_session().await.unwrap();
        let filter = GeoFilter::Ward {
            code_prefix: String::new(),
            ward_no: None,
        };

        let all = session
            .find_matching(GeoLevel::Ward, &filter, DEFAULT_YEAR, 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 4);

        let two = session
            .find_matching(GeoLevel::Ward, &filter, DEFAULT_YEAR, 2)
            .await
            .unwrap();
        assert_eq!(two.len(), 2);
    }

    #[tokio::test]
    async fn test_wards_for_subplaces() {
        let store = fixtures::store();
        let mut session = store.open_session().await.unwrap();
        let filter = GeoFilter::Subplace {
            prefix: "Cape".to_string(),
            code: "Cape".to_string(),
        };

        let wards = session
            .wards_for_subplaces(&filter, DEFAULT_YEAR, 10)
            .await
            .unwrap();
        // Both subplaces sit in the same ward
        assert_eq!(wards.len(), 2);
        assert!(wards.iter().all(|w| w.code == "19100054"));
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();

        let mut geos = File::create(dir.path().join(GEOGRAPHIES_FILE)).unwrap();
        writeln!(
            geos,
            "level,code,year,name,long_name,square_kms,ward_no,subplace_name,mainplace_name,ward_code,municipality_code,district_code,province_code,country_code"
        )
        .unwrap();
        writeln!(geos, "country,ZA,2011,South Africa,South Africa,1220813,,,,,,,,").unwrap();
        writeln!(
            geos,
            "ward,19100005,,,Ward 5 (19100005),3.5,5,,,,CPT,,WC,ZA"
        )
        .unwrap();
        drop(geos);

        let mut youth = File::create(dir.path().join(YOUTH_FILE)).unwrap();
        writeln!(
            youth,
            "geo_level,geo_code,youth_pop,youth_proportion,edu_dep,disab_dep,light_dep,heat_dep,cook_dep,toilet_dep,water_dep,dwell_dep,asset_dep,emp_dep,neets_dep,prop_multid_poor,youth_mpi"
        )
        .unwrap();
        writeln!(youth, "country,ZA,100,0.2,0.1,,0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1").unwrap();
        drop(youth);

        let store = MemoryStore::load_dir(dir.path()).unwrap();
        let tables = &store.tables;

        let ward = tables
            .geographies
            .get(&(GeoLevel::Ward, DEFAULT_YEAR.to_string(), "19100005".to_string()))
            .unwrap();
        assert_eq!(ward.ward_no(), Some(5));
        assert_eq!(ward.name, None);
        assert_eq!(ward.parents.municipality_code.as_deref(), Some("CPT"));
        assert_eq!(ward.parents.district_code, None);

        let row = tables
            .youth
            .get(&(GeoLevel::Country, "ZA".to_string()))
            .unwrap();
        assert_eq!(row.youth_prop, Some(0.2));
        assert_eq!(row.disab_dep, None);
        assert!(tables.population.is_empty());
    }

    #[test]
    fn test_load_gzipped_geographies() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("geographies.csv.gz")).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        writeln!(encoder, "level,code,name,long_name").unwrap();
        writeln!(encoder, "province,WC,Western Cape,Western Cape").unwrap();
        encoder.finish().unwrap();

        let store = MemoryStore::load_dir(dir.path()).unwrap();
        assert_eq!(store.tables.geographies.len(), 1);
    }

    #[test]
    fn test_missing_geographies_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MemoryStore::load_dir(dir.path()).is_err());
    }
}
