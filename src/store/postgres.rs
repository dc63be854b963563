//! PostgreSQL-backed store.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use super::{escape_like, GeoFilter, GeoSession, GeoStore, YouthRow};
use crate::error::{GeoError, Result};
use crate::models::{GeoLevel, Geography, LevelDetail, Parents};

/// Schema SQL embedded at compile time
const CENSUS_SCHEMA: &str = include_str!("../../schema/census.sql");

/// Optional geography columns and their SQL type, in row order.
const OPTIONAL_COLUMNS: &[(&str, &str)] = &[
    ("name", "text"),
    ("ward_no", "int8"),
    ("subplace_name", "text"),
    ("mainplace_name", "text"),
    ("ward_code", "text"),
    ("municipality_code", "text"),
    ("district_code", "text"),
    ("province_code", "text"),
    ("country_code", "text"),
];

const YOUTH_COLUMNS: &[&str] = &[
    "youth_pop",
    "youth_proportion",
    "edu_dep",
    "disab_dep",
    "light_dep",
    "heat_dep",
    "cook_dep",
    "toilet_dep",
    "water_dep",
    "dwell_dep",
    "asset_dep",
    "emp_dep",
    "neets_dep",
    "prop_multid_poor",
    "youth_mpi",
];

fn has_column(level: GeoLevel, column: &str) -> bool {
    use GeoLevel::*;
    match column {
        "name" => !matches!(level, Ward | Subplace),
        "ward_no" => level == Ward,
        "subplace_name" | "mainplace_name" | "ward_code" => level == Subplace,
        "municipality_code" => matches!(level, Ward | Subplace),
        "district_code" => matches!(level, Municipality | Ward),
        "province_code" => !matches!(level, Country | Province),
        "country_code" => level != Country,
        _ => false,
    }
}

/// SELECT list giving every level's table the same row shape.
///
/// Columns a table lacks are projected as typed NULLs.
fn projection(level: GeoLevel, alias: &str) -> String {
    let mut columns = vec![
        format!("{alias}.code"),
        format!("{alias}.year"),
        format!("{alias}.long_name"),
        format!("{alias}.square_kms::float8 AS square_kms"),
    ];
    for (column, sql_type) in OPTIONAL_COLUMNS {
        if has_column(level, column) {
            columns.push(format!("{alias}.{column}::{sql_type} AS {column}"));
        } else {
            columns.push(format!("NULL::{sql_type} AS {column}"));
        }
    }
    columns.join(", ")
}

fn youth_projection() -> String {
    YOUTH_COLUMNS
        .iter()
        .map(|c| format!("{c}::float8 AS {c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Append the WHERE condition for `filter` on the table aliased `alias`.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &GeoFilter, alias: &str) {
    match filter {
        GeoFilter::Name { prefix, code } => {
            let prefix = escape_like(prefix);
            builder.push(format!("({alias}.name ILIKE "));
            builder.push_bind(format!("{}%", prefix));
            builder.push(format!(" OR {alias}.name ILIKE "));
            builder.push_bind(format!("{}%", GeoFilter::city_prefix(&prefix)));
            builder.push(format!(" OR {alias}.code = "));
            builder.push_bind(code.clone());
            builder.push(")");
        }
        GeoFilter::Ward {
            code_prefix,
            ward_no,
        } => {
            builder.push(format!("({alias}.code LIKE "));
            builder.push_bind(format!("{}%", escape_like(code_prefix)));
            if let Some(no) = ward_no {
                builder.push(format!(" OR {alias}.ward_no = "));
                builder.push_bind(*no);
            }
            builder.push(")");
        }
        GeoFilter::Subplace { prefix, code } => {
            let prefix = escape_like(prefix);
            builder.push(format!("({alias}.subplace_name ILIKE "));
            builder.push_bind(format!("{}%", prefix));
            builder.push(format!(" OR {alias}.subplace_name ILIKE "));
            builder.push_bind(format!("{}%", GeoFilter::city_prefix(&prefix)));
            builder.push(format!(" OR {alias}.mainplace_name ILIKE "));
            builder.push_bind(format!("{}%", prefix));
            builder.push(format!(" OR {alias}.code = "));
            builder.push_bind(code.clone());
            builder.push(")");
        }
    }
}

/// Records of `level` in `year` matching `filter`, ordered by code so the
/// limited subset is stable.
fn matching_query<'a>(
    level: GeoLevel,
    filter: &GeoFilter,
    year: &'a str,
    limit: usize,
) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM {} g WHERE g.year = ",
        projection(level, "g"),
        level.table_name()
    ));
    builder.push_bind(year);
    builder.push(" AND ");
    push_filter(&mut builder, filter, "g");
    builder.push(" ORDER BY g.code LIMIT ");
    builder.push_bind(limit as i64);
    builder
}

/// Wards owning the subplaces that match `filter`, ordered by ward code.
fn subplace_wards_query<'a>(
    filter: &GeoFilter,
    year: &'a str,
    limit: usize,
) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM ward w JOIN subplace s ON s.ward_code = w.code AND s.year = w.year \
         WHERE s.year = ",
        projection(GeoLevel::Ward, "w"),
    ));
    builder.push_bind(year);
    builder.push(" AND ");
    push_filter(&mut builder, filter, "s");
    builder.push(" ORDER BY w.code LIMIT ");
    builder.push_bind(limit as i64);
    builder
}

#[derive(Debug, sqlx::FromRow)]
struct GeographyRow {
    code: String,
    year: String,
    long_name: String,
    square_kms: Option<f64>,
    name: Option<String>,
    ward_no: Option<i64>,
    subplace_name: Option<String>,
    mainplace_name: Option<String>,
    ward_code: Option<String>,
    municipality_code: Option<String>,
    district_code: Option<String>,
    province_code: Option<String>,
    country_code: Option<String>,
}

impl GeographyRow {
    fn into_geography(self, level: GeoLevel) -> Geography {
        let detail = match level {
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
            level,
            code: self.code,
            year: self.year,
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

/// Store over a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        Ok(Self::new(pool))
    }

    /// Create any missing census tables.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(CENSUS_SCHEMA)
            .execute(&self.pool)
            .await
            .context("Failed to apply census schema")?;
        info!("Census schema is in place");
        Ok(())
    }
}

#[async_trait]
impl GeoStore for PgStore {
    async fn open_session(&self) -> Result<Box<dyn GeoSession>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgSession { conn }))
    }
}

/// Holds one pooled connection; returned to the pool on drop.
struct PgSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl GeoSession for PgSession {
    async fn geography(
        &mut self,
        level: GeoLevel,
        code: &str,
        year: &str,
    ) -> Result<Option<Geography>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM {} g WHERE g.code = ",
            projection(level, "g"),
            level.table_name()
        ));
        builder.push_bind(code);
        builder.push(" AND g.year = ");
        builder.push_bind(year);

        let row = builder
            .build_query_as::<GeographyRow>()
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row.map(|r| r.into_geography(level)))
    }

    async fn find_matching(
        &mut self,
        level: GeoLevel,
        filter: &GeoFilter,
        year: &str,
        limit: usize,
    ) -> Result<Vec<Geography>> {
        if filter.target_level().is_some_and(|l| l != level) {
            return Err(GeoError::Data(format!(
                "{:?} cannot be applied to {}",
                filter, level
            )));
        }

        let mut builder = matching_query(level, filter, year, limit);
        debug!("{} search: {}", level, builder.sql());

        let rows = builder
            .build_query_as::<GeographyRow>()
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows.into_iter().map(|r| r.into_geography(level)).collect())
    }

    async fn wards_for_subplaces(
        &mut self,
        filter: &GeoFilter,
        year: &str,
        limit: usize,
    ) -> Result<Vec<Geography>> {
        let mut builder = subplace_wards_query(filter, year, limit);
        debug!("subplace search: {}", builder.sql());

        let rows = builder
            .build_query_as::<GeographyRow>()
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| r.into_geography(GeoLevel::Ward))
            .collect())
    }

    async fn population_groups(
        &mut self,
        level: GeoLevel,
        code: &str,
    ) -> Result<Vec<(String, f64)>> {
        let rows: Vec<(String, Option<f64>)> = sqlx::query_as(
            "SELECT population_group, total::float8 FROM population_group \
             WHERE geo_level = $1 AND geo_code = $2 ORDER BY population_group",
        )
        .bind(level.as_str())
        .bind(code)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(group, total)| (group, total.unwrap_or(0.0)))
            .collect())
    }

    async fn youth_row(&mut self, level: GeoLevel, code: &str) -> Result<Option<YouthRow>> {
        let sql = format!(
            "SELECT {} FROM youth WHERE geo_level = $1 AND geo_code = $2",
            youth_projection()
        );
        let row = sqlx::query_as::<_, YouthRow>(&sql)
            .bind(level.as_str())
            .bind(code)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn test_projection_fills_missing_columns() {
        let sql = projection(GeoLevel::Ward, "w");
        assert!(sql.starts_with("w.code, w.year, w.long_name"));
        assert!(sql.contains("NULL::text AS name"));
        assert!(sql.contains("w.ward_no::int8 AS ward_no"));
        assert!(sql.contains("w.municipality_code::text AS municipality_code"));
        assert!(sql.contains("NULL::text AS subplace_name"));

        let country = projection(GeoLevel::Country, "g");
        assert!(country.contains("g.name::text AS name"));
        assert!(country.contains("NULL::text AS country_code"));

        let province = projection(GeoLevel::Province, "g");
        assert!(province.contains("NULL::text AS province_code"));
        assert!(province.contains("g.country_code::text AS country_code"));
    }

    /// Column names of every table in the embedded schema.
    fn schema_columns() -> HashMap<String, HashSet<String>> {
        CENSUS_SCHEMA
            .split("CREATE TABLE IF NOT EXISTS ")
            .skip(1)
            .map(|block| {
                let table = block.split_whitespace().next().unwrap().to_string();
                let body = &block[block.find('(').unwrap() + 1..];
                let columns = body
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with("PRIMARY") && !l.starts_with(')'))
                    .filter_map(|l| l.split_whitespace().next())
                    .map(String::from)
                    .collect();
                (table, columns)
            })
            .collect()
    }

    #[test]
    fn test_projection_matches_schema() {
        let tables = schema_columns();

        for level in GeoLevel::all() {
            let columns = &tables[level.table_name()];
            for required in ["code", "year", "long_name", "square_kms"] {
                assert!(columns.contains(required), "{}.{}", level, required);
            }
            for (column, _) in OPTIONAL_COLUMNS {
                assert_eq!(
                    has_column(*level, column),
                    columns.contains(*column),
                    "{}.{}",
                    level,
                    column
                );
            }
        }

        let youth = &tables["youth"];
        for column in YOUTH_COLUMNS {
            assert!(youth.contains(*column), "youth.{}", column);
        }
    }

    #[test]
    fn test_limited_queries_are_ordered() {
        let filter = GeoFilter::Name {
            prefix: "cape".to_string(),
            code: "CAPE".to_string(),
        };
        let builder = matching_query(GeoLevel::Province, &filter, "2011", 10);
        assert!(builder.sql().starts_with("SELECT g.code, g.year"));
        assert!(builder.sql().contains("FROM province g WHERE g.year = $1 AND ("));
        assert!(builder.sql().ends_with(" ORDER BY g.code LIMIT $5"));

        let filter = GeoFilter::Subplace {
            prefix: "cape".to_string(),
            code: "cape".to_string(),
        };
        let builder = subplace_wards_query(&filter, "2011", 10);
        assert!(builder.sql().contains("JOIN subplace s ON s.ward_code = w.code"));
        assert!(builder.sql().ends_with(" ORDER BY w.code LIMIT $6"));
    }

    #[test]
    fn test_every_projection_has_same_width() {
        for level in GeoLevel::all() {
            let columns = projection(*level, "g").split(", ").count();
            assert_eq!(columns, 4 + OPTIONAL_COLUMNS.len());
        }
    }

    #[test]
    fn test_name_filter_sql() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM province g WHERE ");
        let filter = GeoFilter::Name {
            prefix: "50%".to_string(),
            code: "50%".to_string(),
        };
        push_filter(&mut builder, &filter, "g");
        assert_eq!(
            builder.sql(),
            "SELECT 1 FROM province g WHERE (g.name ILIKE $1 OR g.name ILIKE $2 OR g.code = $3)"
        );
    }

    #[test]
    fn test_ward_filter_sql_without_number() {
        let mut builder = QueryBuilder::<Postgres>::new("");
        let filter = GeoFilter::Ward {
            code_prefix: "abc".to_string(),
            ward_no: None,
        };
        push_filter(&mut builder, &filter, "g");
        assert_eq!(builder.sql(), "(g.code LIKE $1)");
    }

    #[test]
    fn test_youth_projection_casts() {
        let sql = youth_projection();
        assert!(sql.starts_with("youth_pop::float8 AS youth_pop"));
        assert!(sql.contains("youth_proportion::float8 AS youth_proportion"));
        assert_eq!(sql.split(", ").count(), 15);
    }
}
