//! SQLite-backed catalog repository.
//!
//! One connection behind a mutex. Statements are short and synchronous, so
//! callers on an async runtime can use the repository directly.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use barkeep_core::{
    Amount, CandidateQuery, CatalogRecord, CatalogRepository, CatalogStats, CoreError,
    CostCalculation, IngredientKind, PriceHistoryEntry, Recipe, RecipeIngredient,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::StoreError;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS catalog_records (
    external_id       TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    brand             TEXT,
    category          TEXT,
    subcategory       TEXT,
    volume_ml         REAL,
    abv_percent       REAL,
    current_price     REAL,
    regular_price     REAL,
    country_of_origin TEXT,
    url               TEXT,
    last_seen_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_catalog_category ON catalog_records(category);

CREATE TABLE IF NOT EXISTS price_history (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id   TEXT NOT NULL REFERENCES catalog_records(external_id) ON DELETE CASCADE,
    price         REAL NOT NULL,
    regular_price REAL,
    observed_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_price_history_record ON price_history(external_id);

CREATE TABLE IF NOT EXISTS recipes (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL UNIQUE,
    category        TEXT,
    serving_size_ml REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS recipe_ingredients (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    recipe_id         INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    position          INTEGER NOT NULL,
    display_text      TEXT NOT NULL,
    amount_ml         REAL,
    amount_count      REAL,
    unit              TEXT NOT NULL,
    kind              TEXT NOT NULL,
    alcohol_type_hint TEXT,
    category_hint     TEXT,
    min_abv_percent   REAL,
    brand_preference  TEXT
);
CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);

CREATE TABLE IF NOT EXISTS cost_calculations (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    recipe_name      TEXT NOT NULL,
    tier             TEXT NOT NULL,
    total_cost       REAL NOT NULL,
    unresolved_count INTEGER NOT NULL,
    computed_at      TEXT NOT NULL,
    payload          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cost_calculations_recipe ON cost_calculations(recipe_name);
";

const RECORD_COLUMNS: &str = "external_id, name, brand, category, subcategory, volume_ml, \
     abv_percent, current_price, regular_price, country_of_origin, url, last_seen_at";

// ============================================================================
// Row Mapping
// ============================================================================

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogRecord> {
    Ok(CatalogRecord {
        external_id: row.get(0)?,
        name: row.get(1)?,
        brand: row.get(2)?,
        category: row.get(3)?,
        subcategory: row.get(4)?,
        volume_ml: row.get(5)?,
        abv_percent: row.get(6)?,
        current_price: row.get(7)?,
        regular_price: row.get(8)?,
        country_of_origin: row.get(9)?,
        url: row.get(10)?,
        last_seen_at: timestamp(row, 11)?,
    })
}

fn ingredient_from_row(row: &Row<'_>) -> rusqlite::Result<RecipeIngredient> {
    let amount_ml: Option<f64> = row.get(1)?;
    let amount_count: Option<f64> = row.get(2)?;
    let amount = match (amount_ml, amount_count) {
        (Some(ml), _) => Amount::Millilitres(ml),
        (None, Some(count)) => Amount::Count(count),
        (None, None) => Amount::Millilitres(0.0),
    };
    let kind: String = row.get(4)?;
    let kind = kind
        .parse::<IngredientKind>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(RecipeIngredient {
        display_text: row.get(0)?,
        amount,
        unit: row.get(3)?,
        kind,
        alcohol_type_hint: row.get(5)?,
        category_hint: row.get(6)?,
        min_abv_percent: row.get(7)?,
        brand_preference: row.get(8)?,
    })
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// ============================================================================
// Export
// ============================================================================

/// Everything in the database, for JSON export.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogExport {
    /// When the export was taken.
    pub exported_at: DateTime<Utc>,
    /// Aggregate counts.
    pub stats: CatalogStats,
    /// All catalog records.
    pub records: Vec<CatalogRecord>,
    /// All recipes.
    pub recipes: Vec<Recipe>,
}

// ============================================================================
// Repository
// ============================================================================

/// SQLite implementation of [`CatalogRepository`].
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Opens (or creates) a database file and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened catalog database");
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Inserts or updates a record.
    ///
    /// Prices are normalized first. Returns `true` if the record is new or
    /// either price changed.
    #[instrument(skip(self, record), fields(external_id = %record.external_id))]
    pub fn upsert_record(&self, record: &CatalogRecord) -> Result<bool, StoreError> {
        let mut record = record.clone();
        record.normalize_prices();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let previous: Option<(Option<f64>, Option<f64>)> = tx
            .query_row(
                "SELECT current_price, regular_price FROM catalog_records WHERE external_id = ?1",
                [&record.external_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        tx.execute(
            "INSERT INTO catalog_records (external_id, name, brand, category, subcategory,
                 volume_ml, abv_percent, current_price, regular_price, country_of_origin, url,
                 last_seen_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(external_id) DO UPDATE SET
                 name = excluded.name,
                 brand = excluded.brand,
                 category = excluded.category,
                 subcategory = excluded.subcategory,
                 volume_ml = excluded.volume_ml,
                 abv_percent = excluded.abv_percent,
                 current_price = excluded.current_price,
                 regular_price = excluded.regular_price,
                 country_of_origin = excluded.country_of_origin,
                 url = excluded.url,
                 last_seen_at = excluded.last_seen_at",
            params![
                record.external_id,
                record.name,
                record.brand,
                record.category,
                record.subcategory,
                record.volume_ml,
                record.abv_percent,
                record.current_price,
                record.regular_price,
                record.country_of_origin,
                record.url,
                record.last_seen_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        let changed = previous.is_none_or(|(current, regular)| {
            current != record.current_price || regular != record.regular_price
        });
        debug!(is_new = previous.is_none(), changed, "Upserted record");
        Ok(changed)
    }

    /// Appends a price observation.
    pub fn append_price(&self, entry: &PriceHistoryEntry) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO price_history (external_id, price, regular_price, observed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.external_id,
                entry.price,
                entry.regular_price,
                entry.observed_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Returns one record by external id.
    pub fn get_catalog_record(&self, external_id: &str) -> Result<Option<CatalogRecord>, StoreError> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM catalog_records WHERE external_id = ?1"),
                [external_id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Lists records, optionally filtered by category and a name/brand search.
    ///
    /// Ordered by category, then name.
    pub fn list_catalog_records(
        &self,
        category: Option<&str>,
        search: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogRecord>, StoreError> {
        let mut clauses = Vec::new();
        let mut values: Vec<String> = Vec::new();
        if let Some(category) = category {
            values.push(category.to_string());
            clauses.push(format!("category = ?{} COLLATE NOCASE", values.len()));
        }
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            values.push(format!("%{}%", search.to_lowercase()));
            let n = values.len();
            clauses.push(format!(
                "(lower(name) LIKE ?{n} OR lower(coalesce(brand, '')) LIKE ?{n})"
            ));
        }

        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM catalog_records");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY category, name, external_id");
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", to_i64(limit)));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Returns the price history of a record, oldest first.
    pub fn price_history(&self, external_id: &str) -> Result<Vec<PriceHistoryEntry>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT external_id, price, regular_price, observed_at FROM price_history
             WHERE external_id = ?1 ORDER BY observed_at, id",
        )?;
        let entries = stmt
            .query_map([external_id], |row| {
                Ok(PriceHistoryEntry {
                    external_id: row.get(0)?,
                    price: row.get(1)?,
                    regular_price: row.get(2)?,
                    observed_at: timestamp(row, 3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Returns records that could match a candidate query, by external id.
    pub fn candidates(&self, hint: &CandidateQuery) -> Result<Vec<CatalogRecord>, StoreError> {
        if hint.is_empty() {
            return Ok(Vec::new());
        }

        let mut clauses = Vec::new();
        let mut values: Vec<String> = Vec::new();
        for keyword in &hint.keywords {
            values.push(format!("%{}%", keyword.to_lowercase()));
            let n = values.len();
            clauses.push(format!(
                "lower(name) LIKE ?{n} OR lower(coalesce(brand, '')) LIKE ?{n} \
                 OR lower(coalesce(subcategory, '')) LIKE ?{n}"
            ));
        }
        for category in &hint.categories {
            values.push(category.clone());
            clauses.push(format!("category = ?{} COLLATE NOCASE", values.len()));
        }

        let mut sql = format!(
            "SELECT {RECORD_COLUMNS} FROM catalog_records WHERE {} ORDER BY external_id",
            clauses.join(" OR ")
        );
        if let Some(limit) = hint.limit {
            sql.push_str(&format!(" LIMIT {}", to_i64(limit)));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            keywords = hint.keywords.len(),
            found = records.len(),
            "Queried candidates"
        );
        Ok(records)
    }

    // ========================================================================
    // Recipes
    // ========================================================================

    /// Saves a recipe, replacing any recipe with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidData`] if the recipe fails validation.
    #[instrument(skip(self, recipe), fields(recipe = %recipe.name))]
    pub fn save_recipe(&self, recipe: &Recipe) -> Result<(), StoreError> {
        recipe.validate()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM recipes WHERE name = ?1", [&recipe.name])?;
        tx.execute(
            "INSERT INTO recipes (name, category, serving_size_ml) VALUES (?1, ?2, ?3)",
            params![recipe.name, recipe.category, recipe.serving_size_ml],
        )?;
        let recipe_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO recipe_ingredients (recipe_id, position, display_text, amount_ml,
                     amount_count, unit, kind, alcohol_type_hint, category_hint,
                     min_abv_percent, brand_preference)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (position, ingredient) in recipe.ingredients.iter().enumerate() {
                let (amount_ml, amount_count) = match ingredient.amount {
                    Amount::Millilitres(ml) => (Some(ml), None),
                    Amount::Count(count) => (None, Some(count)),
                };
                stmt.execute(params![
                    recipe_id,
                    to_i64(position),
                    ingredient.display_text,
                    amount_ml,
                    amount_count,
                    ingredient.unit,
                    ingredient.kind.to_string(),
                    ingredient.alcohol_type_hint,
                    ingredient.category_hint,
                    ingredient.min_abv_percent,
                    ingredient.brand_preference,
                ])?;
            }
        }
        tx.commit()?;

        debug!(ingredients = recipe.ingredients.len(), "Saved recipe");
        Ok(())
    }

    /// Loads a recipe by name.
    pub fn get_recipe(&self, name: &str) -> Result<Option<Recipe>, StoreError> {
        let conn = self.conn()?;
        let header: Option<(i64, String, Option<String>, f64)> = conn
            .query_row(
                "SELECT id, name, category, serving_size_ml FROM recipes WHERE name = ?1",
                [name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        let Some((id, name, category, serving_size_ml)) = header else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT display_text, amount_ml, amount_count, unit, kind, alcohol_type_hint,
                    category_hint, min_abv_percent, brand_preference
             FROM recipe_ingredients WHERE recipe_id = ?1 ORDER BY position",
        )?;
        let ingredients = stmt
            .query_map([id], ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Recipe {
            name,
            category,
            serving_size_ml,
            ingredients,
        }))
    }

    /// Deletes a recipe and its ingredients. Returns `false` if it did not exist.
    pub fn delete_recipe(&self, name: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM recipes WHERE name = ?1", [name])?;
        Ok(deleted > 0)
    }

    /// Returns every recipe, ordered by name.
    pub fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        let names: Vec<String> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare("SELECT name FROM recipes ORDER BY name")?;
            stmt.query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?
        };
        let mut recipes = Vec::with_capacity(names.len());
        for name in names {
            if let Some(recipe) = self.get_recipe(&name)? {
                recipes.push(recipe);
            }
        }
        Ok(recipes)
    }

    // ========================================================================
    // Cost Calculations
    // ========================================================================

    /// Appends a cost calculation.
    pub fn append_cost(&self, calculation: &CostCalculation) -> Result<(), StoreError> {
        let payload = serde_json::to_string(calculation)?;
        self.conn()?.execute(
            "INSERT INTO cost_calculations (recipe_name, tier, total_cost, unresolved_count,
                 computed_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                calculation.recipe_name,
                calculation.tier.to_string(),
                calculation.total_cost,
                to_i64(calculation.unresolved_count),
                calculation.computed_at.to_rfc3339(),
                payload,
            ],
        )?;
        Ok(())
    }

    /// Returns stored calculations for a recipe, most recent first.
    pub fn cost_history(
        &self,
        recipe_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CostCalculation>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT payload FROM cost_calculations WHERE recipe_name = ?1
             ORDER BY computed_at DESC, id DESC LIMIT ?2",
        )?;
        let payloads = stmt
            .query_map(params![recipe_name, limit.map_or(-1, to_i64)], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|p| {
                serde_json::from_str(p).map_err(|e| StoreError::CorruptRow {
                    table: "cost_calculations",
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    // ========================================================================
    // Stats & Export
    // ========================================================================

    /// Returns aggregate counts.
    pub fn catalog_stats(&self) -> Result<CatalogStats, StoreError> {
        let conn = self.conn()?;
        let count = |sql: &str| -> Result<usize, StoreError> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or_default())
        };

        let mut stats = CatalogStats {
            total_records: count("SELECT COUNT(*) FROM catalog_records")?,
            on_sale: count(
                "SELECT COUNT(*) FROM catalog_records WHERE current_price < regular_price",
            )?,
            price_history_entries: count("SELECT COUNT(*) FROM price_history")?,
            recipes: count("SELECT COUNT(*) FROM recipes")?,
            cost_calculations: count("SELECT COUNT(*) FROM cost_calculations")?,
            ..CatalogStats::default()
        };

        let mut stmt = conn.prepare(
            "SELECT coalesce(category, 'Uncategorized'), COUNT(*) FROM catalog_records
             GROUP BY 1",
        )?;
        for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))? {
            let (category, n) = row?;
            stats
                .by_category
                .insert(category, usize::try_from(n).unwrap_or_default());
        }

        let last: Option<String> =
            conn.query_row("SELECT MAX(last_seen_at) FROM catalog_records", [], |row| {
                row.get(0)
            })?;
        stats.last_crawled_at = last
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|t| t.with_timezone(&Utc));
        Ok(stats)
    }

    /// Returns everything in the database.
    pub fn export(&self) -> Result<CatalogExport, StoreError> {
        Ok(CatalogExport {
            exported_at: Utc::now(),
            stats: self.catalog_stats()?,
            records: self.list_catalog_records(None, None, None)?,
            recipes: self.list_recipes()?,
        })
    }
}

impl std::fmt::Debug for SqliteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRepository").finish_non_exhaustive()
    }
}

impl CatalogRepository for SqliteRepository {
    fn upsert_catalog_record(&self, record: &CatalogRecord) -> Result<bool, CoreError> {
        Ok(self.upsert_record(record)?)
    }

    fn append_price_history(&self, entry: &PriceHistoryEntry) -> Result<(), CoreError> {
        Ok(self.append_price(entry)?)
    }

    fn load_recipe(&self, name: &str) -> Result<Option<Recipe>, CoreError> {
        Ok(self.get_recipe(name)?)
    }

    fn append_cost_calculation(&self, calculation: &CostCalculation) -> Result<(), CoreError> {
        Ok(self.append_cost(calculation)?)
    }

    fn query_candidates(&self, hint: &CandidateQuery) -> Result<Vec<CatalogRecord>, CoreError> {
        Ok(self.candidates(hint)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barkeep_core::{CostTier, Resolution};

    fn repo() -> SqliteRepository {
        SqliteRepository::open_in_memory().unwrap()
    }

    fn gin(price: f64) -> CatalogRecord {
        CatalogRecord::new("g1", "Tanqueray London Dry Gin")
            .with_brand("Tanqueray")
            .with_category("Spirits")
            .with_subcategory("Gin")
            .with_volume_ml(750.0)
            .with_abv(47.3)
            .with_price(price)
    }

    fn negroni() -> Recipe {
        Recipe::new("Negroni")
            .with_category("Classic")
            .with_serving_size(90.0)
            .with_ingredient(
                RecipeIngredient::new("30ml Gin", Amount::Millilitres(30.0), "ml")
                    .with_alcohol_type("gin")
                    .with_min_abv(40.0),
            )
            .with_ingredient(
                RecipeIngredient::new("1 Orange Peel", Amount::Count(1.0), "whole")
                    .with_kind(IngredientKind::Garnish),
            )
    }

    #[test]
    fn test_upsert_reports_changes() {
        let repo = repo();
        assert!(repo.upsert_record(&gin(34.95)).unwrap());
        assert!(!repo.upsert_record(&gin(34.95)).unwrap());
        assert!(repo.upsert_record(&gin(32.95)).unwrap());

        let stored = repo.get_catalog_record("g1").unwrap().unwrap();
        assert_eq!(stored.current_price, Some(32.95));
        assert_eq!(stored.abv_percent, Some(47.3));
    }

    #[test]
    fn test_upsert_normalizes_prices() {
        let repo = repo();
        let mut record = gin(30.0);
        record.regular_price = Some(20.0);
        repo.upsert_record(&record).unwrap();
        let stored = repo.get_catalog_record("g1").unwrap().unwrap();
        assert_eq!(stored.regular_price, Some(30.0));
    }

    #[test]
    fn test_recipe_roundtrip() {
        let repo = repo();
        repo.save_recipe(&negroni()).unwrap();
        assert_eq!(repo.get_recipe("Negroni").unwrap(), Some(negroni()));
        assert_eq!(repo.get_recipe("Martini").unwrap(), None);
    }

    #[test]
    fn test_save_recipe_replaces() {
        let repo = repo();
        repo.save_recipe(&negroni()).unwrap();
        repo.save_recipe(&negroni().with_serving_size(100.0)).unwrap();
        let recipes = repo.list_recipes().unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].serving_size_ml, 100.0);
        assert_eq!(recipes[0].ingredients.len(), 2);
    }

    #[test]
    fn test_save_recipe_validates() {
        let err = repo().save_recipe(&Recipe::new("Empty")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[test]
    fn test_delete_recipe_cascades() {
        let repo = repo();
        repo.save_recipe(&negroni()).unwrap();
        assert!(repo.delete_recipe("Negroni").unwrap());
        assert!(!repo.delete_recipe("Negroni").unwrap());

        let orphans: i64 = repo
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM recipe_ingredients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_candidates() {
        let repo = repo();
        repo.upsert_record(&gin(34.95)).unwrap();
        repo.upsert_record(
            &CatalogRecord::new("v1", "Absolut")
                .with_category("Spirits")
                .with_subcategory("Vodka"),
        )
        .unwrap();
        repo.upsert_record(&CatalogRecord::new("w1", "Pinot Noir").with_category("Wine"))
            .unwrap();

        let found = repo.candidates(&CandidateQuery::new(["gin"])).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].external_id, "g1");

        let found = repo.candidates(&CandidateQuery::new(["vodka"])).unwrap();
        assert_eq!(found[0].external_id, "v1");

        let found = repo
            .candidates(&CandidateQuery::new(Vec::<String>::new()).with_category("wine"))
            .unwrap();
        assert_eq!(found.len(), 1);

        let found = repo
            .candidates(&CandidateQuery::new(["o"]).with_limit(2))
            .unwrap();
        assert_eq!(found.len(), 2);

        assert!(repo.candidates(&CandidateQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn test_cost_history_most_recent_first() {
        let repo = repo();
        let mut calc = CostCalculation {
            recipe_name: "Negroni".into(),
            tier: CostTier::MidRange,
            breakdown: vec![barkeep_core::IngredientCostBreakdown {
                display_text: "30ml Gin".into(),
                kind: IngredientKind::Alcohol,
                amount_ml: Some(30.0),
                resolution: Resolution::Unresolved,
                item_cost: None,
                savings_amount: None,
                tier_fallback: false,
            }],
            total_cost: 1.0,
            unresolved_count: 1,
            total_savings: 0.0,
            markup_multiplier: 3.0,
            suggested_price: 3.0,
            margin: 2.0,
            cost_per_ml: None,
            computed_at: Utc::now(),
        };
        repo.append_cost(&calc).unwrap();
        calc.total_cost = 2.0;
        calc.computed_at += chrono::Duration::seconds(1);
        repo.append_cost(&calc).unwrap();

        let history = repo.cost_history("Negroni", None).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].total_cost, 2.0);
        assert_eq!(history[1].breakdown[0].resolution, Resolution::Unresolved);
        assert_eq!(repo.cost_history("Negroni", Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_stats_and_price_history() {
        let repo = repo();
        let record = gin(34.95);
        repo.upsert_record(&record).unwrap();
        repo.append_price(&PriceHistoryEntry::from_record(&record).unwrap())
            .unwrap();
        repo.upsert_record(
            &CatalogRecord::new("w1", "Prosecco")
                .with_category("Wine")
                .with_sale_price(15.0, 18.0),
        )
        .unwrap();
        repo.save_recipe(&negroni()).unwrap();

        let stats = repo.catalog_stats().unwrap();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.on_sale, 1);
        assert_eq!(stats.price_history_entries, 1);
        assert_eq!(stats.recipes, 1);
        assert_eq!(stats.by_category.get("Spirits"), Some(&1));
        assert!(stats.last_crawled_at.is_some());

        let history = repo.price_history("g1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price, 34.95);
    }

    #[test]
    fn test_list_catalog_records_filters() {
        let repo = repo();
        repo.upsert_record(&gin(34.95)).unwrap();
        repo.upsert_record(&CatalogRecord::new("w1", "Pinot Noir").with_category("Wine"))
            .unwrap();

        assert_eq!(repo.list_catalog_records(None, None, None).unwrap().len(), 2);
        assert_eq!(
            repo.list_catalog_records(Some("spirits"), None, None)
                .unwrap()
                .len(),
            1
        );
        let found = repo
            .list_catalog_records(None, Some("tanq"), None)
            .unwrap();
        assert_eq!(found[0].external_id, "g1");
    }
}
