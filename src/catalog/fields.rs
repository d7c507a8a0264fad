//! Field catalog keyed by market configuration
//!
//! The JSON form maps a combination key (`USA_1_TOP3000`) to the fields available under
//! it. Each field is either a bare name or an object with `id` (or `name`) and an optional
//! `type`.

use std::{
    collections::BTreeMap,
    fmt,
    path::Path,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use super::{closest_match, read_catalog_file, CatalogError};

// ============================================================================
// COMBINATION KEY
// ============================================================================

/// Region, delay and universe: selects which field set applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombinationKey {
    pub region: String,
    pub delay: String,
    pub universe: String,
}

impl CombinationKey {
    pub fn new(
        region: impl Into<String>,
        delay: impl Into<String>,
        universe: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            delay: delay.into(),
            universe: universe.into(),
        }
    }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.region, self.delay, self.universe)
    }
}

impl FromStr for CombinationKey {
    type Err = String;

    /// Parses `REGION_DELAY_UNIVERSE`; the universe may itself contain underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '_');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(region), Some(delay), Some(universe))
                if !region.is_empty() && !delay.is_empty() && !universe.is_empty() =>
            {
                Ok(Self::new(region, delay, universe))
            }
            _ => Err(format!(
                "`{}` is not a combination key of the form REGION_DELAY_UNIVERSE",
                s
            )),
        }
    }
}

// ============================================================================
// FIELD SETS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub name: String,
    /// Data type reported by the catalog (e.g. `MATRIX`, `VECTOR`).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// The fields known under one combination key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    fields: BTreeMap<String, FieldEntry>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: FieldEntry) {
        self.fields.insert(entry.name.clone(), entry);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &FieldEntry> {
        self.fields.values()
    }

    pub fn suggest(&self, name: &str) -> Option<&str> {
        closest_match(name, self.names())
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = FieldSet::new();
        for name in iter {
            set.insert(FieldEntry {
                name: name.into(),
                data_type: None,
            });
        }
        set
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// Field sets for every known combination key.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    sets: BTreeMap<String, FieldSet>,
}

impl FieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &CombinationKey, set: FieldSet) {
        self.sets.insert(key.to_string(), set);
    }

    /// Builder form of [`FieldCatalog::insert`].
    pub fn with_set(mut self, key: CombinationKey, set: FieldSet) -> Self {
        self.insert(&key, set);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let document: BTreeMap<String, Vec<FieldRecord>> =
            serde_json::from_str(json).map_err(|e| CatalogError::Format {
                what: "field",
                message: e.to_string(),
            })?;

        let mut catalog = Self::new();
        for (key, records) in document {
            if key.parse::<CombinationKey>().is_err() {
                tracing::warn!(key = %key, "skipping field set with a malformed combination key");
                continue;
            }
            let set = records
                .into_iter()
                .map(FieldRecord::into_entry)
                .fold(FieldSet::new(), |mut set, entry| {
                    set.insert(entry);
                    set
                });
            catalog.sets.insert(key, set);
        }

        tracing::info!(keys = catalog.len(), "loaded field catalog");
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::from_json_str(&read_catalog_file(path.as_ref())?)
    }

    pub fn get(&self, key: &CombinationKey) -> Option<&FieldSet> {
        self.sets.get(&key.to_string())
    }

    pub fn contains_key(&self, key: &CombinationKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// All combination keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = CombinationKey> + '_ {
        self.sets.keys().filter_map(|key| key.parse().ok())
    }

    /// `delay/universe` pairs grouped by region.
    pub fn available_keys_by_region(&self) -> BTreeMap<String, Vec<String>> {
        let mut regions: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for key in self.keys() {
            regions
                .entry(key.region)
                .or_default()
                .push(format!("{}/{}", key.delay, key.universe));
        }
        regions
    }

    /// One line per region, e.g. `USA: 0/TOP500, 1/TOP3000`.
    pub fn describe_available(&self) -> String {
        self.available_keys_by_region()
            .into_iter()
            .map(|(region, combos)| format!("{}: {}", region, combos.join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldRecord {
    Name(String),
    Entry {
        #[serde(alias = "id")]
        name: String,
        #[serde(default, rename = "type")]
        data_type: Option<String>,
    },
}

impl FieldRecord {
    fn into_entry(self) -> FieldEntry {
        match self {
            FieldRecord::Name(name) => FieldEntry {
                name,
                data_type: None,
            },
            FieldRecord::Entry { name, data_type } => FieldEntry { name, data_type },
        }
    }
}
