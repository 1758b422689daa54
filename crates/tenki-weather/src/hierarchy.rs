//! Region → office hierarchy loaded from the area document (`areas.json`).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use tenki_core::ForecastError;

use crate::types::{Office, Region};

#[derive(Debug, Deserialize)]
struct HierarchyDocument {
    centers: BTreeMap<String, CenterEntry>,
    offices: BTreeMap<String, OfficeEntry>,
}

#[derive(Debug, Deserialize)]
struct CenterEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OfficeEntry {
    name: String,
    parent: String,
}

/// Read-only name/code index over regions and their offices.
///
/// Built once at startup and shared by reference; both maps iterate in code
/// order.
#[derive(Debug, Clone, Default)]
pub struct AreaHierarchyIndex {
    regions: BTreeMap<String, Region>,
    offices: BTreeMap<String, Office>,
}

impl AreaHierarchyIndex {
    /// Load the hierarchy from a JSON file.
    ///
    /// # Errors
    /// `SourceUnavailable` if the file cannot be read, `MalformedDocument`
    /// if it does not have the centers/offices shape.
    pub fn load(path: &Path) -> Result<Self, ForecastError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::SourceUnavailable(format!("{}: {}", path.display(), e))
        })?;

        let index = Self::from_json_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            regions = index.regions.len(),
            offices = index.offices.len(),
            "Loaded area hierarchy"
        );
        Ok(index)
    }

    /// Parse the hierarchy from JSON text.
    ///
    /// # Errors
    /// `MalformedDocument` if the text is not JSON or lacks `centers`/`offices`.
    pub fn from_json_str(contents: &str) -> Result<Self, ForecastError> {
        let doc: HierarchyDocument = serde_json::from_str(contents)
            .map_err(|e| ForecastError::MalformedDocument(e.to_string()))?;

        let regions: BTreeMap<String, Region> = doc
            .centers
            .into_iter()
            .map(|(code, entry)| {
                let region = Region {
                    code: code.clone(),
                    name: entry.name,
                };
                (code, region)
            })
            .collect();

        let mut offices = BTreeMap::new();
        for (code, entry) in doc.offices {
            if !regions.contains_key(&entry.parent) {
                tracing::warn!(
                    office = %code,
                    parent = %entry.parent,
                    "Skipping office with unknown parent region"
                );
                continue;
            }
            offices.insert(
                code.clone(),
                Office {
                    code,
                    name: entry.name,
                    parent_region_code: entry.parent,
                },
            );
        }

        Ok(Self { regions, offices })
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn region(&self, code: &str) -> Option<&Region> {
        self.regions.get(code)
    }

    pub fn office(&self, code: &str) -> Option<&Office> {
        self.offices.get(code)
    }

    /// Offices under the given region, in code order.
    pub fn offices_in_region<'a>(
        &'a self,
        region_code: &'a str,
    ) -> impl Iterator<Item = &'a Office> + 'a {
        self.offices
            .values()
            .filter(move |office| office.parent_region_code == region_code)
    }

    /// First region (in code order) whose name matches exactly.
    ///
    /// # Errors
    /// `NotFound` if no region has that name.
    pub fn resolve_region_code(&self, name: &str) -> Result<&str, ForecastError> {
        self.regions
            .values()
            .find(|region| region.name == name)
            .map(|region| region.code.as_str())
            .ok_or_else(|| ForecastError::not_found(format!("region '{}'", name)))
    }

    /// Office code for `name` among the offices of `parent_region_code`.
    ///
    /// Office names are not unique across regions, so a match under another
    /// region is a miss.
    ///
    /// # Errors
    /// `NotFound` if the region has no office with that name.
    pub fn resolve_office_code(
        &self,
        name: &str,
        parent_region_code: &str,
    ) -> Result<&str, ForecastError> {
        self.offices
            .values()
            .find(|office| office.parent_region_code == parent_region_code && office.name == name)
            .map(|office| office.code.as_str())
            .ok_or_else(|| {
                ForecastError::not_found(format!(
                    "office '{}' in region {}",
                    name, parent_region_code
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use tenki_core::ForecastErrorKind;

    const AREAS: &str = r#"{
        "centers": {
            "010300": {"name": "関東甲信地方", "enName": "Kanto Koshin", "children": ["130000"]},
            "010400": {"name": "東海地方", "children": ["230000"]}
        },
        "offices": {
            "130000": {"name": "東京都", "parent": "010300"},
            "190000": {"name": "山梨県", "parent": "010300"},
            "230000": {"name": "愛知県", "parent": "010400"},
            "990000": {"name": "Shared", "parent": "010400"},
            "990001": {"name": "Shared", "parent": "010300"},
            "999999": {"name": "Orphan", "parent": "000000"}
        },
        "class10s": {}
    }"#;

    fn index() -> AreaHierarchyIndex {
        AreaHierarchyIndex::from_json_str(AREAS).unwrap()
    }

    #[test]
    fn test_resolve_region_code() {
        assert_eq!(index().resolve_region_code("関東甲信地方").unwrap(), "010300");
    }

    #[test]
    fn test_unknown_region_is_not_found() {
        let err = index().resolve_region_code("北海道地方").unwrap_err();
        assert_eq!(err.kind(), ForecastErrorKind::NotFound);
    }

    #[test]
    fn test_office_lookup_is_scoped_to_region() {
        let index = index();
        assert_eq!(index.resolve_office_code("東京都", "010300").unwrap(), "130000");

        let err = index.resolve_office_code("東京都", "010400").unwrap_err();
        assert_eq!(err.kind(), ForecastErrorKind::NotFound);
    }

    #[test]
    fn test_duplicate_office_names_resolve_per_region() {
        let index = index();
        assert_eq!(index.resolve_office_code("Shared", "010400").unwrap(), "990000");
        assert_eq!(index.resolve_office_code("Shared", "010300").unwrap(), "990001");
    }

    #[test]
    fn test_offices_in_region_in_code_order() {
        let index = index();
        let names: Vec<_> = index
            .offices_in_region("010300")
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["東京都", "山梨県", "Shared"]);
    }

    #[test]
    fn test_orphan_office_is_skipped() {
        assert!(index().office("999999").is_none());
    }

    #[test]
    fn test_regions_iterate_in_code_order() {
        let codes: Vec<_> = index().regions().map(|r| r.code.clone()).collect();
        assert_eq!(codes, vec!["010300", "010400"]);
    }

    #[test]
    fn test_missing_offices_key_is_malformed() {
        let err = AreaHierarchyIndex::from_json_str(r#"{"centers": {}}"#).unwrap_err();
        assert_eq!(err.kind(), ForecastErrorKind::MalformedDocument);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = AreaHierarchyIndex::from_json_str("{ not json").unwrap_err();
        assert_eq!(err.kind(), ForecastErrorKind::MalformedDocument);
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let err = AreaHierarchyIndex::load(Path::new("/nonexistent/areas.json")).unwrap_err();
        assert_eq!(err.kind(), ForecastErrorKind::SourceUnavailable);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("areas.json");
        std::fs::write(&path, AREAS).unwrap();

        let index = AreaHierarchyIndex::load(&path).unwrap();
        assert_eq!(index.region("010400").unwrap().name, "東海地方");
    }
}
