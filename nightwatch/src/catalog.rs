//! Astronomical object catalog (§3 ADDED), a small in-memory stand-in for
//! the full SQLite-backed database in
//! `original_source/services/catalog/catalog.py`; plate solving and a
//! complete star database are explicitly out of scope (§1); the
//! lookup-by-name-or-alias contract is what the rest of the system needs.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CatalogMiss;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectType {
    Star,
    OpenCluster,
    GlobularCluster,
    Nebula,
    PlanetaryNebula,
    Galaxy,
    SupernovaRemnant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogObject {
    pub catalog_id: String,
    pub name: Option<String>,
    pub object_type: ObjectType,
    pub ra_hours: f64,
    pub dec_deg: f64,
    pub magnitude: Option<f64>,
    pub constellation: Option<String>,
    pub aliases: Vec<String>,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<CatalogObject, CatalogMiss>;
    async fn list(&self) -> Vec<CatalogObject>;
}

/// Case-insensitive lookup by catalog id, common name, or alias.
pub struct InMemoryCatalog {
    objects: Vec<CatalogObject>,
    index: HashMap<String, usize>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        let objects = seed_messier_objects();
        let mut index = HashMap::new();
        for (i, object) in objects.iter().enumerate() {
            index.insert(object.catalog_id.to_lowercase(), i);
            if let Some(name) = &object.name {
                index.insert(name.to_lowercase(), i);
            }
            for alias in &object.aliases {
                index.insert(alias.to_lowercase(), i);
            }
        }
        Self { objects, index }
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn resolve(&self, query: &str) -> Result<CatalogObject, CatalogMiss> {
        self.index
            .get(query.trim().to_lowercase().as_str())
            .map(|&i| self.objects[i].clone())
            .ok_or_else(|| CatalogMiss(query.to_string()))
    }

    async fn list(&self) -> Vec<CatalogObject> {
        self.objects.clone()
    }
}

fn seed_messier_objects() -> Vec<CatalogObject> {
    vec![
        CatalogObject {
            catalog_id: "M31".to_string(),
            name: Some("Andromeda Galaxy".to_string()),
            object_type: ObjectType::Galaxy,
            ra_hours: 0.7125,
            dec_deg: 41.2692,
            magnitude: Some(3.4),
            constellation: Some("Andromeda".to_string()),
            aliases: vec!["andromeda".to_string(), "ngc 224".to_string()],
        },
        CatalogObject {
            catalog_id: "M42".to_string(),
            name: Some("Orion Nebula".to_string()),
            object_type: ObjectType::Nebula,
            ra_hours: 5.5881,
            dec_deg: -5.3911,
            magnitude: Some(4.0),
            constellation: Some("Orion".to_string()),
            aliases: vec!["orion nebula".to_string(), "ngc 1976".to_string()],
        },
        CatalogObject {
            catalog_id: "M45".to_string(),
            name: Some("Pleiades".to_string()),
            object_type: ObjectType::OpenCluster,
            ra_hours: 3.7912,
            dec_deg: 24.1167,
            magnitude: Some(1.6),
            constellation: Some("Taurus".to_string()),
            aliases: vec!["pleiades".to_string(), "seven sisters".to_string()],
        },
        CatalogObject {
            catalog_id: "M13".to_string(),
            name: Some("Hercules Cluster".to_string()),
            object_type: ObjectType::GlobularCluster,
            ra_hours: 16.6947,
            dec_deg: 36.4603,
            magnitude: Some(5.8),
            constellation: Some("Hercules".to_string()),
            aliases: vec!["great globular cluster".to_string(), "ngc 6205".to_string()],
        },
        CatalogObject {
            catalog_id: "M57".to_string(),
            name: Some("Ring Nebula".to_string()),
            object_type: ObjectType::PlanetaryNebula,
            ra_hours: 18.8917,
            dec_deg: 33.0294,
            magnitude: Some(8.8),
            constellation: Some("Lyra".to_string()),
            aliases: vec!["ring nebula".to_string(), "ngc 6720".to_string()],
        },
        CatalogObject {
            catalog_id: "M1".to_string(),
            name: Some("Crab Nebula".to_string()),
            object_type: ObjectType::SupernovaRemnant,
            ra_hours: 5.5755,
            dec_deg: 22.0145,
            magnitude: Some(8.4),
            constellation: Some("Taurus".to_string()),
            aliases: vec!["crab nebula".to_string(), "ngc 1952".to_string()],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_by_catalog_id_name_and_alias() {
        let catalog = InMemoryCatalog::new();
        assert_eq!(catalog.resolve("M31").await.unwrap().catalog_id, "M31");
        assert_eq!(catalog.resolve("andromeda galaxy").await.unwrap().catalog_id, "M31");
        assert_eq!(catalog.resolve("ngc 224").await.unwrap().catalog_id, "M31");
    }

    #[tokio::test]
    async fn unknown_object_is_a_catalog_miss() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.resolve("not a real object").await.is_err());
    }
}
