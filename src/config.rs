//! Entity declarations loaded from `trellis.toml`.
//!
//! ```toml
//! [entities.user]
//! backend = "sql"
//! storage = "users"
//! casts = { born_on = "date" }
//!
//! [entities.user_role]
//! backend = "document"
//! storage = "user_roles"
//! unique = [["user_id", "role_id"]]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use trellis_core::TrellisError;
use trellis_core::cast::CastManager;
use trellis_types::Backend;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Unknown entity `{0}`")]
    UnknownEntity(String),
    #[error("Storage `{storage}` is on the {found} backend, expected {expected}")]
    WrongBackend {
        storage: String,
        expected: Backend,
        found: Backend,
    },
    #[error(transparent)]
    Cast(#[from] TrellisError),
}

/// Storage declaration of one entity type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EntityConfig {
    /// `"sql"` or `"document"` (aliases such as `"sqlite"` and `"mongodb"`
    /// are accepted)
    pub backend: Backend,
    /// Table or collection name
    pub storage: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Attribute sets whose combined values must be unique
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<Vec<String>>,
    /// Attribute → cast kind
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub casts: BTreeMap<String, String>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl EntityConfig {
    pub fn new(backend: Backend, storage: impl Into<String>) -> Self {
        Self {
            backend,
            storage: storage.into(),
            primary_key: default_primary_key(),
            unique: Vec::new(),
            casts: BTreeMap::new(),
        }
    }

    /// Fails unless the entity lives on `expected`.
    pub fn expect_backend(&self, expected: Backend) -> Result<(), ConfigError> {
        if self.backend != expected {
            return Err(ConfigError::WrongBackend {
                storage: self.storage.clone(),
                expected,
                found: self.backend,
            });
        }
        Ok(())
    }

    /// Builds the validated cast manager of this entity.
    pub fn cast_manager(&self) -> Result<CastManager, ConfigError> {
        let builder = self
            .casts
            .iter()
            .fold(CastManager::builder(), |builder, (attribute, kind)| {
                builder.attribute(attribute.as_str(), kind.as_str())
            });
        Ok(builder.build()?)
    }
}

/// Main configuration struct for trellis.toml
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TrellisConfig {
    #[serde(default)]
    pub entities: BTreeMap<String, EntityConfig>,
}

impl TrellisConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::parse(&contents)
    }

    /// Parse configuration from a TOML string; every entity's cast
    /// declarations are validated.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        for entity in config.entities.values() {
            entity.cast_manager()?;
        }
        Ok(config)
    }

    pub fn entity(&self, name: &str) -> Result<&EntityConfig, ConfigError> {
        self.entities
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEntity(name.to_owned()))
    }

    /// The cast manager of entity `name`.
    pub fn cast_manager(&self, name: &str) -> Result<CastManager, ConfigError> {
        self.entity(name)?.cast_manager()
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [entities.user]
        backend = "sqlite"
        storage = "users"
        casts = { born_on = "date" }

        [entities.user_role]
        backend = "document"
        storage = "user_roles"
        primary_key = "_id"
        unique = [["user_id", "role_id"]]
    "#;

    #[test]
    fn test_parse_entities() {
        let config = TrellisConfig::parse(CONFIG).unwrap();

        let user = config.entity("user").unwrap();
        assert_eq!(user.backend, Backend::Sql);
        assert_eq!(user.primary_key, "id");
        assert!(config.cast_manager("user").unwrap().caster("born_on").is_some());

        let pivot = config.entity("user_role").unwrap();
        assert_eq!(pivot.backend, Backend::Document);
        assert_eq!(pivot.primary_key, "_id");
        assert_eq!(pivot.unique, vec![vec!["user_id".to_owned(), "role_id".to_owned()]]);
    }

    #[test]
    fn test_unknown_entity() {
        let config = TrellisConfig::parse(CONFIG).unwrap();
        assert!(matches!(
            config.entity("team"),
            Err(ConfigError::UnknownEntity(name)) if name == "team"
        ));
    }

    #[test]
    fn test_invalid_backend_is_rejected() {
        let result = TrellisConfig::parse(
            r#"
            [entities.user]
            backend = "cassandra"
            storage = "users"
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::ParseError(message)) if message.contains("cassandra")
        ));
    }

    #[test]
    fn test_unknown_cast_kind_is_rejected() {
        let result = TrellisConfig::parse(
            r#"
            [entities.user]
            backend = "sql"
            storage = "users"
            casts = { born_on = "moon_phase" }
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::Cast(TrellisError::UnknownCastKind { .. }))
        ));
    }

    #[test]
    fn test_wrong_backend() {
        let entity = EntityConfig::new(Backend::Document, "things");
        assert!(entity.expect_backend(Backend::Document).is_ok());
        assert!(matches!(
            entity.expect_backend(Backend::Sql),
            Err(ConfigError::WrongBackend { storage, found: Backend::Document, .. })
                if storage == "things"
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = TrellisConfig::parse(CONFIG).unwrap();
        let reparsed = TrellisConfig::parse(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, reparsed);
    }
}
