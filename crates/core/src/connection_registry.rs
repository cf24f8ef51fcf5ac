use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConnectionSeed;
use crate::workflow::{AppView, PendingTransition};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatastoreKind {
    #[default]
    Mongodb,
    Postgresql,
    Mysql,
    Redis,
}

impl DatastoreKind {
    pub const ALL: [Self; 4] = [Self::Mongodb, Self::Postgresql, Self::Mysql, Self::Redis];

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Mongodb => "mongodb",
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
            Self::Redis => "redis",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Mongodb => "MongoDB",
            Self::Postgresql => "PostgreSQL",
            Self::Mysql => "MySQL",
            Self::Redis => "Redis",
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Mongodb => Self::Postgresql,
            Self::Postgresql => Self::Mysql,
            Self::Mysql => Self::Redis,
            Self::Redis => Self::Mongodb,
        }
    }
}

impl fmt::Display for DatastoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown datastore type `{0}`")]
pub struct UnknownDatastoreKind(pub String);

impl FromStr for DatastoreKind {
    type Err = UnknownDatastoreKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == normalized)
            .ok_or_else(|| UnknownDatastoreKind(raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub id: u64,
    pub value: String,
    pub kind: DatastoreKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionRegistryError {
    #[error("add at least one connection before continuing")]
    Empty,
}

#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    descriptors: Vec<ConnectionDescriptor>,
    next_id: u64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            next_id: 1,
        }
    }

    #[must_use]
    pub fn descriptors(&self) -> &[ConnectionDescriptor] {
        &self.descriptors
    }

    #[must_use]
    pub fn descriptor(&self, id: u64) -> Option<&ConnectionDescriptor> {
        self.descriptors.iter().find(|descriptor| descriptor.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn add(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.descriptors.push(ConnectionDescriptor {
            id,
            value: String::new(),
            kind: DatastoreKind::default(),
        });
        id
    }

    pub fn update(&mut self, id: u64, value: impl Into<String>) {
        if let Some(descriptor) = self.find_mut(id) {
            descriptor.value = value.into();
        }
    }

    pub fn set_kind(&mut self, id: u64, kind: DatastoreKind) {
        if let Some(descriptor) = self.find_mut(id) {
            descriptor.kind = kind;
        }
    }

    pub fn from_seeds(seeds: &[ConnectionSeed]) -> Result<Self, UnknownDatastoreKind> {
        let mut registry = Self::new();
        for seed in seeds {
            let id = registry.add();
            registry.update(id, seed.value.clone());
            registry.set_kind_tag(id, &seed.kind)?;
        }
        Ok(registry)
    }

    pub fn set_kind_tag(&mut self, id: u64, tag: &str) -> Result<(), UnknownDatastoreKind> {
        let kind = tag.parse::<DatastoreKind>()?;
        self.set_kind(id, kind);
        Ok(())
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let original_len = self.descriptors.len();
        self.descriptors.retain(|descriptor| descriptor.id != id);
        self.descriptors.len() != original_len
    }

    pub fn submit(&self, delay: Duration) -> Result<PendingTransition, ConnectionRegistryError> {
        if self.descriptors.is_empty() {
            return Err(ConnectionRegistryError::Empty);
        }
        tracing::info!(
            connections = self.descriptors.len(),
            "accepted connection descriptors"
        );
        Ok(PendingTransition::new(AppView::Schema, delay))
    }

    fn find_mut(&mut self, id: u64) -> Option<&mut ConnectionDescriptor> {
        self.descriptors
            .iter_mut()
            .find(|descriptor| descriptor.id == id)
    }
}
