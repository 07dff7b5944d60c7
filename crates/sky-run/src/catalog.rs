use std::collections::HashMap;

use sky_source::{Source, SourceId};

use crate::error::{RunError, RunResult};

/// The run's sources, with dense ids assigned in insertion order.
#[derive(Debug, Default)]
pub struct SourceCatalog {
    sources: Vec<Source>,
    by_name: HashMap<String, SourceId>,
}

impl SourceCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a source; its id is its position in insertion order.
    pub fn insert(&mut self, run: &str, source: Source) -> RunResult<SourceId> {
        let id = SourceId::new(self.sources.len() as u32);
        if self
            .by_name
            .insert(source.name().to_string(), id)
            .is_some()
        {
            return Err(RunError::DuplicateSource {
                run: run.to_string(),
                source_name: source.name().to_string(),
            });
        }
        self.sources.push(source);
        Ok(id)
    }

    /// Look up a source id by name.
    pub fn id_of(&self, name: &str) -> Option<SourceId> {
        self.by_name.get(name).copied()
    }

    /// Shared access by id. Ids handed out by this catalog are always
    /// valid, so the accessors index directly.
    pub fn get(&self, id: SourceId) -> &Source {
        &self.sources[id.index()]
    }

    /// Exclusive access by id.
    pub fn get_mut(&mut self, id: SourceId) -> &mut Source {
        &mut self.sources[id.index()]
    }

    /// All sources in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    /// Exclusive iteration in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Source> {
        self.sources.iter_mut()
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// True when no source was registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_name_addressable() {
        let mut catalog = SourceCatalog::new();
        let a = catalog.insert("run", Source::new("a")).unwrap();
        let b = catalog.insert("run", Source::new("b")).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(catalog.id_of("b"), Some(b));
        assert_eq!(catalog.get(a).name(), "a");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut catalog = SourceCatalog::new();
        catalog.insert("run", Source::new("a")).unwrap();
        assert!(matches!(
            catalog.insert("run", Source::new("a")),
            Err(RunError::DuplicateSource { .. })
        ));
    }
}
