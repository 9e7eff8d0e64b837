//! Instance registry
//!
//! Name-keyed storage shared by both supervisors. The registry owns its
//! instances: they enter only through [`Registry::add`] and leave only
//! through [`Registry::take`] or [`Registry::drain`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::error::SupervisorError;

/// Something a registry can key by name
pub trait Instance {
    fn name(&self) -> &str;
}

/// Mapping from unique name to instance
#[derive(Debug)]
pub struct Registry<I> {
    instances: HashMap<String, I>,
}

impl<I: Instance> Registry<I> {
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
        }
    }

    /// Store a new instance under its name
    ///
    /// Never replaces: an existing entry fails the call with `AlreadyExists`
    /// and stays untouched.
    pub fn add(&mut self, instance: I) -> Result<&mut I, SupervisorError> {
        match self.instances.entry(instance.name().to_string()) {
            Entry::Occupied(entry) => Err(SupervisorError::AlreadyExists {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => Ok(entry.insert(instance)),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&I> {
        self.instances.get(name)
    }

    /// Mutable access, failing with `NotFound`
    pub fn get_mut(&mut self, name: &str) -> Result<&mut I, SupervisorError> {
        self.instances
            .get_mut(name)
            .ok_or_else(|| SupervisorError::NotFound {
                name: name.to_string(),
            })
    }

    /// Remove and return an instance, failing with `NotFound`
    pub fn take(&mut self, name: &str) -> Result<I, SupervisorError> {
        self.instances
            .remove(name)
            .ok_or_else(|| SupervisorError::NotFound {
                name: name.to_string(),
            })
    }

    /// Remove every instance, ordered by name
    pub fn drain(&mut self) -> Vec<I> {
        let mut drained: Vec<I> = self.instances.drain().map(|(_, instance)| instance).collect();
        drained.sort_by(|a, b| a.name().cmp(b.name()));
        drained
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.instances.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &I> {
        self.instances.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut I> {
        self.instances.values_mut()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl<I: Instance> Default for Registry<I> {
    fn default() -> Self {
        Self::new()
    }
}
