//! Typed capability registry
//!
//! The typed replacement for installing module methods onto a shared host
//! object: a unique module registers an `Arc<dyn Trait>` under the trait's
//! `TypeId`, and callers resolve it by type. A second provider of the same
//! capability is a composition error.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::host::error::ModuleAddError;
use crate::host::id::ModuleId;
use crate::util::lock;

struct CapabilityEntry {
    owner: ModuleId,
    name: &'static str,
    capability: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub(crate) struct CapabilityRegistry {
    entries: Mutex<HashMap<TypeId, CapabilityEntry>>,
}

impl CapabilityRegistry {
    pub(crate) fn provide<T>(&self, owner: &ModuleId, capability: Arc<T>) -> Result<(), ModuleAddError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let mut entries = lock(&self.entries);
        let type_id = TypeId::of::<T>();
        let name = std::any::type_name::<T>();

        if let Some(existing) = entries.get(&type_id) {
            return Err(ModuleAddError::CapabilityCollision {
                module: owner.clone(),
                capability: name,
                owner: existing.owner.clone(),
            });
        }

        entries.insert(
            type_id,
            CapabilityEntry {
                owner: owner.clone(),
                name,
                capability: Box::new(capability),
            },
        );

        Ok(())
    }

    pub(crate) fn resolve<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        lock(&self.entries)
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.capability.downcast_ref::<Arc<T>>())
            .map(Arc::clone)
    }

    /// (capability name, owning module) pairs for introspection.
    pub(crate) fn owners(&self) -> Vec<(&'static str, ModuleId)> {
        lock(&self.entries)
            .values()
            .map(|entry| (entry.name, entry.owner.clone()))
            .collect()
    }
}
