//! Template registries
//!
//! Four independent named-blueprint stores (asset, object, stage, physics
//! configurations). Each store hands out stable, monotonically increasing
//! integer ids that are never reused; re-registering an existing handle
//! overwrites the stored blueprint in place and returns the existing id.

mod types;

pub use types::{
    AssetTemplate, CollisionShape, ObjectTemplate, PhysicsTemplate, StageTemplate,
    StaticColliderDef,
};

use std::collections::{BTreeMap, HashMap};

use crate::core::error::{SimError, SimResult};

/// Stable integer id of a registered template
pub type TemplateId = u32;

/// A single named-blueprint store
///
/// Lookups succeed by id or by handle; `handles()` lists registration order
/// (ascending id).
#[derive(Debug, Clone)]
pub struct TemplateStore<T> {
    kind: &'static str,
    by_id: BTreeMap<TemplateId, (String, T)>,
    handle_to_id: HashMap<String, TemplateId>,
    next_id: TemplateId,
}

impl<T: Clone> TemplateStore<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            by_id: BTreeMap::new(),
            handle_to_id: HashMap::new(),
            next_id: 0,
        }
    }

    /// Register a template under a handle
    ///
    /// Overwrites in place when the handle already exists, returning the
    /// existing id. Fresh handles get the next monotonic id.
    pub fn register(&mut self, handle: &str, template: T) -> TemplateId {
        if let Some(&id) = self.handle_to_id.get(handle) {
            log::debug!("{} template '{}' overwritten in place (id {})", self.kind, handle, id);
            self.by_id.insert(id, (handle.to_string(), template));
            return id;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.by_id.insert(id, (handle.to_string(), template));
        self.handle_to_id.insert(handle.to_string(), id);
        id
    }

    /// Look up a template by id
    pub fn get(&self, id: TemplateId) -> SimResult<&T> {
        self.by_id
            .get(&id)
            .map(|(_, template)| template)
            .ok_or_else(|| {
                SimError::NotFound(format!("{} template id {} is not registered", self.kind, id))
            })
    }

    /// Look up a template by handle
    pub fn get_by_handle(&self, handle: &str) -> SimResult<&T> {
        let id = self.id_for_handle(handle)?;
        self.get(id)
    }

    /// Resolve a handle to its id
    pub fn id_for_handle(&self, handle: &str) -> SimResult<TemplateId> {
        self.handle_to_id.get(handle).copied().ok_or_else(|| {
            SimError::NotFound(format!(
                "{} template handle '{}' is not registered",
                self.kind, handle
            ))
        })
    }

    /// All registered handles in ascending id order
    pub fn handles(&self) -> Vec<String> {
        self.by_id.values().map(|(handle, _)| handle.clone()).collect()
    }

    /// Number of registered templates
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// The four independent template stores shared by every scene of a simulator
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    /// Render/primitive asset blueprints
    pub assets: TemplateStore<AssetTemplate>,
    /// Instantiable object blueprints
    pub objects: TemplateStore<ObjectTemplate>,
    /// Stage (static environment) blueprints
    pub stages: TemplateStore<StageTemplate>,
    /// Physics backend configurations
    pub physics: TemplateStore<PhysicsTemplate>,
}

impl TemplateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            assets: TemplateStore::new("asset"),
            objects: TemplateStore::new("object"),
            stages: TemplateStore::new("stage"),
            physics: TemplateStore::new("physics"),
        }
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get_round_trip() {
        let mut registry = TemplateRegistry::new();
        let template = ObjectTemplate {
            mass: 2.5,
            ..Default::default()
        };

        let id = registry.objects.register("chair", template.clone());
        assert_eq!(*registry.objects.get(id).unwrap(), template);
        assert_eq!(*registry.objects.get_by_handle("chair").unwrap(), template);
    }

    #[test]
    fn test_get_unregistered_fails_not_found() {
        let registry = TemplateRegistry::new();

        assert!(matches!(
            registry.objects.get(99),
            Err(SimError::NotFound(_))
        ));
        assert!(matches!(
            registry.stages.get_by_handle("no_such_stage"),
            Err(SimError::NotFound(_))
        ));
    }

    #[test]
    fn test_ids_are_monotonic_and_never_reused() {
        let mut store = TemplateStore::new("object");
        let a = store.register("a", ObjectTemplate::default());
        let b = store.register("b", ObjectTemplate::default());
        assert_eq!((a, b), (0, 1));

        // Overwrite keeps the existing id and does not consume a new one.
        let a_again = store.register("a", ObjectTemplate { mass: 9.0, ..Default::default() });
        assert_eq!(a_again, a);
        let c = store.register("c", ObjectTemplate::default());
        assert_eq!(c, 2);
    }

    #[test]
    fn test_reregister_overwrites_in_place() {
        let mut store = TemplateStore::new("object");
        store.register("box", ObjectTemplate { mass: 1.0, ..Default::default() });
        store.register("box", ObjectTemplate { mass: 5.0, ..Default::default() });

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_handle("box").unwrap().mass, 5.0);
    }

    #[test]
    fn test_handles_listed_in_registration_order() {
        let mut store = TemplateStore::new("asset");
        store.register("banana", AssetTemplate::default());
        store.register("apple", AssetTemplate::default());
        store.register("mango", AssetTemplate::default());

        assert_eq!(store.handles(), vec!["banana", "apple", "mango"]);
    }
}
