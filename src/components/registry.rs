//! # Dependency registry.
//!
//! [`BeanRegistry`] is the seam to the component store: register by class
//! or by value, look up by type. [`Ioc`] is the in-memory implementation.
//!
//! ## Rules
//! - One instance per `TypeId`; registering an already present type is a no-op.
//! - Registration happens on the starting thread; lookups may come from any
//!   thread afterwards (cron workers resolve task targets per fire).

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::components::class::ComponentClass;

/// A constructed component instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// An instance paired with the type it is registered under.
#[derive(Clone)]
pub struct Bean {
    type_id: TypeId,
    type_name: &'static str,
    instance: Instance,
}

impl Bean {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            instance: value,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}

impl std::fmt::Debug for Bean {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Bean").field(&self.type_name).finish()
    }
}

/// Component store consulted by the registrar, the orchestrator and task fires.
pub trait BeanRegistry: Send + Sync {
    /// Constructs and stores the class unless its type is already present.
    /// Returns `true` when a new instance was stored.
    fn register_class(&self, class: &ComponentClass) -> bool;

    /// Stores a ready instance unless its type is already present.
    fn register_bean(&self, bean: Bean) -> bool;

    fn get_bean(&self, type_id: TypeId) -> Option<Instance>;

    fn contains(&self, type_id: TypeId) -> bool {
        self.get_bean(type_id).is_some()
    }

    /// Type names of every stored instance.
    fn bean_names(&self) -> Vec<&'static str>;
}

impl dyn BeanRegistry {
    /// Typed lookup.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_bean(TypeId::of::<T>())?.downcast::<T>().ok()
    }
}

/// In-memory [`BeanRegistry`].
#[derive(Default)]
pub struct Ioc {
    beans: RwLock<HashMap<TypeId, Bean>>,
}

impl Ioc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `register_bean(Bean::new(value))`.
    pub fn register_value<T: Any + Send + Sync>(&self, value: T) -> bool {
        self.register_bean(Bean::new(value))
    }

    pub fn len(&self) -> usize {
        self.beans.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.beans.read().is_empty()
    }
}

impl BeanRegistry for Ioc {
    fn register_class(&self, class: &ComponentClass) -> bool {
        if self.beans.read().contains_key(&class.type_id()) {
            return false;
        }
        // Construct outside the lock; factories may look up other beans.
        let instance = class.instantiate();
        let mut beans = self.beans.write();
        if beans.contains_key(&class.type_id()) {
            return false;
        }
        beans.insert(
            class.type_id(),
            Bean {
                type_id: class.type_id(),
                type_name: class.type_name(),
                instance,
            },
        );
        true
    }

    fn register_bean(&self, bean: Bean) -> bool {
        let mut beans = self.beans.write();
        if beans.contains_key(&bean.type_id) {
            return false;
        }
        beans.insert(bean.type_id, bean);
        true
    }

    fn get_bean(&self, type_id: TypeId) -> Option<Instance> {
        self.beans.read().get(&type_id).map(|b| Arc::clone(&b.instance))
    }

    fn bean_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.beans.read().values().map(|b| b.type_name).collect();
        names.sort_unstable();
        names
    }
}
