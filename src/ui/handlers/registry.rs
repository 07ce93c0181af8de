use std::any::TypeId;
use std::collections::HashMap;
use std::rc::Rc;

use crate::components::{BoundValue, Handler, Node};

type Factory = Box<dyn Fn(&HandlerRegistry) -> Rc<dyn Handler>>;

/// Maps the type a node is bound to onto the handler that edits it. Handlers are resolved once,
/// when the node gets created, never per frame.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: Rc<HashMap<TypeId, Factory>>,
}

#[derive(Default)]
pub struct RegistryBuilder {
    factories: HashMap<TypeId, Factory>,
}

impl RegistryBuilder {
    /// Handler for nodes bound to a `Shared<T>`. Registering a type twice replaces the first one
    pub fn register<T: 'static>(
        mut self,
        factory: impl Fn(&HandlerRegistry) -> Rc<dyn Handler> + 'static,
    ) -> Self {
        self.factories.insert(TypeId::of::<T>(), Box::new(factory));
        self
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            factories: Rc::new(self.factories),
        }
    }
}

impl HandlerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn resolve(&self, value: &BoundValue) -> Option<Rc<dyn Handler>> {
        let factory = self.factories.get(&value.value_type_id())?;
        Some(factory(self))
    }

    /// Gives a freshly created node its handler, leaving nodes that already have one alone
    pub fn setup(&self, node: &Node) {
        if node.handler().is_some() {
            return;
        }
        match node.value() {
            Some(value) => match self.resolve(&value) {
                Some(handler) => node.set_handler(Some(handler)),
                None => log::warn!(
                    "no handler registered for {} ({}), it will not be editable",
                    value.type_name(),
                    node.path()
                ),
            },
            None => log::debug!("{} has no value, leaving it passive", node.path()),
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "[HandlerRegistry | {} types]", self.factories.len())
    }
}
