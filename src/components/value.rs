use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

/// Data that is owned by the document but edited through the tree. Everything a node binds to
/// lives behind one of these, so the node, the document and any captured commands all see the
/// same value.
pub type Shared<T> = Rc<RefCell<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Type-erased handle to a `Shared<T>`. Identity is the identity of the underlying allocation,
/// so two handles are "the same value" exactly when they point at the same `Shared`.
#[derive(Clone)]
pub struct BoundValue {
    inner: Rc<dyn Any>,
    type_id: TypeId,
    type_name: &'static str,
}

impl BoundValue {
    /// Wraps a fresh value. Mostly useful for values the tree owns itself
    pub fn new<T: 'static>(value: T) -> Self {
        Self::from_shared(shared(value))
    }

    pub fn from_shared<T: 'static>(value: Shared<T>) -> Self {
        Self {
            inner: value,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn downcast<T: 'static>(&self) -> Option<Shared<T>> {
        self.inner.clone().downcast::<RefCell<T>>().ok()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.inner.is::<RefCell<T>>()
    }

    /// `TypeId` of the `T` inside the `Shared<T>`
    pub fn value_type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Reference identity, the default comparer used by the reconciler
    pub fn ptr_eq(&self, other: &BoundValue) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Value equality for handlers binding plain values that get re-wrapped every frame.
    /// Returns false when either side isn't a `T`.
    pub fn value_eq<T: PartialEq + 'static>(&self, other: &BoundValue) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.downcast::<T>(), other.downcast::<T>()) {
            (Some(left), Some(right)) => *left.borrow() == *right.borrow(),
            _ => false,
        }
    }
}

impl<T: 'static> From<Shared<T>> for BoundValue {
    fn from(value: Shared<T>) -> Self {
        BoundValue::from_shared(value)
    }
}

impl Debug for BoundValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[BoundValue | {} @ {:p}]", self.type_name, Rc::as_ptr(&self.inner))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_identity_and_downcast() {
        let name = shared(String::from("crate_01"));
        let first = BoundValue::from_shared(name.clone());
        let second: BoundValue = name.clone().into();
        let lookalike = BoundValue::new(String::from("crate_01"));

        assert!(first.ptr_eq(&second));
        assert!(!first.ptr_eq(&lookalike));
        assert!(first.value_eq::<String>(&lookalike));
        assert!(!first.value_eq::<i64>(&lookalike));

        assert!(first.is::<String>());
        assert!(first.downcast::<i64>().is_none());

        first.downcast::<String>().unwrap().borrow_mut().push_str("_b");
        assert_eq!(*name.borrow(), "crate_01_b");
    }
}
