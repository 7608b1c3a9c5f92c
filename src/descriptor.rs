//! Route descriptors
//!
//! [`Entry`] is one unit of route-description input handed to a parser. Its
//! concrete type is agreed between the caller and the parser in use, so it is
//! carried type-erased. [`Descriptor`] is what a parser emits for one
//! route group and what a generator renders.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased route-description input.
#[derive(Clone)]
pub struct Entry(Arc<dyn Any + Send + Sync>);

impl Entry {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Entry(Arc::new(value))
    }

    /// Borrow the entry as `T` if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Entry").finish_non_exhaustive()
    }
}

/// One routed handler method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// HTTP method, or `ANY`
    pub http_method: String,
    /// Host pattern, if the route is host-bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Path pattern
    pub path: String,
    /// Query parameter names
    #[serde(default)]
    pub queries: Vec<String>,
    /// Handler method name
    pub method_name: String,
    #[serde(default)]
    pub comment: String,
}

/// One route group (an interface to generate).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Route group prefix, e.g. `v1`
    pub group: String,
    /// Package the generated code belongs to
    pub package: String,
    /// Name of the generated interface
    pub type_name: String,
    #[serde(default)]
    pub comment: String,
    /// Middleware / chain handler names
    #[serde(default)]
    pub chain: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl Descriptor {
    pub fn new(group: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// Batch of descriptors in parse order.
pub type Descriptors = Vec<Descriptor>;
