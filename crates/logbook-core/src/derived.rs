//! Lazily computed, memoized values attached to an event.
//!
//! [`Derived`] owns both the inputs of a computation and its cached result.
//! Reading the inputs is free; the only way to mutate them is
//! [`Derived::inputs_mut`], which drops the cached result first. A patch
//! that changes an input therefore cannot leave a stale value behind.

use serde::Serialize;
use std::sync::OnceLock;

use crate::event::exploration::{EstimatedValue, RouteSummary};

/// Inputs plus a compute-once cache over them.
#[derive(Debug, Clone)]
pub struct Derived<I, V> {
    inputs: I,
    cache: OnceLock<V>,
}

impl<I, V> Derived<I, V> {
    /// Wrap inputs with an empty cache.
    pub const fn new(inputs: I) -> Self {
        Self {
            inputs,
            cache: OnceLock::new(),
        }
    }

    /// Read-only access to the inputs.
    pub const fn inputs(&self) -> &I {
        &self.inputs
    }

    /// Mutable access to the inputs. Clears the cache.
    pub fn inputs_mut(&mut self) -> &mut I {
        self.cache.take();
        &mut self.inputs
    }

    /// The cached value, computing it with `compute` on first use.
    pub fn get_or_compute(&self, compute: impl FnOnce(&I) -> V) -> &V {
        self.cache.get_or_init(|| compute(&self.inputs))
    }

    /// The cached value, if already computed.
    pub fn cached(&self) -> Option<&V> {
        self.cache.get()
    }
}

impl<I: PartialEq, V> PartialEq for Derived<I, V> {
    fn eq(&self, other: &Self) -> bool {
        self.inputs == other.inputs
    }
}

impl<I: Serialize, V> Serialize for Derived<I, V> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inputs.serialize(serializer)
    }
}

/// A derived value borrowed from its owning event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DerivedValue<'a> {
    /// Estimated exploration value of a scanned body.
    ScanValue(&'a EstimatedValue),
    /// Summary of a plotted route.
    Route(&'a RouteSummary),
}
