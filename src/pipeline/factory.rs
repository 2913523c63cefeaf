//! Factory for recreating components by type name.
//!
//! Restoration only knows a component's type name and saved settings, so the
//! factory maps names to constructors. Names nobody registered come back as
//! [`OpaqueComponent`]s.

use crate::pipeline::error::PipelineResult;
use crate::pipeline::node::{Component, OpaqueComponent};
use serde_json::Value;
use std::collections::HashMap;

/// Builds a component from its saved settings.
pub type ComponentConstructor = Box<dyn Fn(&Value) -> PipelineResult<Box<dyn Component>>>;

#[derive(Default)]
pub struct ComponentFactory {
    constructors: HashMap<String, ComponentConstructor>,
}

impl ComponentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor, replacing any previous one for the same name.
    pub fn register<F>(&mut self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn(&Value) -> PipelineResult<Box<dyn Component>> + 'static,
    {
        self.constructors
            .insert(type_name.into(), Box::new(constructor));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Create a component, falling back to an opaque one for unknown names.
    pub fn create(&self, type_name: &str, state: &Value) -> PipelineResult<Box<dyn Component>> {
        match self.constructors.get(type_name) {
            Some(constructor) => constructor(state),
            None => {
                tracing::debug!("No constructor for component '{}', keeping it opaque", type_name);
                Ok(Box::new(OpaqueComponent::new(type_name, state.clone())))
            }
        }
    }
}
