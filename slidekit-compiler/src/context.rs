//! Deck context: the bound variables a compilation renders against.

use serde::Serialize;

use slidekit_core::{Block, BoundVariables};

use crate::error::CompileError;

/// Variables for one compilation, with every variable a block names present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeckContext {
    variables: BoundVariables,
}

impl DeckContext {
    /// Take the caller's values and fill in anything a block names but the
    /// caller left out, using the variable's fallback value.
    pub fn resolve(bound: &BoundVariables, blocks: &[Block]) -> Self {
        let mut variables = bound.clone();
        for spec in blocks.iter().flat_map(|b| b.variables.iter()) {
            if !variables.contains_key(&spec.name) {
                tracing::debug!(variable = %spec.name, kind = %spec.kind, "filling unbound variable");
                variables.insert(spec.name.clone(), spec.fallback_value());
            }
        }
        DeckContext { variables }
    }

    pub fn variables(&self) -> &BoundVariables {
        &self.variables
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, CompileError> {
        tera::Context::from_serialize(self).map_err(CompileError::from)
    }
}

impl From<BoundVariables> for DeckContext {
    fn from(variables: BoundVariables) -> Self {
        DeckContext { variables }
    }
}
