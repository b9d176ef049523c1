//! slidekit core library: domain types, template store, errors.
//!
//! - [`types`]: template definitions, bound variables, preview instances
//! - [`templates`]: read-only [`TemplateStore`] over a templates directory
//! - [`error`]: [`ErrorKind`] and [`TemplateError`]

pub mod error;
pub mod templates;
pub mod types;

pub use error::{ErrorKind, TemplateError};
pub use templates::{MacroFragment, TemplateStore};
pub use types::{
    Block, BoundValue, BoundVariables, Instance, InstanceId, InstanceStatus, SelectOption,
    TemplateId, VariableKind, VariableSpec,
};
