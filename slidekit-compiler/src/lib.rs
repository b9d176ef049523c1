//! # slidekit-compiler
//!
//! Turns a template's blocks and the caller's bound variables into a single
//! deck document, resolved through Tera.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use slidekit_compiler::Compiler;
//! use slidekit_core::{BoundVariables, TemplateId, TemplateStore};
//!
//! fn compile_pitch() {
//!     let store = TemplateStore::new("templates");
//!     let id = TemplateId::from("business-pitch");
//!     if let Ok(blocks) = store.blocks(&id) {
//!         let compiler = Compiler::new(store);
//!         if let Ok(doc) = compiler.compile(&id, &BoundVariables::new(), &blocks) {
//!             println!("{} bytes", doc.as_str().len());
//!         }
//!     }
//! }
//! ```

pub mod binder;
pub mod context;
pub mod error;
pub mod frontmatter;
pub mod order;
pub mod pipeline;

pub use binder::{assignment, parse_assignment, string_literal, value_literal};
pub use context::DeckContext;
pub use error::{CompileError, LiteralError};
pub use frontmatter::FrontMatter;
pub use order::order_blocks;
pub use pipeline::{
    assemble, render, AssembledSource, CompileRequest, CompiledDocument, Compiler, SLIDE_BREAK,
};
