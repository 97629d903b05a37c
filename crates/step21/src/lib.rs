#![warn(missing_docs)]

//! ISO 10303-21 (STEP physical file) writing and reading.
//!
//! Entities are built as plain values in an [`EntityStore`]; attributes may
//! reference other entities by key. On write, the compiler flattens the
//! entity forest into a uniquely numbered table, collapsing structurally
//! identical entities to a single `#id` record, and the writer assembles
//! the HEADER and DATA sections around it.
//!
//! # Example
//!
//! ```no_run
//! use step21::{Attribute, Entity, FileHeader, StepDocument, write_step};
//!
//! let mut doc = StepDocument::new(FileHeader {
//!     file_name: "part.step".into(),
//!     schemas: vec!["AUTOMOTIVE_DESIGN".into()],
//!     ..Default::default()
//! });
//!
//! let origin = doc.store.insert(
//!     Entity::new("CARTESIAN_POINT")
//!         .with(Attribute::Text("".into()))
//!         .with(Attribute::List(vec![
//!             Attribute::Real(0.0),
//!             Attribute::Real(0.0),
//!             Attribute::Real(0.0),
//!         ])),
//! );
//! doc.add_root(
//!     Entity::new("VERTEX_POINT")
//!         .with(Attribute::Text("".into()))
//!         .with(Attribute::Reference(origin)),
//! );
//!
//! write_step(&doc, "part.step").unwrap();
//! ```

mod compile;
mod error;
mod escape;
mod format;
mod header;
mod lexer;
mod model;
mod parser;
mod writer;

pub use compile::{CompiledEntity, Compiler, EntityTable};
pub use error::StepError;
pub use escape::{decode_string, encode_string};
pub use format::{format_real, render_attribute, ResolveEntity};
pub use header::FileHeader;
pub use lexer::{Lexer, Token};
pub use model::{normalize_name, Attribute, Entity, EntityKey, EntityStore};
pub use parser::{read_step, read_step_from_buffer};
pub use writer::{write_step, write_step_to_buffer, StepDocument};
