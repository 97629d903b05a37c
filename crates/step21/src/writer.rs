//! STEP file writer: compiles a document and assembles the output text.

use std::fmt::Write as _;
use std::path::Path;

use crate::compile::Compiler;
use crate::error::StepError;
use crate::header::FileHeader;
use crate::model::{Entity, EntityKey, EntityStore};

/// A complete in-memory STEP document: header fields plus an entity forest.
#[derive(Debug, Clone, Default)]
pub struct StepDocument {
    /// HEADER section fields.
    pub header: FileHeader,
    /// Arena holding every entity of the DATA section.
    pub store: EntityStore,
    /// Top-level entities, in output order. Entities reachable through
    /// references need not be listed; the compiler finds them.
    pub roots: Vec<EntityKey>,
}

impl StepDocument {
    /// Create an empty document with the given header.
    pub fn new(header: FileHeader) -> Self {
        Self {
            header,
            store: EntityStore::new(),
            roots: Vec::new(),
        }
    }

    /// Insert an entity into the store and register it as a root.
    pub fn add_root(&mut self, entity: Entity) -> EntityKey {
        let key = self.store.insert(entity);
        self.roots.push(key);
        key
    }

    /// Render the complete document text.
    ///
    /// Both sections go through the same compile path; header pseudo-entities
    /// print without the `#id=` prefix, data entities always with it. A
    /// compile failure (unknown key, reference cycle) aborts the whole write;
    /// no partial document is produced.
    pub fn to_step_string(&self) -> Result<String, StepError> {
        let mut header_store = EntityStore::new();
        let header_roots: Vec<EntityKey> = self
            .header
            .to_entities()
            .into_iter()
            .map(|e| header_store.insert(e))
            .collect();
        let header_table = Compiler::new(&header_store).compile(&header_roots)?;
        let data_table = Compiler::new(&self.store).compile(&self.roots)?;

        let mut out = String::new();
        out.push_str("ISO-10303-21;\n");
        out.push_str("HEADER;\n");
        for record in header_table.records() {
            let _ = writeln!(out, "{}({});", record.type_name, record.attributes);
        }
        out.push_str("ENDSEC;\n");
        out.push_str("DATA;\n");
        for record in data_table.records() {
            let _ = writeln!(
                out,
                "#{}={}({});",
                record.id, record.type_name, record.attributes
            );
        }
        out.push_str("ENDSEC;\n");
        out.push_str("END-ISO-10303-21;\n");
        Ok(out)
    }
}

/// Write a document to a file at `path`.
pub fn write_step(document: &StepDocument, path: impl AsRef<Path>) -> Result<(), StepError> {
    let text = document.to_step_string()?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Render a document to an in-memory string.
pub fn write_step_to_buffer(document: &StepDocument) -> Result<String, StepError> {
    document.to_step_string()
}
