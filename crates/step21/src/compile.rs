//! Entity graph flattening: id assignment and structural deduplication.
//!
//! The compiler walks an entity forest depth-first. A referenced entity is
//! compiled before the text of the referring attribute can be produced, so
//! children receive lower ids than the parents that first reach them. Two
//! entities whose rendered bodies are byte-identical collapse to a single
//! record, however many places reference them (hash-consing on the rendered
//! text). Ids are dense, starting at 1, in first-discovery order.

use std::collections::HashMap;

use crate::error::StepError;
use crate::format::{render_attribute, ResolveEntity};
use crate::model::{EntityKey, EntityStore};

/// One flattened entity record, destined for a `#id=TYPE(...)` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledEntity {
    /// Assigned identifier, unique and dense within one table.
    pub id: u64,
    /// Entity type name.
    pub type_name: String,
    /// Rendered attribute text, comma-joined, without the parentheses.
    pub attributes: String,
}

impl CompiledEntity {
    /// The rendered entity body, `TYPE_NAME(attr1,attr2,...)`.
    pub fn body(&self) -> String {
        format!("{}({})", self.type_name, self.attributes)
    }
}

/// The result of one successful compile: records in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    records: Vec<CompiledEntity>,
}

impl EntityTable {
    /// The compiled records, ordered by id (`1..=n`, no gaps).
    pub fn records(&self) -> &[CompiledEntity] {
        &self.records
    }

    /// Number of distinct compiled entities.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Compilation context for one compile call.
///
/// Owns the in-progress table; the formatter resolves reference attributes
/// through it (see [`ResolveEntity`]), which is what triggers compilation
/// of not-yet-seen children.
pub struct Compiler<'a> {
    store: &'a EntityStore,
    /// Hash-cons map: rendered body text to assigned id.
    ids: HashMap<String, u64>,
    records: Vec<CompiledEntity>,
    /// Memo: keys already compiled, to avoid re-rendering shared subtrees.
    compiled: HashMap<EntityKey, u64>,
    /// Keys currently being compiled, innermost last; a repeat is a cycle.
    visiting: Vec<EntityKey>,
}

impl<'a> Compiler<'a> {
    /// Create a compiler over `store` with an empty table.
    pub fn new(store: &'a EntityStore) -> Self {
        Self {
            store,
            ids: HashMap::new(),
            records: Vec::new(),
            compiled: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    /// Compile an entity forest into a table.
    ///
    /// Roots are processed in the order given. Fails wholesale on a key not
    /// present in the store or on a reference cycle; no partial table is
    /// ever returned.
    pub fn compile(mut self, roots: &[EntityKey]) -> Result<EntityTable, StepError> {
        for &root in roots {
            self.compile_entity(root)?;
        }
        Ok(EntityTable {
            records: self.records,
        })
    }

    /// Compile one entity, returning its assigned (or reused) id.
    fn compile_entity(&mut self, key: EntityKey) -> Result<u64, StepError> {
        if let Some(&id) = self.compiled.get(&key) {
            return Ok(id);
        }
        if self.visiting.contains(&key) {
            return Err(self.cycle_error(key));
        }
        let store = self.store;
        let entity = store.get(key).ok_or(StepError::UnknownEntityKey(key))?;

        self.visiting.push(key);
        let mut attributes = String::new();
        for (i, attribute) in entity.attributes.iter().enumerate() {
            if i > 0 {
                attributes.push(',');
            }
            let text = render_attribute(attribute, self)?;
            attributes.push_str(&text);
        }
        self.visiting.pop();

        let body = format!("{}({attributes})", entity.type_name);
        let id = match self.ids.get(&body) {
            Some(&id) => id,
            None => {
                let id = self.records.len() as u64 + 1;
                self.records.push(CompiledEntity {
                    id,
                    type_name: entity.type_name.clone(),
                    attributes,
                });
                self.ids.insert(body, id);
                id
            }
        };
        self.compiled.insert(key, id);
        Ok(id)
    }

    fn cycle_error(&self, repeat: EntityKey) -> StepError {
        let start = self
            .visiting
            .iter()
            .position(|&k| k == repeat)
            .unwrap_or(0);
        let name = |k: EntityKey| {
            self.store
                .get(k)
                .map(|e| e.type_name.clone())
                .unwrap_or_else(|| "?".into())
        };
        let mut chain: Vec<String> = self.visiting[start..].iter().map(|&k| name(k)).collect();
        chain.push(name(repeat));
        StepError::CircularReference { chain }
    }
}

impl ResolveEntity for Compiler<'_> {
    fn resolve(&mut self, key: EntityKey) -> Result<u64, StepError> {
        self.compile_entity(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, Entity};

    fn point(x: f64, y: f64, z: f64) -> Entity {
        Entity::new("CARTESIAN_POINT").with(Attribute::List(vec![
            Attribute::Real(x),
            Attribute::Real(y),
            Attribute::Real(z),
        ]))
    }

    #[test]
    fn test_independent_roots_in_order() {
        let mut store = EntityStore::new();
        let a = store.insert(Entity::new("A"));
        let b = store.insert(Entity::new("B"));
        let c = store.insert(Entity::new("C"));
        let table = Compiler::new(&store).compile(&[a, b, c]).unwrap();
        let bodies: Vec<String> = table.records().iter().map(|r| r.body()).collect();
        assert_eq!(bodies, vec!["A()", "B()", "C()"]);
        let ids: Vec<u64> = table.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_child_gets_lower_id_than_parent() {
        let mut store = EntityStore::new();
        let p = store.insert(point(1.0, 2.0, 3.0));
        let parent = store.insert(
            Entity::new("VERTEX_POINT")
                .with(Attribute::Text("".into()))
                .with(Attribute::Reference(p)),
        );
        let table = Compiler::new(&store).compile(&[parent]).unwrap();
        assert_eq!(table.records()[0].body(), "CARTESIAN_POINT((1.,2.,3.))");
        assert_eq!(table.records()[0].id, 1);
        assert_eq!(table.records()[1].body(), "VERTEX_POINT('',#1)");
        assert_eq!(table.records()[1].id, 2);
    }

    #[test]
    fn test_shared_child_compiles_once() {
        // Two structurally identical points under different parents collapse
        // to one record, and both parents carry the same #id.
        let mut store = EntityStore::new();
        let p1 = store.insert(point(1.0, 2.0, 3.0));
        let p2 = store.insert(point(1.0, 2.0, 3.0));
        let a = store.insert(Entity::new("VERTEX_POINT").with(Attribute::Reference(p1)));
        let b = store.insert(Entity::new("EDGE_START").with(Attribute::Reference(p2)));
        let table = Compiler::new(&store).compile(&[a, b]).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.records()[0].body(), "CARTESIAN_POINT((1.,2.,3.))");
        assert_eq!(table.records()[1].attributes, "#1");
        assert_eq!(table.records()[2].attributes, "#1");
    }

    #[test]
    fn test_same_key_referenced_twice() {
        let mut store = EntityStore::new();
        let p = store.insert(point(0.0, 0.0, 0.0));
        let parent = store.insert(
            Entity::new("LINE_SEGMENT")
                .with(Attribute::Reference(p))
                .with(Attribute::Reference(p)),
        );
        let table = Compiler::new(&store).compile(&[parent]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[1].attributes, "#1,#1");
    }

    #[test]
    fn test_duplicate_roots_dedup() {
        let mut store = EntityStore::new();
        let a = store.insert(point(5.0, 5.0, 5.0));
        let b = store.insert(point(5.0, 5.0, 5.0));
        let table = Compiler::new(&store).compile(&[a, b]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].id, 1);
    }

    #[test]
    fn test_id_density() {
        let mut store = EntityStore::new();
        let mut roots = Vec::new();
        for i in 0..10 {
            roots.push(store.insert(point(i as f64, 0.0, 0.0)));
        }
        // Interleave duplicates of the even points.
        for i in (0..10).step_by(2) {
            roots.push(store.insert(point(i as f64, 0.0, 0.0)));
        }
        let table = Compiler::new(&store).compile(&roots).unwrap();
        assert_eq!(table.len(), 10);
        for (i, rec) in table.records().iter().enumerate() {
            assert_eq!(rec.id, i as u64 + 1);
        }
    }

    #[test]
    fn test_references_inside_lists() {
        let mut store = EntityStore::new();
        let p = store.insert(point(1.0, 0.0, 0.0));
        let q = store.insert(point(0.0, 1.0, 0.0));
        let poly = store.insert(Entity::new("POLYLINE").with(Attribute::List(vec![
            Attribute::Reference(p),
            Attribute::Reference(q),
            Attribute::Reference(p),
        ])));
        let table = Compiler::new(&store).compile(&[poly]).unwrap();
        assert_eq!(table.records()[2].attributes, "(#1,#2,#1)");
    }

    #[test]
    fn test_cycle_rejected() {
        let mut store = EntityStore::new();
        let a = store.insert(Entity::new("A"));
        let b = store.insert(Entity::new("B").with(Attribute::Reference(a)));
        store.get_mut(a).unwrap().attributes.push(Attribute::Reference(b));
        let err = Compiler::new(&store).compile(&[a]).unwrap_err();
        match err {
            StepError::CircularReference { chain } => {
                assert_eq!(chain, vec!["A", "B", "A"]);
            }
            other => panic!("expected CircularReference, got {other:?}"),
        }
    }

    #[test]
    fn test_self_cycle_rejected() {
        let mut store = EntityStore::new();
        let a = store.insert(Entity::new("SELF_REF"));
        store.get_mut(a).unwrap().attributes.push(Attribute::Reference(a));
        let err = Compiler::new(&store).compile(&[a]).unwrap_err();
        assert!(matches!(err, StepError::CircularReference { .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let store = EntityStore::new();
        let mut other = EntityStore::new();
        let stray = other.insert(Entity::new("X"));
        let err = Compiler::new(&store).compile(&[stray]).unwrap_err();
        assert!(matches!(err, StepError::UnknownEntityKey(_)));
    }
}
