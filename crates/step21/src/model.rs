//! In-memory model of STEP entities and attribute values.
//!
//! Entities are plain values held in an [`EntityStore`] arena; attributes
//! that reference other entities hold an [`EntityKey`] into the same store.
//! Nothing here has a `#id` yet — integer identifiers are assigned by the
//! compiler when a document is written out.

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Key identifying an [`Entity`] within an [`EntityStore`].
    pub struct EntityKey;
}

/// One attribute slot of a STEP entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// Explicitly absent value (`$`).
    Null,
    /// Value supplied by a derivation rule, not stored (`*`).
    Derived,
    /// Integer literal.
    Integer(i64),
    /// Real literal, always written with a decimal point.
    Real(f64),
    /// String literal, escaped on output per Part 21.
    Text(String),
    /// Pre-encoded binary literal; the payload must already be hex digits.
    Binary(String),
    /// Enumeration value, written as `.NAME.`.
    Enumeration(String),
    /// Boolean, written as `.T.` / `.F.`.
    Boolean(bool),
    /// SELECT-type wrapper: `TYPE_NAME(value)`.
    Typed {
        /// The wrapping type name.
        type_name: String,
        /// The wrapped value.
        value: Box<Attribute>,
    },
    /// Parenthesized list of values; may nest.
    List(Vec<Attribute>),
    /// Reference to another entity in the same store.
    Reference(EntityKey),
}

impl Attribute {
    /// Build an enumeration attribute, normalizing the name to upper case.
    pub fn enumeration(name: &str) -> Self {
        Attribute::Enumeration(normalize_name(name))
    }

    /// Build a SELECT-type wrapper, normalizing the type name to upper case.
    pub fn typed(type_name: &str, value: Attribute) -> Self {
        Attribute::Typed {
            type_name: normalize_name(type_name),
            value: Box::new(value),
        }
    }

    /// Try to get as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Attribute::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as a real number (also accepts integer).
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Attribute::Real(v) => Some(*v),
            Attribute::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to get as a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Attribute::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as an enumeration name.
    pub fn as_enumeration(&self) -> Option<&str> {
        match self {
            Attribute::Enumeration(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a list.
    pub fn as_list(&self) -> Option<&[Attribute]> {
        match self {
            Attribute::List(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as an entity reference.
    pub fn as_reference(&self) -> Option<EntityKey> {
        match self {
            Attribute::Reference(k) => Some(*k),
            _ => None,
        }
    }

    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Attribute::Null)
    }

    /// Check if this is a derived value.
    pub fn is_derived(&self) -> bool {
        matches!(self, Attribute::Derived)
    }
}

/// A STEP entity: a type name plus an ordered attribute list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entity {
    /// Entity type name, normalized to upper case (e.g., `CARTESIAN_POINT`).
    pub type_name: String,
    /// Attributes in declaration order.
    pub attributes: Vec<Attribute>,
}

impl Entity {
    /// Create an entity with no attributes, normalizing the type name.
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: normalize_name(type_name),
            attributes: Vec::new(),
        }
    }

    /// Append one attribute, builder style.
    pub fn with(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Append several attributes, builder style.
    pub fn with_all(mut self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        self.attributes.extend(attributes);
        self
    }
}

/// Normalize a type or enumeration name: trimmed, ASCII upper case.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Arena holding the entities of one document.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: SlotMap<EntityKey, Entity>,
}

impl EntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entities: SlotMap::with_key(),
        }
    }

    /// Insert an entity, returning its key.
    pub fn insert(&mut self, entity: Entity) -> EntityKey {
        self.entities.insert(entity)
    }

    /// Get an entity by key.
    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Get an entity mutably by key.
    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        self.entities.get_mut(key)
    }

    /// Check whether a key is present.
    pub fn contains_key(&self, key: EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    /// Number of entities in the store.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over `(key, entity)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.entities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("cartesian_point"), "CARTESIAN_POINT");
        assert_eq!(normalize_name("  Direction "), "DIRECTION");
        assert_eq!(normalize_name("ABSORBED_DOSE_MEASURE"), "ABSORBED_DOSE_MEASURE");
    }

    #[test]
    fn test_entity_builder() {
        let e = Entity::new("cartesian_point")
            .with(Attribute::Text("origin".into()))
            .with_all([Attribute::Real(0.0), Attribute::Real(1.0)]);
        assert_eq!(e.type_name, "CARTESIAN_POINT");
        assert_eq!(e.attributes.len(), 3);
        assert_eq!(e.attributes[0].as_text(), Some("origin"));
        assert_eq!(e.attributes[2].as_real(), Some(1.0));
    }

    #[test]
    fn test_store_round_trip() {
        let mut store = EntityStore::new();
        let k = store.insert(Entity::new("DIRECTION"));
        assert!(store.contains_key(k));
        assert_eq!(store.get(k).unwrap().type_name, "DIRECTION");
        store.get_mut(k).unwrap().attributes.push(Attribute::Null);
        assert!(store.get(k).unwrap().attributes[0].is_null());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_attribute_accessors() {
        assert_eq!(Attribute::Integer(3).as_real(), Some(3.0));
        assert_eq!(Attribute::enumeration("unspecified").as_enumeration(), Some("UNSPECIFIED"));
        assert!(Attribute::Derived.is_derived());
        assert!(Attribute::Text("x".into()).as_list().is_none());
    }
}
