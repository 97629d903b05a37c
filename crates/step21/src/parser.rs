//! Part 21 parser: reads STEP text back into a [`StepDocument`].
//!
//! Parsing is two-phase. A recursive descent over the token stream first
//! produces raw entities whose references are still `#id` integers; a
//! resolve pass then materializes every entity into the document's
//! [`EntityStore`], turning each `#id` into a key (placeholders make
//! forward references unproblematic). Data entities that no other entity
//! references become the document roots, in file order; a file whose
//! entities form a reference cycle is rejected, since no root could ever
//! reach them.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::compile::Compiler;
use crate::error::StepError;
use crate::header::FileHeader;
use crate::lexer::{Lexer, Token};
use crate::model::{Attribute, Entity, EntityKey, EntityStore};
use crate::writer::StepDocument;

/// Read a STEP file from a path.
pub fn read_step(path: impl AsRef<Path>) -> Result<StepDocument, StepError> {
    let data = std::fs::read(path)?;
    read_step_from_buffer(&data)
}

/// Read a STEP file from a byte buffer.
pub fn read_step_from_buffer(data: &[u8]) -> Result<StepDocument, StepError> {
    let tokens = Lexer::new(data).tokenize()?;
    let raw = Parser { tokens, pos: 0 }.parse_file()?;
    resolve(raw)
}

/// An attribute value whose entity references are still raw `#id`s.
#[derive(Debug, Clone, PartialEq)]
enum RawValue {
    Ref(u64),
    Text(String),
    Real(f64),
    Integer(i64),
    Enum(String),
    Binary(String),
    Null,
    Derived,
    List(Vec<RawValue>),
    Typed { type_name: String, args: Vec<RawValue> },
}

#[derive(Debug, Clone)]
struct RawEntity {
    /// Entity ID; 0 for header pseudo-entities, which carry none.
    id: u64,
    type_name: String,
    args: Vec<RawValue>,
}

#[derive(Debug, Default)]
struct RawFile {
    header: Vec<RawEntity>,
    data: Vec<RawEntity>,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn parse_file(mut self) -> Result<RawFile, StepError> {
        let mut file = RawFile::default();

        self.expect_keyword("ISO-10303-21")?;
        self.expect(&Token::Semicolon)?;

        loop {
            if self.take_keyword("HEADER") {
                self.expect(&Token::Semicolon)?;
                file.header = self.parse_header_entities()?;
                self.expect_keyword("ENDSEC")?;
                self.expect(&Token::Semicolon)?;
            } else if self.take_keyword("DATA") {
                self.expect(&Token::Semicolon)?;
                file.data = self.parse_data_entities()?;
                self.expect_keyword("ENDSEC")?;
                self.expect(&Token::Semicolon)?;
            } else if self.take_keyword("END-ISO-10303-21") {
                self.expect(&Token::Semicolon)?;
                break;
            } else {
                let token = self.peek().cloned();
                return Err(StepError::parser(None, format!("unexpected token: {token:?}")));
            }
        }
        Ok(file)
    }

    fn parse_header_entities(&mut self) -> Result<Vec<RawEntity>, StepError> {
        let mut entities = Vec::new();
        // Header entities have no #id, just TYPE(args);
        while let Some(Token::Keyword(name)) = self.peek() {
            if name == "ENDSEC" {
                break;
            }
            let type_name = name.clone();
            self.advance();
            let args = self.parse_args()?;
            self.expect(&Token::Semicolon)?;
            entities.push(RawEntity {
                id: 0,
                type_name,
                args,
            });
        }
        Ok(entities)
    }

    fn parse_data_entities(&mut self) -> Result<Vec<RawEntity>, StepError> {
        let mut entities = Vec::new();
        while let Some(&Token::EntityRef(id)) = self.peek() {
            self.advance();
            self.expect(&Token::Equals)?;
            let type_name = match self.peek() {
                Some(Token::Keyword(name)) => {
                    let name = name.clone();
                    self.advance();
                    name
                }
                other => {
                    return Err(StepError::parser(
                        Some(id),
                        format!("expected type name, got {other:?}"),
                    ));
                }
            };
            let args = self.parse_args()?;
            self.expect(&Token::Semicolon)?;
            entities.push(RawEntity {
                id,
                type_name,
                args,
            });
        }
        Ok(entities)
    }

    fn parse_args(&mut self) -> Result<Vec<RawValue>, StepError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            args.push(self.parse_value()?);
            while self.peek() == Some(&Token::Comma) {
                self.advance();
                args.push(self.parse_value()?);
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn parse_value(&mut self) -> Result<RawValue, StepError> {
        let value = match self.peek().cloned() {
            Some(Token::EntityRef(id)) => RawValue::Ref(id),
            Some(Token::String(s)) => RawValue::Text(s),
            Some(Token::Real(v)) => RawValue::Real(v),
            Some(Token::Integer(v)) => RawValue::Integer(v),
            Some(Token::Enum(name)) => RawValue::Enum(name),
            Some(Token::Binary(hex)) => RawValue::Binary(hex),
            Some(Token::Dollar) => RawValue::Null,
            Some(Token::Asterisk) => RawValue::Derived,
            Some(Token::LParen) => {
                let items = self.parse_args()?;
                return Ok(RawValue::List(items));
            }
            Some(Token::Keyword(type_name)) => {
                self.advance();
                let args = self.parse_args()?;
                return Ok(RawValue::Typed { type_name, args });
            }
            other => {
                return Err(StepError::parser(None, format!("unexpected value: {other:?}")));
            }
        };
        self.advance();
        Ok(value)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn take_keyword(&mut self, name: &str) -> bool {
        match self.peek() {
            Some(Token::Keyword(k)) if k == name => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), StepError> {
        if self.peek() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            let actual = self.peek().cloned();
            Err(StepError::parser(
                None,
                format!("expected {expected:?}, got {actual:?}"),
            ))
        }
    }

    fn expect_keyword(&mut self, name: &str) -> Result<(), StepError> {
        if self.take_keyword(name) {
            Ok(())
        } else {
            let actual = self.peek().cloned();
            Err(StepError::parser(
                None,
                format!("expected keyword '{name}', got {actual:?}"),
            ))
        }
    }
}

/// Materialize raw entities into a document.
fn resolve(raw: RawFile) -> Result<StepDocument, StepError> {
    let mut store = EntityStore::new();

    // Placeholders first, so forward references resolve.
    let mut key_of: HashMap<u64, EntityKey> = HashMap::new();
    for entity in &raw.data {
        if key_of.contains_key(&entity.id) {
            return Err(StepError::parser(
                Some(entity.id),
                "duplicate entity ID".to_string(),
            ));
        }
        key_of.insert(entity.id, store.insert(Entity::new(&entity.type_name)));
    }

    let mut referenced: HashSet<u64> = HashSet::new();
    for entity in &raw.data {
        let attributes: Vec<Attribute> = entity
            .args
            .iter()
            .map(|value| resolve_value(value, &key_of, &mut referenced))
            .collect::<Result<_, _>>()?;
        let key = key_of[&entity.id];
        store.get_mut(key).expect("placeholder inserted above").attributes = attributes;
    }

    // Header pseudo-entities live outside the store and may not hold refs.
    let mut header_entities = Vec::new();
    for entity in &raw.header {
        let no_keys = HashMap::new();
        let mut no_refs = HashSet::new();
        let attributes: Vec<Attribute> = entity
            .args
            .iter()
            .map(|value| resolve_value(value, &no_keys, &mut no_refs))
            .collect::<Result<_, _>>()?;
        header_entities.push(Entity {
            type_name: entity.type_name.clone(),
            attributes,
        });
    }

    let roots: Vec<EntityKey> = raw
        .data
        .iter()
        .filter(|e| !referenced.contains(&e.id))
        .map(|e| key_of[&e.id])
        .collect();

    // A component whose members all reference one another has no root and
    // would be invisible to the writer. Compiling the full data section in
    // file order rejects such cycles instead of dropping the entities.
    let all_keys: Vec<EntityKey> = raw.data.iter().map(|e| key_of[&e.id]).collect();
    Compiler::new(&store).compile(&all_keys)?;

    Ok(StepDocument {
        header: FileHeader::from_entities(&header_entities),
        store,
        roots,
    })
}

fn resolve_value(
    value: &RawValue,
    key_of: &HashMap<u64, EntityKey>,
    referenced: &mut HashSet<u64>,
) -> Result<Attribute, StepError> {
    Ok(match value {
        RawValue::Ref(id) => {
            let key = *key_of.get(id).ok_or(StepError::MissingEntity(*id))?;
            referenced.insert(*id);
            Attribute::Reference(key)
        }
        RawValue::Text(s) => Attribute::Text(s.clone()),
        RawValue::Real(v) => Attribute::Real(*v),
        RawValue::Integer(v) => Attribute::Integer(*v),
        // .T. / .F. write back as booleans; their text form is identical.
        RawValue::Enum(name) if name == "T" => Attribute::Boolean(true),
        RawValue::Enum(name) if name == "F" => Attribute::Boolean(false),
        RawValue::Enum(name) => Attribute::Enumeration(name.clone()),
        RawValue::Binary(hex) => Attribute::Binary(hex.clone()),
        RawValue::Null => Attribute::Null,
        RawValue::Derived => Attribute::Derived,
        RawValue::List(items) => Attribute::List(
            items
                .iter()
                .map(|item| resolve_value(item, key_of, referenced))
                .collect::<Result<_, _>>()?,
        ),
        RawValue::Typed { type_name, args } => {
            // A SELECT wrapper carries exactly one value; tolerate more by
            // folding them into a list.
            let mut values: Vec<Attribute> = args
                .iter()
                .map(|item| resolve_value(item, key_of, referenced))
                .collect::<Result<_, _>>()?;
            let inner = match values.len() {
                1 => values.pop().expect("length checked"),
                _ => Attribute::List(values),
            };
            Attribute::typed(type_name, inner)
        }
    })
}
