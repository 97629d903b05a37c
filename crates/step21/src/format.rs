//! Attribute rendering: one [`Attribute`] to its Part 21 textual form.

use std::fmt::Write as _;

use crate::error::StepError;
use crate::escape::encode_string;
use crate::model::{Attribute, EntityKey};

/// Resolves a [`Attribute::Reference`] to its assigned integer id.
///
/// Implemented by the entity compiler; resolving a reference to an entity
/// that has not been compiled yet compiles it first, so the id is always
/// known by the time the `#id` text is produced.
pub trait ResolveEntity {
    /// Return the id for `key`, compiling the entity if necessary.
    fn resolve(&mut self, key: EntityKey) -> Result<u64, StepError>;
}

/// Render one attribute to its textual form.
///
/// Total for every variant except `Reference`, whose resolver may fail on
/// an unknown key or a reference cycle.
pub fn render_attribute(
    attribute: &Attribute,
    resolver: &mut impl ResolveEntity,
) -> Result<String, StepError> {
    let mut out = String::new();
    write_attribute(&mut out, attribute, resolver)?;
    Ok(out)
}

fn write_attribute(
    out: &mut String,
    attribute: &Attribute,
    resolver: &mut impl ResolveEntity,
) -> Result<(), StepError> {
    match attribute {
        Attribute::Null => out.push('$'),
        Attribute::Derived => out.push('*'),
        Attribute::Integer(v) => {
            let _ = write!(out, "{v}");
        }
        Attribute::Real(v) => out.push_str(&format_real(*v)),
        Attribute::Text(s) => {
            out.push('\'');
            out.push_str(&encode_string(s));
            out.push('\'');
        }
        Attribute::Binary(hex) => {
            // Payload is caller-supplied hex digits, passed through verbatim.
            out.push('"');
            out.push_str(hex);
            out.push('"');
        }
        Attribute::Enumeration(name) => {
            let _ = write!(out, ".{name}.");
        }
        Attribute::Boolean(b) => out.push_str(if *b { ".T." } else { ".F." }),
        Attribute::Typed { type_name, value } => {
            out.push_str(type_name);
            out.push('(');
            write_attribute(out, value, resolver)?;
            out.push(')');
        }
        Attribute::List(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_attribute(out, item, resolver)?;
            }
            out.push(')');
        }
        Attribute::Reference(key) => {
            let id = resolver.resolve(*key)?;
            let _ = write!(out, "#{id}");
        }
    }
    Ok(())
}

/// Format a real for Part 21: shortest round-trippable decimal, guaranteed
/// to carry a decimal point so reals stay distinguishable from integers.
///
/// `Display` for `f64` never uses exponent notation (that is `{:e}`), so
/// appending the point when missing is the only adjustment needed to stay
/// inside the Part 21 real grammar.
pub fn format_real(value: f64) -> String {
    let mut s = format!("{value}");
    if !s.contains('.') {
        s.push('.');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Resolver for attributes that contain no references.
    struct NoRefs;

    impl ResolveEntity for NoRefs {
        fn resolve(&mut self, key: EntityKey) -> Result<u64, StepError> {
            Err(StepError::UnknownEntityKey(key))
        }
    }

    fn render(attribute: &Attribute) -> String {
        render_attribute(attribute, &mut NoRefs).unwrap()
    }

    #[test]
    fn test_null_and_derived() {
        assert_eq!(render(&Attribute::Null), "$");
        assert_eq!(render(&Attribute::Derived), "*");
    }

    #[test]
    fn test_integer() {
        assert_eq!(render(&Attribute::Integer(0)), "0");
        assert_eq!(render(&Attribute::Integer(42)), "42");
        assert_eq!(render(&Attribute::Integer(-7)), "-7");
    }

    #[test]
    fn test_real_trailing_dot() {
        assert_eq!(format_real(2.0), "2.");
        assert_eq!(format_real(2.5), "2.5");
        assert_eq!(format_real(-3.0), "-3.");
        assert_eq!(format_real(0.015), "0.015");
        assert_eq!(format_real(0.0), "0.");
    }

    #[test]
    fn test_real_stays_in_grammar() {
        // Always a decimal point, never a lower-case exponent, and the text
        // parses back to the same value.
        for v in [1e300, 2.5e-10, -4.25e18, 123456789.125] {
            let s = format_real(v);
            assert!(s.contains('.'), "got {s}");
            assert!(!s.contains('e'), "got {s}");
            assert_eq!(s.parse::<f64>().unwrap(), v, "got {s}");
        }
    }

    #[test]
    fn test_text_quoted_and_escaped() {
        assert_eq!(render(&Attribute::Text("O'Brien".into())), "'O''Brien'");
        assert_eq!(render(&Attribute::Text(String::new())), "''");
    }

    #[test]
    fn test_binary_passthrough() {
        assert_eq!(render(&Attribute::Binary("0FF".into())), "\"0FF\"");
    }

    #[test]
    fn test_enumeration_and_boolean() {
        assert_eq!(render(&Attribute::enumeration("unspecified")), ".UNSPECIFIED.");
        assert_eq!(render(&Attribute::Boolean(true)), ".T.");
        assert_eq!(render(&Attribute::Boolean(false)), ".F.");
    }

    #[test]
    fn test_typed_value() {
        let a = Attribute::typed("length_measure", Attribute::Real(2.0));
        assert_eq!(render(&a), "LENGTH_MEASURE(2.)");
    }

    #[test]
    fn test_list() {
        let a = Attribute::List(vec![
            Attribute::Real(1.0),
            Attribute::Real(2.5),
            Attribute::List(vec![Attribute::Integer(3)]),
        ]);
        assert_eq!(render(&a), "(1.,2.5,(3))");
        assert_eq!(render(&Attribute::List(vec![])), "()");
    }

    #[test]
    fn test_reference_uses_resolver() {
        struct Fixed(u64);
        impl ResolveEntity for Fixed {
            fn resolve(&mut self, _key: EntityKey) -> Result<u64, StepError> {
                Ok(self.0)
            }
        }
        let key = EntityKey::default();
        let text = render_attribute(&Attribute::Reference(key), &mut Fixed(17)).unwrap();
        assert_eq!(text, "#17");
    }
}
