//! Field/method descriptor parsing (§4.2).
//!
//! A descriptor is a compact string encoding of a JVM type or method
//! signature, e.g. `I` for `int`, `[Ljava/lang/String;` for `String[]`,
//! `(IF)Ljava/lang/String;` for a `String m(int, float)` method.

use std::fmt;

use thiserror::Error;

/// A JVM type, including the internal-use-only variants that appear in
/// verification frames (`ReturnAddress`, `Uninitialized`, ...) rather than
/// in source descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
    Boolean,
    Void,
    Class(String),
    Array(Box<Type>),
    /// A descriptor that failed to parse, preserved verbatim rather than
    /// raising — the caller decides whether that's fatal.
    Invalid(String),
    ReturnAddress,
    Uninitialized { source: u32 },
    UninitializedThis,
    Top,
    Null,
}

impl Type {
    fn descriptor_char(&self) -> Option<char> {
        Some(match self {
            Type::Byte => 'B',
            Type::Short => 'S',
            Type::Int => 'I',
            Type::Long => 'J',
            Type::Char => 'C',
            Type::Float => 'F',
            Type::Double => 'D',
            Type::Boolean => 'Z',
            Type::Void => 'V',
            _ => return None,
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("empty descriptor")]
    EmptyDescriptor,
    #[error("trailing data after descriptor: `{0}`")]
    TrailingData(String),
    #[error("invalid type at `{0}`")]
    InvalidType(String),
    #[error("method descriptor missing `(`")]
    MissingParen,
}

/// A `Class` constant's unwrapped name, as produced by `parse_reference`:
/// either a bare internal name (`java/lang/Object`) or an array/object
/// descriptor (`[I`, `Ljava/lang/String;`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Internal(String),
    Descriptor(Type),
}

/// Parses one type starting at `chars`, returning the type and the
/// remainder. Shared by `parse_field`, `parse_method`'s argument loop, and
/// array-element recursion.
fn parse_one(s: &str) -> Result<(Type, &str), DescriptorError> {
    let mut chars = s.char_indices();
    let (_, first) = chars.next().ok_or(DescriptorError::EmptyDescriptor)?;
    match first {
        'B' => Ok((Type::Byte, &s[1..])),
        'S' => Ok((Type::Short, &s[1..])),
        'I' => Ok((Type::Int, &s[1..])),
        'J' => Ok((Type::Long, &s[1..])),
        'C' => Ok((Type::Char, &s[1..])),
        'F' => Ok((Type::Float, &s[1..])),
        'D' => Ok((Type::Double, &s[1..])),
        'Z' => Ok((Type::Boolean, &s[1..])),
        'V' => Ok((Type::Void, &s[1..])),
        'L' => match s.find(';') {
            Some(end) => Ok((Type::Class(s[1..end].to_string()), &s[end + 1..])),
            None => Err(DescriptorError::InvalidType(s.to_string())),
        },
        '[' => {
            let (element, rest) = parse_one(&s[1..])?;
            Ok((Type::Array(Box::new(element)), rest))
        }
        _ => Err(DescriptorError::InvalidType(s.to_string())),
    }
}

/// Decodes a field descriptor. `void` is rejected (it's only valid as a
/// method's return type).
pub fn parse_field(s: &str) -> Result<Type, DescriptorError> {
    if s.is_empty() {
        return Err(DescriptorError::EmptyDescriptor);
    }
    let (ty, rest) = parse_one(s)?;
    if !rest.is_empty() {
        return Err(DescriptorError::TrailingData(rest.to_string()));
    }
    if ty == Type::Void {
        return Err(DescriptorError::InvalidType(s.to_string()));
    }
    Ok(ty)
}

/// Decodes a method descriptor `(ArgTypes)ReturnType`. Arguments may be
/// empty; the return type may be `void`.
pub fn parse_method(s: &str) -> Result<(Vec<Type>, Type), DescriptorError> {
    let rest = s.strip_prefix('(').ok_or(DescriptorError::MissingParen)?;
    let mut args = Vec::new();
    let mut cursor = rest;
    loop {
        if let Some(after) = cursor.strip_prefix(')') {
            let (ret, trailing) = parse_one(after)?;
            if !trailing.is_empty() {
                return Err(DescriptorError::TrailingData(trailing.to_string()));
            }
            return Ok((args, ret));
        }
        if cursor.is_empty() {
            return Err(DescriptorError::InvalidType(s.to_string()));
        }
        let (ty, next) = parse_one(cursor)?;
        if matches!(
            ty,
            Type::Void
                | Type::ReturnAddress
                | Type::Uninitialized { .. }
                | Type::UninitializedThis
                | Type::Top
                | Type::Null
        ) {
            return Err(DescriptorError::InvalidType(s.to_string()));
        }
        args.push(ty);
        cursor = next;
    }
}

/// Unwraps a `Class` constant's UTF8 payload: either a bare internal name
/// (no `L`/`[` prefix) or a full field descriptor.
pub fn parse_reference(s: &str) -> Reference {
    if s.starts_with('[') {
        match parse_one(s) {
            Ok((ty, rest)) if rest.is_empty() => Reference::Descriptor(ty),
            _ => Reference::Descriptor(Type::Invalid(s.to_string())),
        }
    } else if let Some(rest) = s.strip_prefix('L') {
        match rest.strip_suffix(';') {
            Some(name) => Reference::Descriptor(Type::Class(name.to_string())),
            None => Reference::Internal(s.to_string()),
        }
    } else {
        Reference::Internal(s.to_string())
    }
}

fn write_type(ty: &Type, out: &mut String) {
    if let Some(c) = ty.descriptor_char() {
        out.push(c);
        return;
    }
    match ty {
        Type::Class(name) => {
            out.push('L');
            out.push_str(name);
            out.push(';');
        }
        Type::Array(element) => {
            out.push('[');
            write_type(element, out);
        }
        Type::Invalid(raw) => out.push_str(raw),
        other => panic!("type {other:?} has no source descriptor form"),
    }
}

/// Encodes a field descriptor. Inverse of [`parse_field`].
pub fn to_field_descriptor(ty: &Type) -> String {
    let mut out = String::new();
    write_type(ty, &mut out);
    out
}

/// Encodes a method descriptor. Inverse of [`parse_method`].
pub fn to_method_descriptor(args: &[Type], ret: &Type) -> String {
    let mut out = String::from("(");
    for arg in args {
        write_type(arg, &mut out);
    }
    out.push(')');
    write_type(ret, &mut out);
    out
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Class(name) => write!(f, "{name}"),
            Type::Array(element) => write!(f, "{element}[]"),
            other => write!(f, "{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    /// A `Type` restricted to the variants that actually have a source
    /// descriptor form, for round-trip property tests — `ReturnAddress`,
    /// `Uninitialized`, etc. have no inverse and would make `to_field_descriptor`
    /// panic.
    #[derive(Debug, Clone)]
    struct SourceType(Type);

    impl Arbitrary for SourceType {
        fn arbitrary(g: &mut Gen) -> Self {
            fn gen_type(g: &mut Gen, depth: u32) -> Type {
                let choices: &[fn() -> Type] = &[
                    || Type::Byte,
                    || Type::Short,
                    || Type::Int,
                    || Type::Long,
                    || Type::Char,
                    || Type::Float,
                    || Type::Double,
                    || Type::Boolean,
                    || Type::Class("java/lang/Object".to_string()),
                ];
                if depth > 3 {
                    return (g.choose(choices).unwrap())();
                }
                // Bias towards an array wrapper a third of the time, to
                // exercise nested descriptors without blowing the stack.
                if bool::arbitrary(g) && bool::arbitrary(g) {
                    Type::Array(Box::new(gen_type(g, depth + 1)))
                } else {
                    (g.choose(choices).unwrap())()
                }
            }
            SourceType(gen_type(g, 0))
        }
    }

    #[quickcheck]
    fn field_descriptor_round_trips(ty: SourceType) -> bool {
        parse_field(&to_field_descriptor(&ty.0)) == Ok(ty.0)
    }

    #[quickcheck]
    fn method_descriptor_round_trips(args: Vec<SourceType>, ret: SourceType) -> bool {
        let args: Vec<Type> = args.into_iter().map(|t| t.0).collect();
        let encoded = to_method_descriptor(&args, &ret.0);
        parse_method(&encoded) == Ok((args, ret.0))
    }

    #[test]
    fn parses_primitives() {
        assert_eq!(parse_field("I").unwrap(), Type::Int);
        assert_eq!(parse_field("Z").unwrap(), Type::Boolean);
        assert!(parse_field("V").is_err());
    }

    #[test]
    fn parses_class_and_array() {
        assert_eq!(
            parse_field("Ljava/lang/String;").unwrap(),
            Type::Class("java/lang/String".to_string())
        );
        assert_eq!(
            parse_field("[[I").unwrap(),
            Type::Array(Box::new(Type::Array(Box::new(Type::Int))))
        );
    }

    #[test]
    fn rejects_trailing_data() {
        assert_eq!(
            parse_field("II"),
            Err(DescriptorError::TrailingData("I".to_string()))
        );
    }

    #[test]
    fn parses_method_descriptor() {
        let (args, ret) = parse_method("(IF)Ljava/lang/String;").unwrap();
        assert_eq!(args, vec![Type::Int, Type::Float]);
        assert_eq!(ret, Type::Class("java/lang/String".to_string()));
    }

    #[test]
    fn parses_void_returning_method_with_no_args() {
        let (args, ret) = parse_method("()V").unwrap();
        assert!(args.is_empty());
        assert_eq!(ret, Type::Void);
    }

    #[test]
    fn rejects_void_argument() {
        assert_eq!(
            parse_method("(V)V"),
            Err(DescriptorError::InvalidType("(V)V".to_string()))
        );
        assert_eq!(
            parse_method("(IVF)V"),
            Err(DescriptorError::InvalidType("(IVF)V".to_string()))
        );
    }

    #[test]
    fn method_descriptor_requires_open_paren() {
        assert_eq!(parse_method("I)V"), Err(DescriptorError::MissingParen));
    }

    #[test]
    fn reference_distinguishes_internal_name_from_descriptor() {
        assert_eq!(
            parse_reference("java/lang/Object"),
            Reference::Internal("java/lang/Object".to_string())
        );
        assert_eq!(
            parse_reference("[I"),
            Reference::Descriptor(Type::Array(Box::new(Type::Int)))
        );
    }

    #[test]
    fn round_trips_field_descriptor() {
        let ty = Type::Array(Box::new(Type::Class("java/lang/Object".to_string())));
        assert_eq!(parse_field(&to_field_descriptor(&ty)).unwrap(), ty);
    }

    #[test]
    fn round_trips_method_descriptor() {
        let args = vec![Type::Int, Type::Array(Box::new(Type::Long))];
        let ret = Type::Void;
        let encoded = to_method_descriptor(&args, &ret);
        assert_eq!(parse_method(&encoded).unwrap(), (args, ret));
    }
}
