//! `serde` deserializer over positioned YAML nodes
//!
//! Decoding is driven by the target type, so scalars only resolve to numbers
//! or booleans where the type asks for one. In strict mode, mapping keys that
//! a struct does not declare are collected as [`UnknownField`]s instead of
//! failing the decode, so every unknown field of a document can be reported
//! at once.

use std::fmt;

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    Unexpected, VariantAccess, Visitor,
};

use super::node::{resolve_plain, Entry, Node, NodeKind, Resolved};
use crate::error::ConfigError;
use crate::warning::Mark;

/// Decoding failure, positioned at the innermost node that caused it
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    message: String,
    mark: Option<Mark>,
}

impl DecodeError {
    pub fn new(message: impl Into<String>, mark: Mark) -> Self {
        Self {
            message: message.into(),
            mark: Some(mark),
        }
    }

    /// Attach `mark` unless a more precise one is already set
    pub fn at(mut self, mark: Mark) -> Self {
        if self.mark.is_none() {
            self.mark = Some(mark);
        }
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn mark(&self) -> Option<Mark> {
        self.mark
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mark {
            Some(mark) => write!(f, "line {}, column {}: {}", mark.line, mark.column, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DecodeError {}

impl de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self {
            message: msg.to_string(),
            mark: None,
        }
    }
}

impl From<DecodeError> for ConfigError {
    fn from(err: DecodeError) -> Self {
        let mark = err.mark.unwrap_or_default();
        ConfigError::Decode {
            message: err.message,
            line: mark.line,
            column: mark.column,
        }
    }
}

/// A mapping key that the target struct does not declare
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownField {
    pub field: String,
    /// Name of the struct the key was found in
    pub type_name: &'static str,
    pub mark: Mark,
    pub value: String,
}

/// Decode `node` into `T`
///
/// Returns the unknown fields found along the way; they are always empty
/// when `strict` is false.
pub fn from_node<T: DeserializeOwned>(
    node: &Node,
    strict: bool,
) -> Result<(T, Vec<UnknownField>), DecodeError> {
    let mut unknown = Vec::new();
    let value = T::deserialize(NodeDeserializer::new(node, &mut unknown, strict))?;
    Ok((value, unknown))
}

pub struct NodeDeserializer<'a, 'u> {
    node: &'a Node,
    unknown: &'u mut Vec<UnknownField>,
    strict: bool,
}

impl<'a, 'u> NodeDeserializer<'a, 'u> {
    pub fn new(node: &'a Node, unknown: &'u mut Vec<UnknownField>, strict: bool) -> Self {
        Self {
            node,
            unknown,
            strict,
        }
    }

    fn unexpected(&self) -> Unexpected<'a> {
        let node: &'a Node = self.node;
        match &node.kind {
            _ if node.is_null() => Unexpected::Unit,
            NodeKind::Scalar { value, plain: true } => match resolve_plain(value) {
                Resolved::Bool(b) => Unexpected::Bool(b),
                Resolved::Int(n) => Unexpected::Signed(n),
                Resolved::Uint(n) => Unexpected::Unsigned(n),
                Resolved::Float(f) => Unexpected::Float(f),
                Resolved::Null | Resolved::Str => Unexpected::Str(value),
            },
            NodeKind::Scalar { value, .. } => Unexpected::Str(value),
            NodeKind::Sequence(_) => Unexpected::Seq,
            NodeKind::Mapping(_) => Unexpected::Map,
        }
    }

    fn invalid_type(&self, expected: &dyn de::Expected) -> DecodeError {
        DecodeError::new(
            <DecodeError as de::Error>::invalid_type(self.unexpected(), expected).message,
            self.node.mark,
        )
    }

    /// Plain scalar resolved as a number
    fn number(&self, expected: &dyn de::Expected) -> Result<Resolved, DecodeError> {
        match &self.node.kind {
            NodeKind::Scalar { value, plain: true } => match resolve_plain(value) {
                n @ (Resolved::Int(_) | Resolved::Uint(_) | Resolved::Float(_)) => Ok(n),
                _ => Err(self.invalid_type(expected)),
            },
            _ => Err(self.invalid_type(expected)),
        }
    }

    fn seq(self) -> SeqDeserializer<'a, 'u> {
        let node: &'a Node = self.node;
        let items: &'a [Node] = match &node.kind {
            NodeKind::Sequence(items) => items,
            _ => &[],
        };
        SeqDeserializer {
            items: items.iter(),
            unknown: self.unknown,
            strict: self.strict,
        }
    }

    fn map(self, fields: Option<(&'static str, &'static [&'static str])>) -> MapDeserializer<'a, 'u> {
        let node: &'a Node = self.node;
        let entries: &'a [Entry] = match &node.kind {
            NodeKind::Mapping(entries) => entries,
            _ => &[],
        };
        MapDeserializer {
            entries: entries.iter(),
            value: None,
            key_mark: None,
            fields: if self.strict { fields } else { None },
            unknown: self.unknown,
            strict: self.strict,
        }
    }

    fn deserialize_integer<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        let mark = self.node.mark;
        let result = match self.number(&visitor)? {
            Resolved::Int(n) => visitor.visit_i64(n),
            Resolved::Uint(n) => visitor.visit_u64(n),
            _ => Err(self.invalid_type(&visitor)),
        };
        result.map_err(|e: DecodeError| e.at(mark))
    }

    fn deserialize_float<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        let mark = self.node.mark;
        let value = match self.number(&visitor)? {
            Resolved::Int(n) => n as f64,
            Resolved::Uint(n) => n as f64,
            Resolved::Float(f) => f,
            _ => return Err(self.invalid_type(&visitor)),
        };
        visitor.visit_f64(value).map_err(|e: DecodeError| e.at(mark))
    }
}

impl<'de, 'a, 'u> de::Deserializer<'de> for NodeDeserializer<'a, 'u> {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        let node: &'a Node = self.node;
        let mark = node.mark;
        let result = match &node.kind {
            NodeKind::Scalar { value, plain: true } => match resolve_plain(value) {
                Resolved::Null => visitor.visit_unit(),
                Resolved::Bool(b) => visitor.visit_bool(b),
                Resolved::Int(n) => visitor.visit_i64(n),
                Resolved::Uint(n) => visitor.visit_u64(n),
                Resolved::Float(f) => visitor.visit_f64(f),
                Resolved::Str => visitor.visit_str(value),
            },
            NodeKind::Scalar { value, .. } => visitor.visit_str(value),
            NodeKind::Sequence(_) => visitor.visit_seq(self.seq()),
            NodeKind::Mapping(_) => visitor.visit_map(self.map(None)),
        };
        result.map_err(|e: DecodeError| e.at(mark))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match &self.node.kind {
            NodeKind::Scalar { value, plain: true } => match resolve_plain(value) {
                Resolved::Bool(b) => visitor.visit_bool(b).map_err(|e: DecodeError| e.at(self.node.mark)),
                _ => Err(self.invalid_type(&visitor)),
            },
            _ => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_float(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_float(visitor)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_str(visitor)
    }

    /// Any scalar decodes as its text, null as the empty string
    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match &self.node.kind {
            NodeKind::Scalar { .. } => visitor
                .visit_str(self.node.scalar_value())
                .map_err(|e: DecodeError| e.at(self.node.mark)),
            _ => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match &self.node.kind {
            NodeKind::Scalar { .. } => visitor
                .visit_bytes(self.node.scalar_value().as_bytes())
                .map_err(|e: DecodeError| e.at(self.node.mark)),
            _ => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        if self.node.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        if self.node.is_null() {
            visitor.visit_unit()
        } else {
            Err(self.invalid_type(&visitor))
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_newtype_struct(self)
    }

    /// Null decodes as an empty sequence
    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        let mark = self.node.mark;
        match &self.node.kind {
            NodeKind::Sequence(_) => {}
            _ if self.node.is_null() => {}
            _ => return Err(self.invalid_type(&visitor)),
        }
        visitor.visit_seq(self.seq()).map_err(|e: DecodeError| e.at(mark))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    /// Null decodes as an empty map
    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        let mark = self.node.mark;
        match &self.node.kind {
            NodeKind::Mapping(_) => {}
            _ if self.node.is_null() => {}
            _ => return Err(self.invalid_type(&visitor)),
        }
        let mut map = self.map(None);
        visitor
            .visit_map(&mut map)
            .map_err(|e: DecodeError| e.at(map.key_mark.unwrap_or(mark)))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        let mark = self.node.mark;
        match &self.node.kind {
            NodeKind::Mapping(_) => {}
            _ if self.node.is_null() => {}
            _ => return Err(self.invalid_type(&visitor)),
        }
        // errors raised right after a key (duplicates) point at that key,
        // errors raised after the last one (missing fields) at the struct
        let mut map = self.map(Some((name, fields)));
        visitor
            .visit_map(&mut map)
            .map_err(|e: DecodeError| e.at(map.key_mark.unwrap_or(mark)))
    }

    /// Unit variants from a scalar, other variants from a single-entry map
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        let node: &'a Node = self.node;
        let mark = node.mark;
        let result = match &node.kind {
            NodeKind::Scalar { value, .. } => visitor.visit_enum(value.as_str().into_deserializer()),
            NodeKind::Mapping(entries) if entries.len() == 1 => visitor.visit_enum(EnumDeserializer {
                entry: &entries[0],
                unknown: self.unknown,
                strict: self.strict,
            }),
            _ => Err(DecodeError::new(
                format!("expected an enum variant, found {}", node.kind_name()),
                mark,
            )),
        };
        result.map_err(|e: DecodeError| e.at(mark))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }
}

struct SeqDeserializer<'a, 'u> {
    items: std::slice::Iter<'a, Node>,
    unknown: &'u mut Vec<UnknownField>,
    strict: bool,
}

impl<'de> SeqAccess<'de> for SeqDeserializer<'_, '_> {
    type Error = DecodeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, DecodeError> {
        match self.items.next() {
            Some(node) => seed
                .deserialize(NodeDeserializer::new(node, self.unknown, self.strict))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct MapDeserializer<'a, 'u> {
    entries: std::slice::Iter<'a, Entry>,
    value: Option<&'a Node>,
    /// Key most recently handed out, cleared once the entries run out
    key_mark: Option<Mark>,
    /// Struct name and declared fields, set in strict mode only
    fields: Option<(&'static str, &'static [&'static str])>,
    unknown: &'u mut Vec<UnknownField>,
    strict: bool,
}

impl<'de> MapAccess<'de> for MapDeserializer<'_, '_> {
    type Error = DecodeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, DecodeError> {
        for entry in self.entries.by_ref() {
            if let Some((type_name, fields)) = self.fields {
                let key = entry.key.scalar_value();
                if !fields.iter().any(|f| *f == key) {
                    self.unknown.push(UnknownField {
                        field: key.to_string(),
                        type_name,
                        mark: entry.key.mark,
                        value: entry.value.scalar_value().to_string(),
                    });
                    continue;
                }
            }
            self.value = Some(&entry.value);
            self.key_mark = Some(entry.key.mark);
            return seed
                .deserialize(NodeDeserializer::new(&entry.key, self.unknown, self.strict))
                .map(Some);
        }
        self.key_mark = None;
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, DecodeError> {
        match self.value.take() {
            Some(node) => seed.deserialize(NodeDeserializer::new(node, self.unknown, self.strict)),
            None => Err(de::Error::custom("value requested before key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct EnumDeserializer<'a, 'u> {
    entry: &'a Entry,
    unknown: &'u mut Vec<UnknownField>,
    strict: bool,
}

impl<'de, 'a, 'u> EnumAccess<'de> for EnumDeserializer<'a, 'u> {
    type Error = DecodeError;
    type Variant = NodeDeserializer<'a, 'u>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant), DecodeError> {
        let variant = seed.deserialize(NodeDeserializer::new(&self.entry.key, self.unknown, self.strict))?;
        Ok((variant, NodeDeserializer::new(&self.entry.value, self.unknown, self.strict)))
    }
}

impl<'de> VariantAccess<'de> for NodeDeserializer<'_, '_> {
    type Error = DecodeError;

    fn unit_variant(self) -> Result<(), DecodeError> {
        de::Deserialize::deserialize(self)
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, DecodeError> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, DecodeError> {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        de::Deserializer::deserialize_struct(self, "", fields, visitor)
    }
}
