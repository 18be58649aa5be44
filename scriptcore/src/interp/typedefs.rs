//! `typedef` aliases and resolution of declared types

use std::collections::HashMap;

use super::{literal_value, InterpResult, Layout, RuntimeError, TypeMeta};
use crate::ast::{FieldDecl, TypeRef};
use crate::types::{BitmapType, DataType, FieldType, IntmapType, RecordField, RecordType};

/// A declared type with aliases and inline layouts resolved
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedType {
    Simple(DataType),
    Record(RecordType),
    Bitmap(BitmapType),
    Intmap(IntmapType),
    Array(Box<ResolvedType>),
    Queue(Box<ResolvedType>),
    SortedMap,
}

impl ResolvedType {
    /// Tag used for conversion of a whole value
    pub fn data_type(&self) -> DataType {
        match self {
            ResolvedType::Simple(dt) => *dt,
            ResolvedType::Record(_) => DataType::Record,
            ResolvedType::Bitmap(_) => DataType::Bitmap,
            ResolvedType::Intmap(_) => DataType::Intmap,
            ResolvedType::Array(_) => DataType::Array,
            ResolvedType::Queue(_) => DataType::Queue,
            ResolvedType::SortedMap => DataType::Map,
        }
    }

    /// Layout a binding of this type carries; arrays carry their element's
    pub fn layout(&self) -> Option<Layout> {
        match self {
            ResolvedType::Record(rt) => Some(Layout::Record(rt.clone())),
            ResolvedType::Bitmap(bt) => Some(Layout::Bitmap(bt.clone())),
            ResolvedType::Intmap(it) => Some(Layout::Intmap(it.clone())),
            ResolvedType::Array(elem) => match elem.as_ref() {
                ResolvedType::Record(rt) => Some(Layout::Record(rt.clone())),
                _ => None,
            },
            _ => None,
        }
    }

    /// Innermost element tag of an array / queue type
    pub fn elem_type(&self) -> DataType {
        match self {
            ResolvedType::Array(elem) | ResolvedType::Queue(elem) => match elem.as_ref() {
                ResolvedType::Array(_) => elem.elem_type(),
                other => other.data_type(),
            },
            other => other.data_type(),
        }
    }
}

/// A resolved type plus the alias it was reached through
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub ty: ResolvedType,
    pub alias: Option<String>,
}

impl Resolved {
    pub fn meta(&self) -> Option<TypeMeta> {
        self.ty.layout().map(|layout| TypeMeta {
            layout,
            alias: self.alias.clone(),
        })
    }
}

/// Aliases registered by `typedef`; names are case-insensitive
#[derive(Debug, Default)]
pub struct TypeRegistry {
    aliases: HashMap<String, ResolvedType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    pub fn define(&mut self, name: &str, ty: ResolvedType) {
        self.aliases.insert(name.to_ascii_lowercase(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedType> {
        self.aliases.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.aliases.contains_key(&name.to_ascii_lowercase())
    }

    pub fn resolve(&self, ty: &TypeRef) -> InterpResult<Resolved> {
        if let TypeRef::Alias(name) = ty {
            let resolved = self
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::unknown(format!("Unknown type '{name}'")))?;
            return Ok(Resolved {
                ty: resolved,
                alias: Some(name.to_ascii_lowercase()),
            });
        }
        Ok(Resolved {
            ty: self.resolve_type(ty)?,
            alias: None,
        })
    }

    fn resolve_type(&self, ty: &TypeRef) -> InterpResult<ResolvedType> {
        Ok(match ty {
            TypeRef::Simple(dt) => ResolvedType::Simple(*dt),
            TypeRef::Record(fields) => ResolvedType::Record(self.record(fields)?),
            TypeRef::Bitmap(decls) => ResolvedType::Bitmap(BitmapType::from_decls(decls)?),
            TypeRef::Intmap(decls) => ResolvedType::Intmap(IntmapType::from_decls(decls)?),
            TypeRef::Array(elem) => ResolvedType::Array(Box::new(self.resolve(elem)?.ty)),
            TypeRef::Queue(elem) => ResolvedType::Queue(Box::new(self.resolve(elem)?.ty)),
            TypeRef::SortedMap => ResolvedType::SortedMap,
            TypeRef::Alias(_) => self.resolve(ty)?.ty,
        })
    }

    fn record(&self, fields: &[FieldDecl]) -> InterpResult<RecordType> {
        let mut rt = RecordType::new();
        for decl in fields {
            let ty = match self.resolve(&decl.ty)?.ty {
                ResolvedType::Record(nested) => FieldType::Record(nested),
                other => FieldType::Simple(other.data_type()),
            };
            let default = match &decl.default {
                Some(lit) => Some(ty.data_type().convert(literal_value(lit))?),
                None => None,
            };
            rt.push_field(RecordField {
                name: decl.name.clone(),
                ty,
                mandatory: decl.mandatory,
                max_length: decl.max_length,
                default,
            })?;
        }
        Ok(rt)
    }
}
