use std::collections::HashMap;
use std::sync::Arc;

use super::convert::{converter_for, ConvertFn, FieldKind, FieldTypeResolver};
use super::source::ColumnInfo;
use crate::error::{Error, Result};

/// Metadata of one result column, with its converter resolved up front.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_name: String,
    pub kind: FieldKind,
    convert: Option<ConvertFn>,
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl FieldDescriptor {
    pub fn new(column: ColumnInfo, resolver: &dyn FieldTypeResolver) -> Self {
        let kind = resolver.resolve(&column.type_name);
        Self {
            name: column.name,
            type_name: column.type_name,
            kind,
            convert: converter_for(kind),
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self.kind, FieldKind::Table)
    }

    /// Converter for scalar fields; `None` for nested tables.
    pub fn converter(&self) -> Option<ConvertFn> {
        self.convert
    }
}

/// All fields of a result plus a case-insensitive name index.
#[derive(Debug, Clone)]
pub struct FieldSet {
    fields: Vec<FieldDescriptor>,
    names: Arc<[String]>,
    index: HashMap<String, usize>,
}

impl FieldSet {
    pub fn new(columns: Vec<ColumnInfo>, resolver: &dyn FieldTypeResolver) -> Self {
        let fields: Vec<FieldDescriptor> = columns
            .into_iter()
            .map(|c| FieldDescriptor::new(c, resolver))
            .collect();
        let mut index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            // First occurrence wins for duplicate names.
            index.entry(field.name.to_lowercase()).or_insert(i);
        }
        let names = fields.iter().map(|f| f.name.clone()).collect();
        Self {
            fields,
            names,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Result<&FieldDescriptor> {
        self.fields.get(ordinal).ok_or(Error::FieldOutOfRange {
            ordinal,
            count: self.fields.len(),
        })
    }

    pub fn ordinal(&self, name: &str) -> Result<usize> {
        self.index
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    /// Field names, shared with every record built from this set.
    pub fn names(&self) -> Arc<[String]> {
        self.names.clone()
    }
}

/// Field metadata that is loaded on first access and then kept.
#[derive(Debug, Clone, Default)]
pub enum LazyFields {
    #[default]
    Unloaded,
    Loaded(Arc<FieldSet>),
}

impl LazyFields {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LazyFields::Loaded(_))
    }

    /// Return the cached set, running `load` only the first time.
    pub fn get_or_load(
        &mut self,
        load: impl FnOnce() -> Result<FieldSet>,
    ) -> Result<Arc<FieldSet>> {
        match self {
            LazyFields::Loaded(fields) => Ok(fields.clone()),
            LazyFields::Unloaded => {
                let fields = Arc::new(load()?);
                *self = LazyFields::Loaded(fields.clone());
                Ok(fields)
            }
        }
    }
}
