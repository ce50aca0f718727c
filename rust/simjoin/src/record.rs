//! Records: ordered sets of named, optionally null, string fields.

use serde::{Deserialize, Serialize};
use simjoin_workflow::EstimateSize;

/// Dense identifier assigned to the records of the indexed side of a join.
pub type RecordId = u64;

/// A record paired with the tokens of its selected columns.
pub type TokenizedRecord = (Vec<String>, Record);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, value: Option<impl Into<String>>) -> Field {
        Field {
            name: name.into(),
            value: value.map(Into::into),
        }
    }
}

/// A record of a joined collection.
///
/// The join engine treats records as opaque except for column selection: featurizers
/// read the values of the columns they were configured with. Field order is preserved
/// and is part of the record's identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    pub fn new() -> Record {
        Record::default()
    }

    /// Builds a record from `(name, value)` pairs with non-null values.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Record
    where
        N: Into<String>,
        V: Into<String>,
    {
        Record {
            fields: pairs
                .into_iter()
                .map(|(name, value)| Field::new(name, Some(value)))
                .collect(),
        }
    }

    /// Appends a field, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Record {
        self.push(Field::new(name, Some(value)));
        self
    }

    /// Appends a null field, builder style.
    pub fn with_null(mut self, name: impl Into<String>) -> Record {
        self.push(Field::new(name, None::<String>));
        self
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Value of the first field named `name`. Missing and null fields both yield `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .and_then(|field| field.value.as_deref())
    }

    /// Non-null values of the selected columns, in selection order. An empty selection
    /// selects every field in record order.
    pub fn values<'a>(&'a self, cols: &[String]) -> Vec<&'a str> {
        if cols.is_empty() {
            self.fields
                .iter()
                .filter_map(|field| field.value.as_deref())
                .collect()
        } else {
            cols.iter().filter_map(|col| self.get(col)).collect()
        }
    }
}

impl EstimateSize for Field {
    fn heap_size(&self) -> u64 {
        self.name.heap_size() + self.value.heap_size()
    }
}

impl EstimateSize for Record {
    fn heap_size(&self) -> u64 {
        self.fields.heap_size()
    }
}
