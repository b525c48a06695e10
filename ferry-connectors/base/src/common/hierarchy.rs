use std::collections::{BTreeMap, HashMap};

use ferry_core::{
    data::DataValue,
    entity::{EntityDescriptor, Row},
    err::{bail, Result},
};
use ferry_logging::trace;
use serde::{Deserialize, Serialize};

/// The relationships which may appear in flat rows, keyed by name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelationshipSchema {
    /// Relationship name to the child's foreign key columns
    relationships: BTreeMap<String, Vec<String>>,
}

impl RelationshipSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, name: impl Into<String>, child_keys: Vec<&str>) -> Self {
        self.relationships
            .insert(name.into(), child_keys.into_iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn from_entity(entity: &EntityDescriptor) -> Self {
        Self {
            relationships: entity
                .relationships
                .iter()
                .map(|r| (r.name.clone(), r.child_keys.clone()))
                .collect(),
        }
    }

    fn child_keys(&self, name: &str) -> Option<&Vec<String>> {
        self.relationships.get(name)
    }
}

/// A child record, columns keyed by `table.column`
pub type ChildRecord = BTreeMap<String, DataValue>;

/// An entity reassembled from a flat row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HierarchicalEntity {
    pub properties: BTreeMap<String, DataValue>,
    /// Every relationship of the schema has an entry, empty if the row has no children
    pub children: BTreeMap<String, Vec<ChildRecord>>,
}

/// Reassembles each flat row into a hierarchical entity, lazily
pub fn reassemble<I>(rows: I, schema: &RelationshipSchema) -> HierarchyRows<I::IntoIter>
where
    I: IntoIterator<Item = Result<Row>>,
{
    HierarchyRows {
        inner: rows.into_iter(),
        schema: schema.clone(),
    }
}

/// Iterator returned by [`reassemble`]
pub struct HierarchyRows<I> {
    inner: I,
    schema: RelationshipSchema,
}

impl<I> HierarchyRows<I> {
    fn map_row(&self, row: Row) -> Result<HierarchicalEntity> {
        let mut entity = HierarchicalEntity {
            properties: BTreeMap::new(),
            children: self
                .schema
                .relationships
                .keys()
                .map(|name| (name.clone(), vec![]))
                .collect(),
        };
        let mut records: HashMap<String, Vec<ChildRecord>> = HashMap::new();

        for (col, value) in row.into_iter() {
            let mut parts = col.splitn(3, '.');

            let (rel, table, column) = match (parts.next(), parts.next(), parts.next()) {
                (Some(rel), Some(table), Some(column)) => (rel, table, column),
                _ => {
                    entity.properties.insert(col, value);
                    continue;
                }
            };

            if self.schema.child_keys(rel).is_none() {
                bail!(
                    "Column \"{}\" refers to unknown relationship \"{}\"",
                    col,
                    rel
                );
            }

            let key = format!("{}.{}", table, column);
            let rel_records = records.entry(rel.to_string()).or_default();

            // A repeated column starts the next record of the relationship
            match rel_records.iter_mut().find(|r| !r.contains_key(&key)) {
                Some(record) => {
                    record.insert(key, value);
                }
                None => rel_records.push(BTreeMap::from([(key, value)])),
            }
        }

        for (rel, rel_records) in records.into_iter() {
            let keys = self.schema.child_keys(&rel).cloned().unwrap_or_default();
            let children = entity.children.entry(rel.clone()).or_default();

            for record in rel_records.into_iter() {
                if Self::is_absent(&record, &keys) {
                    trace!("Pruned empty child record of \"{}\"", rel);
                    continue;
                }

                children.push(record);
            }
        }

        Ok(entity)
    }

    /// A record whose foreign key columns are all null is produced by an unmatched join.
    ///
    /// Key columns missing from the record are ignored, a record without any is kept.
    fn is_absent(record: &ChildRecord, keys: &[String]) -> bool {
        let mut values = keys
            .iter()
            .filter_map(|key| {
                record.iter().find(|(col, _)| {
                    col.rsplit_once('.')
                        .map_or(false, |(_, c)| c.eq_ignore_ascii_case(key))
                })
            })
            .map(|(_, value)| value)
            .peekable();

        values.peek().is_some() && values.all(|value| value.is_null())
    }
}

impl<I> Iterator for HierarchyRows<I>
where
    I: Iterator<Item = Result<Row>>,
{
    type Item = Result<HierarchicalEntity>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.inner.next()? {
            Ok(row) => row,
            Err(err) => return Some(Err(err)),
        };

        Some(self.map_row(row))
    }
}
