use serde::{Deserialize, Serialize};

/// Describes the table being read and what to read from it
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// The table name, optionally schema-qualified eg `dbo.Contacts`
    pub table: String,
    /// The requested columns, an empty list selects all columns
    #[serde(default)]
    pub columns: Vec<String>,
    /// Sort keys in order of precedence
    #[serde(default)]
    pub order_by: Vec<SortKey>,
    /// Child entities joined to this entity
    #[serde(default)]
    pub relationships: Vec<RelationshipDescriptor>,
}

impl EntityDescriptor {
    pub fn new(table: impl Into<String>, columns: Vec<&str>) -> Self {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(|c| c.to_string()).collect(),
            order_by: vec![],
            relationships: vec![],
        }
    }

    pub fn with_order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(SortKey::new(column, direction));
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipDescriptor) -> Self {
        self.relationships.push(relationship);
        self
    }
}

/// A sort key
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A parent to child join
///
/// `parent_keys[i]` is joined to `child_keys[i]`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    /// The name of the relationship, used to label the child records
    pub name: String,
    pub parent_keys: Vec<String>,
    pub child_keys: Vec<String>,
    pub child: EntityDescriptor,
}

impl RelationshipDescriptor {
    pub fn new(
        name: impl Into<String>,
        parent_keys: Vec<&str>,
        child_keys: Vec<&str>,
        child: EntityDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            parent_keys: parent_keys.into_iter().map(|c| c.to_string()).collect(),
            child_keys: child_keys.into_iter().map(|c| c.to_string()).collect(),
            child,
        }
    }
}
