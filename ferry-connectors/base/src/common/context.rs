use std::collections::HashMap;

use ferry_core::{
    entity::{ColumnCatalog, ColumnMetadata, EntityDescriptor},
    err::{bail, Result},
};

/// Dialect-independent options applied while compiling
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Round date/times carrying milliseconds up to the next whole second
    pub round_fractional_seconds: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            round_fractional_seconds: true,
        }
    }
}

/// How property references are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualification {
    /// Only the column, for single-table statements
    ColumnOnly,
    /// Keep the prefix if the reference has one
    AsWritten,
    /// Always prefix, bare columns belong to the root table
    Full,
}

/// A table referenced by a statement
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRef {
    pub table: String,
    /// Set when the table must be referenced through an alias
    pub alias: Option<String>,
}

/// A property reference resolved against the statement's sources
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProperty<'a> {
    /// `None` renders the bare column
    pub qualifier: Option<SourceRef>,
    pub column: &'a str,
    /// The table whose metadata describes the column
    pub table: String,
}

/// State threaded through the compilation of a single statement
#[derive(Debug, Clone)]
pub struct CompileContext<'a> {
    catalog: &'a ColumnCatalog,
    table: String,
    sources: HashMap<String, SourceRef>,
    qualification: Qualification,
    options: CompileOptions,
}

impl<'a> CompileContext<'a> {
    /// Creates a context for a statement over a single table
    pub fn new(catalog: &'a ColumnCatalog, table: impl Into<String>) -> Self {
        let table = table.into();
        let mut ctx = Self {
            catalog,
            table: table.clone(),
            sources: HashMap::new(),
            qualification: Qualification::ColumnOnly,
            options: CompileOptions::default(),
        };
        ctx.add_source(&table, SourceRef { table: table.clone(), alias: None });
        ctx
    }

    /// Creates a context for selecting the entity and its relationships.
    ///
    /// A child is aliased by its relationship name when it joins its parent's
    /// table or when a sibling joins the same table.
    pub fn for_select(catalog: &'a ColumnCatalog, entity: &EntityDescriptor) -> Result<Self> {
        let mut ctx = Self::new(catalog, &entity.table);
        ctx.qualification = if entity.relationships.is_empty() {
            Qualification::AsWritten
        } else {
            Qualification::Full
        };

        for rel in entity.relationships.iter() {
            if !rel.child.relationships.is_empty() {
                bail!(
                    "Relationship \"{}\" is nested, only a single level of relationships is supported",
                    rel.name
                );
            }

            let table = &rel.child.table;
            let siblings = entity
                .relationships
                .iter()
                .filter(|r| r.child.table.eq_ignore_ascii_case(table))
                .count();
            let aliased = siblings > 1 || table.eq_ignore_ascii_case(&entity.table);

            let source = SourceRef {
                table: table.clone(),
                alias: aliased.then(|| rel.name.clone()),
            };

            if !aliased {
                ctx.add_source(table, source.clone());
            }
            ctx.add_source(&rel.name, source);
        }

        Ok(ctx)
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_qualification(mut self, qualification: Qualification) -> Self {
        self.qualification = qualification;
        self
    }

    fn add_source(&mut self, reference: &str, source: SourceRef) {
        // Tables are also referable by their unqualified name, eg "Contacts" for "dbo.Contacts"
        if let Some((_, name)) = reference.rsplit_once('.') {
            self.sources
                .entry(name.to_lowercase())
                .or_insert_with(|| source.clone());
        }

        self.sources.insert(reference.to_lowercase(), source);
    }

    pub fn catalog(&self) -> &'a ColumnCatalog {
        self.catalog
    }

    /// The root table of the statement
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn qualification(&self) -> Qualification {
        self.qualification
    }

    /// Gets the source registered under the reference, if any
    pub fn source(&self, reference: &str) -> Option<&SourceRef> {
        self.sources.get(&reference.to_lowercase())
    }

    /// The source of the root table
    pub fn root(&self) -> SourceRef {
        SourceRef {
            table: self.table.clone(),
            alias: None,
        }
    }

    /// Resolves a `Column` or `Prefix.Column` reference
    pub fn resolve<'r>(&self, reference: &'r str) -> ResolvedProperty<'r> {
        let (prefix, column) = match reference.rsplit_once('.') {
            Some((prefix, column)) => (Some(prefix), column),
            None => (None, reference),
        };

        let source = prefix.map(|prefix| {
            self.source(prefix).cloned().unwrap_or_else(|| SourceRef {
                table: prefix.to_string(),
                alias: None,
            })
        });

        match (self.qualification, source) {
            (Qualification::ColumnOnly, _) => ResolvedProperty {
                qualifier: None,
                column,
                table: self.table.clone(),
            },
            (_, Some(source)) => ResolvedProperty {
                table: source.table.clone(),
                qualifier: Some(source),
                column,
            },
            (Qualification::AsWritten, None) => ResolvedProperty {
                qualifier: None,
                column,
                table: self.table.clone(),
            },
            (Qualification::Full, None) => ResolvedProperty {
                qualifier: Some(self.root()),
                column,
                table: self.table.clone(),
            },
        }
    }

    /// Looks up the metadata of a resolved property
    pub fn column(&self, property: &ResolvedProperty) -> Result<Option<&'a ColumnMetadata>> {
        self.catalog.find(&property.table, property.column)
    }
}

#[cfg(test)]
mod tests {
    use ferry_core::entity::RelationshipDescriptor;
    use pretty_assertions::assert_eq;

    use super::*;

    fn contacts_with_manager() -> EntityDescriptor {
        EntityDescriptor::new("dbo.Contacts", vec!["Id", "Name"])
            .with_relationship(RelationshipDescriptor::new(
                "Manager",
                vec!["ManagerId"],
                vec!["Id"],
                EntityDescriptor::new("dbo.Contacts", vec!["Id", "Name"]),
            ))
            .with_relationship(RelationshipDescriptor::new(
                "Addresses",
                vec!["Id"],
                vec!["ContactId"],
                EntityDescriptor::new("Addresses", vec!["City"]),
            ))
    }

    #[test]
    fn test_compile_context_resolve_column_only() {
        let catalog = ColumnCatalog::new();
        let ctx = CompileContext::new(&catalog, "Contacts");

        assert_eq!(
            ctx.resolve("Contacts.Name"),
            ResolvedProperty {
                qualifier: None,
                column: "Name",
                table: "Contacts".into()
            }
        );
    }

    #[test]
    fn test_compile_context_resolve_as_written() {
        let catalog = ColumnCatalog::new();
        let ctx = CompileContext::for_select(&catalog, &EntityDescriptor::new("Contacts", vec![]))
            .unwrap();

        assert_eq!(ctx.resolve("Phone").qualifier, None);
        assert_eq!(
            ctx.resolve("Addresses.City"),
            ResolvedProperty {
                qualifier: Some(SourceRef {
                    table: "Addresses".into(),
                    alias: None
                }),
                column: "City",
                table: "Addresses".into()
            }
        );
    }

    #[test]
    fn test_compile_context_self_join_aliases() {
        let catalog = ColumnCatalog::new();
        let ctx = CompileContext::for_select(&catalog, &contacts_with_manager()).unwrap();

        assert_eq!(ctx.qualification(), Qualification::Full);
        assert_eq!(
            ctx.resolve("Manager.Name").qualifier,
            Some(SourceRef {
                table: "dbo.Contacts".into(),
                alias: Some("Manager".into())
            })
        );
        // the table name keeps referring to the root
        assert_eq!(ctx.resolve("Contacts.Name").qualifier, Some(ctx.root()));
        assert_eq!(ctx.resolve("Name").qualifier, Some(ctx.root()));
        assert_eq!(
            ctx.resolve("Addresses.City").qualifier,
            Some(SourceRef {
                table: "Addresses".into(),
                alias: None
            })
        );
    }

    #[test]
    fn test_compile_context_nested_relationships_rejected() {
        let catalog = ColumnCatalog::new();
        let nested = EntityDescriptor::new("A", vec![]).with_relationship(
            RelationshipDescriptor::new(
                "B",
                vec!["Id"],
                vec!["AId"],
                contacts_with_manager(),
            ),
        );

        CompileContext::for_select(&catalog, &nested).unwrap_err();
    }
}
