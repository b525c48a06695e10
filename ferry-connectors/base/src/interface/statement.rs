use ferry_core::{
    entity::{EntityDescriptor, RowChangeRequest},
    filter::FilterExpr,
};

/// A statement to be compiled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statement<'a> {
    Select {
        entity: &'a EntityDescriptor,
        filter: Option<&'a FilterExpr>,
    },
    Insert(&'a RowChangeRequest),
    /// Compiles to the `SET` statement only, the lookup is applied separately
    Update(&'a RowChangeRequest),
    /// Compiles to the `DELETE` statement only, the lookup is applied separately
    Delete(&'a RowChangeRequest),
    Count {
        table: &'a str,
        filter: Option<&'a FilterExpr>,
    },
    Upsert {
        row: &'a RowChangeRequest,
        keys: &'a [String],
    },
}
