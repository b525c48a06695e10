use ferry_connectors_base::test::{MockExecutor, MockMetadataProvider};
use ferry_connectors_mssql::{MssqlConnector, MssqlConnectorOptions};
use ferry_core::{
    data::DataValue,
    entity::{ColumnMetadata, Row},
};

/// Metadata of the `Contacts` and `Addresses` tables
pub fn mock_metadata() -> MockMetadataProvider {
    MockMetadataProvider::new()
        .with_table(
            "Contacts",
            vec![
                ColumnMetadata::primary_key("Id", "int"),
                ColumnMetadata::new("Name", "nvarchar", Some(50), false, false),
                ColumnMetadata::minimal("Phone", "varchar(20)"),
                ColumnMetadata::minimal("IsActive", "bit"),
                ColumnMetadata::minimal("ManagerId", "int"),
            ],
        )
        .with_table(
            "Addresses",
            vec![
                ColumnMetadata::primary_key("Id", "int"),
                ColumnMetadata::minimal("ContactId", "int"),
                ColumnMetadata::minimal("ContactTitle", "nvarchar"),
                ColumnMetadata::minimal("City", "nvarchar"),
            ],
        )
}

pub fn connect(
    executor: MockExecutor,
    options: MssqlConnectorOptions,
) -> MssqlConnector<MockExecutor, MockMetadataProvider> {
    ferry_logging::init_for_tests();

    MssqlConnector::new(executor, mock_metadata(), options)
}

pub fn row(cols: Vec<(&str, DataValue)>) -> Row {
    cols.into_iter().map(|(c, v)| (c.to_string(), v)).collect()
}

/// The single row returned by `SELECT COUNT(*)`
pub fn count_row(count: i32) -> Vec<Row> {
    vec![row(vec![("", DataValue::Int32(count))])]
}
