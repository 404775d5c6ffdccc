use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parquet::basic::{LogicalType, Repetition, Type as PhysicalType};
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DataType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::{SerializedColumnWriter, SerializedFileWriter};
use parquet::schema::types::{Type, TypePtr};
use serde_json::Value;

use crate::constants::store::TABLE_EXTENSION;
use crate::errors::IngestError;
use crate::store::{ensure_parent_dir, source_path, temp_sibling};
use crate::table::{ColumnKind, Row, Table, value_text};

/// Flattened Parquet tables at `{root}/{source}/{identifier}.parquet`.
#[derive(Clone, Debug)]
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    /// Store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic location of a table.
    pub fn path_for(&self, source: &str, identifier: &str) -> PathBuf {
        source_path(&self.root, source, identifier, TABLE_EXTENSION)
    }

    /// Write `table` to its path, replacing any previous file.
    ///
    /// Every column is OPTIONAL. Column types follow [`Table::column_kind`],
    /// so a column mixing value kinds is written as UTF8 text.
    pub fn save_table(
        &self,
        source: &str,
        identifier: &str,
        table: &Table,
    ) -> Result<PathBuf, IngestError> {
        let path = self.path_for(source, identifier);
        write_parquet(&path, table)?;
        Ok(path)
    }

    /// Read the table stored for `(source, identifier)`.
    pub fn load(&self, source: &str, identifier: &str) -> Result<Table, IngestError> {
        load_table(&self.path_for(source, identifier))
    }
}

/// Read a flat Parquet file into a [`Table`]. Null cells are left out of rows.
pub fn load_table(path: &Path) -> Result<Table, IngestError> {
    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    let columns: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema()
        .get_fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect();

    let mut table = Table::with_columns(columns);
    if reader.num_row_groups() == 0 {
        return Ok(table);
    }
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let Value::Object(fields) = row.to_json_value() else {
            continue;
        };
        let row: Row = fields
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

fn write_parquet(path: &Path, table: &Table) -> Result<(), IngestError> {
    ensure_parent_dir(path)?;
    let tmp = temp_sibling(path);
    let result = write_parquet_file(&tmp, table).and_then(|()| Ok(fs::rename(&tmp, path)?));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_parquet_file(path: &Path, table: &Table) -> Result<(), IngestError> {
    let columns: Vec<(&str, ColumnKind)> = table
        .columns()
        .map(|column| (column, table.column_kind(column)))
        .collect();
    let fields = columns
        .iter()
        .map(|(name, kind)| column_type(name, *kind))
        .collect::<Result<Vec<TypePtr>, IngestError>>()?;
    let schema = Arc::new(Type::group_type_builder("schema").with_fields(fields).build()?);
    let props = Arc::new(WriterProperties::builder().build());

    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, schema, props)?;
    if !table.is_empty() {
        let mut row_group = writer.next_row_group()?;
        let mut position = 0usize;
        while let Some(mut column_writer) = row_group.next_column()? {
            let (name, kind) = columns[position];
            write_column(&mut column_writer, table, name, kind)?;
            column_writer.close()?;
            position += 1;
        }
        row_group.close()?;
    }
    writer.close()?;
    Ok(())
}

fn column_type(name: &str, kind: ColumnKind) -> Result<TypePtr, IngestError> {
    let builder = match kind {
        ColumnKind::Boolean => Type::primitive_type_builder(name, PhysicalType::BOOLEAN),
        ColumnKind::Int64 => Type::primitive_type_builder(name, PhysicalType::INT64),
        ColumnKind::Double => Type::primitive_type_builder(name, PhysicalType::DOUBLE),
        ColumnKind::Utf8 => Type::primitive_type_builder(name, PhysicalType::BYTE_ARRAY)
            .with_logical_type(Some(LogicalType::String)),
    };
    Ok(Arc::new(
        builder.with_repetition(Repetition::OPTIONAL).build()?,
    ))
}

fn write_column(
    column_writer: &mut SerializedColumnWriter<'_>,
    table: &Table,
    column: &str,
    kind: ColumnKind,
) -> Result<(), IngestError> {
    match kind {
        ColumnKind::Boolean => write_typed::<BoolType>(column_writer, table, column, Value::as_bool),
        ColumnKind::Int64 => write_typed::<Int64Type>(column_writer, table, column, Value::as_i64),
        ColumnKind::Double => {
            write_typed::<DoubleType>(column_writer, table, column, Value::as_f64)
        }
        ColumnKind::Utf8 => write_typed::<ByteArrayType>(column_writer, table, column, |value| {
            value_text(value).map(|text| ByteArray::from(text.into_bytes()))
        }),
    }
}

fn write_typed<T: DataType>(
    column_writer: &mut SerializedColumnWriter<'_>,
    table: &Table,
    column: &str,
    convert: impl Fn(&Value) -> Option<T::T>,
) -> Result<(), IngestError> {
    let mut def_levels = Vec::with_capacity(table.len());
    let mut values = Vec::with_capacity(table.len());
    for value in table.column_values(column) {
        match convert(value) {
            Some(converted) => {
                def_levels.push(1i16);
                values.push(converted);
            }
            None => def_levels.push(0i16),
        }
    }
    column_writer
        .typed::<T>()
        .write_batch(&values, Some(&def_levels), None)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_keeps_row_count_and_primitive_values() {
        let temp = tempdir().unwrap();
        let store = TableStore::new(temp.path().join("bronze"));
        let table = Table::from_records(&[
            json!({"appid": 10, "name": "Counter-Strike", "score": 0.5, "is_free": false}),
            json!({"appid": 20, "name": "Team Fortress Classic", "score": 1}),
            json!({"appid": 30, "is_free": true}),
        ]);

        let path = store.save_table("dummy", "test", &table).unwrap();
        assert_eq!(path, temp.path().join("bronze").join("dummy").join("test.parquet"));

        let loaded = store.load("dummy", "test").unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(
            loaded.columns().collect::<Vec<_>>(),
            vec!["appid", "name", "score", "is_free"]
        );
        let appids: Vec<&Value> = loaded.column_values("appid").collect();
        assert_eq!(appids, vec![&json!(10), &json!(20), &json!(30)]);
        assert_eq!(loaded.rows()[0]["name"], json!("Counter-Strike"));
        assert_eq!(loaded.rows()[1]["score"], json!(1.0));
        assert_eq!(loaded.rows()[2]["is_free"], json!(true));
        assert!(!loaded.rows()[2].contains_key("name"));
    }

    #[test]
    fn mixed_and_nested_columns_are_stored_as_text() {
        let temp = tempdir().unwrap();
        let store = TableStore::new(temp.path());
        let table = Table::from_records(&[
            json!({"appid": 1, "required_age": 0, "genres": [{"id": "1"}], "price": {"final": 999}}),
            json!({"appid": 2, "required_age": "18", "genres": []}),
        ]);

        store.save_table("steam_store", "app_details", &table).unwrap();
        let loaded = store.load("steam_store", "app_details").unwrap();

        assert_eq!(loaded.rows()[0]["required_age"], json!("0"));
        assert_eq!(loaded.rows()[1]["required_age"], json!("18"));
        assert_eq!(loaded.rows()[0]["genres"], json!(r#"[{"id":"1"}]"#));
        assert_eq!(loaded.rows()[1]["genres"], json!("[]"));
        assert_eq!(loaded.rows()[0]["price.final"], json!(999));
    }

    #[test]
    fn non_ascii_text_survives_a_round_trip() {
        let temp = tempdir().unwrap();
        let store = TableStore::new(temp.path());
        let table = Table::from_records(&[
            json!({"appid": 1, "name": "Überläufer: Ärger im Café"}),
            json!({"appid": 2, "name": "東方Project", "tags": ["ロールプレイング", "🎮"]}),
        ]);

        store.save_table("steam_store", "app_details", &table).unwrap();
        let loaded = store.load("steam_store", "app_details").unwrap();

        assert_eq!(loaded.column_kind("name"), ColumnKind::Utf8);
        assert_eq!(loaded.rows()[0]["name"], json!("Überläufer: Ärger im Café"));
        assert_eq!(loaded.rows()[1]["name"], json!("東方Project"));
        assert_eq!(loaded.rows()[1]["tags"], json!(r#"["ロールプレイング","🎮"]"#));
    }

    #[test]
    fn empty_table_keeps_declared_columns() {
        let temp = tempdir().unwrap();
        let store = TableStore::new(temp.path());
        let table = Table::with_columns(["appid"]);

        store.save_table("steam_store", "app_details", &table).unwrap();
        let loaded = store.load("steam_store", "app_details").unwrap();

        assert!(loaded.is_empty());
        assert!(loaded.has_column("appid"));
    }

    #[test]
    fn save_replaces_existing_file() {
        let temp = tempdir().unwrap();
        let store = TableStore::new(temp.path());
        let first = Table::from_records(&[json!({"appid": 1}), json!({"appid": 2})]);
        let second = Table::from_records(&[json!({"appid": 3, "name": "three"})]);

        store.save_table("dummy", "t", &first).unwrap();
        store.save_table("dummy", "t", &second).unwrap();

        let loaded = store.load("dummy", "t").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.rows()[0]["appid"], json!(3));
    }

    #[test]
    fn loading_missing_file_is_io_error() {
        let temp = tempdir().unwrap();
        let err = load_table(&temp.path().join("absent.parquet")).unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
    }
}
