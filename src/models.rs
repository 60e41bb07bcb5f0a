//! Data models for schema views and PostgREST responses.

use serde::{Deserialize, Deserializer, Serialize};

/// One column of a table or shadow view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub column_name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub column_default: String,
}

/// A table and its columns, in ordinal (pull) or declaration (push) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchemaResult {
    pub table_name: String,
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
}

/// A struct field that maps to a column.
///
/// This is the language-neutral push input: the introspector produces these
/// from a source file, and a descriptor file can supply them directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub field: String,
    pub column: String,
    #[serde(rename = "type")]
    pub source_type: String,
}

/// Row of `information_schema.columns` as PostgREST returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawColumn {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
    #[serde(default)]
    pub column_default: Option<String>,
}

impl From<RawColumn> for ColumnSchema {
    fn from(raw: RawColumn) -> Self {
        Self {
            column_name: raw.column_name,
            data_type: raw.data_type,
            is_nullable: raw.is_nullable == "YES",
            column_default: raw.column_default.unwrap_or_default(),
        }
    }
}

/// Row of `information_schema.tables`.
#[derive(Debug, Clone, Deserialize)]
pub struct TableName {
    pub table_name: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_schema_from_view_row() {
        let json = r#"[
            {"column_name":"id","data_type":"bigint","is_nullable":false,"column_default":"nextval('blogs_id_seq'::regclass)"},
            {"column_name":"title","data_type":"text","is_nullable":true,"column_default":null}
        ]"#;
        let columns: Vec<ColumnSchema> = serde_json::from_str(json).unwrap();

        assert_eq!(columns.len(), 2);
        assert!(!columns[0].is_nullable);
        assert_eq!(columns[0].column_default, "nextval('blogs_id_seq'::regclass)");
        assert!(columns[1].is_nullable);
        assert_eq!(columns[1].column_default, "");
    }

    #[test]
    fn test_raw_column_normalizes_nullable_and_default() {
        let raw: Vec<RawColumn> = serde_json::from_str(
            r#"[
                {"column_name":"id","data_type":"bigint","is_nullable":"NO","column_default":null},
                {"column_name":"note","data_type":"text","is_nullable":"YES","column_default":"'n/a'::text"}
            ]"#,
        )
        .unwrap();
        let columns: Vec<ColumnSchema> = raw.into_iter().map(Into::into).collect();

        assert_eq!(
            columns[0],
            ColumnSchema {
                column_name: "id".into(),
                data_type: "bigint".into(),
                is_nullable: false,
                column_default: String::new(),
            }
        );
        assert!(columns[1].is_nullable);
        assert_eq!(columns[1].column_default, "'n/a'::text");
    }

    #[test]
    fn test_field_descriptor_uses_type_key() {
        let fields: Vec<FieldDescriptor> =
            serde_json::from_str(r#"[{"field":"id","column":"id","type":"i64"}]"#).unwrap();
        assert_eq!(fields[0].source_type, "i64");
    }
}
