//! Mapping between struct field types and SQL column types.

use std::collections::HashSet;

use syn::{Ident, Type, TypePath};

use crate::models::TableSchemaResult;

const INTEGER_TYPES: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
];

const TIMESTAMP_TYPES: &[&str] = &[
    "DateTime",
    "NaiveDateTime",
    "SystemTime",
    "OffsetDateTime",
    "PrimitiveDateTime",
    "Timestamp",
];

/// SQL type for a field's source type expression.
///
/// Only bare primitives and timestamp paths are recognized. Everything else
/// (`Option<_>`, references, qualified primitives, tuples, arrays, text that
/// is not a type at all) maps to `TEXT`; this never fails.
pub fn sql_type(source_type: &str) -> &'static str {
    let Ok(Type::Path(TypePath { qself: None, path })) = syn::parse_str::<Type>(source_type) else {
        return "TEXT";
    };
    let Some(last) = path.segments.last() else {
        return "TEXT";
    };
    let ident = last.ident.to_string();

    // `chrono::DateTime<Utc>`, `NaiveDateTime`, `std::time::SystemTime`, ...
    if TIMESTAMP_TYPES.contains(&ident.as_str()) {
        return "TIMESTAMP";
    }

    let bare = path.leading_colon.is_none()
        && path.segments.len() == 1
        && last.arguments.is_empty();
    if !bare {
        return "TEXT";
    }

    match ident.as_str() {
        ty if INTEGER_TYPES.contains(&ty) => "BIGINT",
        "bool" => "BOOLEAN",
        _ => "TEXT",
    }
}

/// Rust type used when rendering a pulled column.
pub fn rust_type(data_type: &str) -> &'static str {
    let ty = data_type.trim().to_ascii_lowercase();

    match ty.as_str() {
        "bigint" | "integer" | "smallint" | "int" | "int2" | "int4" | "int8" | "serial"
        | "bigserial" => "i64",
        "boolean" | "bool" => "bool",
        _ if ty.starts_with("timestamp") => "chrono::NaiveDateTime",
        _ => "String",
    }
}

/// Keywords that cannot be written as raw identifiers either.
const NON_RAW_KEYWORDS: &[&str] = &["_", "crate", "self", "super"];

/// Field name for a column: lowercase ASCII, other characters replaced by
/// `_`, keywords written as raw identifiers.
fn field_ident(column: &str) -> String {
    let mut ident: String = column
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();

    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }

    // Parsing as an identifier rejects strict and reserved keywords alike.
    if syn::parse_str::<Ident>(&ident).is_err() {
        if NON_RAW_KEYWORDS.contains(&ident.as_str()) {
            ident.push('_');
        } else {
            ident.insert_str(0, "r#");
        }
    }
    ident
}

/// Render a pulled schema as a tagged struct definition.
///
/// The output is what the introspector reads back on push, so column names
/// and order survive the round trip. Columns whose field names collide get a
/// numeric suffix.
pub fn render_struct(schema: &TableSchemaResult) -> String {
    let name = crate::introspect::struct_name_for(&schema.table_name);
    let mut out = format!("pub struct {} {{\n", name);
    let mut taken = HashSet::new();

    for column in &schema.columns {
        let base = field_ident(&column.column_name);
        let mut field = base.clone();
        let mut suffix = 2;
        while !taken.insert(field.clone()) {
            field = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        let ty = rust_type(&column.data_type);
        let ty = if column.is_nullable {
            format!("Option<{}>", ty)
        } else {
            ty.to_string()
        };

        // Debug formatting yields a valid string literal with `"` and `\` escaped.
        out.push_str(&format!(
            "    #[db({:?})]\n    pub {}: {},\n",
            column.column_name, field, ty
        ));
    }

    out.push_str("}\n");
    out
}
