//! Reads column definitions from local struct declarations.
//!
//! A column is declared by tagging a named field with `#[db("column")]`:
//!
//! ```text
//! pub struct Examples {
//!     #[db("id")]
//!     pub id: i64,
//!     #[db("name")]
//!     pub name: String,
//!     pub cached: bool, // no tag, not a column
//! }
//! ```

use std::path::Path;

use quote::ToTokens;
use syn::ext::IdentExt;
use syn::{Attribute, Expr, ExprLit, Field, Fields, FieldsNamed, Item, Lit, LitStr, MetaNameValue, Type};

use crate::error::{Error, Result};
use crate::models::{ColumnSchema, FieldDescriptor};
use crate::types::sql_type;

const COLUMN_TAG: &str = "db";

/// Struct name expected for a table: the table name with its first letter
/// capitalized.
pub fn struct_name_for(table: &str) -> String {
    let mut chars = table.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parse `struct_name` out of the source file at `path`.
pub fn parse_struct_file(path: &Path, struct_name: &str) -> Result<Vec<FieldDescriptor>> {
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_struct(&source, struct_name)
        .map_err(|source| Error::Syntax {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| Error::DeclarationNotFound {
            struct_name: struct_name.to_string(),
            path: path.to_path_buf(),
        })
}

/// Load field descriptors from a JSON array.
pub fn load_descriptor_file(path: &Path) -> Result<Vec<FieldDescriptor>> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| Error::Decode {
        what: "field descriptors",
        source,
    })
}

/// Column schemas for the given fields, in the same order.
pub fn columns_from_fields(fields: &[FieldDescriptor]) -> Vec<ColumnSchema> {
    fields
        .iter()
        .map(|field| ColumnSchema {
            column_name: field.column.clone(),
            data_type: sql_type(&field.source_type).to_string(),
            is_nullable: false,
            column_default: String::new(),
        })
        .collect()
}

/// Tagged fields of the named-field struct `name`, or `None` if the source
/// declares no such struct. Structs inside inline modules are searched too.
pub fn parse_struct(source: &str, name: &str) -> syn::Result<Option<Vec<FieldDescriptor>>> {
    let file = syn::parse_file(source)?;

    Ok(find_struct(&file.items, name).map(|fields| {
        fields
            .named
            .iter()
            .filter_map(parse_field)
            .collect()
    }))
}

fn find_struct<'a>(items: &'a [Item], name: &str) -> Option<&'a FieldsNamed> {
    items.iter().find_map(|item| match item {
        Item::Struct(item) if item.ident == name => match &item.fields {
            Fields::Named(fields) => Some(fields),
            _ => None,
        },
        Item::Mod(module) => module
            .content
            .as_ref()
            .and_then(|(_, items)| find_struct(items, name)),
        _ => None,
    })
}

fn parse_field(field: &Field) -> Option<FieldDescriptor> {
    let column = field.attrs.iter().find_map(column_from_attribute)?;
    let ident = field.ident.as_ref()?;

    Some(FieldDescriptor {
        field: ident.unraw().to_string(),
        column,
        source_type: type_string(&field.ty),
    })
}

/// `#[db("id")]` or `#[db(column = "id")]` -> `id`.
fn column_from_attribute(attr: &Attribute) -> Option<String> {
    if !attr.path().is_ident(COLUMN_TAG) {
        return None;
    }

    let column = match attr.parse_args::<LitStr>() {
        Ok(lit) => lit.value(),
        Err(_) => {
            let meta = attr.parse_args::<MetaNameValue>().ok()?;
            if !meta.path.is_ident("column") {
                return None;
            }
            match meta.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }) => lit.value(),
                _ => return None,
            }
        }
    };

    (!column.is_empty()).then_some(column)
}

/// Source text of a type with token spacing tightened, e.g.
/// `chrono::DateTime<Utc>` rather than `chrono :: DateTime < Utc >`.
fn type_string(ty: &Type) -> String {
    ty.to_token_stream()
        .to_string()
        .replace(" :: ", "::")
        .replace(":: ", "::")
        .replace(" < ", "<")
        .replace(" <", "<")
        .replace(" >", ">")
        .replace(" ,", ",")
}
