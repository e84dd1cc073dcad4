//! Serde model of the accepted JSON Schema subset.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `type` may be a single name or a list (a `"null"` entry marks nullable).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum TypeDecl {
    One(String),
    Many(Vec<String>),
}

impl TypeDecl {
    /// Primary (non-null) type name and whether `null` was listed.
    pub(crate) fn split(&self) -> (Option<&str>, bool) {
        match self {
            Self::One(name) if name == "null" => (None, true),
            Self::One(name) => (Some(name.as_str()), false),
            Self::Many(names) => {
                let nullable = names.iter().any(|name| name == "null");
                let primary = names.iter().find(|name| *name != "null");
                (primary.map(String::as_str), nullable)
            }
        }
    }
}

/// `datagrid_index_name`: `"title"` or `["section", "title"]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum IndexNameDecl {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawSchema {
    #[serde(rename = "type")]
    pub ty: Option<TypeDecl>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "present")]
    pub default: Option<Value>,
    pub section: Option<String>,
    #[serde(alias = "aui_column_width")]
    pub column_width: Option<u32>,
    #[serde(alias = "aui_sig_fig")]
    pub precision: Option<u8>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    #[serde(alias = "minItems")]
    pub min_items: Option<usize>,
    #[serde(alias = "maxItems")]
    pub max_items: Option<usize>,
    #[serde(alias = "minLength")]
    pub min_length: Option<usize>,
    #[serde(alias = "maxLength")]
    pub max_length: Option<usize>,
    pub required: Vec<String>,
    pub nullable: bool,
    pub disabled: bool,
    pub format: Option<String>,
    pub widget: Option<String>,
    pub items: Option<Box<RawSchema>>,
    pub properties: IndexMap<String, RawSchema>,
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(rename = "allOf")]
    pub all_of: Vec<RawSchema>,
    #[serde(rename = "anyOf")]
    pub any_of: Vec<RawSchema>,
    pub definitions: IndexMap<String, RawSchema>,
    #[serde(rename = "$defs")]
    pub defs: IndexMap<String, RawSchema>,
    pub order: Option<Vec<String>>,
    pub datagrid_index_name: Option<IndexNameDecl>,
}

/// Keeps an explicit `null` distinct from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl RawSchema {
    /// Copy every key set on `over` onto `self`. Structural keys (`properties`,
    /// `items`) only replace when `over` declares them. Reference keys of
    /// `self` are left alone so alias chains can keep resolving.
    pub(crate) fn overlay(&mut self, over: &RawSchema) {
        macro_rules! take {
            ($($field:ident),+ $(,)?) => {
                $(
                    if over.$field.is_some() {
                        self.$field = over.$field.clone();
                    }
                )+
            };
        }
        take!(
            ty,
            title,
            description,
            default,
            section,
            column_width,
            precision,
            enum_values,
            minimum,
            maximum,
            min_items,
            max_items,
            min_length,
            max_length,
            format,
            widget,
            items,
            order,
            datagrid_index_name,
        );
        if !over.properties.is_empty() {
            self.properties = over.properties.clone();
        }
        if !over.required.is_empty() {
            self.required = over.required.clone();
        }
        self.nullable |= over.nullable;
        self.disabled |= over.disabled;
    }

    /// Whether this node declares the tabular ("dataframe") format.
    pub(crate) fn is_tabular(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|format| format.eq_ignore_ascii_case("dataframe"))
    }

    /// Whether this node describes a record (explicit object type or bare properties).
    pub(crate) fn is_record(&self) -> bool {
        match self.ty.as_ref().map(TypeDecl::split) {
            Some((Some("object"), _)) => true,
            Some((None, _)) | None => !self.properties.is_empty(),
            Some(_) => false,
        }
    }
}
