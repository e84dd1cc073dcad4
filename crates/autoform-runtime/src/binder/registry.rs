//! Control kinds and the registry that builds controls for them.

use std::fmt;
use std::sync::Arc;

use autoform_schema::{FieldKind, FieldPath, NormalizedField, ScalarType, SchemaError, SchemaIndex};
use rustc_hash::FxHashMap;
use serde_json::Value;
use smol_str::SmolStr;

use crate::binder::control::Control;
use crate::binder::widgets::{GridControl, ListControl, NestedControl, ScalarControl};
use crate::config::UiConfig;

/// Closed set of control kinds. `Custom` names an externally registered kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// Single-line text.
    Text,
    /// Multi-line text.
    TextArea,
    /// File path, with a renderer picked from its extension.
    Path,
    /// Integer typed as text.
    IntegerText,
    /// Number typed as text.
    NumberText,
    /// Number bounded by `minimum` and `maximum`.
    Slider,
    Checkbox,
    /// One choice out of `enum`.
    Dropdown,
    /// Several choices out of `enum`.
    MultiSelect,
    /// Free list of scalars.
    List,
    /// Form of a nested record.
    Nested,
    /// Editable grid of records.
    Grid,
    Custom(SmolStr),
}

impl WidgetKind {
    /// Every built-in kind.
    pub const STANDARD: [WidgetKind; 12] = [
        Self::Text,
        Self::TextArea,
        Self::Path,
        Self::IntegerText,
        Self::NumberText,
        Self::Slider,
        Self::Checkbox,
        Self::Dropdown,
        Self::MultiSelect,
        Self::List,
        Self::Nested,
        Self::Grid,
    ];

    /// Kind named `name`, case-insensitively. Unknown names become
    /// [`WidgetKind::Custom`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let key = name.trim().to_ascii_lowercase();
        Self::STANDARD
            .into_iter()
            .find(|kind| kind.as_str() == key)
            .unwrap_or_else(|| Self::Custom(SmolStr::new(name.trim())))
    }

    /// Name used in schemas and configuration.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::TextArea => "textarea",
            Self::Path => "path",
            Self::IntegerText => "integer",
            Self::NumberText => "number",
            Self::Slider => "slider",
            Self::Checkbox => "checkbox",
            Self::Dropdown => "dropdown",
            Self::MultiSelect => "multiselect",
            Self::List => "list",
            Self::Nested => "nested",
            Self::Grid => "grid",
            Self::Custom(name) => name.as_str(),
        }
    }

    /// Free-text kinds buffer keystrokes until commit or blur.
    #[must_use]
    pub fn buffers_input(&self) -> bool {
        matches!(
            self,
            Self::Text | Self::TextArea | Self::Path | Self::IntegerText | Self::NumberText | Self::List
        )
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control kind for `field`, honouring an explicit `widget` override.
#[must_use]
pub fn widget_for_field(field: &NormalizedField) -> WidgetKind {
    match &field.widget {
        Some(name) => WidgetKind::parse(name),
        None => standard_widget(field),
    }
}

fn standard_widget(field: &NormalizedField) -> WidgetKind {
    let has_options = field.constraints.enum_values.is_some();
    let format = field.format.as_deref().map(str::to_ascii_lowercase);
    match &field.kind {
        FieldKind::Scalar(_) if has_options => WidgetKind::Dropdown,
        FieldKind::Scalar(ScalarType::String) => match format.as_deref() {
            Some("path" | "file-path" | "directory-path") => WidgetKind::Path,
            Some("textarea" | "multiline" | "markdown") => WidgetKind::TextArea,
            _ => WidgetKind::Text,
        },
        FieldKind::Scalar(ScalarType::Integer | ScalarType::Number)
            if field.constraints.is_bounded() =>
        {
            WidgetKind::Slider
        }
        FieldKind::Scalar(ScalarType::Integer) => WidgetKind::IntegerText,
        FieldKind::Scalar(ScalarType::Number) => WidgetKind::NumberText,
        FieldKind::Scalar(ScalarType::Boolean) => WidgetKind::Checkbox,
        FieldKind::ScalarArray(_) if has_options => WidgetKind::MultiSelect,
        FieldKind::ScalarArray(_) => WidgetKind::List,
        FieldKind::Object(_) => WidgetKind::Nested,
        FieldKind::RecordArray(_) => WidgetKind::Grid,
    }
}

/// Everything a factory needs to build one control.
pub struct ControlContext<'a> {
    pub kind: WidgetKind,
    pub field: &'a NormalizedField,
    pub path: &'a FieldPath,
    pub schema: &'a Arc<SchemaIndex>,
    pub registry: &'a ControlRegistry,
    pub config: &'a UiConfig,
    /// Initial value of the field.
    pub value: &'a Value,
}

/// Builds the control for one field.
pub type ControlFactory =
    Arc<dyn Fn(&ControlContext<'_>) -> Result<Box<dyn Control>, SchemaError> + Send + Sync>;

/// Maps each [`WidgetKind`] to a control factory.
///
/// Registering a factory returns a new registry; existing registries and the
/// controls built from them are unaffected.
#[derive(Clone)]
pub struct ControlRegistry {
    factories: Arc<FxHashMap<WidgetKind, ControlFactory>>,
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ControlRegistry {
    /// Registry with a factory for every standard kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut factories: FxHashMap<WidgetKind, ControlFactory> = FxHashMap::default();
        for kind in WidgetKind::STANDARD {
            let factory: ControlFactory = match kind {
                WidgetKind::List | WidgetKind::MultiSelect => Arc::new(build_list),
                WidgetKind::Nested => Arc::new(build_nested),
                WidgetKind::Grid => Arc::new(build_grid),
                _ => Arc::new(build_scalar),
            };
            factories.insert(kind, factory);
        }
        Self {
            factories: Arc::new(factories),
        }
    }

    /// New registry where `kind` is built by `factory`.
    #[must_use]
    pub fn with_factory<F>(&self, kind: WidgetKind, factory: F) -> Self
    where
        F: Fn(&ControlContext<'_>) -> Result<Box<dyn Control>, SchemaError> + Send + Sync + 'static,
    {
        let mut factories = (*self.factories).clone();
        factories.insert(kind, Arc::new(factory));
        Self {
            factories: Arc::new(factories),
        }
    }

    /// Whether a factory is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: &WidgetKind) -> bool {
        self.factories.contains_key(kind)
    }

    /// Build the control described by `ctx`. An unregistered custom kind
    /// falls back to the standard kind of the field.
    pub fn build(&self, ctx: &ControlContext<'_>) -> Result<Box<dyn Control>, SchemaError> {
        if let Some(factory) = self.factories.get(&ctx.kind) {
            return factory(ctx);
        }
        let fallback = standard_widget(ctx.field);
        tracing::warn!(
            path = %ctx.path,
            requested = %ctx.kind,
            fallback = %fallback,
            "no factory registered for widget; using the standard control"
        );
        let factory = self
            .factories
            .get(&fallback)
            .ok_or_else(|| SchemaError::UnsupportedType {
                path: ctx.path.clone(),
                ty: SmolStr::new(ctx.kind.as_str()),
            })?;
        factory(&ControlContext {
            kind: fallback,
            field: ctx.field,
            path: ctx.path,
            schema: ctx.schema,
            registry: ctx.registry,
            config: ctx.config,
            value: ctx.value,
        })
    }
}

impl fmt::Debug for ControlRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.factories.keys().map(WidgetKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("ControlRegistry").field("kinds", &kinds).finish()
    }
}

fn build_scalar(ctx: &ControlContext<'_>) -> Result<Box<dyn Control>, SchemaError> {
    Ok(Box::new(ScalarControl::new(ctx)?))
}

fn build_list(ctx: &ControlContext<'_>) -> Result<Box<dyn Control>, SchemaError> {
    Ok(Box::new(ListControl::new(ctx)?))
}

fn build_nested(ctx: &ControlContext<'_>) -> Result<Box<dyn Control>, SchemaError> {
    Ok(Box::new(NestedControl::new(ctx)?))
}

fn build_grid(ctx: &ControlContext<'_>) -> Result<Box<dyn Control>, SchemaError> {
    Ok(Box::new(GridControl::new(ctx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds(schema: Value) -> Vec<(String, String)> {
        let index = SchemaIndex::from_value(schema).expect("schema");
        index
            .root_record()
            .expect("record")
            .fields()
            .iter()
            .map(|field| (field.name.to_string(), widget_for_field(field).to_string()))
            .collect()
    }

    #[test]
    fn kinds_follow_field_shape() {
        let listing = kinds(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "notes": {"type": "string", "format": "textarea"},
                "file": {"type": "string", "format": "path"},
                "count": {"type": "integer"},
                "ratio": {"type": "number"},
                "level": {"type": "integer", "minimum": 0, "maximum": 10},
                "flag": {"type": "boolean"},
                "colour": {"type": "string", "enum": ["red", "blue"]},
                "tags": {"type": "array", "items": {"type": "string"}},
                "picks": {"type": "array", "items": {"type": "string", "enum": ["a", "b"]}},
                "inner": {"type": "object", "properties": {"x": {"type": "integer"}}},
                "rows": {"type": "array", "items": {"type": "object", "properties": {"x": {"type": "integer"}}}},
                "fancy": {"type": "string", "widget": "colour-picker"}
            }
        }));
        let listing: Vec<String> = listing
            .into_iter()
            .map(|(name, kind)| format!("{name}={kind}"))
            .collect();
        assert_eq!(
            listing,
            [
                "name=text",
                "notes=textarea",
                "file=path",
                "count=integer",
                "ratio=number",
                "level=slider",
                "flag=checkbox",
                "colour=dropdown",
                "tags=list",
                "picks=multiselect",
                "inner=nested",
                "rows=grid",
                "fancy=colour-picker",
            ]
        );
    }

    #[test]
    fn registering_a_factory_leaves_the_original_untouched() {
        let standard = ControlRegistry::standard();
        let custom = WidgetKind::parse("colour-picker");
        let extended = standard.with_factory(custom.clone(), build_scalar);
        assert!(extended.contains(&custom));
        assert!(!standard.contains(&custom));
        assert_eq!(WidgetKind::parse("Slider"), WidgetKind::Slider);
    }
}
