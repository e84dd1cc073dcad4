//! UI configuration: CRUD options, grid display, file renderers and button styles.
//!
//! The built-in defaults are immutable. Overrides read from `autoform.toml`
//! produce a new [`UiConfig`] through [`UiConfig::merge`].

#![allow(missing_docs)]

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::ConfigError;

/// Built-in file extension to renderer mapping.
pub const DEFAULT_FILE_RENDERERS: &[(&str, &str)] = &[
    (".csv", "csv"),
    (".json", "json"),
    (".plotly", "plotly"),
    (".plotly.json", "plotly"),
    (".vg.json", "vega"),
    (".vl.json", "vegalite"),
    (".ipyui.json", "autoui"),
    (".yaml", "yaml"),
    (".yml", "yaml"),
    (".png", "image"),
    (".jpg", "image"),
    (".jpeg", "image"),
    (".txt", "text"),
    (".md", "markdown"),
    (".py", "python"),
    (".pdf", "pdf"),
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UiConfig {
    pub crud: CrudOptions,
    pub grid: GridOptions,
    pub renderers: RendererMap,
    pub styles: ButtonStyles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrudOptions {
    /// Route delete through a confirmation step showing the selected rows.
    pub warn_on_delete: bool,
    /// Copy waits for an explicit confirmation.
    pub show_copy_dialogue: bool,
    /// Return to idle after a commit instead of reopening the same action.
    pub close_on_action: bool,
    pub copy_placement: CopyPlacement,
}

/// Where copied rows are inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyPlacement {
    #[default]
    End,
    Beginning,
}

impl CopyPlacement {
    fn parse(text: &str) -> Result<Self, ConfigError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "end" => Ok(Self::End),
            "beginning" | "start" => Ok(Self::Beginning),
            _ => Err(ConfigError::InvalidOption(
                format!("invalid crud.copy_policy '{text}'").into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOptions {
    /// Records map to table columns instead of rows.
    pub transposed: bool,
    /// Label columns by title rather than by field name.
    pub by_title: bool,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            transposed: false,
            by_title: true,
        }
    }
}

/// File extension to renderer name. Keys are lowercase and start with `.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererMap(Arc<IndexMap<SmolStr, SmolStr>>);

impl Default for RendererMap {
    fn default() -> Self {
        Self(Arc::new(
            DEFAULT_FILE_RENDERERS
                .iter()
                .map(|(ext, renderer)| (SmolStr::new(ext), SmolStr::new(renderer)))
                .collect(),
        ))
    }
}

impl RendererMap {
    #[must_use]
    pub fn get(&self, ext: &str) -> Option<&SmolStr> {
        self.0.get(normalize_ext(ext).as_str())
    }

    /// New map with `overrides` applied on top of this one.
    #[must_use]
    pub fn merge<'a>(&self, overrides: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut map = (*self.0).clone();
        for (ext, renderer) in overrides {
            map.insert(normalize_ext(ext), SmolStr::new(renderer));
        }
        Self(Arc::new(map))
    }

    /// Renderer for `path`, matching the longest registered suffix so that
    /// compound extensions such as `.vg.json` win over `.json`.
    #[must_use]
    pub fn renderer_for(&self, path: &str) -> Option<&SmolStr> {
        let name = path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(path)
            .to_ascii_lowercase();
        self.0
            .iter()
            .filter(|(ext, _)| name.ends_with(ext.as_str()) && name.len() > ext.len())
            .max_by_key(|(ext, _)| ext.len())
            .map(|(_, renderer)| renderer)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &SmolStr)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize_ext(ext: &str) -> SmolStr {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        SmolStr::new(ext)
    } else {
        SmolStr::new(format!(".{ext}"))
    }
}

/// Buttons of the CRUD button bar and its dialogues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonRole {
    Add,
    Edit,
    Copy,
    Delete,
    Save,
    Revert,
    ConfirmCopy,
    ConfirmDelete,
}

impl ButtonRole {
    pub const ALL: [ButtonRole; 8] = [
        Self::Add,
        Self::Edit,
        Self::Copy,
        Self::Delete,
        Self::Save,
        Self::Revert,
        Self::ConfirmCopy,
        Self::ConfirmDelete,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Copy => "copy",
            Self::Delete => "delete",
            Self::Save => "save",
            Self::Revert => "revert",
            Self::ConfirmCopy => "confirm_copy",
            Self::ConfirmDelete => "confirm_delete",
        }
    }

    fn parse(text: &str) -> Result<Self, ConfigError> {
        let key = text.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == key)
            .ok_or_else(|| ConfigError::InvalidOption(format!("invalid styles.{text}").into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylePreset {
    pub icon: SmolStr,
    pub style: SmolStr,
    pub tooltip: SmolStr,
}

impl StylePreset {
    fn new(icon: &str, style: &str, tooltip: &str) -> Self {
        Self {
            icon: SmolStr::new(icon),
            style: SmolStr::new(style),
            tooltip: SmolStr::new(tooltip),
        }
    }
}

/// Style preset per [`ButtonRole`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonStyles(Arc<IndexMap<ButtonRole, StylePreset>>);

impl Default for ButtonStyles {
    fn default() -> Self {
        let presets = [
            (ButtonRole::Add, StylePreset::new("plus", "success", "add item")),
            (ButtonRole::Edit, StylePreset::new("edit", "warning", "edit item")),
            (ButtonRole::Copy, StylePreset::new("copy", "primary", "copy item")),
            (ButtonRole::Delete, StylePreset::new("minus", "danger", "remove item")),
            (ButtonRole::Save, StylePreset::new("check", "success", "save changes")),
            (ButtonRole::Revert, StylePreset::new("times", "warning", "discard changes")),
            (ButtonRole::ConfirmCopy, StylePreset::new("copy", "success", "copy selected rows")),
            (
                ButtonRole::ConfirmDelete,
                StylePreset::new("exclamation-triangle", "danger", "delete selected rows"),
            ),
        ];
        Self(Arc::new(presets.into_iter().collect()))
    }
}

impl ButtonStyles {
    /// Preset for `role`. Every role has one.
    #[must_use]
    pub fn get(&self, role: ButtonRole) -> StylePreset {
        self.0
            .get(&role)
            .cloned()
            .unwrap_or_else(|| StylePreset::new("", "", role.as_str()))
    }

    fn merge(&self, overrides: &IndexMap<ButtonRole, StyleOverlay>) -> Self {
        if overrides.is_empty() {
            return self.clone();
        }
        let mut map = (*self.0).clone();
        for (role, overlay) in overrides {
            let mut preset = self.get(*role);
            if let Some(icon) = &overlay.icon {
                preset.icon.clone_from(icon);
            }
            if let Some(style) = &overlay.style {
                preset.style.clone_from(style);
            }
            if let Some(tooltip) = &overlay.tooltip {
                preset.tooltip.clone_from(tooltip);
            }
            map.insert(*role, preset);
        }
        Self(Arc::new(map))
    }
}

/// Partial configuration layered over a [`UiConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiConfigOverlay {
    pub warn_on_delete: Option<bool>,
    pub show_copy_dialogue: Option<bool>,
    pub close_on_action: Option<bool>,
    pub copy_placement: Option<CopyPlacement>,
    pub transposed: Option<bool>,
    pub by_title: Option<bool>,
    pub renderers: IndexMap<SmolStr, SmolStr>,
    pub styles: IndexMap<ButtonRole, StyleOverlay>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleOverlay {
    pub icon: Option<SmolStr>,
    pub style: Option<SmolStr>,
    pub tooltip: Option<SmolStr>,
}

impl UiConfigOverlay {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let raw: UiToml = toml::from_str(text)
            .map_err(|err| ConfigError::Parse(format!("autoform.toml: {err}").into()))?;
        raw.into_overlay()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|err| ConfigError::Io(format!("autoform.toml: {err}").into()))?;
        Self::parse(&text)
    }
}

impl UiConfig {
    /// Defaults with the overrides of `path` applied.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let overlay = UiConfigOverlay::load(path)?;
        Ok(Self::default().merge(&overlay))
    }

    /// New configuration with `overlay` applied. `self` is left unchanged.
    #[must_use]
    pub fn merge(&self, overlay: &UiConfigOverlay) -> UiConfig {
        let crud = CrudOptions {
            warn_on_delete: overlay.warn_on_delete.unwrap_or(self.crud.warn_on_delete),
            show_copy_dialogue: overlay
                .show_copy_dialogue
                .unwrap_or(self.crud.show_copy_dialogue),
            close_on_action: overlay.close_on_action.unwrap_or(self.crud.close_on_action),
            copy_placement: overlay.copy_placement.unwrap_or(self.crud.copy_placement),
        };
        let grid = GridOptions {
            transposed: overlay.transposed.unwrap_or(self.grid.transposed),
            by_title: overlay.by_title.unwrap_or(self.grid.by_title),
        };
        let renderers = if overlay.renderers.is_empty() {
            self.renderers.clone()
        } else {
            self.renderers.merge(
                overlay
                    .renderers
                    .iter()
                    .map(|(ext, renderer)| (ext.as_str(), renderer.as_str())),
            )
        };
        UiConfig {
            crud,
            grid,
            renderers,
            styles: self.styles.merge(&overlay.styles),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UiToml {
    crud: Option<CrudSection>,
    grid: Option<GridSection>,
    #[serde(default)]
    renderers: IndexMap<String, String>,
    #[serde(default)]
    styles: IndexMap<String, StyleSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CrudSection {
    warn_on_delete: Option<bool>,
    show_copy_dialogue: Option<bool>,
    close_on_action: Option<bool>,
    copy_policy: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GridSection {
    transposed: Option<bool>,
    by_title: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StyleSection {
    icon: Option<String>,
    style: Option<String>,
    tooltip: Option<String>,
}

impl UiToml {
    fn into_overlay(self) -> Result<UiConfigOverlay, ConfigError> {
        let mut overlay = UiConfigOverlay::default();
        if let Some(crud) = self.crud {
            overlay.warn_on_delete = crud.warn_on_delete;
            overlay.show_copy_dialogue = crud.show_copy_dialogue;
            overlay.close_on_action = crud.close_on_action;
            overlay.copy_placement = crud
                .copy_policy
                .as_deref()
                .map(CopyPlacement::parse)
                .transpose()?;
        }
        if let Some(grid) = self.grid {
            overlay.transposed = grid.transposed;
            overlay.by_title = grid.by_title;
        }
        for (ext, renderer) in self.renderers {
            if renderer.trim().is_empty() {
                return Err(ConfigError::InvalidOption(
                    format!("renderers.'{ext}' must name a renderer").into(),
                ));
            }
            overlay
                .renderers
                .insert(SmolStr::new(ext), SmolStr::new(renderer));
        }
        for (name, style) in self.styles {
            let role = ButtonRole::parse(&name)?;
            overlay.styles.insert(
                role,
                StyleOverlay {
                    icon: style.icon.map(SmolStr::new),
                    style: style.style.map(SmolStr::new),
                    tooltip: style.tooltip.map(SmolStr::new),
                },
            );
        }
        Ok(overlay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_edit_grid() {
        let config = UiConfig::default();
        assert!(!config.crud.warn_on_delete);
        assert!(!config.crud.show_copy_dialogue);
        assert!(!config.crud.close_on_action);
        assert_eq!(config.crud.copy_placement, CopyPlacement::End);
        assert!(config.grid.by_title);
        assert!(!config.grid.transposed);
        assert_eq!(config.styles.get(ButtonRole::ConfirmDelete).icon, "exclamation-triangle");
    }

    #[test]
    fn compound_extensions_win_over_plain_ones() {
        let renderers = RendererMap::default();
        assert_eq!(renderers.renderer_for("out/chart.vg.json").map(SmolStr::as_str), Some("vega"));
        assert_eq!(renderers.renderer_for("data.JSON").map(SmolStr::as_str), Some("json"));
        assert_eq!(renderers.renderer_for("notes"), None);
        assert_eq!(renderers.renderer_for(".json"), None);
    }

    #[test]
    fn merge_returns_a_new_map() {
        let base = RendererMap::default();
        let merged = base.merge([("XLSX", "excel"), (".csv", "table")]);
        assert_eq!(merged.get(".xlsx").map(SmolStr::as_str), Some("excel"));
        assert_eq!(merged.get("csv").map(SmolStr::as_str), Some("table"));
        assert_eq!(base.get(".csv").map(SmolStr::as_str), Some("csv"));
        assert_eq!(base.get(".xlsx"), None);
    }

    #[test]
    fn overlay_parses_sections() {
        let overlay = UiConfigOverlay::parse(
            r#"
[crud]
warn_on_delete = true
copy_policy = "Beginning"

[grid]
transposed = true

[renderers]
".log" = "text"

[styles.add]
icon = "plus-circle"
"#,
        )
        .expect("overlay");
        let base = UiConfig::default();
        let merged = base.merge(&overlay);
        assert!(merged.crud.warn_on_delete);
        assert_eq!(merged.crud.copy_placement, CopyPlacement::Beginning);
        assert!(merged.grid.transposed);
        assert!(merged.grid.by_title);
        assert_eq!(merged.renderers.renderer_for("x.log").map(SmolStr::as_str), Some("text"));
        let add = merged.styles.get(ButtonRole::Add);
        assert_eq!((add.icon.as_str(), add.style.as_str()), ("plus-circle", "success"));
        assert_eq!(base, UiConfig::default());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let err = UiConfigOverlay::parse("[crud]\ncopy_policy = \"middle\"\n").expect_err("policy");
        assert_eq!(
            err,
            ConfigError::InvalidOption("invalid crud.copy_policy 'middle'".into())
        );
        assert!(matches!(
            UiConfigOverlay::parse("[styles.launch]\nicon = \"x\"\n"),
            Err(ConfigError::InvalidOption(_))
        ));
        assert!(matches!(
            UiConfigOverlay::parse("[grid]\nrows = 1\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
