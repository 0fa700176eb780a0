//! Engine options and their TOML form.

#![allow(missing_docs)]

use std::path::Path;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::FormError;

/// How top-level tab groups are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TabPolicy {
    /// Tab groups share one tab container.
    #[default]
    Tabs,
    /// Tab groups are stacked as top-level fieldsets with a table of contents.
    Linear,
}

impl TabPolicy {
    pub fn parse(text: &str) -> Result<Self, FormError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "tabs" | "default" => Ok(Self::Tabs),
            "linear" | "inline" => Ok(Self::Linear),
            _ => Err(FormError::InvalidConfig(
                format!("invalid form.tab_policy '{text}'").into(),
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tabs => "tabs",
            Self::Linear => "linear",
        }
    }
}

/// Options of one form instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOptions {
    /// Separator of flat field names.
    pub separator: SmolStr,
    /// Prefix applied to every submitted field name.
    pub field_name_prefix: SmolStr,
    /// Hide deactivated checker controls instead of showing them disabled.
    pub hide_disabled_buttons: bool,
    pub tab_policy: TabPolicy,
    /// Count comments in panel badges.
    pub show_comments: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            separator: SmolStr::new_inline("."),
            field_name_prefix: SmolStr::default(),
            hide_disabled_buttons: false,
            tab_policy: TabPolicy::Tabs,
            show_comments: true,
        }
    }
}

impl FormOptions {
    /// Loads the `[form]` table of a TOML file; other tables are ignored.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FormError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|err| FormError::InvalidConfig(format!("formpanel.toml: {err}").into()))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, FormError> {
        let raw: OptionsToml = toml::from_str(text)
            .map_err(|err| FormError::InvalidConfig(format!("formpanel.toml: {err}").into()))?;
        raw.into_config()
    }
}

#[derive(Debug, Deserialize)]
struct OptionsToml {
    form: Option<FormSection>,
}

#[derive(Debug, Deserialize)]
struct FormSection {
    separator: Option<String>,
    field_name_prefix: Option<String>,
    hide_disabled_buttons: Option<bool>,
    tab_policy: Option<String>,
    show_comments: Option<bool>,
}

impl OptionsToml {
    fn into_config(self) -> Result<FormOptions, FormError> {
        let defaults = FormOptions::default();
        let Some(section) = self.form else {
            return Ok(defaults);
        };
        let separator = section.separator.map_or(defaults.separator, SmolStr::new);
        if separator.is_empty() || separator.contains('/') {
            return Err(FormError::InvalidConfig(
                format!("invalid form.separator '{separator}'").into(),
            ));
        }
        let field_name_prefix = section
            .field_name_prefix
            .map_or(defaults.field_name_prefix, SmolStr::new);
        if !field_name_prefix.is_empty() && !field_name_prefix.ends_with(separator.as_str()) {
            return Err(FormError::InvalidConfig(
                format!("form.field_name_prefix must end with '{separator}'").into(),
            ));
        }
        let tab_policy = match section.tab_policy.as_deref() {
            Some(text) => TabPolicy::parse(text)?,
            None => defaults.tab_policy,
        };
        Ok(FormOptions {
            separator,
            field_name_prefix,
            hide_disabled_buttons: section
                .hide_disabled_buttons
                .unwrap_or(defaults.hide_disabled_buttons),
            tab_policy,
            show_comments: section.show_comments.unwrap_or(defaults.show_comments),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_gives_defaults() {
        let options = FormOptions::from_toml_str("[endpoint]\nurl = \"http://x\"\n").unwrap();
        assert_eq!(options, FormOptions::default());
    }

    #[test]
    fn form_table_overrides_defaults() {
        let options = FormOptions::from_toml_str(
            "[form]\nseparator = \":\"\nfield_name_prefix = \"cfg:\"\ntab_policy = \"linear\"\nhide_disabled_buttons = true\n",
        )
        .unwrap();
        assert_eq!(options.separator, ":");
        assert_eq!(options.field_name_prefix, "cfg:");
        assert_eq!(options.tab_policy, TabPolicy::Linear);
        assert!(options.hide_disabled_buttons);
    }

    #[test]
    fn prefix_must_end_with_separator() {
        let err = FormOptions::from_toml_str("[form]\nfield_name_prefix = \"cfg\"\n").unwrap_err();
        assert!(matches!(err, FormError::InvalidConfig(_)));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(TabPolicy::parse("accordion").is_err());
    }
}
