//! Resource-layer configuration.
//!
//! Defaults match what a desktop GL context normally offers. Each field can be
//! overridden from the environment:
//!
//! | variable                            | effect                                   |
//! |-------------------------------------|------------------------------------------|
//! | `SCENEGL_SEARCH_PATHS`              | platform path list prepended to search   |
//! | `SCENEGL_MAX_TEXTURE_UNITS`         | units processed when multitexturing      |
//! | `SCENEGL_DISABLE_MULTITEXTURE`      | `1`/`true` forces single-unit binding    |
//! | `SCENEGL_DISABLE_RENDER_TO_TEXTURE` | `1`/`true` forces degraded surfaces      |
//! | `SCENEGL_ATTACHMENTS`               | default colour attachments per surface   |

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::state::MAX_TEXTURE_UNITS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    /// Directories searched, in order, when resolving texture file names.
    pub search_paths: Vec<PathBuf>,
    /// Upper bound on texture units processed per bind. Clamped to
    /// [`MAX_TEXTURE_UNITS`].
    pub max_texture_units: usize,
    /// Allow binding more than one texture unit when the driver supports it.
    pub multitexturing: bool,
    /// Allow framebuffer-backed render targets when the driver supports them.
    pub render_to_texture: bool,
    /// Colour attachments created for a surface when none is requested.
    pub default_attachments: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            max_texture_units: MAX_TEXTURE_UNITS,
            multitexturing: true,
            render_to_texture: true,
            default_attachments: 1,
        }
    }
}

impl ResourceConfig {
    /// Defaults overridden by `SCENEGL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var_os(key).map(|v| v.to_string_lossy().into_owned()))
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(paths) = lookup("SCENEGL_SEARCH_PATHS") {
            config.search_paths = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }

        if let Some(units) = lookup("SCENEGL_MAX_TEXTURE_UNITS") {
            let units: usize = units
                .trim()
                .parse()
                .with_context(|| format!("SCENEGL_MAX_TEXTURE_UNITS={units:?}"))?;
            if units == 0 {
                bail!("SCENEGL_MAX_TEXTURE_UNITS must be at least 1");
            }
            config.max_texture_units = units.min(MAX_TEXTURE_UNITS);
        }

        if let Some(flag) = lookup("SCENEGL_DISABLE_MULTITEXTURE") {
            config.multitexturing = !parse_flag("SCENEGL_DISABLE_MULTITEXTURE", &flag)?;
        }

        if let Some(flag) = lookup("SCENEGL_DISABLE_RENDER_TO_TEXTURE") {
            config.render_to_texture = !parse_flag("SCENEGL_DISABLE_RENDER_TO_TEXTURE", &flag)?;
        }

        if let Some(count) = lookup("SCENEGL_ATTACHMENTS") {
            let count: usize = count
                .trim()
                .parse()
                .with_context(|| format!("SCENEGL_ATTACHMENTS={count:?}"))?;
            config.default_attachments = count.max(1);
        }

        Ok(config)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{name}: expected a boolean, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn no_variables_gives_defaults() {
        let config = ResourceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ResourceConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = ResourceConfig::from_lookup(lookup(&[
            ("SCENEGL_MAX_TEXTURE_UNITS", "4"),
            ("SCENEGL_DISABLE_MULTITEXTURE", "true"),
            ("SCENEGL_DISABLE_RENDER_TO_TEXTURE", "0"),
            ("SCENEGL_ATTACHMENTS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.max_texture_units, 4);
        assert!(!config.multitexturing);
        assert!(config.render_to_texture);
        assert_eq!(config.default_attachments, 3);
    }

    #[test]
    fn texture_units_are_clamped() {
        let config =
            ResourceConfig::from_lookup(lookup(&[("SCENEGL_MAX_TEXTURE_UNITS", "64")])).unwrap();
        assert_eq!(config.max_texture_units, MAX_TEXTURE_UNITS);

        assert!(ResourceConfig::from_lookup(lookup(&[("SCENEGL_MAX_TEXTURE_UNITS", "0")])).is_err());
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(
            ResourceConfig::from_lookup(lookup(&[("SCENEGL_MAX_TEXTURE_UNITS", "many")])).is_err()
        );
        assert!(
            ResourceConfig::from_lookup(lookup(&[("SCENEGL_DISABLE_MULTITEXTURE", "maybe")]))
                .is_err()
        );
    }

    #[test]
    fn search_paths_split_on_platform_separator() {
        let joined = std::env::join_paths(["/a/textures", "/b/textures"]).unwrap();
        let joined = joined.to_string_lossy().into_owned();
        let config =
            ResourceConfig::from_lookup(lookup(&[("SCENEGL_SEARCH_PATHS", joined.as_str())]))
                .unwrap();
        assert_eq!(
            config.search_paths,
            vec![PathBuf::from("/a/textures"), PathBuf::from("/b/textures")]
        );
    }
}
