//! Editor configuration.
//!
//! Every field has a default, so a JSON file only needs the keys it wants to
//! change:
//!
//! ```json
//! { "grid_size": 16, "canvas_drag": "marquee", "theme": { "error": "#ff0000" } }
//! ```

use crate::keymap::Keymap;
use crate::model::ConnectionStyle;
use crate::viewport::{Size, ZoomLimits};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// What dragging the empty canvas with the primary button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasDragMode {
    #[default]
    Pan,
    Marquee,
}

/// An opaque RGB colour, written as `#rrggbb` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u32);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub fn to_color(self) -> slint::Color {
        slint::Color::from_argb_encoded(0xff00_0000 | self.0)
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("colour `{}` must start with #", s))?;
        if hex.len() != 6 {
            return Err(format!("colour `{}` must have six hex digits", s));
        }
        u32::from_str_radix(hex, 16)
            .map(Rgb)
            .map_err(|e| format!("colour `{}`: {}", s, e))
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

/// Colours used for visual states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub connection: Rgb,
    pub connection_hovered: Rgb,
    pub connection_selected: Rgb,
    pub node_border: Rgb,
    pub node_hovered: Rgb,
    pub node_selected: Rgb,
    pub port: Rgb,
    /// Invalid drop targets and the preview path over them.
    pub error: Rgb,
    pub minimap_node: Rgb,
    pub minimap_viewport: Rgb,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            connection: Rgb::new(0x99, 0x99, 0x99),
            connection_hovered: Rgb::new(0xff, 0x6d, 0x5a),
            connection_selected: Rgb::new(0xff, 0x6d, 0x5a),
            node_border: Rgb::new(0x7d, 0x7d, 0x87),
            node_hovered: Rgb::new(0xb0, 0xb0, 0xb8),
            node_selected: Rgb::new(0x5a, 0x9c, 0xff),
            port: Rgb::new(0xc4, 0xc8, 0xd1),
            error: Rgb::new(0xf5, 0x4f, 0x4f),
            minimap_node: Rgb::new(0x88, 0x88, 0x88),
            minimap_viewport: Rgb::new(0x5a, 0x9c, 0xff),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimapConfig {
    pub width: f32,
    pub height: f32,
    /// Inner margin around the projected graph, in minimap pixels.
    pub padding: f32,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 150.0,
            padding: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub zoom: ZoomLimits,
    /// Factor applied by the zoom-in/zoom-out commands.
    pub zoom_step: f32,
    /// Factor applied per wheel notch.
    pub wheel_zoom_factor: f32,
    /// Screen pixels kept free around the graph by fit-to-view.
    pub fit_padding: f32,

    pub grid_size: f32,
    pub snap_to_grid: bool,
    /// Used for nodes that carry no size and have not been measured.
    pub default_node_size: Size,

    /// Screen pixels.
    pub port_hit_radius: f32,
    /// Screen pixels.
    pub connection_hover_distance: f32,
    pub hit_samples: usize,

    pub bezier_min_offset: f32,
    pub connection_style: ConnectionStyle,

    pub canvas_drag: CanvasDragMode,
    /// Pointer travel (screen pixels) between live marquee recomputations.
    pub marquee_throttle_px: f32,

    pub minimap: MinimapConfig,
    pub theme: Theme,
    pub keymap: Keymap,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomLimits::default(),
            zoom_step: 1.2,
            wheel_zoom_factor: 1.1,
            fit_padding: 50.0,
            grid_size: 20.0,
            snap_to_grid: true,
            default_node_size: Size::new(100.0, 100.0),
            port_hit_radius: 10.0,
            connection_hover_distance: 8.0,
            hit_samples: 20,
            bezier_min_offset: 50.0,
            connection_style: ConnectionStyle::Bezier,
            canvas_drag: CanvasDragMode::Pan,
            marquee_throttle_px: 4.0,
            minimap: MinimapConfig::default(),
            theme: Theme::default(),
            keymap: Keymap::default(),
        }
    }
}

impl EditorConfig {
    /// Load a configuration from JSON; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let config: EditorConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Replace out-of-range values with usable ones.
    pub fn sanitized(mut self) -> Self {
        let defaults = EditorConfig::default();

        if !(self.zoom.min > 0.0 && self.zoom.min <= self.zoom.max) {
            warn!(min = self.zoom.min, max = self.zoom.max, "invalid zoom limits, using defaults");
            self.zoom = defaults.zoom;
        }
        if !(self.zoom_step > 1.0) {
            warn!(zoom_step = self.zoom_step, "zoom_step must exceed 1");
            self.zoom_step = defaults.zoom_step;
        }
        if !(self.wheel_zoom_factor > 1.0) {
            warn!(factor = self.wheel_zoom_factor, "wheel_zoom_factor must exceed 1");
            self.wheel_zoom_factor = defaults.wheel_zoom_factor;
        }
        if !(self.default_node_size.width > 0.0 && self.default_node_size.height > 0.0) {
            warn!("default_node_size must be positive");
            self.default_node_size = defaults.default_node_size;
        }
        self.grid_size = self.grid_size.max(0.0);
        self.fit_padding = self.fit_padding.max(0.0);
        self.marquee_throttle_px = self.marquee_throttle_px.max(0.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.zoom.min, 0.1);
        assert_eq!(config.zoom.max, 3.0);
        assert_eq!(config.wheel_zoom_factor, 1.1);
        assert_eq!(config.bezier_min_offset, 50.0);
        assert_eq!(config.canvas_drag, CanvasDragMode::Pan);
        assert_eq!(config.connection_style, ConnectionStyle::Bezier);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EditorConfig::from_json_str(
            r##"{"grid_size": 16, "canvas_drag": "marquee", "theme": {"error": "#ff0000"}}"##,
        )
        .unwrap();
        assert_eq!(config.grid_size, 16.0);
        assert_eq!(config.canvas_drag, CanvasDragMode::Marquee);
        assert_eq!(config.theme.error, Rgb(0xff0000));
        assert_eq!(config.theme.port, Theme::default().port);
        assert_eq!(config.keymap, Keymap::default());
    }

    #[test]
    fn test_invalid_values_are_sanitized() {
        let config =
            EditorConfig::from_json_str(r#"{"zoom": {"min": 5.0, "max": 1.0}, "zoom_step": 0.5}"#)
                .unwrap();
        assert_eq!(config.zoom, ZoomLimits::default());
        assert_eq!(config.zoom_step, 1.2);
    }

    #[test]
    fn test_bad_colour_is_an_error() {
        assert!(EditorConfig::from_json_str(r#"{"theme": {"error": "red"}}"#).is_err());
        assert!(EditorConfig::from_json_str(r##"{"theme": {"error": "#fff"}}"##).is_err());
    }

    #[test]
    fn test_rgb_to_color() {
        let c = Rgb::new(0x12, 0x34, 0x56).to_color();
        assert_eq!((c.red(), c.green(), c.blue(), c.alpha()), (0x12, 0x34, 0x56, 0xff));
        assert_eq!(Rgb::new(0x12, 0x34, 0x56).to_string(), "#123456");
    }

    #[test]
    fn test_roundtrip_json() {
        let config = EditorConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EditorConfig::from_json_str(&json).unwrap(), config);
    }
}
