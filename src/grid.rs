use crate::viewport::{Position, Viewport};

/// Generate SVG path commands for background grid lines
///
/// Creates a string of SVG path commands for rendering an infinite grid that
/// follows the viewport's pan offset and zoom level.
///
/// # Arguments
/// * `width` - Canvas width in pixels
/// * `height` - Canvas height in pixels
/// * `viewport` - Current pan offset and zoom
/// * `spacing` - Base grid spacing in world units
///
/// # Returns
/// SVG path commands string (e.g., "M 24 0 L 24 600 M 48 0 L 48 600...")
pub fn generate_grid_commands(width: f32, height: f32, viewport: &Viewport, spacing: f32) -> String {
    let effective_spacing = spacing * viewport.zoom;

    // Skip if spacing is too small to be visible
    if effective_spacing < 4.0 {
        return String::new();
    }

    let offset_x = viewport.x.rem_euclid(effective_spacing);
    let offset_y = viewport.y.rem_euclid(effective_spacing);

    let mut lines = Vec::new();

    let mut x = offset_x;
    while x < width + effective_spacing {
        lines.push(format!("M {} 0 L {} {}", x, x, height));
        x += effective_spacing;
    }

    let mut y = offset_y;
    while y < height + effective_spacing {
        lines.push(format!("M 0 {} L {} {}", y, width, y));
        y += effective_spacing;
    }

    lines.join(" ")
}

/// Snap a world position to the nearest grid intersection.
///
/// A non-positive grid size leaves the position untouched.
pub fn snap_to_grid(position: Position, grid_size: f32) -> Position {
    if grid_size <= 0.0 {
        return position;
    }
    Position::new(
        (position.x / grid_size).round() * grid_size,
        (position.y / grid_size).round() * grid_size,
    )
}
