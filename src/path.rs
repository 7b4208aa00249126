use crate::model::ConnectionStyle;
use crate::viewport::Position;

/// Endpoints closer than this (times zoom) are joined with a straight segment.
const SHORT_LINK_THRESHOLD: f32 = 10.0;

/// Generate SVG path command for a bezier connection between two points
///
/// Creates a horizontal-biased cubic bezier curve suitable for node connections.
/// Control points extend horizontally from start and end points, so the curve
/// leaves an output port to the right and enters an input port from the left.
///
/// # Arguments
/// * `start_x`, `start_y` - Start point (output port anchor)
/// * `end_x`, `end_y` - End point (input port anchor)
/// * `zoom` - Current zoom level (affects control point offset)
/// * `min_offset` - Minimum control point offset (default: 50.0)
///
/// # Returns
/// SVG path command string (e.g., "M 10 20 C 60 20 90 80 140 80")
pub fn generate_bezier_path(
    start_x: f32,
    start_y: f32,
    end_x: f32,
    end_y: f32,
    zoom: f32,
    min_offset: f32,
) -> String {
    let bezier = CubicBezier::from_endpoints(start_x, start_y, end_x, end_y, zoom, min_offset);
    if bezier.is_straight() {
        return generate_straight_path(start_x, start_y, end_x, end_y);
    }

    // Generate SVG path: M (move to), C (cubic bezier)
    format!(
        "M {} {} C {} {} {} {} {} {}",
        bezier.p0.0,
        bezier.p0.1,
        bezier.p1.0,
        bezier.p1.1,
        bezier.p2.0,
        bezier.p2.1,
        bezier.p3.0,
        bezier.p3.1
    )
}

/// Generate SVG path command for a straight connection.
pub fn generate_straight_path(start_x: f32, start_y: f32, end_x: f32, end_y: f32) -> String {
    format!("M {} {} L {} {}", start_x, start_y, end_x, end_y)
}

/// Generate SVG path command for an orthogonal connection with a single
/// vertical elbow halfway between the endpoints.
pub fn generate_step_path(start_x: f32, start_y: f32, end_x: f32, end_y: f32) -> String {
    let [a, b, c, d] = step_points(start_x, start_y, end_x, end_y);
    format!(
        "M {} {} L {} {} L {} {} L {} {}",
        a.0, a.1, b.0, b.1, c.0, c.1, d.0, d.1
    )
}

fn step_points(start_x: f32, start_y: f32, end_x: f32, end_y: f32) -> [(f32, f32); 4] {
    let mid_x = (start_x + end_x) / 2.0;
    [
        (start_x, start_y),
        (mid_x, start_y),
        (mid_x, end_y),
        (end_x, end_y),
    ]
}

impl ConnectionStyle {
    /// SVG path commands for this style between two points.
    pub fn path_commands(self, start: Position, end: Position, zoom: f32, min_offset: f32) -> String {
        match self {
            ConnectionStyle::Bezier => {
                generate_bezier_path(start.x, start.y, end.x, end.y, zoom, min_offset)
            }
            ConnectionStyle::Straight => generate_straight_path(start.x, start.y, end.x, end.y),
            ConnectionStyle::Step => generate_step_path(start.x, start.y, end.x, end.y),
        }
    }

    /// The rendered route sampled as a polyline.
    pub fn polyline(
        self,
        start: Position,
        end: Position,
        zoom: f32,
        min_offset: f32,
        samples: usize,
    ) -> Vec<(f32, f32)> {
        match self {
            ConnectionStyle::Bezier => {
                let bezier =
                    CubicBezier::from_endpoints(start.x, start.y, end.x, end.y, zoom, min_offset);
                bezier.sample(samples)
            }
            ConnectionStyle::Straight => vec![start.as_tuple(), end.as_tuple()],
            ConnectionStyle::Step => step_points(start.x, start.y, end.x, end.y).to_vec(),
        }
    }
}

/// Point halfway along the rendered route, measured by arc length.
///
/// Used to place overlay controls (insert node, delete, label) on the curve
/// itself rather than at the average of the endpoints.
pub fn path_midpoint(
    style: ConnectionStyle,
    start: Position,
    end: Position,
    zoom: f32,
    min_offset: f32,
) -> Position {
    let points = style.polyline(start, end, zoom, min_offset, 32);
    polyline_point_at_fraction(&points, 0.5).into()
}

fn polyline_point_at_fraction(points: &[(f32, f32)], fraction: f32) -> (f32, f32) {
    let Some(&first) = points.first() else {
        return (0.0, 0.0);
    };

    let total: f32 = points.windows(2).map(|w| segment_len(w[0], w[1])).sum();
    if total <= f32::EPSILON {
        return first;
    }

    let mut remaining = total * fraction.clamp(0.0, 1.0);
    for w in points.windows(2) {
        let len = segment_len(w[0], w[1]);
        if remaining <= len && len > 0.0 {
            return lerp_point(w[0], w[1], remaining / len);
        }
        remaining -= len;
    }

    points[points.len() - 1]
}

fn segment_len(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    (dx * dx + dy * dy).sqrt()
}

/// Linear interpolation between two points
fn lerp_point(a: (f32, f32), b: (f32, f32), t: f32) -> (f32, f32) {
    (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t)
}

/// Cubic bezier curve for distance calculations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: (f32, f32), // Start point
    pub p1: (f32, f32), // Control point 1
    pub p2: (f32, f32), // Control point 2
    pub p3: (f32, f32), // End point
}

impl CubicBezier {
    /// Create a bezier from endpoints using the same logic as generate_bezier_path
    ///
    /// Very short connections collapse their control points onto the
    /// endpoints, which makes the curve a straight segment.
    pub fn from_endpoints(
        start_x: f32,
        start_y: f32,
        end_x: f32,
        end_y: f32,
        zoom: f32,
        min_offset: f32,
    ) -> Self {
        let dx = end_x - start_x;
        let dy = end_y - start_y;
        let dist_sq = dx * dx + dy * dy;
        let threshold = SHORT_LINK_THRESHOLD * zoom;

        if dist_sq < threshold * threshold {
            return CubicBezier {
                p0: (start_x, start_y),
                p1: (start_x, start_y),
                p2: (end_x, end_y),
                p3: (end_x, end_y),
            };
        }

        let offset = (dx.abs() * 0.5).max(min_offset * zoom);

        CubicBezier {
            p0: (start_x, start_y),
            p1: (start_x + offset, start_y),
            p2: (end_x - offset, end_y),
            p3: (end_x, end_y),
        }
    }

    fn is_straight(&self) -> bool {
        self.p1 == self.p0 && self.p2 == self.p3
    }

    /// Evaluate the bezier curve at parameter t (0.0 to 1.0)
    pub fn eval(&self, t: f32) -> (f32, f32) {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * self.p0.0
            + 3.0 * mt2 * t * self.p1.0
            + 3.0 * mt * t2 * self.p2.0
            + t3 * self.p3.0;
        let y = mt3 * self.p0.1
            + 3.0 * mt2 * t * self.p1.1
            + 3.0 * mt * t2 * self.p2.1
            + t3 * self.p3.1;

        (x, y)
    }

    /// Sample the curve into `segments + 1` points, endpoints included exactly.
    pub fn sample(&self, segments: usize) -> Vec<(f32, f32)> {
        let segments = segments.max(1);
        let mut points = Vec::with_capacity(segments + 1);
        points.push(self.p0);
        for i in 1..segments {
            points.push(self.eval(i as f32 / segments as f32));
        }
        points.push(self.p3);
        points
    }
}

/// Calculate squared distance from a point to a line segment
fn distance_to_line_segment_sq(point: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ap = (point.0 - a.0, point.1 - a.1);

    let ab_len_sq = ab.0 * ab.0 + ab.1 * ab.1;

    if ab_len_sq < f32::EPSILON {
        // Degenerate segment (a == b)
        return ap.0 * ap.0 + ap.1 * ap.1;
    }

    // Project point onto line, clamped to segment
    let t = ((ap.0 * ab.0 + ap.1 * ab.1) / ab_len_sq).clamp(0.0, 1.0);

    let closest = (a.0 + t * ab.0, a.1 + t * ab.1);

    let dx = point.0 - closest.0;
    let dy = point.1 - closest.1;
    dx * dx + dy * dy
}

/// Minimum distance from a point to a polyline.
///
/// An empty polyline is infinitely far away; a single point is treated as a
/// zero-length segment.
pub fn distance_to_polyline(point: (f32, f32), points: &[(f32, f32)]) -> f32 {
    match points {
        [] => f32::INFINITY,
        [only] => distance_to_line_segment_sq(point, *only, *only).sqrt(),
        _ => points
            .windows(2)
            .map(|w| distance_to_line_segment_sq(point, w[0], w[1]))
            .fold(f32::MAX, f32::min)
            .sqrt(),
    }
}

/// Calculate the minimum distance from a point to a cubic bezier curve
///
/// Uses subdivision approach: sample curve at regular intervals and find closest point.
///
/// # Arguments
/// * `point` - The point to measure distance from
/// * `bezier` - The bezier curve
/// * `num_samples` - Number of samples for distance calculation (default: 20)
pub fn distance_to_bezier(point: (f32, f32), bezier: &CubicBezier, num_samples: usize) -> f32 {
    let num_samples = if num_samples == 0 { 20 } else { num_samples };
    distance_to_polyline(point, &bezier.sample(num_samples))
}
