// geometry helpers for integer-vertex polygons
//
// - axis-aligned bounds clamped to a canvas
// - centroid (tile-seed lookups)
// - even-odd point containment (error-guided mutation)

pub type Point = (i32, i32);

/// inclusive pixel bounds (x_min, y_min, x_max, y_max) clamped to a width x height canvas.
/// None for an empty point list or a polygon lying fully off-canvas.
pub fn clamped_bounds(pts: &[Point], width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if pts.is_empty() || width == 0 || height == 0 {
        return None;
    }

    let mut min_x = i32::MAX;
    let mut min_y = i32::MAX;
    let mut max_x = i32::MIN;
    let mut max_y = i32::MIN;
    for &(x, y) in pts {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let w = width as i32;
    let h = height as i32;
    if max_x < 0 || max_y < 0 || min_x >= w || min_y >= h {
        return None;
    }

    Some((
        min_x.max(0) as u32,
        min_y.max(0) as u32,
        max_x.min(w - 1) as u32,
        max_y.min(h - 1) as u32,
    ))
}

/// vertex average, truncated toward zero like the pixel grid
pub fn centroid(pts: &[Point]) -> Option<Point> {
    if pts.is_empty() {
        return None;
    }
    let n = pts.len() as i64;
    let sx: i64 = pts.iter().map(|p| p.0 as i64).sum();
    let sy: i64 = pts.iter().map(|p| p.1 as i64).sum();
    Some(((sx / n) as i32, (sy / n) as i32))
}

/// even-odd ray cast. points exactly on an edge count as outside,
/// so a polygon never "contains" its own vertices.
pub fn contains_point(pts: &[Point], x: f64, y: f64) -> bool {
    let n = pts.len();
    if n < 3 {
        return false;
    }

    // boundary check first so edge points are consistently rejected
    for i in 0..n {
        let (ax, ay) = (pts[i].0 as f64, pts[i].1 as f64);
        let (bx, by) = (pts[(i + 1) % n].0 as f64, pts[(i + 1) % n].1 as f64);
        let cross = (bx - ax) * (y - ay) - (by - ay) * (x - ax);
        if cross.abs() < 1e-9
            && x >= ax.min(bx)
            && x <= ax.max(bx)
            && y >= ay.min(by)
            && y <= ay.max(by)
        {
            return false;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (pts[i].0 as f64, pts[i].1 as f64);
        let (xj, yj) = (pts[j].0 as f64, pts[j].1 as f64);
        if (yi > y) != (yj > y) {
            let x_cross = xj + (y - yj) * (xi - xj) / (yi - yj);
            if x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_clamped() {
        let pts = vec![(-5, 2), (20, 3), (4, 30)];
        assert_eq!(clamped_bounds(&pts, 16, 16), Some((0, 2, 15, 15)));
        assert_eq!(clamped_bounds(&[(-3, -3), (-1, -2), (-2, -1)], 16, 16), None);
    }

    #[test]
    fn test_centroid() {
        assert_eq!(centroid(&[(0, 0), (3, 0), (0, 3)]), Some((1, 1)));
        assert_eq!(centroid(&[]), None);
    }

    #[test]
    fn test_contains_point() {
        let tri = vec![(0, 0), (10, 0), (0, 10)];
        assert!(contains_point(&tri, 2.0, 2.0));
        assert!(!contains_point(&tri, 8.0, 8.0));
        // vertices and edges are outside
        assert!(!contains_point(&tri, 0.0, 0.0));
        assert!(!contains_point(&tri, 5.0, 0.0));
    }
}
