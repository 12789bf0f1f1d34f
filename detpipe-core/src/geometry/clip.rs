//! Convex polygon clipping against the frame rectangle.

use super::transform::Point;

/// Clips a polygon to `[0, width] x [0, height]` (Sutherland-Hodgman).
///
/// Returns the clipped vertices, possibly fewer than three when nothing of
/// the polygon is left.
pub fn clip_to_frame(polygon: &[Point], frame_width: i32, frame_height: i32) -> Vec<Point> {
    let (w, h) = (f64::from(frame_width), f64::from(frame_height));

    let mut points = polygon.to_vec();
    points = clip_edge(&points, |p| p.0 >= 0.0, |a, b| at_x(a, b, 0.0));
    points = clip_edge(&points, |p| p.0 <= w, |a, b| at_x(a, b, w));
    points = clip_edge(&points, |p| p.1 >= 0.0, |a, b| at_y(a, b, 0.0));
    clip_edge(&points, |p| p.1 <= h, |a, b| at_y(a, b, h))
}

/// Area enclosed by a simple polygon (shoelace formula).
pub fn polygon_area(polygon: &[Point]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let twice: f64 = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(a, b)| a.0 * b.1 - b.0 * a.1)
        .sum();
    twice.abs() / 2.0
}

fn clip_edge<I, X>(polygon: &[Point], inside: I, intersect: X) -> Vec<Point>
where
    I: Fn(Point) -> bool,
    X: Fn(Point, Point) -> Point,
{
    let Some(&last) = polygon.last() else {
        return Vec::new();
    };

    let mut output = Vec::with_capacity(polygon.len() + 1);
    let mut previous = last;
    for &current in polygon {
        match (inside(previous), inside(current)) {
            (true, true) => output.push(current),
            (true, false) => output.push(intersect(previous, current)),
            (false, true) => {
                output.push(intersect(previous, current));
                output.push(current);
            }
            (false, false) => {}
        }
        previous = current;
    }
    output
}

fn at_x(a: Point, b: Point, x: f64) -> Point {
    let t = (x - a.0) / (b.0 - a.0);
    (x, a.1 + t * (b.1 - a.1))
}

fn at_y(a: Point, b: Point, y: f64) -> Point {
    let t = (y - a.1) / (b.1 - a.1);
    (a.0 + t * (b.0 - a.0), y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
        vec![(x, y), (x + size, y), (x + size, y + size), (x, y + size)]
    }

    #[test]
    fn inside_polygon_is_untouched() {
        let clipped = clip_to_frame(&square(1.0, 1.0, 2.0), 10, 10);
        assert_eq!(polygon_area(&clipped), 4.0);
    }

    #[test]
    fn partially_outside_polygon_is_cut() {
        let clipped = clip_to_frame(&square(-1.0, -1.0, 2.0), 10, 10);
        assert_eq!(polygon_area(&clipped), 1.0);
    }

    #[test]
    fn polygon_touching_the_edge_has_no_area() {
        let clipped = clip_to_frame(&square(10.0, 2.0, 3.0), 10, 10);
        assert_eq!(polygon_area(&clipped), 0.0);
    }

    #[test]
    fn polygon_outside_is_removed() {
        assert!(clip_to_frame(&square(20.0, 20.0, 3.0), 10, 10).is_empty());
    }
}
