/// Axis-aligned box in canvas pixels (origin top-left, y grows downward).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Strict overlap; boxes that only share an edge do not intersect.
    pub fn intersects(&self, o: &Rect) -> bool {
        self.x < o.right() && self.right() > o.x && self.y < o.bottom() && self.bottom() > o.y
    }

    pub fn overlaps_vertically(&self, o: &Rect) -> bool {
        self.y < o.bottom() && self.bottom() > o.y
    }

    /// Horizontal distance between the boxes, 0 when their x-ranges overlap.
    pub fn horizontal_gap(&self, o: &Rect) -> f64 {
        if self.right() <= o.x {
            o.x - self.right()
        } else if o.right() <= self.x {
            self.x - o.right()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_boxes_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::new(0.0, 10.0, 10.0, 10.0)));
    }

    #[test]
    fn horizontal_gap_between_adjacent_lanes() {
        let left = Rect::new(67.5, 400.0, 40.0, 60.0);
        let right = Rect::new(142.5, 380.0, 40.0, 60.0);
        assert!((left.horizontal_gap(&right) - 35.0).abs() < 1e-9);
        assert!((right.horizontal_gap(&left) - 35.0).abs() < 1e-9);
        assert!(left.overlaps_vertically(&right));
        assert_eq!(left.horizontal_gap(&Rect::new(80.0, 0.0, 5.0, 5.0)), 0.0);
    }
}
