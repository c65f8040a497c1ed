//! Collision and graze tests
//!
//! Dodge mode judges axis-aligned boxes against the player slider; bullet-hell
//! mode judges circles against the player's hit circle and the larger graze
//! ring. Everything here is pure geometry; who gets tested against what (and
//! in which order) is the tick driver's business.

use glam::Vec2;

/// Axis-aligned box, origin at top-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Aabb {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

/// Circle with center and radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Standard separating-axis overlap test for two boxes
#[inline]
pub fn aabb_overlap(a: &Aabb, b: &Aabb) -> bool {
    a.x < b.x + b.w && a.x + a.w > b.x && a.y < b.y + b.h && a.y + a.h > b.y
}

/// Circle-circle overlap via squared distance (no sqrt in the hot loop)
#[inline]
pub fn circles_overlap(a: &Circle, b: &Circle) -> bool {
    let radius_sum = a.radius + b.radius;
    a.center.distance_squared(b.center) < radius_sum * radius_sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_overlap() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        let b = Aabb::new(5.0, 5.0, 10.0, 10.0);
        assert!(aabb_overlap(&a, &b));

        // Touching edges do not overlap (strict comparison)
        let c = Aabb::new(10.0, 0.0, 10.0, 10.0);
        assert!(!aabb_overlap(&a, &c));

        let d = Aabb::new(0.0, 20.0, 10.0, 10.0);
        assert!(!aabb_overlap(&a, &d));
    }

    #[test]
    fn test_circles_overlap() {
        let a = Circle::new(Vec2::ZERO, 5.0);
        let b = Circle::new(Vec2::new(8.0, 0.0), 5.0);
        assert!(circles_overlap(&a, &b));

        // Exactly touching is not an overlap
        let c = Circle::new(Vec2::new(10.0, 0.0), 5.0);
        assert!(!circles_overlap(&a, &c));

        let d = Circle::new(Vec2::new(100.0, 100.0), 5.0);
        assert!(!circles_overlap(&a, &d));
    }

    #[test]
    fn graze_ring_is_wider_than_hitbox() {
        use crate::consts::{HELL_GRAZE_RADIUS, HELL_HITBOX_RADIUS};

        let pos = Vec2::new(400.0, 450.0);
        let hitbox = Circle::new(pos, HELL_HITBOX_RADIUS);
        let graze = Circle::new(pos, HELL_GRAZE_RADIUS);

        // A bullet 25px out is a near-miss but not a hit
        let bullet = Circle::new(pos + Vec2::new(25.0, 0.0), 6.0);
        assert!(circles_overlap(&bullet, &graze));
        assert!(!circles_overlap(&bullet, &hitbox));
    }
}
