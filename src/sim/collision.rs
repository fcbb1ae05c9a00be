//! Collision geometry for box-shaped bodies
//!
//! Every body is an axis-aligned box (center + half extents). Sensors are
//! rays tested against those boxes with the slab method.

use glam::Vec3;

/// Result of a ray test
#[derive(Debug, Clone, Copy)]
pub struct RayResult {
    /// Whether the ray hit the box within range
    pub hit: bool,
    /// Distance along the ray to the entry point
    pub distance: f32,
}

impl RayResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            distance: f32::INFINITY,
        }
    }
}

/// Cast a ray against a box
///
/// `dir` must be normalized. A ray starting inside the box hits at distance 0.
pub fn ray_aabb(origin: Vec3, dir: Vec3, max_distance: f32, center: Vec3, half: Vec3) -> RayResult {
    let min = center - half;
    let max = center + half;

    let mut t_enter = 0.0_f32;
    let mut t_exit = max_distance;

    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        if d.abs() < 1e-6 {
            // Parallel to this slab: must already be inside it
            if o < min[axis] || o > max[axis] {
                return RayResult::miss();
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t0 = (min[axis] - o) * inv;
        let mut t1 = (max[axis] - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_enter = t_enter.max(t0);
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return RayResult::miss();
        }
    }

    RayResult {
        hit: true,
        distance: t_enter,
    }
}

/// Check whether two boxes overlap
#[inline]
pub fn aabb_overlap(a_center: Vec3, a_half: Vec3, b_center: Vec3, b_half: Vec3) -> bool {
    let delta = (a_center - b_center).abs();
    let reach = a_half + b_half;
    delta.x < reach.x && delta.y < reach.y && delta.z < reach.z
}

/// Direction of the knockback impulse applied to a struck entity
///
/// The configured direction is tilted along the striker's forward axis by its
/// own z component, then normalized.
pub fn knockback_direction(hit_direction: Vec3, forward: Vec3) -> Vec3 {
    (hit_direction + forward * hit_direction.z).normalize_or_zero()
}
