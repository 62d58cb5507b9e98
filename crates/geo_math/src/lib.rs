// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//! Plane, frustum and AABB value types used for view-frustum culling.

use nalgebra::{Point3, Vector3};

/// A plane in Hessian normal form: `dot(normal, p) + d == 0` for any point
/// `p` on the plane. `normal` points towards the half-space considered
/// "inside" (e.g. the interior of a view frustum).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub d: f64,
}

impl Plane {
    pub fn from_point_and_normal(point: &Point3<f64>, normal: Vector3<f64>) -> Self {
        let normal = normal.normalize();
        let d = -normal.dot(&point.coords);
        Self { normal, d }
    }

    /// Signed distance from `point` to the plane. Positive is inside.
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) + self.d
    }
}

/// Six-plane view frustum, ordered near/far/left/right/top/bottom.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Builds a frustum from a camera basis (`position`, `forward`, `right`,
    /// `up`), the near/far clip distances and the vertical/horizontal
    /// half-angles (radians) of a perspective projection.
    #[allow(clippy::too_many_arguments)]
    pub fn from_perspective(
        position: &Point3<f64>,
        forward: &Vector3<f64>,
        right: &Vector3<f64>,
        up: &Vector3<f64>,
        z_near: f64,
        z_far: f64,
        half_fov_y: f64,
        half_fov_x: f64,
    ) -> Self {
        let near_point = position + forward * z_near;
        let far_point = position + forward * z_far;

        let near = Plane::from_point_and_normal(&near_point, *forward);
        let far = Plane::from_point_and_normal(&far_point, -forward);

        // Rotate `forward` towards `up`/`right` by the half-angle to get an
        // edge direction, then build a plane whose normal points back into
        // the frustum (cross the edge direction with the frustum's lateral
        // axis).
        let top_normal = (forward * half_fov_y.cos() - up * half_fov_y.sin())
            .cross(right)
            .normalize();
        let bottom_normal = (forward * half_fov_y.cos() + up * half_fov_y.sin())
            .cross(&-right)
            .normalize();
        let right_normal = (forward * half_fov_x.cos() + right * half_fov_x.sin())
            .cross(&-up)
            .normalize();
        let left_normal = (forward * half_fov_x.cos() - right * half_fov_x.sin())
            .cross(up)
            .normalize();

        Self {
            planes: [
                near,
                far,
                Plane::from_point_and_normal(position, left_normal),
                Plane::from_point_and_normal(position, right_normal),
                Plane::from_point_and_normal(position, top_normal),
                Plane::from_point_and_normal(position, bottom_normal),
            ],
        }
    }

    /// True unless the AABB `[min, max]` lies entirely outside some plane
    /// (standard center + half-extents vs plane test).
    pub fn intersects_aabb(&self, min: &Point3<f64>, max: &Point3<f64>) -> bool {
        let center = nalgebra::center(min, max);
        let extents = (max - min) * 0.5;
        for plane in &self.planes {
            let radius = extents.x * plane.normal.x.abs()
                + extents.y * plane.normal.y.abs()
                + extents.z * plane.normal.z.abs();
            if plane.signed_distance(&center) + radius < 0.0 {
                return false;
            }
        }
        true
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn plane_signed_distance_sign() {
        let plane = Plane::from_point_and_normal(&Point3::origin(), Vector3::new(0.0, 1.0, 0.0));
        assert!(plane.signed_distance(&Point3::new(0.0, 5.0, 0.0)) > 0.0);
        assert!(plane.signed_distance(&Point3::new(0.0, -5.0, 0.0)) < 0.0);
        assert_relative_eq!(plane.signed_distance(&Point3::new(3.0, 0.0, 3.0)), 0.0);
    }

    #[test]
    fn frustum_rejects_aabb_behind_camera() {
        let frustum = Frustum::from_perspective(
            &Point3::origin(),
            &Vector3::new(0.0, 0.0, -1.0),
            &Vector3::new(1.0, 0.0, 0.0),
            &Vector3::new(0.0, 1.0, 0.0),
            0.1,
            1000.0,
            (45.0_f64).to_radians(),
            (45.0_f64).to_radians(),
        );
        // Directly behind the camera: entirely on the wrong side of the near plane.
        let behind_min = Point3::new(-1.0, -1.0, 5.0);
        let behind_max = Point3::new(1.0, 1.0, 10.0);
        assert!(!frustum.intersects_aabb(&behind_min, &behind_max));

        let ahead_min = Point3::new(-1.0, -1.0, -20.0);
        let ahead_max = Point3::new(1.0, 1.0, -10.0);
        assert!(frustum.intersects_aabb(&ahead_min, &ahead_max));
    }
}
