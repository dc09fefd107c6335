use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// Data unique to each distortion-mesh vertex, interleaved into the
/// per-eye vertex buffer: the undistorted screen position and the source
/// texture coordinate it samples.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: Vec2,
    pub texcoord: Vec2,
}

/// Per-eye uniform record consumed by the vertex stage: the UV
/// sub-rectangle of the source texture visible to this eye.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct UvBounds {
    pub left_u: f32,
    pub right_u: f32,
    pub top_v: f32,
    pub bottom_v: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn mesh_vertex_matches_the_pipeline_vertex_input() {
        // One binding, stride 16: vec2 position at 0, vec2 texcoord at 8.
        assert_eq!(size_of::<MeshVertex>(), 16);
        assert_eq!(offset_of!(MeshVertex, position), 0);
        assert_eq!(offset_of!(MeshVertex, texcoord), 8);
    }

    #[test]
    fn uv_bounds_are_four_consecutive_floats() {
        let bounds = UvBounds {
            left_u: 0.25,
            right_u: 0.75,
            top_v: 0.0,
            bottom_v: 1.0,
        };
        assert_eq!(size_of::<UvBounds>(), 16);

        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&bounds));
        assert_eq!(floats, &[0.25, 0.75, 0.0, 1.0]);
    }
}
