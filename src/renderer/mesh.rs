use glam::Vec2;

use crate::renderer::error::{RendererError, Result};
use crate::renderer::eye::Eye;
use crate::renderer::shader_data::MeshVertex;

/// Borrowed view of a caller-supplied distortion mesh for one eye.
///
/// `positions` and `texcoords` are flat arrays of two floats per vertex;
/// `indices` describes a triangle strip over them. Index values are not
/// checked against the vertex count: an out-of-range index is undefined
/// behavior at draw time, the same as with any index buffer.
#[derive(Debug, Clone, Copy)]
pub struct DistortionMesh<'a> {
    pub positions: &'a [f32],
    pub texcoords: &'a [f32],
    pub indices: &'a [u16],
}

impl DistortionMesh<'_> {
    /// Interleaves the flat coordinate arrays into vertex records.
    ///
    /// The position and texcoord arrays must describe the same number of
    /// vertices.
    pub(crate) fn interleave(&self, eye: Eye) -> Result<Vec<MeshVertex>> {
        if self.positions.len() != self.texcoords.len() {
            return Err(RendererError::MeshArityMismatch {
                eye,
                positions: self.positions.len() / 2,
                texcoords: self.texcoords.len() / 2,
            });
        }

        Ok(self
            .positions
            .chunks_exact(2)
            .zip(self.texcoords.chunks_exact(2))
            .map(|(position, texcoord)| MeshVertex {
                position: Vec2::new(position[0], position[1]),
                texcoord: Vec2::new(texcoord[0], texcoord[1]),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> DistortionMesh<'static> {
        DistortionMesh {
            positions: &[-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0],
            texcoords: &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            indices: &[0, 1, 2, 3],
        }
    }

    #[test]
    fn interleave_pairs_positions_with_texcoords() {
        let vertices = quad().interleave(Eye::Left).unwrap();
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[0].position, Vec2::new(-1.0, -1.0));
        assert_eq!(vertices[0].texcoord, Vec2::new(0.0, 0.0));
        assert_eq!(vertices[3].position, Vec2::new(1.0, 1.0));
        assert_eq!(vertices[3].texcoord, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn empty_mesh_interleaves_to_nothing() {
        let mesh = DistortionMesh {
            positions: &[],
            texcoords: &[],
            indices: &[],
        };
        assert!(mesh.interleave(Eye::Right).unwrap().is_empty());
    }

    #[test]
    fn mismatched_arrays_are_rejected() {
        let mesh = DistortionMesh {
            positions: &[0.0, 0.0, 1.0, 1.0],
            texcoords: &[0.0, 0.0],
            indices: &[0, 1],
        };
        let err = mesh.interleave(Eye::Right).unwrap_err();
        assert!(matches!(
            err,
            RendererError::MeshArityMismatch {
                eye: Eye::Right,
                positions: 2,
                texcoords: 1,
            }
        ));
    }
}
