use ash::vk;

use crate::renderer::eye::Eye;
use crate::renderer::shader_data::UvBounds;

/// Output target for one render call: where commands are recorded, the
/// render-pass identity the host will execute them under, and which
/// output image slot is being drawn this frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderTarget {
    pub command_buffer: vk::CommandBuffer,
    pub render_pass: vk::RenderPass,
    pub image_index: u32,
}

/// One eye's source texture for the current frame.
///
/// Transient: the image handle may rotate in an external texture pool, so
/// it is consumed within the render call and never stored.
#[derive(Debug, Clone, Copy)]
pub struct EyeTexture {
    pub image: vk::Image,
    pub left_u: f32,
    pub right_u: f32,
    pub top_v: f32,
    pub bottom_v: f32,
}

impl EyeTexture {
    pub(crate) fn uv_bounds(&self) -> UvBounds {
        UvBounds {
            left_u: self.left_u,
            right_u: self.right_u,
            top_v: self.top_v,
            bottom_v: self.bottom_v,
        }
    }
}

/// Both eyes share one full-surface viewport.
pub(crate) fn eye_viewport(x: i32, y: i32, width: u32, height: u32) -> vk::Viewport {
    vk::Viewport {
        x: x as f32,
        y: y as f32,
        width: width as f32,
        height: height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// The scissor splits the output surface into disjoint halves: left half
/// for the left eye, right half for the right eye (side-by-side stereo
/// layout).
pub(crate) fn eye_scissor(eye: Eye, x: i32, y: i32, width: u32, height: u32) -> vk::Rect2D {
    let half_width = width / 2;
    let offset_x = match eye {
        Eye::Left => x,
        Eye::Right => x + half_width as i32,
    };
    vk::Rect2D {
        offset: vk::Offset2D { x: offset_x, y },
        extent: vk::Extent2D {
            width: half_width,
            height,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_covers_the_full_output_rect_for_both_eyes() {
        let viewport = eye_viewport(4, 8, 640, 480);
        assert_eq!(viewport.x, 4.0);
        assert_eq!(viewport.y, 8.0);
        assert_eq!(viewport.width, 640.0);
        assert_eq!(viewport.height, 480.0);
        assert_eq!(viewport.min_depth, 0.0);
        assert_eq!(viewport.max_depth, 1.0);
    }

    #[test]
    fn scissors_split_the_surface_into_disjoint_halves() {
        let left = eye_scissor(Eye::Left, 4, 8, 640, 480);
        assert_eq!(left.offset, vk::Offset2D { x: 4, y: 8 });
        assert_eq!(
            left.extent,
            vk::Extent2D {
                width: 320,
                height: 480
            }
        );

        let right = eye_scissor(Eye::Right, 4, 8, 640, 480);
        assert_eq!(right.offset, vk::Offset2D { x: 324, y: 8 });
        assert_eq!(
            right.extent,
            vk::Extent2D {
                width: 320,
                height: 480
            }
        );

        assert_eq!(left.offset.x + left.extent.width as i32, right.offset.x);
    }

    #[test]
    fn odd_widths_truncate_both_halves_alike() {
        let left = eye_scissor(Eye::Left, 0, 0, 7, 3);
        let right = eye_scissor(Eye::Right, 0, 0, 7, 3);
        assert_eq!(left.extent.width, 3);
        assert_eq!(right.extent.width, 3);
        assert_eq!(right.offset.x, 3);
    }

    #[test]
    fn uv_bounds_pass_through_untransformed() {
        use ash::vk::Handle;

        let texture = EyeTexture {
            image: vk::Image::from_raw(0x1),
            left_u: 0.1,
            right_u: 0.9,
            top_v: 0.2,
            bottom_v: 0.8,
        };
        let bounds = texture.uv_bounds();
        assert_eq!(
            (bounds.left_u, bounds.right_u, bounds.top_v, bounds.bottom_v),
            (0.1, 0.9, 0.2, 0.8)
        );
    }
}
