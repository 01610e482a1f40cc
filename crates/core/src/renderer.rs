//! Renderer abstraction for turning chip output into displayable frames.
//!
//! Video chips in this workspace produce their own native output (the TIA
//! writes palette indices, one byte per color clock). A renderer owns an
//! ARGB [`Frame`] and is responsible for the conversion, so hosts can pick a
//! backend without the chip knowing about it:
//!
//! ```text
//! chip (indexed pixels) -> Renderer -> Frame (0xAARRGGBB)
//! ```

use crate::types::Frame;

/// Common interface of all rendering backends
pub trait Renderer: Send {
    /// Current framebuffer
    fn get_frame(&self) -> &Frame;

    /// Fill the framebuffer with one ARGB color
    fn clear(&mut self, color: u32);

    /// Back to the initial state, normally an opaque black frame
    fn reset(&mut self);

    /// Human readable backend name
    fn name(&self) -> &str;

    fn is_hardware_accelerated(&self) -> bool {
        false
    }

    /// Recreate the framebuffer at a new size
    fn resize(&mut self, width: u32, height: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FillRenderer {
        frame: Frame,
    }

    impl Renderer for FillRenderer {
        fn get_frame(&self) -> &Frame {
            &self.frame
        }

        fn clear(&mut self, color: u32) {
            self.frame.pixels.fill(color);
        }

        fn reset(&mut self) {
            self.clear(0xFF000000);
        }

        fn name(&self) -> &str {
            "Fill Renderer"
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.frame = Frame::new(width, height);
        }
    }

    #[test]
    fn test_default_is_software() {
        let renderer = FillRenderer {
            frame: Frame::new(160, 2),
        };
        assert!(!renderer.is_hardware_accelerated());
        assert_eq!(renderer.name(), "Fill Renderer");
    }

    #[test]
    fn test_clear_then_reset() {
        let mut renderer = FillRenderer {
            frame: Frame::new(4, 4),
        };
        renderer.clear(0xFF00FF00);
        assert!(renderer.get_frame().pixels.iter().all(|&p| p == 0xFF00FF00));
        renderer.reset();
        assert!(renderer.get_frame().pixels.iter().all(|&p| p == 0xFF000000));
    }

    #[test]
    fn test_resize_reallocates() {
        let mut renderer = FillRenderer {
            frame: Frame::new(4, 4),
        };
        renderer.resize(160, 228);
        assert_eq!(renderer.get_frame().pixels.len(), 160 * 228);
    }
}
