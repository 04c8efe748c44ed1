use ndarray::{s, ArrayView3};

use super::geometry::BoundingBox;

/// A single camera frame: contiguous RGB bytes in row-major order.
///
/// The event logic never looks at pixels; frames only travel alongside
/// tracker output so capture sinks can save evidence images.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

const CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// `None` if the buffer does not match the declared dimensions.
    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, CHANNELS),
            &self.data,
        )
        .ok()
    }

    /// Copies the pixels under `bbox`, clamped to the frame.
    ///
    /// Returns `None` when the clamped region is empty.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<Frame> {
        if !bbox.is_well_formed() {
            return None;
        }
        let clamp_x = |v: f64| (v.max(0.0) as usize).min(self.width as usize);
        let clamp_y = |v: f64| (v.max(0.0) as usize).min(self.height as usize);
        let (x1, x2) = (clamp_x(bbox.x1.floor()), clamp_x(bbox.x2.ceil()));
        let (y1, y2) = (clamp_y(bbox.y1.floor()), clamp_y(bbox.y2.ceil()));
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let view = self.as_ndarray()?;
        let region = view.slice(s![y1..y2, x1..x2, ..]);
        let data: Vec<u8> = region.iter().copied().collect();
        Some(Frame::new(
            data,
            (x2 - x1) as u32,
            (y2 - y1) as u32,
            self.index,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x3 frame where every pixel's red channel encodes `row * 10 + col`.
    fn gradient_frame() -> Frame {
        let (w, h) = (4u32, 3u32);
        let mut data = Vec::new();
        for row in 0..h {
            for col in 0..w {
                data.extend_from_slice(&[(row * 10 + col) as u8, 0, 0]);
            }
        }
        Frame::new(data, w, h, 7)
    }

    #[test]
    fn test_construction_and_accessors() {
        let frame = Frame::new(vec![0u8; 12], 2, 2, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data().len(), 12);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = gradient_frame();
        let arr = frame.as_ndarray().unwrap();
        assert_eq!(arr.shape(), &[3, 4, 3]);
        assert_eq!(arr[[2, 1, 0]], 21);
    }

    #[test]
    fn test_crop_copies_region() {
        let frame = gradient_frame();
        let crop = frame.crop(&BoundingBox::new(1.0, 1.0, 3.0, 3.0)).unwrap();
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.index(), 7);
        let reds: Vec<u8> = crop.data().chunks(3).map(|px| px[0]).collect();
        assert_eq!(reds, vec![11, 12, 21, 22]);
    }

    #[test]
    fn test_crop_clamps_to_frame() {
        let frame = gradient_frame();
        let crop = frame
            .crop(&BoundingBox::new(-5.0, -5.0, 100.0, 100.0))
            .unwrap();
        assert_eq!((crop.width(), crop.height()), (4, 3));
    }

    #[test]
    fn test_crop_outside_frame_is_none() {
        let frame = gradient_frame();
        assert!(frame
            .crop(&BoundingBox::new(10.0, 10.0, 20.0, 20.0))
            .is_none());
    }

    #[test]
    fn test_crop_malformed_box_is_none() {
        let frame = gradient_frame();
        assert!(frame
            .crop(&BoundingBox::new(2.0, 2.0, 2.0, 3.0))
            .is_none());
    }
}
