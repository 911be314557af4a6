//! The frame-difference predicate.

/// An owned, decoded video frame with interleaved channel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap decoded pixel data. `data` must hold exactly
    /// `width * height * channels` bytes.
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "frame data length does not match its dimensions"
        );
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// True iff at least one pixel differs by strictly more than `threshold`
/// in any channel.
///
/// Returns on the first qualifying pixel; a worst-case frame is large and
/// most comparisons in a still scene hit an early difference or none at
/// all. Both frames must share identical dimensions.
pub fn frames_differ(a: &Frame, b: &Frame, threshold: u8) -> bool {
    assert!(
        a.width == b.width && a.height == b.height && a.channels == b.channels,
        "compared frames must have identical dimensions"
    );

    a.data
        .iter()
        .zip(&b.data)
        .any(|(&x, &y)| x.abs_diff(y) > threshold)
}
