//! Generated stand-in media for the demo pipeline.

use cutline_core::{FrameBuffer, RationalTime, SharedFrameBuffer, Size};
use cutline_timeline::{Asset, AssetId, AssetTrack, FrameSource};
use std::collections::HashMap;
use std::sync::Arc;

const BARS: [[u8; 4]; 8] = [
    [255, 255, 255, 255],
    [255, 255, 0, 255],
    [0, 255, 255, 255],
    [0, 255, 0, 255],
    [255, 0, 255, 255],
    [255, 0, 0, 255],
    [0, 0, 255, 255],
    [0, 0, 0, 255],
];

/// Colour-bar clips. Each asset gets its bars rotated by its index, with a
/// dark sweep line whose position encodes the source time.
pub struct SyntheticSource {
    order: HashMap<AssetId, usize>,
}

impl SyntheticSource {
    /// `count` assets of `duration` each, all at `size`.
    pub fn assets(count: usize, duration: RationalTime, size: Size) -> (Vec<Asset>, Self) {
        let assets: Vec<Asset> = (0..count)
            .map(|i| Asset::new(format!("bars-{i}")).with_video(duration, size))
            .collect();
        let order = assets.iter().enumerate().map(|(i, a)| (a.id, i)).collect();
        (assets, Self { order })
    }
}

impl FrameSource for SyntheticSource {
    fn frame_at(&self, track: &AssetTrack, time: RationalTime) -> Option<SharedFrameBuffer> {
        let index = *self.order.get(&track.asset)?;
        let size = track.natural_size?;
        let (width, height) = (size.width as u32, size.height as u32);
        if width == 0 || height == 0 {
            return None;
        }

        let progress = track.time_range.fraction_of(time);
        let sweep = ((progress * width as f64) as u32).min(width - 1);
        let mut frame = FrameBuffer::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let bar = (x as usize * 8 / width as usize + index) % 8;
                let rgba = if x == sweep { [16, 16, 16, 255] } else { BARS[bar] };
                frame.set_pixel(x, y, rgba);
            }
        }
        Some(Arc::new(frame))
    }
}
