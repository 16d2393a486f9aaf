//! Frame grabbing and thumbnail encoding for a video rendering surface.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::{debug, warn};

use crate::constants::{THUMBNAIL_DATA_URI_PREFIX, THUMBNAIL_HEIGHT};
use crate::core::thumbnailer::FrameCapture;
use crate::error::Result;
use crate::state::EditorSettings;

/// A surface that can hand over the frame it currently displays.
pub trait FrameSource: Send + Sync {
    /// RGBA pixels of the current frame, or `None` if nothing is decoded yet.
    fn grab_frame(&self) -> Option<RgbaImage>;
}

/// [`FrameCapture`] over a [`FrameSource`]: downsizes and encodes as a PNG data URI.
pub struct SurfaceFrameCapture<S> {
    source: S,
    thumbnail_height: u32,
}

impl<S: FrameSource> SurfaceFrameCapture<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            thumbnail_height: THUMBNAIL_HEIGHT,
        }
    }

    /// Capture sized by `settings.thumbnail_height`.
    pub fn from_settings(source: S, settings: &EditorSettings) -> Self {
        Self::new(source).with_height(settings.thumbnail_height)
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.thumbnail_height = height;
        self
    }
}

#[async_trait]
impl<S: FrameSource> FrameCapture for SurfaceFrameCapture<S> {
    async fn capture_frame_at(&self, time: f64) -> Option<String> {
        let Some(frame) = self.source.grab_frame() else {
            debug!(time, "surface had no frame to capture");
            return None;
        };
        if frame.width() == 0 || frame.height() == 0 {
            return None;
        }
        let thumbnail = downscale(&frame, self.thumbnail_height);
        match encode_data_uri(&thumbnail) {
            Ok(uri) => Some(uri),
            Err(err) => {
                warn!(time, %err, "failed to encode thumbnail");
                None
            }
        }
    }
}

/// Encode an image as a `data:image/png;base64,...` URI.
pub fn encode_data_uri(image: &RgbaImage) -> Result<String> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(format!("{}{}", THUMBNAIL_DATA_URI_PREFIX, B64.encode(&bytes)))
}

/// Scale down to `height`, keeping the aspect ratio. Smaller frames pass through.
fn downscale(frame: &RgbaImage, height: u32) -> RgbaImage {
    if height == 0 || frame.height() <= height {
        return frame.clone();
    }
    let width = (frame.width() as f64 * height as f64 / frame.height() as f64).round() as u32;
    image::imageops::thumbnail(frame, width.max(1), height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct StillSource(Option<RgbaImage>);

    impl FrameSource for StillSource {
        fn grab_frame(&self) -> Option<RgbaImage> {
            self.0.clone()
        }
    }

    fn decode(uri: &str) -> RgbaImage {
        let payload = uri.strip_prefix(THUMBNAIL_DATA_URI_PREFIX).unwrap();
        let bytes = B64.decode(payload).unwrap();
        image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .unwrap()
            .to_rgba8()
    }

    #[tokio::test]
    async fn capture_downscales_to_thumbnail_height() {
        let frame = RgbaImage::from_pixel(640, 360, Rgba([200, 40, 40, 255]));
        let settings = EditorSettings {
            thumbnail_height: 90,
            ..EditorSettings::default()
        };
        let capture = SurfaceFrameCapture::from_settings(StillSource(Some(frame)), &settings);

        let uri = capture.capture_frame_at(1.0).await.unwrap();
        let thumbnail = decode(&uri);

        assert_eq!(thumbnail.dimensions(), (160, 90));
        assert_eq!(thumbnail.get_pixel(10, 10)[0], 200);
    }

    #[tokio::test]
    async fn small_frames_are_kept_as_is() {
        let frame = RgbaImage::from_pixel(32, 18, Rgba([0, 0, 0, 255]));
        let capture = SurfaceFrameCapture::new(StillSource(Some(frame)));
        let uri = capture.capture_frame_at(0.5).await.unwrap();
        assert_eq!(decode(&uri).dimensions(), (32, 18));
    }

    #[tokio::test]
    async fn empty_surface_yields_none() {
        let capture = SurfaceFrameCapture::new(StillSource(None));
        assert!(capture.capture_frame_at(0.5).await.is_none());
        let empty = SurfaceFrameCapture::new(StillSource(Some(RgbaImage::new(0, 0))));
        assert!(empty.capture_frame_at(0.5).await.is_none());
    }
}
