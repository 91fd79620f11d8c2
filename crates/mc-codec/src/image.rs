//! Image codec built on the `image` crate.
//!
//! A source is decoded once into frames; every variant then applies its own
//! [`TransformPlan`] to each frame and encodes the result.

use std::io::Cursor;

use image::codecs::avif::AvifEncoder;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::{WebPDecoder, WebPEncoder};
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, Delay, DynamicImage, Frame, ImageFormat as Format, Rgba, RgbaImage};
use mc_core::{Error, ImageConfig, ImageFormat, Result};
use mc_media::{Dimensions, TransformPlan};

/// AVIF encoder speed (1 slowest .. 10 fastest).
const AVIF_SPEED: u8 = 8;

/// One decoded frame and how long it is shown.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub image: DynamicImage,
    pub delay: Delay,
}

/// A decoded source image. Still images have exactly one frame.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub frames: Vec<SourceFrame>,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }
}

/// Decode `bytes`, keeping every frame of animated GIF and WebP sources.
///
/// Anything the `image` crate cannot read is [`Error::Decode`].
pub fn decode(bytes: &[u8]) -> Result<DecodedImage> {
    let format = image::guess_format(bytes).map_err(decode_err)?;

    let frames = match format {
        Format::Gif => {
            let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(decode_err)?;
            collect_frames(decoder)?
        }
        Format::WebP => {
            let decoder = WebPDecoder::new(Cursor::new(bytes)).map_err(decode_err)?;
            if decoder.has_animation() {
                collect_frames(decoder)?
            } else {
                let image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
                vec![still(image)]
            }
        }
        other => {
            let image = image::load_from_memory_with_format(bytes, other).map_err(decode_err)?;
            vec![still(image)]
        }
    };

    let first = frames
        .first()
        .ok_or_else(|| Error::Decode("image has no frames".into()))?;
    let (width, height) = (first.image.width(), first.image.height());
    if width == 0 || height == 0 {
        return Err(Error::Decode("image has zero area".into()));
    }

    Ok(DecodedImage {
        frames,
        width,
        height,
    })
}

fn collect_frames<'a>(decoder: impl AnimationDecoder<'a>) -> Result<Vec<SourceFrame>> {
    let frames = decoder.into_frames().collect_frames().map_err(decode_err)?;
    Ok(frames
        .into_iter()
        .map(|f| SourceFrame {
            delay: f.delay(),
            image: DynamicImage::ImageRgba8(f.into_buffer()),
        })
        .collect())
}

fn still(image: DynamicImage) -> SourceFrame {
    SourceFrame {
        image,
        delay: Delay::from_numer_denom_ms(0, 1),
    }
}

fn decode_err(e: image::ImageError) -> Error {
    Error::Decode(e.to_string())
}

/// Whether output in `format` carries every source frame. GIF and WebP
/// do; AVIF output is always a still.
pub fn keeps_all_frames(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Gif | ImageFormat::Webp)
}

/// Apply `plan` to one frame: crop, then resize, then pad.
pub fn transform_frame(frame: &DynamicImage, plan: &TransformPlan) -> DynamicImage {
    if plan.is_identity() {
        return frame.clone();
    }

    let mut out = match plan.crop {
        Some(c) => frame.crop_imm(c.x, c.y, c.width, c.height),
        None => frame.clone(),
    };

    if let Some(size) = plan.resize {
        if (out.width(), out.height()) != (size.width, size.height) {
            out = out.resize_exact(size.width, size.height, FilterType::Lanczos3);
        }
    }

    if let Some(m) = plan.margins {
        let mut canvas =
            RgbaImage::from_pixel(plan.output.width, plan.output.height, Rgba([0, 0, 0, 255]));
        imageops::overlay(&mut canvas, &out.to_rgba8(), i64::from(m.left), i64::from(m.top));
        out = DynamicImage::ImageRgba8(canvas);
    }

    out
}

/// Encode transformed frames as `config.content_type`.
///
/// GIF and WebP keep every frame and loop forever. Other formats take the
/// first frame. Encoder failures are [`Error::Transform`] for `config.tag`.
pub fn encode(frames: &[SourceFrame], config: &ImageConfig) -> Result<Vec<u8>> {
    let first = frames
        .first()
        .ok_or_else(|| Error::transform(&config.tag, "no frames to encode"))?;
    let fail = |e: image::ImageError| Error::transform(&config.tag, e.to_string());

    let mut buf = Vec::new();
    match config.content_type {
        ImageFormat::Jpeg => {
            let quality = config.quality.clamp(1, 100);
            let rgb = DynamicImage::ImageRgb8(first.image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
                .map_err(fail)?;
        }
        ImageFormat::Png => {
            first
                .image
                .write_with_encoder(PngEncoder::new(&mut buf))
                .map_err(fail)?;
        }
        ImageFormat::Webp if frames.len() > 1 => {
            buf = encode_animated_webp(frames, &config.tag)?;
        }
        ImageFormat::Webp => {
            let rgba = DynamicImage::ImageRgba8(first.image.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buf))
                .map_err(fail)?;
        }
        ImageFormat::Avif => {
            let quality = config.quality.clamp(1, 100);
            let rgba = DynamicImage::ImageRgba8(first.image.to_rgba8());
            rgba.write_with_encoder(AvifEncoder::new_with_speed_quality(
                &mut buf, AVIF_SPEED, quality,
            ))
            .map_err(fail)?;
        }
        ImageFormat::Gif => {
            debug_assert!(keeps_all_frames(config.content_type));
            let mut encoder = GifEncoder::new(&mut buf);
            encoder.set_repeat(Repeat::Infinite).map_err(fail)?;
            encoder
                .encode_frames(
                    frames
                        .iter()
                        .map(|f| Frame::from_parts(f.image.to_rgba8(), 0, 0, f.delay)),
                )
                .map_err(fail)?;
        }
    }
    Ok(buf)
}

/// Lossless animated WebP. Each frame starts when the previous one's
/// delay runs out.
fn encode_animated_webp(frames: &[SourceFrame], tag: &str) -> Result<Vec<u8>> {
    let mut webp_config = webp::WebPConfig::new()
        .map_err(|()| Error::transform(tag, "webp encoder config could not be initialised"))?;
    webp_config.lossless = 1;

    let buffers: Vec<RgbaImage> = frames.iter().map(|f| f.image.to_rgba8()).collect();
    let (width, height) = buffers
        .first()
        .map(RgbaImage::dimensions)
        .ok_or_else(|| Error::transform(tag, "no frames to encode"))?;

    let mut encoder = webp::AnimEncoder::new(width, height, &webp_config);
    encoder.set_loop_count(0);
    let mut timestamp: i32 = 0;
    for (frame, rgba) in frames.iter().zip(&buffers) {
        encoder.add_frame(webp::AnimFrame::from_rgba(rgba.as_raw(), width, height, timestamp));
        let (numer, denom) = frame.delay.numer_denom_ms();
        // Timestamps must strictly increase.
        let delay_ms = i32::try_from(numer / denom.max(1)).unwrap_or(i32::MAX).max(1);
        timestamp = timestamp.saturating_add(delay_ms);
    }

    let data = encoder
        .try_encode()
        .map_err(|e| Error::transform(tag, format!("webp animation encoding failed: {e:?}")))?;
    Ok(data.to_vec())
}
