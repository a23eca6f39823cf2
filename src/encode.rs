//! Still-image JPEG encoding through FFmpeg's MJPEG encoder.
//!
//! The quality index is FFmpeg's qscale (the `-q:v` value of the command-line
//! tool): `1` is the finest, `31` the coarsest. Encoding goes through
//! `ffmpeg-next` rather than the `image` crate so that sizes follow the same
//! curve as `ffmpeg -q:v N`.

use ffmpeg_next::codec::Id;
use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::{Packet, Rational};
use image::RgbImage;

use crate::configuration::{MAX_QUALITY_INDEX, MIN_QUALITY_INDEX};
use crate::error::FramegrabError;

/// Encode an RGB image as a baseline JPEG at the given quality index.
///
/// Returns the complete JPEG file contents.
pub(crate) fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, FramegrabError> {
    crate::ffmpeg::initialize()?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(FramegrabError::EncodeError(
            "cannot encode an empty image".to_string(),
        ));
    }
    let quality = quality.clamp(MIN_QUALITY_INDEX, MAX_QUALITY_INDEX);
    let lambda = i32::from(quality) * ffmpeg_sys_next::FF_QP2LAMBDA as i32;

    let codec = ffmpeg_next::encoder::find(Id::MJPEG)
        .ok_or_else(|| FramegrabError::EncodeError("MJPEG encoder not available".to_string()))?;

    let mut encoder = CodecContext::new_with_codec(codec)
        .encoder()
        .video()
        .map_err(|e| FramegrabError::EncodeError(format!("cannot create MJPEG encoder: {e}")))?;

    encoder.set_width(width);
    encoder.set_height(height);
    encoder.set_format(Pixel::YUVJ420P);
    encoder.set_time_base(Rational::new(1, 25));

    // Fixed-quantiser mode: the encoder takes its scale from global_quality
    // and the per-frame quality field.
    unsafe {
        let context = encoder.as_mut_ptr();
        (*context).flags |= ffmpeg_sys_next::AV_CODEC_FLAG_QSCALE as i32;
        (*context).global_quality = lambda;
    }

    let mut opened = encoder
        .open_as(codec)
        .map_err(|e| FramegrabError::EncodeError(format!("cannot open MJPEG encoder: {e}")))?;

    let mut scaler = ScalingContext::get(
        Pixel::RGB24,
        width,
        height,
        Pixel::YUVJ420P,
        width,
        height,
        ScalingFlags::BILINEAR,
    )
    .map_err(|e| FramegrabError::EncodeError(format!("cannot create scaler: {e}")))?;

    let source = rgb_image_to_frame(image);
    let mut yuv_frame = VideoFrame::empty();
    scaler
        .run(&source, &mut yuv_frame)
        .map_err(|e| FramegrabError::EncodeError(format!("scaling failed: {e}")))?;
    yuv_frame.set_pts(Some(0));
    unsafe {
        (*yuv_frame.as_mut_ptr()).quality = lambda;
    }

    opened
        .send_frame(&yuv_frame)
        .map_err(|e| FramegrabError::EncodeError(format!("send_frame failed: {e}")))?;
    opened
        .send_eof()
        .map_err(|e| FramegrabError::EncodeError(format!("send_eof failed: {e}")))?;

    let mut bytes = Vec::new();
    let mut packet = Packet::empty();
    while opened.receive_packet(&mut packet).is_ok() {
        if let Some(data) = packet.data() {
            bytes.extend_from_slice(data);
        }
    }

    if bytes.is_empty() {
        return Err(FramegrabError::EncodeError(
            "MJPEG encoder produced no data".to_string(),
        ));
    }
    Ok(bytes)
}

/// Copy an [`RgbImage`] into an RGB24 FFmpeg frame, honouring the frame's
/// row stride.
fn rgb_image_to_frame(image: &RgbImage) -> VideoFrame {
    let (width, height) = image.dimensions();
    let mut frame = VideoFrame::new(Pixel::RGB24, width, height);
    let stride = frame.stride(0);
    let row_len = width as usize * 3;
    let rgb_bytes = image.as_raw();
    let data = frame.data_mut(0);
    for y in 0..height as usize {
        let src_start = y * row_len;
        let dst_start = y * stride;
        data[dst_start..dst_start + row_len]
            .copy_from_slice(&rgb_bytes[src_start..src_start + row_len]);
    }
    frame
}
