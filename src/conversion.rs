//! Internal conversion helpers.
//!
//! Pixel-buffer copying and frame-rate arithmetic shared by the FFmpeg-backed
//! collaborators.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from an RGB24 FFmpeg frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3).
/// This strips that padding so the result can be passed directly to
/// [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_len = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_len {
        data[..row_len * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_len * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_len]);
        }
        buffer
    }
}

/// Frames per second from a numerator/denominator pair.
///
/// A zero denominator (missing rate) yields `0.0`, as do negative rates.
pub(crate) fn fraction_to_fps(numerator: i32, denominator: i32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let fps = f64::from(numerator) / f64::from(denominator);
    if fps.is_finite() && fps > 0.0 { fps } else { 0.0 }
}

/// Frames per second from an FFmpeg rational.
pub(crate) fn rational_to_fps(rate: Rational) -> f64 {
    fraction_to_fps(rate.numerator(), rate.denominator())
}

/// Duration in seconds of `ticks` in the given time base.
pub(crate) fn ticks_to_seconds(ticks: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    ticks as f64 * f64::from(time_base.numerator()) / f64::from(time_base.denominator())
}

#[cfg(test)]
mod tests {
    use ffmpeg_next::Rational;

    use super::*;

    #[test]
    fn zero_denominator_is_zero_fps() {
        assert_eq!(fraction_to_fps(30, 0), 0.0);
        assert_eq!(rational_to_fps(Rational::new(0, 1)), 0.0);
    }

    #[test]
    fn ntsc_rate() {
        let fps = fraction_to_fps(30000, 1001);
        assert!((fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn ticks_in_millisecond_base() {
        assert_eq!(ticks_to_seconds(2500, Rational::new(1, 1000)), 2.5);
        assert_eq!(ticks_to_seconds(2500, Rational::new(1, 0)), 0.0);
    }
}
