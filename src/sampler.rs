//! Frame sampling.
//!
//! [`FrameSampler`] asks a [`SamplingService`] to write numbered frame files
//! (`frame_0001.png`, `frame_0002.png`, ...) into an output directory, then
//! rescans that directory to build the ordered [`FrameFile`] list. The count
//! always reflects what is on disk, never the pre-run estimate.
//!
//! [`FfmpegSampler`] is the production service: it decodes the video with
//! FFmpeg and pushes frames through an `fps=<rate>` filter graph.

use std::fs;
use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Rational, codec::context::Context as CodecContext, filter::Graph as FilterGraph,
    frame::Video as VideoFrame, media::Type,
};
use ffmpeg_sys_next::AVPixelFormat;
use image::{ImageFormat, RgbImage};

use crate::error::FramegrabError;
use crate::plan::{OutputFormat, SamplingPlan};

/// File name prefix shared by every sampled frame.
pub const FRAME_PREFIX: &str = "frame_";

/// Zero-padding width of the sequence number in frame file names.
pub const SEQUENCE_DIGITS: usize = 4;

/// One sampled frame on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFile {
    /// Location of the image file.
    pub path: PathBuf,
    /// Capture-order position, starting at 1.
    pub sequence_index: u32,
    /// File size at the time of the scan.
    pub size_bytes: u64,
}

/// File name of the frame at `sequence_index` in `format`.
///
/// # Example
///
/// ```
/// use framegrab::{OutputFormat, frame_file_name};
///
/// assert_eq!(frame_file_name(7, OutputFormat::Jpeg), "frame_0007.jpg");
/// ```
pub fn frame_file_name(sequence_index: u32, format: OutputFormat) -> String {
    format!(
        "{FRAME_PREFIX}{sequence_index:0width$}.{}",
        format.extension(),
        width = SEQUENCE_DIGITS
    )
}

/// Parse the sequence index out of a frame file name, if it matches the
/// `frame_NNNN.<ext>` pattern for `format`.
pub(crate) fn parse_sequence_index(file_name: &str, format: OutputFormat) -> Option<u32> {
    let digits = file_name
        .strip_prefix(FRAME_PREFIX)?
        .strip_suffix(format.extension())?
        .strip_suffix('.')?;
    if digits.len() < SEQUENCE_DIGITS || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// List the frame files of `format` in `directory`, ordered by sequence
/// index.
///
/// Hidden scratch files and files of other formats are ignored.
///
/// # Errors
///
/// Returns [`FramegrabError::IoError`] if the directory cannot be read.
pub fn scan_frames(directory: &Path, format: OutputFormat) -> Result<Vec<FrameFile>, FramegrabError> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(sequence_index) = file_name
            .to_str()
            .and_then(|name| parse_sequence_index(name, format))
        else {
            continue;
        };
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        frames.push(FrameFile {
            path: entry.path(),
            sequence_index,
            size_bytes: metadata.len(),
        });
    }
    frames.sort_by_key(|frame| frame.sequence_index);
    Ok(frames)
}

/// A single invocation of the sampling service, covering the whole video.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingRequest {
    /// Video to sample.
    pub video: PathBuf,
    /// Frames per second to keep. `None` keeps every frame at the native
    /// rate.
    pub rate_filter: Option<f64>,
    /// Image format to write.
    pub format: OutputFormat,
    /// Directory receiving `frame_NNNN.<ext>` files.
    pub output_dir: PathBuf,
    /// JPEG quality index for lossy output.
    pub quality: u8,
}

impl SamplingRequest {
    /// Output path of the frame at `sequence_index`.
    pub fn frame_path(&self, sequence_index: u32) -> PathBuf {
        self.output_dir
            .join(frame_file_name(sequence_index, self.format))
    }
}

/// Writes numbered frame files for a whole video.
///
/// Implementations write `frame_0001.<ext>`, `frame_0002.<ext>`, ... under
/// [`SamplingRequest::output_dir`], numbered contiguously from 1 in capture
/// order.
pub trait SamplingService: Send + Sync {
    /// Sample the video described by `request`.
    ///
    /// # Errors
    ///
    /// Implementations should return
    /// [`FramegrabError::ExtractionFailed`] with diagnostic text. Any other
    /// error is wrapped into one by [`FrameSampler`].
    fn sample(&self, request: &SamplingRequest) -> Result<(), FramegrabError>;
}

/// Samples a video through a [`SamplingService`] and reports what landed on
/// disk.
pub struct FrameSampler<'a> {
    service: &'a dyn SamplingService,
    quality: u8,
}

impl<'a> FrameSampler<'a> {
    /// Create a sampler that writes lossy frames at quality index 2.
    pub fn new(service: &'a dyn SamplingService) -> Self {
        Self {
            service,
            quality: 2,
        }
    }

    /// Set the quality index used for lossy frames.
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Sample `video` according to `plan` into `output_dir`.
    ///
    /// Files left behind by a failed service call are not cleaned up.
    ///
    /// # Errors
    ///
    /// - [`FramegrabError::ExtractionFailed`] if the service fails.
    /// - [`FramegrabError::Cancelled`] if the service was cancelled.
    /// - [`FramegrabError::IoError`] if the directory cannot be rescanned.
    pub fn sample(
        &self,
        video: &Path,
        plan: &SamplingPlan,
        format: OutputFormat,
        output_dir: &Path,
    ) -> Result<Vec<FrameFile>, FramegrabError> {
        let request = SamplingRequest {
            video: video.to_path_buf(),
            rate_filter: plan.rate_filter(),
            format,
            output_dir: output_dir.to_path_buf(),
            quality: self.quality,
        };
        log::info!(
            "Sampling {} (rate={}, format={format}) into {}",
            video.display(),
            request
                .rate_filter
                .map_or_else(|| "original".to_string(), |rate| rate.to_string()),
            output_dir.display()
        );

        self.service.sample(&request).map_err(|error| match error {
            FramegrabError::ExtractionFailed { .. } | FramegrabError::Cancelled => error,
            other => FramegrabError::ExtractionFailed {
                diagnostic: other.to_string(),
            },
        })?;

        let frames = scan_frames(output_dir, format)?;
        if frames
            .iter()
            .enumerate()
            .any(|(position, frame)| frame.sequence_index as usize != position + 1)
        {
            log::warn!(
                "Frame numbering in {} is not contiguous from 1",
                output_dir.display()
            );
        }
        log::info!("Sampled {} frame(s)", frames.len());
        Ok(frames)
    }
}

/// [`SamplingService`] that decodes the video in-process with FFmpeg.
///
/// Frames pass through a `buffer → fps=<rate> → format=rgb24 → buffersink`
/// filter graph (the `fps` stage is omitted for the original rate). PNG
/// frames are written with the `image` crate; JPEG frames with FFmpeg's
/// MJPEG encoder at the request's quality index.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegSampler;

impl SamplingService for FfmpegSampler {
    fn sample(&self, request: &SamplingRequest) -> Result<(), FramegrabError> {
        run_sampling(request).map_err(|error| FramegrabError::ExtractionFailed {
            diagnostic: format!("{}: {error}", request.video.display()),
        })
    }
}

fn run_sampling(request: &SamplingRequest) -> Result<(), FramegrabError> {
    crate::ffmpeg::initialize()?;

    let mut input_context = ffmpeg_next::format::input(&request.video)?;
    let stream = input_context
        .streams()
        .best(Type::Video)
        .ok_or_else(|| FramegrabError::FfmpegError("no video stream found".to_string()))?;
    let video_stream_index = stream.index();
    let time_base = stream.time_base();
    let decoder_context = CodecContext::from_parameters(stream.parameters())?;
    let mut decoder = decoder_context.decoder().video()?;

    let filter_spec = match request.rate_filter {
        Some(rate) => format!("fps={rate},format=pix_fmts=rgb24"),
        None => "format=pix_fmts=rgb24".to_string(),
    };
    let mut session = SamplingSession {
        graph: None,
        filter_spec,
        time_base,
        filtered_frame: VideoFrame::empty(),
        writer: FrameWriter {
            request,
            next_index: 1,
        },
    };
    let mut decoded_frame = VideoFrame::empty();

    for (stream, packet) in input_context.packets() {
        if stream.index() != video_stream_index {
            continue;
        }
        decoder.send_packet(&packet)?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            session.push(&mut decoded_frame)?;
        }
    }

    decoder.send_eof()?;
    while decoder.receive_frame(&mut decoded_frame).is_ok() {
        session.push(&mut decoded_frame)?;
    }
    session.finish()?;

    log::debug!("Wrote {} frame file(s)", session.writer.next_index - 1);
    Ok(())
}

/// Decode-side state for one sampling run.
///
/// The filter graph is built from the first decoded frame rather than the
/// decoder parameters, since some decoders report a pixel format up front
/// that differs from what they actually produce.
struct SamplingSession<'a> {
    graph: Option<FilterGraph>,
    filter_spec: String,
    time_base: Rational,
    filtered_frame: VideoFrame,
    writer: FrameWriter<'a>,
}

impl SamplingSession<'_> {
    fn push(&mut self, frame: &mut VideoFrame) -> Result<(), FramegrabError> {
        if self.graph.is_none() {
            let buffer_args = buffer_args_for(frame, self.time_base);
            self.graph = Some(build_filter_graph(&buffer_args, &self.filter_spec)?);
        }
        if let Some(graph) = self.graph.as_mut() {
            feed_frame(graph, frame)?;
            drain_graph(graph, &mut self.filtered_frame, &mut self.writer)?;
        }
        Ok(())
    }

    /// Flush the `fps` filter's buffered frame. A video that never decoded
    /// a frame has no graph and writes nothing.
    fn finish(&mut self) -> Result<(), FramegrabError> {
        let Some(graph) = self.graph.as_mut() else {
            return Ok(());
        };
        graph
            .get("in")
            .ok_or_else(|| FramegrabError::FfmpegError("filter 'in' not found".to_string()))?
            .source()
            .flush()?;
        drain_graph(graph, &mut self.filtered_frame, &mut self.writer)
    }
}

fn buffer_args_for(frame: &VideoFrame, time_base: Rational) -> String {
    // Raw AVFrame fields; the safe enum accessors can disagree with the
    // discriminants the buffer filter expects.
    let (color_space, color_range) = unsafe {
        let pointer = frame.as_ptr();
        ((*pointer).colorspace as i32, (*pointer).color_range as i32)
    };
    format!(
        "video_size={}x{}:pix_fmt={}:time_base={}/{}:pixel_aspect=1/1:colorspace={}:range={}",
        frame.width(),
        frame.height(),
        AVPixelFormat::from(frame.format()) as i32,
        time_base.numerator(),
        time_base.denominator(),
        color_space,
        color_range,
    )
}

/// Build `buffer → <filter_spec> → buffersink`.
fn build_filter_graph(buffer_args: &str, filter_spec: &str) -> Result<FilterGraph, FramegrabError> {
    let mut graph = FilterGraph::new();
    let buffer = ffmpeg_next::filter::find("buffer")
        .ok_or_else(|| FramegrabError::FfmpegError("FFmpeg 'buffer' filter not found".to_string()))?;
    let buffersink = ffmpeg_next::filter::find("buffersink").ok_or_else(|| {
        FramegrabError::FfmpegError("FFmpeg 'buffersink' filter not found".to_string())
    })?;

    graph.add(&buffer, "in", buffer_args)?;
    graph.add(&buffersink, "out", "")?;
    graph
        .output("in", 0)?
        .input("out", 0)?
        .parse(filter_spec)?;
    graph.validate()?;
    Ok(graph)
}

/// Push one decoded frame into the graph, stamped with its best-effort
/// timestamp so the `fps` filter can place it on the output timeline.
fn feed_frame(graph: &mut FilterGraph, frame: &mut VideoFrame) -> Result<(), FramegrabError> {
    let timestamp = frame.timestamp();
    frame.set_pts(timestamp);
    graph
        .get("in")
        .ok_or_else(|| FramegrabError::FfmpegError("filter 'in' not found".to_string()))?
        .source()
        .add(frame)?;
    Ok(())
}

fn drain_graph(
    graph: &mut FilterGraph,
    filtered_frame: &mut VideoFrame,
    writer: &mut FrameWriter<'_>,
) -> Result<(), FramegrabError> {
    loop {
        let mut sink = graph
            .get("out")
            .ok_or_else(|| FramegrabError::FfmpegError("filter 'out' not found".to_string()))?;
        if sink.sink().frame(filtered_frame).is_err() {
            return Ok(());
        }
        writer.write(filtered_frame)?;
    }
}

/// Writes filtered RGB24 frames to contiguous numbered files.
struct FrameWriter<'a> {
    request: &'a SamplingRequest,
    next_index: u32,
}

impl FrameWriter<'_> {
    fn write(&mut self, frame: &VideoFrame) -> Result<(), FramegrabError> {
        let (width, height) = (frame.width(), frame.height());
        let buffer = crate::conversion::frame_to_rgb_buffer(frame, width, height);
        let image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            FramegrabError::FfmpegError("filtered frame has an unexpected size".to_string())
        })?;

        let path = self.request.frame_path(self.next_index);
        match self.request.format {
            OutputFormat::Png => image.save_with_format(&path, ImageFormat::Png)?,
            OutputFormat::Jpeg => {
                let bytes = crate::encode::encode_jpeg(&image, self.request.quality)?;
                fs::write(&path, bytes)?;
            }
        }
        self.next_index += 1;
        Ok(())
    }
}
