//! Codec adapter: JPEG files to and from [`ImageBuffer`]s

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use image::codecs::jpeg::{JpegDecoder, JpegEncoder};
use image::{ColorType, ImageDecoder};
use memmap2::MmapOptions;
use tempfile::{Builder, NamedTempFile};
use tracing::debug;

use crate::config::ProcessingConfig;
use crate::error::{BoxScaleError, ErrorContext, Result};
use super::buffer::{try_alloc, ImageBuffer, CHANNELS};
use super::validation::SourceLimits;

/// Fixed JPEG encode quality
pub const JPEG_QUALITY: u8 = 75;

/// Format-specific decode and encode, shared by all workers
pub trait Codec: Send + Sync {
    /// Decode the file at `path` into 8-bit RGB
    fn decode(&self, path: &Path) -> Result<ImageBuffer>;

    /// Write `image` to `path`, replacing any existing file. On failure an
    /// existing file at `path` is left untouched.
    fn encode(&self, path: &Path, image: &ImageBuffer) -> Result<()>;
}

/// Baseline JPEG codec backed by the `image` crate
#[derive(Debug, Clone)]
pub struct JpegCodec {
    limits: SourceLimits,
    mmap_threshold: u64,
}

impl JpegCodec {
    pub fn new() -> Self {
        Self::from_config(&ProcessingConfig::default())
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            limits: SourceLimits::from_config(config),
            mmap_threshold: config.mmap_threshold,
        }
    }

    /// Read the whole file into memory
    fn decode_standard(&self, path: &Path) -> Result<ImageBuffer> {
        let data = fs::read(path).with_file_context(path)?;
        self.decode_bytes(path, &data)
    }

    /// Map the file instead of copying it (for large files)
    fn decode_mapped(&self, path: &Path) -> Result<ImageBuffer> {
        debug!("Using memory mapping for large file: {:?}", path);

        let file = File::open(path).with_file_context(path)?;
        // SAFETY: the mapping is read-only and dropped before this call returns
        let mmap = unsafe { MmapOptions::new().map(&file).with_file_context(path)? };

        self.decode_bytes(path, &mmap)
    }

    fn decode_bytes(&self, path: &Path, data: &[u8]) -> Result<ImageBuffer> {
        if !infer::image::is_jpeg(data) {
            let detected = infer::get(data).map_or("unknown", |kind| kind.mime_type());
            return Err(BoxScaleError::unsupported_format(detected, Some(path.to_path_buf())));
        }

        let decoder = JpegDecoder::new(Cursor::new(data)).with_file_context(path)?;
        let (width, height) = decoder.dimensions();
        self.limits.check_dimensions(path, width, height)?;

        // reserve fallibly; a refusal fails this file only
        let color = decoder.color_type();
        let len = usize::try_from(decoder.total_bytes()).map_err(|_| {
            BoxScaleError::out_of_memory(format!("{}x{} image does not fit in memory", width, height))
        })?;
        let mut raw = try_alloc(len, format_args!("decoding {}", path.display()))?;
        decoder.read_image(&mut raw).with_file_context(path)?;

        to_rgb(width, height, color, raw).with_file_context(path)
    }
}

/// Convert decoder output to interleaved RGB8
fn to_rgb(width: u32, height: u32, color: ColorType, raw: Vec<u8>) -> Result<ImageBuffer> {
    match color {
        ColorType::Rgb8 => ImageBuffer::from_raw(width, height, raw),
        ColorType::L8 => expand_gray(width, height, raw.iter().copied()),
        ColorType::L16 => expand_gray(
            width,
            height,
            raw.chunks_exact(2)
                .map(|b| narrow_u16(u16::from_ne_bytes([b[0], b[1]]))),
        ),
        other => Err(BoxScaleError::unsupported_format(format!("JPEG with {:?} samples", other), None)),
    }
}

fn expand_gray(width: u32, height: u32, samples: impl Iterator<Item = u8>) -> Result<ImageBuffer> {
    let mut rgb = ImageBuffer::zeroed(width, height)?;
    for (px, value) in rgb.pixels_mut().chunks_exact_mut(CHANNELS).zip(samples) {
        px.fill(value);
    }
    Ok(rgb)
}

/// 16-bit to 8-bit sample, rounded
fn narrow_u16(value: u16) -> u8 {
    ((u32::from(value) + 128) / 257) as u8
}

/// Temp file beside `path`, so the final rename stays on one filesystem
fn staging_file(path: &Path) -> std::io::Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = Builder::new()
        .prefix(".boxscale-")
        .suffix(".partial")
        .tempfile_in(dir)?;

    // temp files start owner-only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }

    Ok(staged)
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for JpegCodec {
    fn decode(&self, path: &Path) -> Result<ImageBuffer> {
        let metadata = fs::metadata(path).with_file_context(path)?;
        let file_size = metadata.len();
        self.limits.check_file_size(path, file_size)?;

        let image = if file_size > self.mmap_threshold {
            self.decode_mapped(path)?
        } else {
            self.decode_standard(path)?
        };

        debug!("Decoded {:?}: {}x{}", path, image.width(), image.height());
        Ok(image)
    }

    fn encode(&self, path: &Path, image: &ImageBuffer) -> Result<()> {
        if image.is_empty() {
            return Err(BoxScaleError::encode(
                path,
                format!("refusing to encode zero-area {}x{} image", image.width(), image.height()),
            ));
        }

        // a failed encode drops the staged file; `path` only changes on rename
        let mut staged = staging_file(path).map_err(|e| BoxScaleError::encode(path, e))?;
        {
            let mut writer = BufWriter::new(staged.as_file_mut());
            JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
                .encode(image.pixels(), image.width(), image.height(), ColorType::Rgb8)
                .map_err(|e| BoxScaleError::encode(path, e))?;
            writer.flush().map_err(|e| BoxScaleError::encode(path, e))?;
        }
        staged
            .persist(path)
            .map_err(|e| BoxScaleError::encode(path, e.error))?;

        debug!("Encoded {:?}: {}x{}", path, image.width(), image.height());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory codec that records every call

    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;

    /// Files whose content starts with this marker fail to decode
    pub const CORRUPT_MARKER: &[u8] = b"corrupt";

    /// Decodes any file into a `side x side` image filled with the file's first byte
    /// and writes the output dimensions as text on encode.
    #[derive(Debug)]
    pub struct RecordingCodec {
        side: u32,
        pub decoded: Mutex<Vec<PathBuf>>,
        pub encoded: Mutex<Vec<PathBuf>>,
    }

    impl RecordingCodec {
        pub fn new(side: u32) -> Self {
            Self {
                side,
                decoded: Mutex::new(Vec::new()),
                encoded: Mutex::new(Vec::new()),
            }
        }

        pub fn decoded_names(&self) -> Vec<String> {
            names(&self.decoded.lock().unwrap())
        }

        pub fn encoded_names(&self) -> Vec<String> {
            names(&self.encoded.lock().unwrap())
        }
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        let mut names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    impl Codec for RecordingCodec {
        fn decode(&self, path: &Path) -> Result<ImageBuffer> {
            self.decoded.lock().unwrap().push(path.to_path_buf());

            let data = fs::read(path).map_err(|e| BoxScaleError::decode(path, e))?;
            if data.starts_with(CORRUPT_MARKER) {
                return Err(BoxScaleError::decode(path, "corrupt test file"));
            }
            let fill = data.first().copied().unwrap_or(0);
            let len = (self.side * self.side) as usize * 3;
            ImageBuffer::from_raw(self.side, self.side, vec![fill; len])
        }

        fn encode(&self, path: &Path, image: &ImageBuffer) -> Result<()> {
            self.encoded.lock().unwrap().push(path.to_path_buf());
            fs::write(path, format!("{}x{}", image.width(), image.height()))
                .map_err(|e| BoxScaleError::encode(path, e))
        }
    }
}
