#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use boxscale::{BoxScaleError, Codec, ImageBuffer, JpegCodec, Result};

/// Write a JPEG with a smooth gradient so downscaled output is stable
pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 4 % 256) as u8, (y * 4 % 256) as u8, 96])
    });
    let path = dir.join(name);
    JpegCodec::new()
        .encode(&path, &ImageBuffer::from(image))
        .unwrap();
    path
}

/// Sorted file names directly inside `dir`
pub fn file_names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

/// Codec that never touches pixel data: decodes to a fixed-size gray image
/// and counts how often each path is seen.
#[derive(Default)]
pub struct CountingCodec {
    pub decoded: Mutex<Vec<PathBuf>>,
}

impl CountingCodec {
    pub fn decoded(&self) -> Vec<PathBuf> {
        let mut paths = self.decoded.lock().unwrap().clone();
        paths.sort();
        paths
    }
}

impl Codec for CountingCodec {
    fn decode(&self, path: &Path) -> Result<ImageBuffer> {
        self.decoded.lock().unwrap().push(path.to_path_buf());
        if fs::read(path).map_err(|e| BoxScaleError::decode(path, e))?.is_empty() {
            return Err(BoxScaleError::decode(path, "empty"));
        }
        ImageBuffer::from_raw(2, 2, vec![128; 12])
    }

    fn encode(&self, path: &Path, image: &ImageBuffer) -> Result<()> {
        fs::write(path, image.pixels()).map_err(|e| BoxScaleError::encode(path, e))
    }
}
