use std::path::Path;

use image::{DynamicImage, ImageReader, ImageResult};
use indicatif::ProgressStyle;

/// 读取图片，格式按文件内容判断而不是扩展名
pub fn imread<P: AsRef<Path>>(filename: P) -> ImageResult<DynamicImage> {
    ImageReader::open(filename)?.with_guessed_format()?.decode()
}

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .expect("invalid progress bar template")
        .progress_chars("#>-")
}
