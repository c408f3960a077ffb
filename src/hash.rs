use std::fmt;
use std::path::Path;

use clap::ValueEnum;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};

use crate::error::CheckError;
use crate::hamming::hamming;
use crate::utils;

/// 感知哈希值
///
/// 共 `size * size` 位，按行优先、高位在前的顺序打包到字节中
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHash {
    size: u32,
    bits: Vec<u8>,
}

impl ImageHash {
    pub fn from_bits<I: IntoIterator<Item = bool>>(size: u32, bits: I) -> Self {
        let nbits = (size * size) as usize;
        let mut packed = vec![0u8; nbits.div_ceil(8)];
        let mut count = 0;
        for (i, bit) in bits.into_iter().enumerate() {
            assert!(i < nbits, "too many bits for hash size {}", size);
            if bit {
                packed[i / 8] |= 0x80 >> (i % 8);
            }
            count += 1;
        }
        assert_eq!(count, nbits, "bit count does not match hash size {}", size);
        Self { size, bits: packed }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// 哈希的位数
    pub fn bit_len(&self) -> usize {
        (self.size * self.size) as usize
    }

    /// 十六进制字符串形式的长度，64 位哈希为 16
    pub fn hex_len(&self) -> usize {
        self.bit_len().div_ceil(4)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn bit(&self, i: usize) -> bool {
        self.bits[i / 8] & (0x80 >> (i % 8)) != 0
    }

    /// 与另一个哈希的汉明距离，两者尺寸必须一致
    pub fn distance(&self, other: &ImageHash) -> u32 {
        assert_eq!(self.size, other.size, "cannot compare hashes of different sizes");
        hamming(&self.bits, &other.bits)
    }
}

impl fmt::Display for ImageHash {
    /// 把全部比特视为一个大整数，输出补零到 `hex_len` 位的十六进制
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nbits = self.bit_len();
        let pad = self.hex_len() * 4 - nbits;
        let bits = std::iter::repeat_n(false, pad).chain((0..nbits).map(|i| self.bit(i)));
        let mut nibble = 0u32;
        for (i, bit) in bits.enumerate() {
            nibble = (nibble << 1) | bit as u32;
            if i % 4 == 3 {
                let c = char::from_digit(nibble, 16).unwrap_or('0');
                write!(f, "{}", c)?;
                nibble = 0;
            }
        }
        Ok(())
    }
}

/// 感知哈希算法
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlg {
    /// Haar 小波哈希
    #[default]
    Whash,
    /// DCT 哈希
    Phash,
    /// 差值哈希
    Dhash,
    /// 均值哈希
    Ahash,
}

impl HashAlg {
    /// 检查哈希边长对该算法是否可用
    pub fn supports_size(self, size: u32) -> bool {
        match self {
            Self::Whash => size >= 2 && size.is_power_of_two(),
            _ => size >= 2,
        }
    }

    /// 读取并计算图片文件的哈希，文件句柄在返回前释放
    pub fn hash_file<P: AsRef<Path>>(self, path: P, size: u32) -> Result<ImageHash, CheckError> {
        if !self.supports_size(size) {
            return Err(CheckError::InvalidHashSize { alg: self, size });
        }
        let path = path.as_ref();
        let image = utils::imread(path)
            .map_err(|source| CheckError::ImageLoad { path: path.to_path_buf(), source })?;
        Ok(self.hash_image(&image, size))
    }

    /// # Panics
    ///
    /// `size` 不被该算法支持时 panic，先用 [`HashAlg::supports_size`] 检查
    pub fn hash_image(self, image: &DynamicImage, size: u32) -> ImageHash {
        assert!(self.supports_size(size), "{:?} does not support hash size {}", self, size);
        let gray = image.to_luma8();
        match self {
            Self::Whash => w_hash(&gray, size),
            Self::Phash => p_hash(&gray, size),
            Self::Dhash => d_hash(&gray, size),
            Self::Ahash => a_hash(&gray, size),
        }
    }
}

fn w_hash(gray: &GrayImage, size: u32) -> ImageHash {
    let (w, h) = gray.dimensions();
    let natural = 1u32 << w.min(h).max(1).ilog2();
    let scale = natural.max(size);
    let resized = imageops::resize(gray, scale, scale, FilterType::Lanczos3);

    let mut pixels: Vec<f64> = resized.pixels().map(|p| p[0] as f64 / 255.).collect();
    // 去掉最高层的 LL 分量，即整体均值
    let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
    pixels.iter_mut().for_each(|p| *p -= mean);

    let mut side = scale as usize;
    while side > size as usize {
        pixels = haar_ll(&pixels, side);
        side /= 2;
    }

    let median = median(&pixels);
    ImageHash::from_bits(size, pixels.iter().map(|&v| v > median))
}

/// 对 side x side 的矩阵做一层二维 Haar 分解，只保留低频部分
fn haar_ll(pixels: &[f64], side: usize) -> Vec<f64> {
    let half = side / 2;
    let mut out = Vec::with_capacity(half * half);
    for y in 0..half {
        for x in 0..half {
            let (r0, r1) = (2 * y * side, (2 * y + 1) * side);
            let sum = pixels[r0 + 2 * x]
                + pixels[r0 + 2 * x + 1]
                + pixels[r1 + 2 * x]
                + pixels[r1 + 2 * x + 1];
            out.push(sum / 2.);
        }
    }
    out
}

fn p_hash(gray: &GrayImage, size: u32) -> ImageHash {
    let n = (size * 4) as usize;
    let resized = imageops::resize(gray, n as u32, n as u32, FilterType::Lanczos3);
    let pixels: Vec<f64> = resized.pixels().map(|p| p[0] as f64).collect();

    let table = dct_table(n);
    let k = size as usize;
    // 先沿列方向，再沿行方向做 DCT-II，只需要左上角 k x k 的低频系数
    let mut cols = vec![0f64; k * n];
    for u in 0..k {
        for x in 0..n {
            cols[u * n + x] = (0..n).map(|y| table[u * n + y] * pixels[y * n + x]).sum();
        }
    }
    let mut low = Vec::with_capacity(k * k);
    for u in 0..k {
        for v in 0..k {
            low.push((0..n).map(|x| table[v * n + x] * cols[u * n + x]).sum::<f64>());
        }
    }

    let median = median(&low);
    ImageHash::from_bits(size, low.iter().map(|&v| v > median))
}

/// `table[k * n + i] = 2 cos(pi k (2i + 1) / 2n)`
fn dct_table(n: usize) -> Vec<f64> {
    let mut table = Vec::with_capacity(n * n);
    for k in 0..n {
        for i in 0..n {
            let angle = std::f64::consts::PI * k as f64 * (2 * i + 1) as f64 / (2 * n) as f64;
            table.push(2. * angle.cos());
        }
    }
    table
}

fn d_hash(gray: &GrayImage, size: u32) -> ImageHash {
    let resized = imageops::resize(gray, size + 1, size, FilterType::Lanczos3);
    let bits = (0..size).flat_map(|y| {
        let resized = &resized;
        (0..size).map(move |x| resized.get_pixel(x, y)[0] < resized.get_pixel(x + 1, y)[0])
    });
    ImageHash::from_bits(size, bits)
}

fn a_hash(gray: &GrayImage, size: u32) -> ImageHash {
    let resized = imageops::resize(gray, size, size, FilterType::Lanczos3);
    let sum: u64 = resized.pixels().map(|p| p[0] as u64).sum();
    let mean = sum as f64 / (size * size) as f64;
    ImageHash::from_bits(size, resized.pixels().map(|p| p[0] as f64 > mean))
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2. } else { sorted[mid] }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;

    fn horizontal_gradient(w: u32, h: u32) -> DynamicImage {
        let image = GrayImage::from_fn(w, h, |x, _| Luma([(x * 255 / (w - 1)) as u8]));
        DynamicImage::ImageLuma8(image)
    }

    fn vertical_gradient(w: u32, h: u32) -> DynamicImage {
        let image = GrayImage::from_fn(w, h, |_, y| Luma([(y * 255 / (h - 1)) as u8]));
        DynamicImage::ImageLuma8(image)
    }

    #[test]
    fn test_from_bits_and_display() {
        let hash = ImageHash::from_bits(8, (0..64).map(|i| i < 4));
        assert_eq!(hash.as_bytes()[0], 0xf0);
        assert_eq!(hash.to_string(), "f000000000000000");
        assert_eq!(hash.hex_len(), 16);
        assert_eq!(hash.bit_len(), 64);
    }

    #[test]
    fn test_display_pads_odd_sizes() {
        // 9 位 -> 3 个十六进制字符，最高位补零
        let hash = ImageHash::from_bits(3, [true; 9]);
        assert_eq!(hash.to_string(), "1ff");
        assert_eq!(hash.hex_len(), 3);
    }

    #[test]
    #[should_panic(expected = "bit count does not match")]
    fn test_from_bits_too_few() {
        ImageHash::from_bits(8, [true; 10]);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3., 1., 2.]), 2.);
        assert_eq!(median(&[4., 1., 3., 2.]), 2.5);
    }

    #[test]
    fn test_identity_all_algorithms() {
        let image = horizontal_gradient(64, 64);
        for alg in HashAlg::value_variants() {
            let a = alg.hash_image(&image, 8);
            let b = alg.hash_image(&image, 8);
            assert_eq!(a, b, "{:?}", alg);
            assert_eq!(a.distance(&b), 0);
        }
    }

    #[test]
    fn test_whash_gradient_bits() {
        // 水平渐变：右半边的块均值大于中位数
        let hash = HashAlg::Whash.hash_image(&horizontal_gradient(64, 64), 8);
        for i in 0..64 {
            assert_eq!(hash.bit(i), i % 8 >= 4, "bit {}", i);
        }
        assert_eq!(hash.to_string(), "0f0f0f0f0f0f0f0f");
    }

    #[test]
    fn test_whash_orthogonal_gradients() {
        let a = HashAlg::Whash.hash_image(&horizontal_gradient(64, 64), 8);
        let b = HashAlg::Whash.hash_image(&vertical_gradient(64, 64), 8);
        assert_eq!(a.distance(&b), 32);
    }

    #[test]
    fn test_whash_small_image_upscaled() {
        // 小于哈希边长的图片会被放大到 hash_size
        let hash = HashAlg::Whash.hash_image(&horizontal_gradient(5, 5), 8);
        assert_eq!(hash.bit_len(), 64);
    }

    #[test]
    fn test_resized_image_is_close() {
        let big = horizontal_gradient(256, 128);
        let small = big.resize_exact(128, 64, FilterType::Triangle);
        // DCT 对纯渐变的高频噪声很敏感，这里不参与比较
        for alg in [HashAlg::Whash, HashAlg::Dhash, HashAlg::Ahash] {
            let a = alg.hash_image(&big, 8);
            let b = alg.hash_image(&small, 8);
            assert!(a.distance(&b) <= 6, "{:?}: {}", alg, a.distance(&b));
        }
    }

    #[test]
    fn test_dhash_gradient() {
        let hash = HashAlg::Dhash.hash_image(&horizontal_gradient(90, 80), 8);
        assert!((0..64).all(|i| hash.bit(i)));
    }

    #[test]
    fn test_supports_size() {
        assert!(HashAlg::Whash.supports_size(16));
        assert!(!HashAlg::Whash.supports_size(12));
        assert!(HashAlg::Phash.supports_size(12));
        assert!(!HashAlg::Ahash.supports_size(1));
    }

    #[test]
    fn test_hash_file_invalid_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradient.png");
        horizontal_gradient(16, 16).save(&path).unwrap();

        let err = HashAlg::Whash.hash_file(&path, 6).unwrap_err();
        assert!(matches!(err, CheckError::InvalidHashSize { alg: HashAlg::Whash, size: 6 }));
        assert_eq!(HashAlg::Phash.hash_file(&path, 6).unwrap().bit_len(), 36);
    }

    #[test]
    fn test_hash_file_missing() {
        let err = HashAlg::Whash.hash_file("/nonexistent/ground_truth.png", 8).unwrap_err();
        assert!(matches!(err, CheckError::ImageLoad { .. }));
    }
}
