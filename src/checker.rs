use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::ValueEnum;
use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{debug, info};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::CheckError;
use crate::hash::{HashAlg, ImageHash};

pub const DEFAULT_SUFFIXES: &str = "png,jpg,jpeg,gif,bmp";
pub const DEFAULT_THRESHOLD: f64 = 90.0;
pub const DEFAULT_HASH_SIZE: u32 = 8;

/// 相似度百分比的分母
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    /// 哈希十六进制字符串的长度（64 位哈希为 16），结果可能低于 0
    #[default]
    Hex,
    /// 哈希的位数，结果在 0 到 100 之间
    Bits,
}

impl Scale {
    pub fn denominator(self, hash: &ImageHash) -> usize {
        match self {
            Self::Hex => hash.hex_len(),
            Self::Bits => hash.bit_len(),
        }
    }
}

/// `100 * (1 - distance / denominator)`
pub fn similarity_percentage(distance: u32, denominator: usize) -> f64 {
    100.0 * (1.0 - distance as f64 / denominator as f64)
}

/// 按文件名后缀筛选图片，大小写不敏感
#[derive(Debug, Clone)]
pub struct SuffixFilter(Regex);

impl SuffixFilter {
    /// 多个后缀用逗号分隔，例如 `png,jpg`
    pub fn new(suffixes: &str) -> Result<Self, regex::Error> {
        let alternatives = suffixes
            .split(',')
            .map(str::trim)
            .map(|s| s.trim_start_matches('.'))
            .filter(|s| !s.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        Ok(Self(Regex::new(&format!(r"(?i)\.({})$", alternatives))?))
    }

    pub fn is_match(&self, file_name: &str) -> bool {
        self.0.is_match(file_name)
    }
}

impl Default for SuffixFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIXES).expect("default suffixes must form a valid regex")
    }
}

/// 列出目录下（不递归）所有符合后缀的图片文件，按文件名排序
pub fn list_candidate_images<P: AsRef<Path>>(
    folder: P,
    filter: &SuffixFilter,
) -> Result<Vec<PathBuf>, CheckError> {
    let folder = folder.as_ref();
    let not_found = |source: io::Error| CheckError::DirectoryNotFound {
        path: folder.to_path_buf(),
        source,
    };

    if !folder.is_dir() {
        let source = match folder.metadata() {
            Ok(_) => io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            Err(e) => e,
        };
        return Err(not_found(source));
    }

    let walker =
        WalkDir::new(folder).min_depth(1).max_depth(1).follow_links(true).sort_by_file_name();
    let mut images = vec![];
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let name = e.path().and_then(Path::file_name).map(|n| n.to_os_string());
                let name = match name {
                    Some(name) if e.depth() > 0 => name,
                    _ => return Err(not_found(e.into())),
                };
                // 目录项本身出错（如失效的符号链接）：不是图片就跳过，是图片则视为无法加载
                if !filter.is_match(&name.to_string_lossy()) {
                    debug!("跳过无法访问的文件: {}", folder.join(&name).display());
                    continue;
                }
                return Err(CheckError::ImageLoad {
                    path: folder.join(name),
                    source: image::ImageError::IoError(e.into()),
                });
            }
        };
        if entry.file_type().is_file() && filter.is_match(&entry.file_name().to_string_lossy()) {
            images.push(folder.join(entry.file_name()));
        }
    }
    Ok(images)
}

/// 单张候选图片的比对结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub path: PathBuf,
    pub distance: u32,
    pub similarity: f64,
}

/// 一次完整比对的汇总
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub reference: PathBuf,
    pub threshold: f64,
    pub results: Vec<SimilarityResult>,
    pub failed: bool,
}

impl Report {
    pub fn new(reference: PathBuf, threshold: f64) -> Self {
        Self { reference, threshold, results: vec![], failed: false }
    }

    /// 记录一个结果；一旦有结果低于阈值，`failed` 不会再被重置
    pub fn push(&mut self, result: SimilarityResult) {
        if !self.failed {
            self.failed = result.similarity < self.threshold;
        }
        self.results.push(result);
    }
}

/// 参照图与候选目录的比对器
#[derive(Clone)]
pub struct Checker {
    hash: HashAlg,
    hash_size: u32,
    scale: Scale,
    threshold: f64,
    filter: SuffixFilter,
    parallel: bool,
    progress: ProgressBar,
}

impl Checker {
    /// 计算单张图片的哈希
    pub fn compute_hash<P: AsRef<Path>>(&self, path: P) -> Result<ImageHash, CheckError> {
        let path = path.as_ref();
        let start = Instant::now();
        let hash = self.hash.hash_file(path, self.hash_size)?;
        debug!("{}: {} ({:.2}ms)", path.display(), hash, start.elapsed().as_secs_f64() * 1000.);
        Ok(hash)
    }

    pub fn list_candidate_images<P: AsRef<Path>>(
        &self,
        folder: P,
    ) -> Result<Vec<PathBuf>, CheckError> {
        list_candidate_images(folder, &self.filter)
    }

    fn score(&self, path: PathBuf, hash: &ImageHash, reference: &ImageHash) -> SimilarityResult {
        let distance = hash.distance(reference);
        let similarity = similarity_percentage(distance, self.scale.denominator(reference));
        SimilarityResult { path, distance, similarity }
    }

    /// 把目录中所有候选图片与参照图比对
    ///
    /// 每得到一个结果就立即交给 `on_result`；任何读取或解码错误都会中止整次比对
    pub fn compare<P, Q, F>(
        &self,
        folder: P,
        ground_truth: Q,
        mut on_result: F,
    ) -> Result<Report, CheckError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        F: FnMut(&SimilarityResult),
    {
        let ground_truth = ground_truth.as_ref();
        let reference = self.compute_hash(ground_truth)?;
        info!("参照图 {} 的哈希: {}", ground_truth.display(), reference);

        info!("开始扫描目录: {}", folder.as_ref().display());
        let images = self.list_candidate_images(folder)?;
        info!("扫描完成，共 {} 张图片", images.len());

        let mut report = Report::new(ground_truth.to_path_buf(), self.threshold);
        self.progress.set_length(images.len() as u64);

        if self.parallel {
            let hashes = images
                .par_iter()
                .progress_with(self.progress.clone())
                .map(|path| self.compute_hash(path))
                .collect::<Result<Vec<_>, _>>()?;
            for (path, hash) in images.into_iter().zip(hashes) {
                let result = self.score(path, &hash, &reference);
                on_result(&result);
                report.push(result);
            }
        } else {
            for path in images {
                let hash = self.compute_hash(&path)?;
                let result = self.score(path, &hash, &reference);
                self.progress.inc(1);
                on_result(&result);
                report.push(result);
            }
        }
        self.progress.finish_and_clear();

        info!(
            "比对完成，{} 张图片中有 {} 张低于 {}%",
            report.results.len(),
            report.results.iter().filter(|r| r.similarity < self.threshold).count(),
            self.threshold
        );
        Ok(report)
    }
}

pub struct CheckerBuilder {
    hash: HashAlg,
    hash_size: u32,
    scale: Scale,
    threshold: f64,
    filter: SuffixFilter,
    parallel: bool,
    progress: ProgressBar,
}

impl Default for CheckerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckerBuilder {
    pub fn new() -> Self {
        Self {
            hash: HashAlg::default(),
            hash_size: DEFAULT_HASH_SIZE,
            scale: Scale::default(),
            threshold: DEFAULT_THRESHOLD,
            filter: SuffixFilter::default(),
            parallel: false,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn hash(mut self, hash: HashAlg) -> Self {
        self.hash = hash;
        self
    }

    pub fn hash_size(mut self, hash_size: u32) -> Self {
        self.hash_size = hash_size;
        self
    }

    pub fn scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn filter(mut self, filter: SuffixFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn build(self) -> Result<Checker, CheckError> {
        if !self.hash.supports_size(self.hash_size) {
            return Err(CheckError::InvalidHashSize { alg: self.hash, size: self.hash_size });
        }
        Ok(Checker {
            hash: self.hash,
            hash_size: self.hash_size,
            scale: self.scale,
            threshold: self.threshold,
            filter: self.filter,
            parallel: self.parallel,
            progress: self.progress,
        })
    }
}
