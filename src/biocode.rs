//! BioHashing：通过种子确定的随机投影把特征向量映射为定长二进制模板
//!
//! 投影矩阵的形状为 `特征长度 × biocode 长度`，元素服从标准正态分布。
//! 随机数生成器为 `Xoshiro256PlusPlus::seed_from_u64(seed)`，正态采样使用
//! `rand_distr::StandardNormal`（Ziggurat 方法），按行优先顺序取样：
//! 第 i 行（对应第 i 个特征）连续占用 `length` 个样本。
//! 矩阵不会被完整物化，而是逐行生成并累加，内存占用为 O(length)。

use std::fmt;

use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;

/// 默认 biocode 长度
pub const DEFAULT_LENGTH: usize = 1024;

/// 定长二进制模板，每个元素只可能是 0 或 1
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Biocode(Vec<u8>);

impl Biocode {
    /// 从比特序列构造，非零值视为 1
    pub fn from_bits(bits: impl IntoIterator<Item = u8>) -> Self {
        Self(bits.into_iter().map(|b| (b != 0) as u8).collect())
    }

    pub fn bits(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 定宽数字串，每个比特对应一个 `'0'` 或 `'1'`
    pub fn to_digit_string(&self) -> String {
        self.0.iter().map(|&b| if b == 1 { '1' } else { '0' }).collect()
    }

    /// 原始字节串，每个比特编码为 8 字节小端 int64
    pub fn to_le_i64_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|&b| (b as i64).to_le_bytes()).collect()
    }
}

impl fmt::Display for Biocode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_digit_string())
    }
}

/// 固定种子与长度的 biocode 生成器
#[derive(Debug, Clone, Copy)]
pub struct BiocodeGenerator {
    seed: u64,
    length: usize,
}

impl BiocodeGenerator {
    pub fn new(seed: u64, length: usize) -> Self {
        Self { seed, length }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// 特征缺失时返回 `None`
    pub fn generate(&self, features: Option<&[u8]>) -> Option<Biocode> {
        features.map(|features| generate(features, self.seed, self.length))
    }
}

/// 计算 `features · M` 并以 0 为阈值二值化，M 由 `seed` 唯一确定
pub fn generate(features: &[u8], seed: u64, length: usize) -> Biocode {
    // 每次调用都重新播种，保证结果与调用顺序无关
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut projected = Array1::<f64>::zeros(length);
    let mut row = Array1::<f64>::zeros(length);
    for &value in features {
        // 即使特征为 0 也必须消耗这一行的样本，否则后续行会错位
        row.iter_mut().for_each(|x| *x = rng.sample(StandardNormal));
        if value != 0 {
            projected.scaled_add(value as f64, &row);
        }
    }
    Biocode(projected.iter().map(|&v| (v > 0.) as u8).collect())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn sample_features() -> Vec<u8> {
        (0..256u32).map(|i| (i * 37 % 251) as u8).collect()
    }

    #[test]
    fn deterministic() {
        let features = sample_features();
        let a = generate(&features, 123, 256);
        let b = generate(&features, 123, 256);
        assert_eq!(a, b);
    }

    #[test]
    fn independent_of_call_order() {
        let features = sample_features();
        let first = generate(&features, 7, 64);
        let _ = generate(&features[..10], 99, 32);
        assert_eq!(generate(&features, 7, 64), first);
    }

    #[rstest]
    #[case(1)]
    #[case(8)]
    #[case(1024)]
    fn length_and_range(#[case] length: usize) {
        let code = generate(&sample_features(), 123, length);
        assert_eq!(code.len(), length);
        assert!(code.bits().iter().all(|&b| b == 0 || b == 1));
    }

    #[test]
    fn seed_sensitivity() {
        let features = sample_features();
        let pairs = [(1, 2), (123, 124), (42, 4242)];
        assert!(pairs.iter().any(|&(a, b)| generate(&features, a, 128) != generate(&features, b, 128)));
    }

    #[test]
    fn degenerate_features() {
        let zeros = vec![0u8; 64];
        let code = generate(&zeros, 123, 32);
        assert_eq!(code, Biocode::from_bits(vec![0; 32]));
        assert_eq!(generate(&[], 123, 16).len(), 16);
    }

    #[test]
    fn absent_features() {
        let generator = BiocodeGenerator::new(123, DEFAULT_LENGTH);
        assert!(generator.generate(None).is_none());
        let features = sample_features();
        assert_eq!(generator.generate(Some(&features)).unwrap().len(), DEFAULT_LENGTH);
    }

    #[test]
    fn serializations() {
        let code = Biocode::from_bits([1, 0, 5]);
        assert_eq!(code.bits(), &[1, 0, 1]);
        assert_eq!(code.to_digit_string(), "101");
        assert_eq!(code.to_string(), "101");
        let bytes = code.to_le_i64_bytes();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[..8], &[1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[8..16], &[0; 8]);
    }
}
