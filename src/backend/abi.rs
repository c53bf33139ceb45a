//! 合约调用所需的最小 ABI 编解码，只支持 `bytes` 与 `uint256`

use anyhow::{Context, Result, bail, ensure};
use tiny_keccak::{Hasher, Keccak};

const WORD: usize = 32;

/// 函数选择器：签名的 Keccak-256 摘要的前 4 字节
pub fn selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak::v256();
    hasher.update(signature.as_bytes());
    let mut digest = [0u8; 32];
    hasher.finalize(&mut digest);
    [digest[0], digest[1], digest[2], digest[3]]
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// 把单个 `bytes` 参数编码为 `偏移 | 长度 | 右侧补零的数据`
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let padded = data.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD * 2 + padded);
    out.extend_from_slice(&uint_word(WORD as u64));
    out.extend_from_slice(&uint_word(data.len() as u64));
    out.extend_from_slice(data);
    out.resize(WORD * 2 + padded, 0);
    out
}

/// `signature(bytes)` 调用数据
pub fn encode_bytes_call(signature: &str, data: &[u8]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode_bytes(data));
    out
}

/// `signature(uint256)` 调用数据
pub fn encode_uint_call(signature: &str, value: u64) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend_from_slice(&uint_word(value));
    out
}

fn read_word_as_usize(data: &[u8], offset: usize) -> Result<usize> {
    let word = offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| anyhow::anyhow!("返回数据过短"))?;
    ensure!(word[..WORD - 8].iter().all(|&b| b == 0), "数值超出范围");
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(buf) as usize)
}

/// 解码返回值中的单个 `bytes`
pub fn decode_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let offset = read_word_as_usize(data, 0)?;
    let len = read_word_as_usize(data, offset)?;
    let start = offset + WORD;
    match start.checked_add(len).and_then(|end| data.get(start..end)) {
        Some(bytes) => Ok(bytes.to_vec()),
        None => bail!("bytes 长度 {} 超出返回数据", len),
    }
}

/// `0x` 前缀的小写十六进制
pub fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

pub fn from_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).with_context(|| format!("非法十六进制: {}", s))
}
