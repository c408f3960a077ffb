/// 计算两个等长比特串的汉明距离
///
/// 按 8 字节一组做异或计数，剩余的尾部逐字节处理
#[inline(always)]
pub fn hamming(va: &[u8], vb: &[u8]) -> u32 {
    assert_eq!(va.len(), vb.len(), "hash length mismatch");
    let (ca, cb) = (va.chunks_exact(8), vb.chunks_exact(8));
    let tail = hamming_naive(ca.remainder(), cb.remainder());
    ca.zip(cb).fold(tail, |sum, (a, b)| sum + hamming_64(to_u64(a), to_u64(b)))
}

#[inline(always)]
pub fn hamming_naive(va: &[u8], vb: &[u8]) -> u32 {
    va.iter().zip(vb).map(|(a, b)| (a ^ b).count_ones()).sum()
}

#[inline(always)]
pub fn hamming_64(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

#[inline(always)]
fn to_u64(chunk: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(chunk);
    u64::from_ne_bytes(buf)
}
