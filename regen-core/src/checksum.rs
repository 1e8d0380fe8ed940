/// Fletcher-16 over a byte block.
///
/// Two accumulators reduced modulo 255; `sum2` lands in the high byte and
/// `sum1` in the low byte. An empty block checksums to 0.
pub fn fletcher16(data: &[u8]) -> u16 {
    let mut sum1: u16 = 0;
    let mut sum2: u16 = 0;
    for &b in data {
        sum1 = (sum1 + u16::from(b)) % 255;
        sum2 = (sum2 + sum1) % 255;
    }
    (sum2 << 8) | sum1
}
