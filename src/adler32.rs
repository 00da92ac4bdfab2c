const MOD_ADLER: u32 = 65521;
// Largest n such that 255n(n+1)/2 + (n+1)(MOD_ADLER-1) fits in a u32, so the sums can go that
// many bytes without a modulo
const NMAX: usize = 5552;

/// Adler-32 checksum as defined by RFC 1950
pub fn adler32(bytes: &[u8]) -> u32 {
    let mut a = 1u32;
    let mut b = 0u32;
    for chunk in bytes.chunks(NMAX) {
        for &byte in chunk {
            a += u32::from(byte);
            b += a;
        }
        a %= MOD_ADLER;
        b %= MOD_ADLER;
    }
    (b << 16) | a
}
