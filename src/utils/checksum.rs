const CRC_POLYNOMIAL: u32 = 0xedb88320;
const ADLER_MODULUS: u32 = 65521;

// Largest number of bytes that can be summed before `b` may overflow a u32
const ADLER_NMAX: usize = 5552;

static CRC_TABLE: [u32; 256] = build_crc_table();

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;

    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            if c & 1 == 1 {
                c = CRC_POLYNOMIAL ^ (c >> 1);
            } else {
                c >>= 1;
            }
            k += 1;
        }
        table[n] = c;
        n += 1;
    }

    table
}

/// Feeds `buf` into a running (non-complemented) CRC register.
pub fn update_crc(crc: u32, buf: &[u8]) -> u32 {
    let mut c = crc;
    for &b in buf {
        c = CRC_TABLE[((c ^ u32::from(b)) & 0xff) as usize] ^ (c >> 8);
    }
    c
}

/// CRC-32 (ISO-HDLC) of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    update_crc(0xffffffff, data) ^ 0xffffffff
}

/// CRC-32 of several byte slices as if they were one contiguous buffer.
///
/// Chunk CRCs cover the type tag followed by the payload; this avoids
/// concatenating them into a temporary buffer.
pub fn crc32_parts(parts: &[&[u8]]) -> u32 {
    parts.iter().fold(0xffffffff, |crc, part| update_crc(crc, part)) ^ 0xffffffff
}

/// Adler-32 of `data`, as embedded at the end of a zlib stream.
pub fn adler32(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;

    // Reduction is deferred per block; results are identical to reducing per byte
    for block in data.chunks(ADLER_NMAX) {
        for &byte in block {
            a += u32::from(byte);
            b += a;
        }
        a %= ADLER_MODULUS;
        b %= ADLER_MODULUS;
    }

    (b << 16) | a
}
