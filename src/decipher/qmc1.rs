//! QQ 音乐 QMC1 格式的逐字节异或解密。
//!
//! 每个字节与 128 字节密钥表中的一项异或，索引由字节位置决定。
//! 位置超过 0x7FFF 后改用 `(p % 0x7FFF) & 0x7F` 取索引，这个不对称的回绕必须原样保留。

/// QMC1 固定密钥表。
#[rustfmt::skip]
const QMC1_KEY: [u8; 128] = [
    0xc3, 0x4a, 0xd6, 0xca, 0x90, 0x67, 0xf7, 0x52,
    0xd8, 0xa1, 0x66, 0x62, 0x9f, 0x5b, 0x09, 0x00,
    0xc3, 0x5e, 0x95, 0x23, 0x9f, 0x13, 0x11, 0x7e,
    0xd8, 0x92, 0x3f, 0xbc, 0x90, 0xbb, 0x74, 0x0e,
    0xc3, 0x47, 0x74, 0x3d, 0x90, 0xaa, 0x3f, 0x51,
    0xd8, 0xf4, 0x11, 0x84, 0x9f, 0xde, 0x95, 0x1d,
    0xc3, 0xc6, 0x09, 0xd5, 0x9f, 0xfa, 0x66, 0xf9,
    0xd8, 0xf0, 0xf7, 0xa0, 0x90, 0xa1, 0xd6, 0xf3,
    0xc3, 0xf3, 0xd6, 0xa1, 0x90, 0xa0, 0xf7, 0xf0,
    0xd8, 0xf9, 0x66, 0xfa, 0x9f, 0xd5, 0x09, 0xc6,
    0xc3, 0x1d, 0x95, 0xde, 0x9f, 0x84, 0x11, 0xf4,
    0xd8, 0x51, 0x3f, 0xaa, 0x90, 0x3d, 0x74, 0x47,
    0xc3, 0x0e, 0x74, 0xbb, 0x90, 0xbc, 0x3f, 0x92,
    0xd8, 0x7e, 0x11, 0x13, 0x9f, 0x23, 0x95, 0x5e,
    0xc3, 0x00, 0x09, 0x5b, 0x9f, 0x62, 0x66, 0xa1,
    0xd8, 0x52, 0xf7, 0x67, 0x90, 0xca, 0xd6, 0x4a,
];

/// 简单寻址与回绕寻址的分界位置。
pub const WRAP_BOUNDARY: usize = 0x7FFF;

/// 计算位置 `position` 使用的密钥表索引。
#[must_use]
pub const fn key_index(position: usize) -> usize {
    if position > WRAP_BOUNDARY {
        (position % WRAP_BOUNDARY) & 0x7F
    } else {
        position & 0x7F
    }
}

/// 位置 `position` 处的密钥流字节。
#[must_use]
pub const fn keystream(position: usize) -> u8 {
    QMC1_KEY[key_index(position)]
}

/// 原地解密（异或是对合运算，加密同理）。
pub fn apply_in_place(data: &mut [u8]) {
    for (position, byte) in data.iter_mut().enumerate() {
        *byte ^= keystream(position);
    }
}

/// 解密 QMC1 数据。该格式不带压缩，输出即为文本字节。
#[must_use]
pub fn decrypt_qmc1(data: &[u8]) -> Vec<u8> {
    let mut output = data.to_vec();
    apply_in_place(&mut output);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_addressing_below_boundary() {
        for position in [0, 5, 0x7F, 0x80, 0x1234, WRAP_BOUNDARY] {
            assert_eq!(keystream(position), QMC1_KEY[position & 0x7F]);
        }
        assert_eq!(key_index(5), 5);
    }

    #[test]
    fn test_wrapped_addressing_above_boundary() {
        // 0x8000 % 0x7FFF == 1，而简单寻址会得到 0
        assert_eq!(key_index(0x8000), 1);
        assert_ne!(key_index(0x8000), 0x8000 & 0x7F);

        for position in [0x8000, 0x8001, 0xFFFE, 0x1_0000, 0x12_3456] {
            assert_eq!(
                keystream(position),
                QMC1_KEY[(position % WRAP_BOUNDARY) & 0x7F],
                "位置 {position:#x} 的密钥索引错误"
            );
        }
    }

    #[test]
    fn test_position_five_uses_index_five() {
        let plaintext = *b"[00:01]x";
        let mut ciphertext = plaintext;
        for (i, byte) in ciphertext.iter_mut().enumerate() {
            *byte ^= QMC1_KEY[i];
        }

        let decrypted = decrypt_qmc1(&ciphertext);

        assert_eq!(decrypted[5], ciphertext[5] ^ QMC1_KEY[5]);
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_round_trip_across_boundary() {
        let original: Vec<u8> = (0..0x8100u32).map(|i| (i % 251) as u8).collect();
        let mut data = original.clone();
        apply_in_place(&mut data);
        assert_ne!(data, original);
        apply_in_place(&mut data);
        assert_eq!(data, original);
    }
}
