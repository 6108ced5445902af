//! QQ 音乐 QRC 歌词使用的非标准 DES。
//!
//! **警告**：
//! 它只是结构上类似 DES 的私有分组密码。与标准的差异包括：
//!
//! - 密钥按两个小端序 32 位字读取（原 C 代码中的 `BITNUM` 宏）；
//! - PC-2 对 D 半部的取位偏移为 `pos - 27`；
//! - 初始置换与逆初始置换规则不同；
//! - S2、S4 各有一个表项与标准不同。
//!
//! 下面的所有常量都必须逐位照搬，不能替换成标准表。
//!
//! ## 致谢
//!
//! - Brad Conte 的原始 DES 实现。
//! - `LyricDecoder` 项目针对 QQ 音乐的改编。
//!
//! - Copyright (c) `SuJiKiNen` (`LyricDecoder` Project)
//! - Licensed under the MIT License.
//!
//! <https://github.com/SuJiKiNen/LyricDecoder>

use std::sync::LazyLock;

use super::{BLOCK_SIZE, Mode, ROUNDS, RoundKeys};

#[rustfmt::skip]
const SBOX1: [u8; 64] = [
    14,  4, 13,  1,  2, 15, 11,  8,  3, 10,  6, 12,  5,  9,  0,  7,
     0, 15,  7,  4, 14,  2, 13,  1, 10,  6, 12, 11,  9,  5,  3,  8,
     4,  1, 14,  8, 13,  6,  2, 11, 15, 12,  9,  7,  3, 10,  5,  0,
    15, 12,  8,  2,  4,  9,  1,  7,  5, 11,  3, 14, 10,  0,  6, 13,
];

// 第 2 行第 8 项为 15（标准为 14）
#[rustfmt::skip]
const SBOX2: [u8; 64] = [
    15,  1,  8, 14,  6, 11,  3,  4,  9,  7,  2, 13, 12,  0,  5, 10,
     3, 13,  4,  7, 15,  2,  8, 15, 12,  0,  1, 10,  6,  9, 11,  5,
     0, 14,  7, 11, 10,  4, 13,  1,  5,  8, 12,  6,  9,  3,  2, 15,
    13,  8, 10,  1,  3, 15,  4,  2, 11,  6,  7, 12,  0,  5, 14,  9,
];

#[rustfmt::skip]
const SBOX3: [u8; 64] = [
    10,  0,  9, 14,  6,  3, 15,  5,  1, 13, 12,  7, 11,  4,  2,  8,
    13,  7,  0,  9,  3,  4,  6, 10,  2,  8,  5, 14, 12, 11, 15,  1,
    13,  6,  4,  9,  8, 15,  3,  0, 11,  1,  2, 12,  5, 10, 14,  7,
     1, 10, 13,  0,  6,  9,  8,  7,  4, 15, 14,  3, 11,  5,  2, 12,
];

// 第 4 行第 6 项为 10（标准为 1）
#[rustfmt::skip]
const SBOX4: [u8; 64] = [
     7, 13, 14,  3,  0,  6,  9, 10,  1,  2,  8,  5, 11, 12,  4, 15,
    13,  8, 11,  5,  6, 15,  0,  3,  4,  7,  2, 12,  1, 10, 14,  9,
    10,  6,  9,  0, 12, 11,  7, 13, 15,  1,  3, 14,  5,  2,  8,  4,
     3, 15,  0,  6, 10, 10, 13,  8,  9,  4,  5, 11, 12,  7,  2, 14,
];

#[rustfmt::skip]
const SBOX5: [u8; 64] = [
     2, 12,  4,  1,  7, 10, 11,  6,  8,  5,  3, 15, 13,  0, 14,  9,
    14, 11,  2, 12,  4,  7, 13,  1,  5,  0, 15, 10,  3,  9,  8,  6,
     4,  2,  1, 11, 10, 13,  7,  8, 15,  9, 12,  5,  6,  3,  0, 14,
    11,  8, 12,  7,  1, 14,  2, 13,  6, 15,  0,  9, 10,  4,  5,  3,
];

#[rustfmt::skip]
const SBOX6: [u8; 64] = [
    12,  1, 10, 15,  9,  2,  6,  8,  0, 13,  3,  4, 14,  7,  5, 11,
    10, 15,  4,  2,  7, 12,  9,  5,  6,  1, 13, 14,  0, 11,  3,  8,
     9, 14, 15,  5,  2,  8, 12,  3,  7,  0,  4, 10,  1, 13, 11,  6,
     4,  3,  2, 12,  9,  5, 15, 10, 11, 14,  1,  7,  6,  0,  8, 13,
];

#[rustfmt::skip]
const SBOX7: [u8; 64] = [
     4, 11,  2, 14, 15,  0,  8, 13,  3, 12,  9,  7,  5, 10,  6,  1,
    13,  0, 11,  7,  4,  9,  1, 10, 14,  3,  5, 12,  2, 15,  8,  6,
     1,  4, 11, 13, 12,  3,  7, 14, 10, 15,  6,  8,  0,  5,  9,  2,
     6, 11, 13,  8,  1,  4, 10,  7,  9,  5,  0, 15, 14,  2,  3, 12,
];

#[rustfmt::skip]
const SBOX8: [u8; 64] = [
    13,  2,  8,  4,  6, 15, 11,  1, 10,  9,  3, 14,  5,  0, 12,  7,
     1, 15, 13,  8, 10,  3,  7,  4, 12,  5,  6, 11,  0, 14,  9,  2,
     7, 11,  4,  1,  9, 12, 14,  2,  0,  6, 10, 13, 15,  3,  5,  8,
     2,  1, 14,  7,  4, 10,  8, 13, 15, 12,  9,  0,  3,  5,  6, 11,
];

const S_BOXES: [[u8; 64]; 8] = [SBOX1, SBOX2, SBOX3, SBOX4, SBOX5, SBOX6, SBOX7, SBOX8];

#[rustfmt::skip]
const P_BOX: [u8; 32] = [
    16,  7, 20, 21, 29, 12, 28, 17,
     1, 15, 23, 26,  5, 18, 31, 10,
     2,  8, 24, 14, 32, 27,  3,  9,
    19, 13, 30,  6, 22, 11,  4, 25,
];

#[rustfmt::skip]
const E_BOX: [u8; 48] = [
    32,  1,  2,  3,  4,  5,
     4,  5,  6,  7,  8,  9,
     8,  9, 10, 11, 12, 13,
    12, 13, 14, 15, 16, 17,
    16, 17, 18, 19, 20, 21,
    20, 21, 22, 23, 24, 25,
    24, 25, 26, 27, 28, 29,
    28, 29, 30, 31, 32,  1,
];

#[rustfmt::skip]
const KEY_RND_SHIFT: [u32; ROUNDS] = [
    1, 1, 2, 2, 2, 2, 2, 2,
    1, 2, 2, 2, 2, 2, 2, 1,
];

/// PC-1 的 C 半部，0-based 位序号。
#[rustfmt::skip]
const KEY_PERM_C: [usize; 28] = [
    56, 48, 40, 32, 24, 16,  8,
     0, 57, 49, 41, 33, 25, 17,
     9,  1, 58, 50, 42, 34, 26,
    18, 10,  2, 59, 51, 43, 35,
];

/// PC-1 的 D 半部，0-based 位序号。
#[rustfmt::skip]
const KEY_PERM_D: [usize; 28] = [
    62, 54, 46, 38, 30, 22, 14,
     6, 61, 53, 45, 37, 29, 21,
    13,  5, 60, 52, 44, 36, 28,
    20, 12,  4, 27, 19, 11,  3,
];

/// PC-2，0-based 位序号。
#[rustfmt::skip]
const KEY_COMPRESSION: [usize; 48] = [
    13, 16, 10, 23,  0,  4,  2, 27,
    14,  5, 20,  9, 22, 18, 11,  3,
    25,  7, 15,  6, 26, 19, 12,  1,
    40, 51, 30, 36, 46, 54, 29, 39,
    50, 44, 32, 47, 43, 48, 38, 55,
    33, 52, 45, 41, 49, 35, 28, 31,
];

#[rustfmt::skip]
const IP_RULE: [u8; 64] = [
    34, 42, 50, 58, 2, 10, 18, 26,
    36, 44, 52, 60, 4, 12, 20, 28,
    38, 46, 54, 62, 6, 14, 22, 30,
    40, 48, 56, 64, 8, 16, 24, 32,
    33, 41, 49, 57, 1,  9, 17, 25,
    35, 43, 51, 59, 3, 11, 19, 27,
    37, 45, 53, 61, 5, 13, 21, 29,
    39, 47, 55, 63, 7, 15, 23, 31,
];

#[rustfmt::skip]
const INV_IP_RULE: [u8; 64] = [
    37, 5, 45, 13, 53, 21, 61, 29,
    38, 6, 46, 14, 54, 22, 62, 30,
    39, 7, 47, 15, 55, 23, 63, 31,
    40, 8, 48, 16, 56, 24, 64, 32,
    33, 1, 41,  9, 49, 17, 57, 25,
    34, 2, 42, 10, 50, 18, 58, 26,
    35, 3, 43, 11, 51, 19, 59, 27,
    36, 4, 44, 12, 52, 20, 60, 28,
];

/// 预计算的查找表：S 盒与 P 盒合并、按字节展开的 IP 与逆 IP。
///
/// 只依赖上面的常量，生成后只读。
struct Tables {
    sp: [[u32; 64]; 8],
    ip: [[(u32, u32); 256]; 8],
    inv_ip: [[u64; 256]; 8],
}

static TABLES: LazyLock<Tables> = LazyLock::new(Tables::build);

impl Tables {
    #[allow(clippy::cast_possible_truncation)]
    fn build() -> Self {
        let mut sp = [[0u32; 64]; 8];
        for (s_idx, s_box) in S_BOXES.iter().enumerate() {
            for (input, slot) in sp[s_idx].iter_mut().enumerate() {
                let nibble = s_box[sbox_index(input as u8)];
                *slot = p_box_permute(u32::from(nibble) << (28 - s_idx * 4));
            }
        }

        let mut ip = [[(0, 0); 256]; 8];
        for (byte_pos, row) in ip.iter_mut().enumerate() {
            for (value, slot) in row.iter_mut().enumerate() {
                let mut input = [0u8; 8];
                input[byte_pos] = value as u8;
                let permuted = permute_bytes(input, &IP_RULE);
                *slot = ((permuted >> 32) as u32, permuted as u32);
            }
        }

        let mut inv_ip = [[0u64; 256]; 8];
        for (byte_pos, row) in inv_ip.iter_mut().enumerate() {
            for (value, slot) in row.iter_mut().enumerate() {
                let input = ((value as u64) << (56 - byte_pos * 8)).to_be_bytes();
                *slot = permute_bytes(input, &INV_IP_RULE);
            }
        }

        Self { sp, ip, inv_ip }
    }
}

/// 按 1-based 规则对 8 字节输入做 64 位置换。
fn permute_bytes(input: [u8; 8], rule: &[u8; 64]) -> u64 {
    rule.iter().enumerate().fold(0u64, |acc, (i, &src)| {
        let bit_index = usize::from(src) - 1;
        let bit = (input[bit_index / 8] >> (7 - bit_index % 8)) & 1;
        acc | (u64::from(bit) << (63 - i))
    })
}

fn p_box_permute(input: u32) -> u32 {
    P_BOX.iter().enumerate().fold(0u32, |acc, (dest, &src)| {
        if input & (1u32 << (32 - u32::from(src))) != 0 {
            acc | (1u32 << (31 - dest))
        } else {
            acc
        }
    })
}

/// 6 位输入的 b5、b0 为行号，b4..b1 为列号。
const fn sbox_index(a: u8) -> usize {
    ((a & 0x20) | ((a & 0x1f) >> 1) | ((a & 0x01) << 4)) as usize
}

/// 对存放在 u32 高 28 位的半密钥循环左移。
const fn rotate_high_28(value: u32, amount: u32) -> u32 {
    ((value << amount) | (value >> (28 - amount))) & 0xFFFF_FFF0
}

/// 按 `BITNUM` 规则从密钥中取位：密钥被视为两个小端序的 32 位字。
///
/// 例如第 0 位实际是 `key[3]` 的最高位，第 31 位是 `key[0]` 的最低位。
fn key_bits(key: &[u8; 8], table: &[usize]) -> u64 {
    let width = table.len();
    table.iter().enumerate().fold(0u64, |acc, (i, &pos)| {
        let in_word = pos % 32;
        let byte_index = (pos / 32) * 4 + (3 - in_word / 8);
        let bit = (key[byte_index] >> (7 - in_word % 8)) & 1;
        acc | (u64::from(bit) << (width - 1 - i))
    })
}

fn expand(input: u32) -> u64 {
    E_BOX.iter().enumerate().fold(0u64, |acc, (i, &src)| {
        let bit = (input >> (32 - u32::from(src))) & 1;
        acc | (u64::from(bit) << (47 - i))
    })
}

#[allow(clippy::cast_possible_truncation)]
pub(super) fn key_schedule(key: &[u8; 8], mode: Mode) -> RoundKeys {
    // 28 位结果左移 4 位，与 rotate_high_28 的高位对齐一致
    let mut c = (key_bits(key, &KEY_PERM_C) as u32) << 4;
    let mut d = (key_bits(key, &KEY_PERM_D) as u32) << 4;

    let mut round_keys: RoundKeys = [[0; 6]; ROUNDS];
    for (i, &shift) in KEY_RND_SHIFT.iter().enumerate() {
        c = rotate_high_28(c, shift);
        d = rotate_high_28(d, shift);

        let subkey = KEY_COMPRESSION
            .iter()
            .enumerate()
            .fold(0u64, |acc, (k, &pos)| {
                let bit = if pos < 28 {
                    (c >> (31 - pos)) & 1
                } else {
                    (d >> (31 - (pos - 27))) & 1
                };
                acc | (u64::from(bit) << (47 - k))
            });

        let slot = match mode {
            Mode::Encrypt => i,
            Mode::Decrypt => ROUNDS - 1 - i,
        };
        round_keys[slot].copy_from_slice(&subkey.to_be_bytes()[2..]);
    }
    round_keys
}

#[rustfmt::skip]
fn round_function(state: u32, subkey: &[u8; 6]) -> u32 {
    let key = u64::from_be_bytes([
        0, 0, subkey[0], subkey[1], subkey[2], subkey[3], subkey[4], subkey[5],
    ]);
    let x = expand(state) ^ key;
    let sp = &TABLES.sp;

    sp[0][((x >> 42) & 0x3F) as usize]
        | sp[1][((x >> 36) & 0x3F) as usize]
        | sp[2][((x >> 30) & 0x3F) as usize]
        | sp[3][((x >> 24) & 0x3F) as usize]
        | sp[4][((x >> 18) & 0x3F) as usize]
        | sp[5][((x >> 12) & 0x3F) as usize]
        | sp[6][((x >>  6) & 0x3F) as usize]
        | sp[7][( x        & 0x3F) as usize]
}

fn initial_permutation(block: &[u8; BLOCK_SIZE]) -> (u32, u32) {
    TABLES
        .ip
        .iter()
        .zip(block)
        .fold((0, 0), |(left, right), (row, &byte)| {
            let (l, r) = row[usize::from(byte)];
            (left | l, right | r)
        })
}

fn inverse_permutation(left: u32, right: u32) -> [u8; BLOCK_SIZE] {
    let result = TABLES
        .inv_ip
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, row)| {
            let half = if i < 4 { left } else { right };
            let byte = (half >> (24 - (i % 4) * 8)) & 0xFF;
            acc | row[byte as usize]
        });
    result.to_be_bytes()
}

pub(super) fn crypt_block(block: &[u8; BLOCK_SIZE], round_keys: &RoundKeys) -> [u8; BLOCK_SIZE] {
    let (mut left, mut right) = initial_permutation(block);

    for subkey in &round_keys[..ROUNDS - 1] {
        let next = left ^ round_function(right, subkey);
        left = right;
        right = next;
    }

    // 第 16 轮不交换：L16 = R15，R16 = L15 ^ f(R15, K16)，结果留在左半
    left ^= round_function(right, &round_keys[ROUNDS - 1]);

    inverse_permutation(left, right)
}
