//! 位级 DES / TripleDES 分组密码引擎。
//!
//! 提供两种变体：
//!
//! - [`DesVariant::Standard`]：FIPS 46-3 所定义的标准 DES。
//! - [`DesVariant::QqMusic`]：QQ 音乐 QRC 歌词使用的私有变体，置换表、S 盒
//!   与密钥字节序都和标准不同，只能逐位照搬。
//!
//! 引擎只处理 8 字节的分组，不做任何填充。
//! 本实现仅用于解密歌词，不应用于实际安全目的。

use dashmap::DashMap;
use tracing::trace;

use crate::error::CipherError;

mod qq;
mod standard;

/// 单个分组的字节数。
pub const BLOCK_SIZE: usize = 8;
/// 轮数。
pub const ROUNDS: usize = 16;
/// 每个轮密钥的字节数（48 位）。
pub const SUB_KEY_SIZE: usize = 6;

/// 16 个 48 位轮密钥。
pub type RoundKeys = [[u8; SUB_KEY_SIZE]; ROUNDS];

/// 密钥调度方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// 加密
    Encrypt,
    /// 解密
    Decrypt,
}

impl Mode {
    /// 返回相反的方向。
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Encrypt => Self::Decrypt,
            Self::Decrypt => Self::Encrypt,
        }
    }
}

/// DES 算法变体。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DesVariant {
    /// 标准 DES。
    Standard,
    /// QQ 音乐的非标准 DES。
    #[default]
    QqMusic,
}

/// 由 (变体, 密钥, 方向) 唯一确定的轮密钥表。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySchedule {
    variant: DesVariant,
    round_keys: RoundKeys,
}

impl KeySchedule {
    /// 生成该调度所属的算法变体。
    #[must_use]
    pub const fn variant(&self) -> DesVariant {
        self.variant
    }

    /// 按使用顺序排列的 16 个轮密钥。
    #[must_use]
    pub const fn round_keys(&self) -> &RoundKeys {
        &self.round_keys
    }
}

/// 单倍或三倍长度的 DES 密钥。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherKey {
    /// 8 字节单 DES 密钥。
    Single([u8; 8]),
    /// 24 字节 TripleDES 密钥，依次为 K1、K2、K3。
    Triple([u8; 24]),
}

impl TryFrom<&[u8]> for CipherKey {
    type Error = CipherError;

    fn try_from(key: &[u8]) -> Result<Self, Self::Error> {
        if let Ok(single) = <[u8; 8]>::try_from(key) {
            Ok(Self::Single(single))
        } else if let Ok(triple) = <[u8; 24]>::try_from(key) {
            Ok(Self::Triple(triple))
        } else {
            Err(CipherError::InvalidKeyLength(key.len()))
        }
    }
}

/// 从 8 字节密钥派生轮密钥表。
///
/// 纯函数：相同的输入总是得到相同的轮密钥。
#[must_use]
pub fn key_schedule(variant: DesVariant, key: &[u8; 8], mode: Mode) -> KeySchedule {
    let round_keys = match variant {
        DesVariant::Standard => standard::key_schedule(key, mode),
        DesVariant::QqMusic => qq::key_schedule(key, mode),
    };
    KeySchedule {
        variant,
        round_keys,
    }
}

/// 使用给定轮密钥表加密或解密单个分组。
///
/// 方向完全由轮密钥表决定。
#[must_use]
pub fn crypt_block(block: &[u8; BLOCK_SIZE], schedule: &KeySchedule) -> [u8; BLOCK_SIZE] {
    match schedule.variant {
        DesVariant::Standard => standard::crypt_block(block, &schedule.round_keys),
        DesVariant::QqMusic => qq::crypt_block(block, &schedule.round_keys),
    }
}

/// 带有轮密钥缓存的 DES 引擎。
///
/// 每个 (密钥, 方向) 组合的轮密钥只计算一次。
/// 新建的引擎缓存为空，不同引擎之间互不影响。
#[derive(Debug, Default)]
pub struct DesEngine {
    variant: DesVariant,
    schedules: DashMap<([u8; 8], Mode), KeySchedule>,
}

impl DesEngine {
    /// 创建一个指定变体的引擎。
    #[must_use]
    pub fn new(variant: DesVariant) -> Self {
        Self {
            variant,
            schedules: DashMap::new(),
        }
    }

    /// 引擎使用的算法变体。
    #[must_use]
    pub const fn variant(&self) -> DesVariant {
        self.variant
    }

    /// 当前已缓存的轮密钥表数量。
    #[must_use]
    pub fn cached_schedules(&self) -> usize {
        self.schedules.len()
    }

    /// 获取（必要时计算并缓存）轮密钥表。
    pub fn schedule(&self, key: &[u8; 8], mode: Mode) -> KeySchedule {
        *self
            .schedules
            .entry((*key, mode))
            .or_insert_with(|| {
                trace!(?mode, variant = ?self.variant, "生成新的轮密钥表");
                key_schedule(self.variant, key, mode)
            })
            .value()
    }

    /// 单 DES 处理一个分组。
    pub fn crypt_block(&self, key: &[u8; 8], block: &[u8; BLOCK_SIZE], mode: Mode) -> [u8; 8] {
        crypt_block(block, &self.schedule(key, mode))
    }

    /// TripleDES 处理一个分组。
    ///
    /// 加密为 E(K1) -> D(K2) -> E(K3)，解密为 D(K3) -> E(K2) -> D(K1)。
    pub fn triple_crypt_block(
        &self,
        key: &[u8; 24],
        block: &[u8; BLOCK_SIZE],
        mode: Mode,
    ) -> [u8; BLOCK_SIZE] {
        let (k1, k2, k3) = split_triple_key(key);
        let order = match mode {
            Mode::Encrypt => [k1, k2, k3],
            Mode::Decrypt => [k3, k2, k1],
        };

        let first = self.crypt_block(&order[0], block, mode);
        let second = self.crypt_block(&order[1], &first, mode.inverse());
        self.crypt_block(&order[2], &second, mode)
    }

    /// 按密钥长度选择单 DES 或 TripleDES 处理一个分组。
    pub fn crypt_block_with(
        &self,
        key: &CipherKey,
        block: &[u8; BLOCK_SIZE],
        mode: Mode,
    ) -> [u8; BLOCK_SIZE] {
        match key {
            CipherKey::Single(k) => self.crypt_block(k, block, mode),
            CipherKey::Triple(k) => self.triple_crypt_block(k, block, mode),
        }
    }
}

fn split_triple_key(key: &[u8; 24]) -> ([u8; 8], [u8; 8], [u8; 8]) {
    let mut k1 = [0u8; 8];
    let mut k2 = [0u8; 8];
    let mut k3 = [0u8; 8];
    k1.copy_from_slice(&key[..8]);
    k2.copy_from_slice(&key[8..16]);
    k3.copy_from_slice(&key[16..]);
    (k1, k2, k3)
}
