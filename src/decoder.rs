//! 歌词字段的解码回退编排。
//!
//! 一个提供商响应可能给出多个候选字段（例如十六进制的加密 `qrc` 与 Base64 的 `lyric`）。
//! 对每个字段依次尝试：
//!
//! 1. 提供商专用的解密适配器；
//! 2. 通用解压（zlib，然后是 raw deflate）；
//! 3. 直接文本解码（UTF-8，然后 GBK），并要求文本“像歌词”。
//!
//! 第一个成功的字段胜出，之后的字段与策略都不再尝试。

use base64::{Engine as _, engine::general_purpose};
use strum_macros::Display;
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::{
    converter,
    crypto::des::DesEngine,
    decipher::{
        inflate, krc, qmc1,
        qrc::{self, QrcCodec},
        text::{decode_text, looks_like_lyrics},
    },
    error::{CipherError, LyricsCodecError, Result},
    model::{
        lyric::{CanonicalLyricDocument, LyricMarkup, LyricsType},
        provider::ProviderId,
    },
};

/// 原始字段数据的编码方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FieldEncoding {
    /// 十六进制文本
    Hex,
    /// 标准 Base64 文本
    Base64,
    /// 原始字节
    Binary,
    /// 已经是文本
    Text,
    /// 依次尝试十六进制、Base64，都不合法时按原始字节处理
    Auto,
}

/// 提供商响应中的一个候选歌词字段。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    /// 字段名，用于结果溯源。
    pub name: String,
    /// 数据编码方式。
    pub encoding: FieldEncoding,
    /// 字段内容。
    pub data: Vec<u8>,
}

impl RawField {
    /// 通用构造函数。
    pub fn new(name: impl Into<String>, encoding: FieldEncoding, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            encoding,
            data: data.into(),
        }
    }

    /// 十六进制字段。
    pub fn hex(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(name, FieldEncoding::Hex, data.into())
    }

    /// Base64 字段。
    pub fn base64(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(name, FieldEncoding::Base64, data.into())
    }

    /// 原始字节字段。
    pub fn binary(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(name, FieldEncoding::Binary, data)
    }

    /// 文本字段。
    pub fn text(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(name, FieldEncoding::Text, data.into())
    }

    /// 编码未知的字段。
    pub fn auto(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(name, FieldEncoding::Auto, data)
    }

    /// 按编码方式还原出待解码的字节。
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, CipherError> {
        match self.encoding {
            FieldEncoding::Hex => {
                hex::decode(self.data.trim_ascii()).map_err(|e| CipherError::Hex(e.to_string()))
            }
            FieldEncoding::Base64 => general_purpose::STANDARD
                .decode(self.data.trim_ascii())
                .map_err(|e| CipherError::Base64(e.to_string())),
            FieldEncoding::Binary | FieldEncoding::Text => Ok(self.data.clone()),
            FieldEncoding::Auto => {
                let trimmed = self.data.trim_ascii();
                let looks_hex = !trimmed.is_empty()
                    && trimmed.len() % 2 == 0
                    && trimmed.iter().all(u8::is_ascii_hexdigit);
                if looks_hex && let Ok(bytes) = hex::decode(trimmed) {
                    return Ok(bytes);
                }
                if let Ok(bytes) = general_purpose::STANDARD.decode(trimmed) {
                    return Ok(bytes);
                }
                Ok(self.data.clone())
            }
        }
    }
}

/// 单个解码策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DecodeStrategy {
    /// 还原字段字节（十六进制 / Base64）。
    #[strum(serialize = "field")]
    FieldEncoding,
    /// QQ 音乐 QRC: TripleDES + zlib。
    #[strum(serialize = "qrc")]
    Qrc,
    /// QMC1 位置异或。
    #[strum(serialize = "qmc1")]
    Qmc1,
    /// 酷狗 KRC: 跳过头部异或 + zlib。
    #[strum(serialize = "krc")]
    Krc,
    /// 通用解压。
    #[strum(serialize = "decompress")]
    Decompress,
    /// 直接按文本解码。
    #[strum(serialize = "text")]
    DirectText,
}

impl DecodeStrategy {
    /// 提供商对应的策略顺序。
    #[must_use]
    pub fn chain_for(provider: ProviderId) -> &'static [Self] {
        match provider {
            ProviderId::Qq => &[Self::Qrc, Self::Decompress, Self::DirectText],
            ProviderId::Qmc1 => &[Self::Qmc1, Self::Decompress, Self::DirectText],
            ProviderId::Kugou => &[Self::Krc, Self::Decompress, Self::DirectText],
            ProviderId::Netease => &[Self::Decompress, Self::DirectText],
        }
    }
}

/// 单个策略失败的原因。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// 解密适配器拒绝了输入
    #[error(transparent)]
    Cipher(#[from] CipherError),
    /// 字节既不是合法的 UTF-8 也不是合法的 GBK
    #[error("无法解码为文本")]
    NotText,
    /// 文本不像带时间标签的歌词
    #[error("文本不像歌词")]
    NotLyrics,
    /// 解码结果为空
    #[error("解码结果为空")]
    Empty,
    /// 缺少容器头部
    #[error("缺少 {0} 头部")]
    MissingHeader(&'static str),
}

/// 一次成功解码得到的文本。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// 解码出的歌词文本。
    pub text: String,
    /// 检测到的标记格式。
    pub markup: LyricMarkup,
}

impl DecodedText {
    fn new(text: String) -> std::result::Result<Self, DecodeError> {
        if text.trim().is_empty() {
            return Err(DecodeError::Empty);
        }
        let markup = converter::detect_markup(&text);
        Ok(Self { text, markup })
    }
}

/// 对某个字段执行某个策略的记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeAttempt {
    /// 字段名。
    pub field: String,
    /// 使用的策略。
    pub strategy: DecodeStrategy,
    /// 结果。
    pub outcome: std::result::Result<DecodedText, DecodeError>,
}

impl DecodeAttempt {
    /// 该次尝试是否成功。
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// 一组字段的完整解码记录。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// 按执行顺序排列的所有尝试。
    pub attempts: Vec<DecodeAttempt>,
}

impl DecodeReport {
    /// 第一个（也是唯一一个）成功的尝试。
    #[must_use]
    pub fn success(&self) -> Option<&DecodeAttempt> {
        self.attempts.iter().find(|attempt| attempt.is_success())
    }

    /// 所有字段、所有策略都失败。
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.success().is_none()
    }
}

/// 解码并规范化后的歌词，以及它的来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLyrics {
    /// 歌词来源提供商。
    pub provider: ProviderId,
    /// 产生结果的字段名。
    pub field: String,
    /// 产生结果的策略。
    pub strategy: DecodeStrategy,
    /// 解码出的原始文本。
    pub text: String,
    /// 原始文本的标记格式。
    pub markup: LyricMarkup,
    /// 规范化文档。
    pub document: CanonicalLyricDocument,
}

impl DecodedLyrics {
    /// 歌词的时间粒度。
    #[must_use]
    pub fn lyrics_type(&self) -> LyricsType {
        self.document.lyrics_type()
    }
}

/// 解码回退编排器。
///
/// 持有一个 QRC 编解码器（及其轮密钥缓存），其余策略都是无状态的纯函数。
#[derive(Debug, Default)]
pub struct DecodeOrchestrator {
    qrc: QrcCodec,
}

impl DecodeOrchestrator {
    /// 创建一个使用全新 DES 引擎的编排器。
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用外部提供的 DES 引擎。
    #[must_use]
    pub fn with_engine(engine: DesEngine) -> Self {
        Self {
            qrc: QrcCodec::with_engine(engine),
        }
    }

    /// 执行单个策略。
    pub fn run_strategy(
        &self,
        strategy: DecodeStrategy,
        bytes: &[u8],
    ) -> std::result::Result<DecodedText, DecodeError> {
        match strategy {
            DecodeStrategy::FieldEncoding => to_text(bytes).and_then(DecodedText::new),
            DecodeStrategy::Qrc => {
                let plain = self.qrc.decrypt_bytes(bytes)?;
                let text = to_text(&plain)?;
                DecodedText::new(qrc::extract_lyric_content(&text))
            }
            DecodeStrategy::Qmc1 => {
                let text = to_text(&qmc1::decrypt_qmc1(bytes))?;
                gated(text)
            }
            DecodeStrategy::Krc => {
                if !bytes.starts_with(krc::KRC_MAGIC) {
                    return Err(DecodeError::MissingHeader("krc1"));
                }
                match krc::open_krc_container(bytes)? {
                    krc::KrcPayload::Inflated(plain) => DecodedText::new(to_text(&plain)?),
                    krc::KrcPayload::Xored(plain) => gated(to_text(&plain)?),
                }
            }
            DecodeStrategy::Decompress => decompress(bytes),
            DecodeStrategy::DirectText => gated(to_text(bytes)?),
        }
    }

    /// 依次尝试所有字段，返回完整的尝试记录。
    #[instrument(skip(self, fields), fields(provider = %provider, field_count = fields.len()))]
    pub fn decode_fields(&self, provider: ProviderId, fields: &[RawField]) -> DecodeReport {
        let mut report = DecodeReport::default();

        for field in fields {
            let bytes = match field.to_bytes() {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(field = %field.name, "字段无法按 {} 还原: {e}", field.encoding);
                    report.attempts.push(DecodeAttempt {
                        field: field.name.clone(),
                        strategy: DecodeStrategy::FieldEncoding,
                        outcome: Err(e.into()),
                    });
                    continue;
                }
            };

            for &strategy in DecodeStrategy::chain_for(provider) {
                let outcome = self.run_strategy(strategy, &bytes);
                match &outcome {
                    Ok(decoded) => trace!(
                        field = %field.name,
                        %strategy,
                        markup = %decoded.markup,
                        "解码成功"
                    ),
                    Err(e) => trace!(field = %field.name, %strategy, "解码失败: {e}"),
                }

                let succeeded = outcome.is_ok();
                report.attempts.push(DecodeAttempt {
                    field: field.name.clone(),
                    strategy,
                    outcome,
                });
                if succeeded {
                    return report;
                }
            }
        }

        debug!("所有字段的所有解码策略均失败");
        report
    }

    /// 解码一组字段并规范化，返回带来源信息的结果。
    ///
    /// # 错误
    ///
    /// 没有任何字段解码成功时返回 [`LyricsCodecError::DecodeFailure`]。
    pub fn decode_lyric_fields(
        &self,
        provider: ProviderId,
        fields: &[RawField],
    ) -> Result<DecodedLyrics> {
        let report = self.decode_fields(provider, fields);
        let Some(attempt) = report.attempts.into_iter().find(DecodeAttempt::is_success) else {
            return Err(LyricsCodecError::DecodeFailure(format!(
                "{provider} 的 {} 个字段均未解出歌词",
                fields.len()
            )));
        };

        let DecodeAttempt {
            field,
            strategy,
            outcome,
        } = attempt;
        let decoded = outcome.map_err(|e| LyricsCodecError::DecodeFailure(e.to_string()))?;

        let document = converter::parse_as(&decoded.text, decoded.markup)
            .map_err(|e| LyricsCodecError::DecodeFailure(format!("歌词规范化失败: {e}")))?
            .into_document();

        Ok(DecodedLyrics {
            provider,
            field,
            strategy,
            text: decoded.text,
            markup: decoded.markup,
            document,
        })
    }

    /// 解码单个字段并规范化。
    pub fn decode_lyric_field(
        &self,
        provider: ProviderId,
        field: &RawField,
    ) -> Result<CanonicalLyricDocument> {
        self.decode_lyric_fields(provider, std::slice::from_ref(field))
            .map(|decoded| decoded.document)
    }
}

fn to_text(bytes: &[u8]) -> std::result::Result<String, DecodeError> {
    decode_text(bytes).ok_or(DecodeError::NotText)
}

/// 文本要么通过歌词形状检查，要么能被识别为 `[start,duration]` 形式的时间标签。
fn gated(text: String) -> std::result::Result<DecodedText, DecodeError> {
    let shaped = looks_like_lyrics(&text);
    let decoded = DecodedText::new(text)?;
    let bracket_timed = matches!(
        decoded.markup,
        LyricMarkup::WordTagged | LyricMarkup::LineTagged | LyricMarkup::Yrc
    );
    if shaped || bracket_timed {
        Ok(decoded)
    } else {
        Err(DecodeError::NotLyrics)
    }
}

/// zlib 带有头部与校验和，可以直接信任；raw deflate 没有，解出的文本还要通过歌词形状检查。
fn decompress(bytes: &[u8]) -> std::result::Result<DecodedText, DecodeError> {
    match inflate::inflate_zlib(bytes) {
        Ok(plain) => DecodedText::new(to_text(&plain)?),
        Err(zlib_err) => {
            let plain = inflate::inflate_raw(bytes).map_err(|_| zlib_err)?;
            gated(to_text(&plain)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decipher::krc::encrypt_krc_bytes;

    const ENCRYPTED_HEX_STRING: &str = include_str!("../tests/test_data/qrc_sample.hex");

    #[test]
    fn test_qrc_field_is_decoded_and_normalized() {
        let orchestrator = DecodeOrchestrator::new();
        let decoded = orchestrator
            .decode_lyric_fields(ProviderId::Qq, &[RawField::hex("qrc", ENCRYPTED_HEX_STRING)])
            .expect("QRC 字段应能解码");

        assert_eq!(decoded.strategy, DecodeStrategy::Qrc);
        assert_eq!(decoded.field, "qrc");
        assert!(!decoded.document.is_empty());
        assert!(!decoded.text.starts_with("<?xml"), "应已去掉 XML 包装");
    }

    #[test]
    fn test_first_successful_field_wins() {
        let orchestrator = DecodeOrchestrator::new();
        let krc = general_purpose::STANDARD
            .encode(encrypt_krc_bytes("[1000,500]<200,100,0>hello").unwrap());
        let fields = [
            RawField::hex("broken", "zz"),
            RawField::base64("content", krc),
            RawField::text("lrc", "[00:05.00]never reached"),
        ];

        let report = orchestrator.decode_fields(ProviderId::Kugou, &fields);

        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.attempts[0].strategy, DecodeStrategy::FieldEncoding);
        let success = report.success().unwrap();
        assert_eq!(success.field, "content");
        assert_eq!(success.strategy, DecodeStrategy::Krc);
        assert!(report.attempts.iter().all(|a| a.field != "lrc"));

        let decoded = orchestrator
            .decode_lyric_fields(ProviderId::Kugou, &fields)
            .unwrap();
        assert_eq!(decoded.document.to_lrc(), "[00:01.200]hello\n");
        assert_eq!(decoded.lyrics_type(), LyricsType::Verbatim);
    }

    #[test]
    fn test_plain_lrc_falls_through_to_direct_text() {
        let orchestrator = DecodeOrchestrator::new();
        let lrc = general_purpose::STANDARD.encode("[00:01.00]第一句\n[00:02.00]第二句");

        let report = orchestrator.decode_fields(ProviderId::Qq, &[RawField::base64("lyric", lrc)]);

        let strategies: Vec<_> = report.attempts.iter().map(|a| a.strategy).collect();
        assert_eq!(
            strategies,
            vec![DecodeStrategy::Qrc, DecodeStrategy::Decompress, DecodeStrategy::DirectText]
        );
        assert_eq!(report.success().unwrap().outcome.as_ref().unwrap().markup, LyricMarkup::Lrc);
    }

    #[test]
    fn test_compressed_field_uses_generic_decompression() {
        let orchestrator = DecodeOrchestrator::new();
        let compressed = inflate::deflate_zlib("[00:01.00]压缩的歌词".as_bytes()).unwrap();

        let report =
            orchestrator.decode_fields(ProviderId::Netease, &[RawField::binary("lrc", compressed)]);
        assert_eq!(report.success().unwrap().strategy, DecodeStrategy::Decompress);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_garbage_is_rejected_by_gating() {
        let orchestrator = DecodeOrchestrator::new();
        let fields = [
            RawField::text("lrc", "hello world, no timestamps here"),
            RawField::binary("bin", vec![0xFF, 0xFE, 0x00, 0x81]),
        ];

        let report = orchestrator.decode_fields(ProviderId::Netease, &fields);
        assert!(report.is_failure());
        assert_eq!(report.attempts.len(), 4);
        assert_eq!(
            report.attempts[1].outcome,
            Err(DecodeError::NotLyrics),
            "纯文本不应被当作歌词"
        );

        let err = orchestrator
            .decode_lyric_fields(ProviderId::Netease, &fields)
            .unwrap_err();
        assert!(matches!(err, LyricsCodecError::DecodeFailure(_)));
        assert!(logs_contain("所有字段的所有解码策略均失败"));
    }

    #[test]
    fn test_qmc1_field() {
        let plaintext = b"[00:01.00]qmc1 lyric";
        let ciphertext = qmc1::decrypt_qmc1(plaintext);

        let orchestrator = DecodeOrchestrator::new();
        let document = orchestrator
            .decode_lyric_field(ProviderId::Qmc1, &RawField::binary("file", ciphertext))
            .unwrap();
        assert_eq!(document.lines()[0].text, "qmc1 lyric");
        assert_eq!(document.lyrics_type(), LyricsType::LineByLine);
    }

    #[test]
    fn test_kugou_plain_lrc_skips_krc() {
        let orchestrator = DecodeOrchestrator::new();
        let lrc = general_purpose::STANDARD.encode("[00:03.50]酷狗的 LRC");

        let report = orchestrator.decode_fields(ProviderId::Kugou, &[RawField::base64("lrc", lrc)]);

        assert_eq!(
            report.attempts[0].outcome,
            Err(DecodeError::MissingHeader("krc1"))
        );
        assert_eq!(report.success().unwrap().strategy, DecodeStrategy::DirectText);
    }

    #[test]
    fn test_uncompressed_krc_body_must_look_like_lyrics() {
        let orchestrator = DecodeOrchestrator::new();

        let garbage = krc::xor_only_container(b"hello world");
        assert!(
            matches!(
                orchestrator.run_strategy(DecodeStrategy::Krc, &garbage),
                Err(DecodeError::NotLyrics)
            ),
            "只做了异或的非歌词内容不应被接受"
        );

        let lyric = krc::xor_only_container(b"[0,100]<0,100,0>la");
        let decoded = orchestrator
            .run_strategy(DecodeStrategy::Krc, &lyric)
            .expect("只做了异或的 KRC 文本应能通过检查");
        assert_eq!(decoded.markup, LyricMarkup::WordTagged);
    }

    #[test]
    fn test_bracket_timed_text_passes_gate() {
        let orchestrator = DecodeOrchestrator::new();
        let yrc = RawField::text("yrc", "[1000,800](1000,300,0)逐(1300,500,0)字");

        let decoded = orchestrator
            .decode_lyric_fields(ProviderId::Netease, std::slice::from_ref(&yrc))
            .unwrap();
        assert_eq!(decoded.strategy, DecodeStrategy::DirectText);
        assert_eq!(decoded.markup, LyricMarkup::Yrc);
    }

    #[test]
    fn test_auto_encoding() {
        assert_eq!(RawField::auto("a", "0A0B").to_bytes().unwrap(), vec![0x0A, 0x0B]);
        assert_eq!(RawField::auto("b", "aGk=").to_bytes().unwrap(), b"hi".to_vec());
        assert_eq!(RawField::auto("c", "[00:01]x").to_bytes().unwrap(), b"[00:01]x".to_vec());
    }
}
