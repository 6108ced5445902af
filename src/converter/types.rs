//! 歌词转换器使用的中间类型与错误。

use thiserror::Error;

use crate::model::lyric::{CanonicalLyricDocument, LyricLine, LyricMarkup};

/// 歌词解析或生成过程中可能发生的错误。
#[derive(Error, Debug)]
pub enum ConvertError {
    /// 整数解析错误。
    #[error("解析错误: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
    /// 时间戳超出可表示范围。
    #[error("无效的时间格式: {0}")]
    InvalidTime(String),
    /// JSON 解析错误。
    #[error("解析 JSON 内容 {context} 失败: {source}")]
    JsonParse {
        /// 底层 `serde_json` 错误
        #[source]
        source: serde_json::Error,
        /// 有关错误发生位置的上下文信息。
        context: String,
    },
    /// 无效的歌词格式。
    #[error("无效的歌词格式: {0}")]
    InvalidLyricFormat(String),
}

impl ConvertError {
    /// 创建一个带有上下文的 `JsonParse` 错误。
    #[must_use]
    pub fn json_parse(source: serde_json::Error, context: String) -> Self {
        Self::JsonParse { source, context }
    }
}

/// 单个解析器的输出。
#[derive(Debug, Clone, Default)]
pub struct ParsedSourceData {
    /// 解析出的歌词行，尚未排序。
    pub lines: Vec<LyricLine>,
    /// 按出现顺序保存的元数据。
    pub raw_metadata: Vec<(String, String)>,
    /// 解析过程中跳过的行等非致命问题。
    pub warnings: Vec<String>,
    /// 源文本的标记格式。
    pub source_format: LyricMarkup,
}

impl ParsedSourceData {
    /// 转换为规范化文档，行会被稳定排序，源格式随文档保存。
    #[must_use]
    pub fn into_document(self) -> CanonicalLyricDocument {
        CanonicalLyricDocument::new(self.lines, self.raw_metadata).with_markup(self.source_format)
    }
}

/// LRC 输出中时间标签的粒度。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LrcStyle {
    /// 有逐字信息的行为每个单词输出一个时间标签。
    #[default]
    WordTimed,
    /// 每行只输出一个行首时间标签，忽略逐字信息。
    LineTimed,
}

impl LrcStyle {
    /// 源格式对应的默认输出粒度。
    ///
    /// QRC 内层文本只保留行时间标签，其余格式有逐字信息时逐字输出。
    #[must_use]
    pub fn for_markup(markup: LyricMarkup) -> Self {
        match markup {
            LyricMarkup::LineTagged => Self::LineTimed,
            _ => Self::WordTimed,
        }
    }
}

/// LRC 生成选项。
#[derive(Debug, Clone, Copy, Default)]
pub struct LrcGenerationOptions {
    /// 时间标签粒度。
    pub style: LrcStyle,
    /// 是否在开头输出元数据标签。
    pub include_metadata: bool,
}
