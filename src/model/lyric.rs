//! 规范化歌词文档的数据结构。

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::converter::generators::lrc_generator;

/// 一个带有绝对时间戳的单词（音节）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricWord {
    /// 单词开始时间（毫秒）。
    pub start_ms: u32,
    /// 单词文本，是所在行文本的一个子串。
    pub text: String,
}

/// 规范化文档中的一行歌词。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    /// 行开始时间（毫秒）。
    pub start_ms: u32,
    /// 行的完整文本。
    pub text: String,
    /// 逐字时间信息。
    ///
    /// `None` 表示这是一个逐行歌词行，而不是“没有单词”。
    pub words: Option<Vec<LyricWord>>,
}

impl LyricLine {
    /// 创建一个逐行（无逐字信息）的歌词行。
    pub fn line(start_ms: u32, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            text: text.into(),
            words: None,
        }
    }

    /// 由逐字信息创建歌词行，行文本为所有单词的拼接。
    #[must_use]
    pub fn verbatim(start_ms: u32, words: Vec<LyricWord>) -> Self {
        let text = words.iter().map(|w| w.text.as_str()).collect();
        Self {
            start_ms,
            text,
            words: Some(words),
        }
    }
}

/// 歌词的时间粒度分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum LyricsType {
    /// 逐字歌词。
    Verbatim,
    /// 逐行歌词。
    LineByLine,
    /// 没有任何有效时间信息的纯文本。
    PlainText,
}

/// 解码后文本的标记格式。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum LyricMarkup {
    /// 酷狗 KRC: `[start,dur]<offset,dur,0>word`
    WordTagged,
    /// QRC 内层文本: `[start,dur]word(start,dur)`
    LineTagged,
    /// 网易云 YRC: `[start,dur](start,dur,0)word`
    Yrc,
    /// 已带 `[mm:ss.xx]` 时间标签的 LRC
    Lrc,
    /// 无任何时间标签的纯文本
    #[default]
    Plain,
}

/// 与提供商格式无关的规范化歌词文档。
///
/// 行总是按 `start_ms` 非递减排列，同一时间的行保持原有先后顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalLyricDocument {
    lines: Vec<LyricLine>,
    metadata: Vec<(String, String)>,
    #[serde(default)]
    markup: LyricMarkup,
}

impl CanonicalLyricDocument {
    /// 由任意顺序的行构建文档，内部会做稳定排序。
    #[must_use]
    pub fn new(mut lines: Vec<LyricLine>, metadata: Vec<(String, String)>) -> Self {
        lines.sort_by_key(|line| line.start_ms);
        Self {
            lines,
            metadata,
            markup: LyricMarkup::Plain,
        }
    }

    /// 记录文档解析自哪种标记格式，决定 [`Self::to_lrc`] 的输出粒度。
    #[must_use]
    pub fn with_markup(mut self, markup: LyricMarkup) -> Self {
        self.markup = markup;
        self
    }

    /// 文档的源标记格式。直接构建的文档为 [`LyricMarkup::Plain`]。
    #[must_use]
    pub fn markup(&self) -> LyricMarkup {
        self.markup
    }

    /// 所有歌词行。
    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    /// 形如 `[ar:...]` 的元数据标签，按出现顺序保存。
    #[must_use]
    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    /// 文档中是否没有任何歌词行。
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 根据行内容推导歌词类型。
    ///
    /// 只要存在任意一行带有逐字信息即视为逐字歌词。
    #[must_use]
    pub fn lyrics_type(&self) -> LyricsType {
        if self.lines.iter().any(|line| line.words.is_some()) {
            LyricsType::Verbatim
        } else if self.lines.iter().any(|line| line.start_ms > 0) {
            LyricsType::LineByLine
        } else {
            LyricsType::PlainText
        }
    }

    /// 渲染为统一带 `[mm:ss.mmm]` 标签的文本。
    ///
    /// 解析自 QRC 内层文本的文档只输出行时间标签，其余逐字输出。
    #[must_use]
    pub fn to_lrc(&self) -> String {
        lrc_generator::generate_lrc(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_sorted_stably() {
        let doc = CanonicalLyricDocument::new(
            vec![
                LyricLine::line(2000, "c"),
                LyricLine::line(1000, "a"),
                LyricLine::line(1000, "b"),
            ],
            vec![],
        );
        let texts: Vec<_> = doc.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[test]
    fn test_lyrics_type_follows_word_presence() {
        let line_doc = CanonicalLyricDocument::new(vec![LyricLine::line(1000, "x")], vec![]);
        assert_eq!(line_doc.lyrics_type(), LyricsType::LineByLine);

        let word_doc = CanonicalLyricDocument::new(
            vec![
                LyricLine::line(0, "intro"),
                LyricLine::verbatim(
                    1000,
                    vec![LyricWord {
                        start_ms: 1000,
                        text: "x".into(),
                    }],
                ),
            ],
            vec![],
        );
        assert_eq!(word_doc.lyrics_type(), LyricsType::Verbatim);

        let plain_doc = CanonicalLyricDocument::new(vec![LyricLine::line(0, "x")], vec![]);
        assert_eq!(plain_doc.lyrics_type(), LyricsType::PlainText);
    }
}
