//! LRC 格式生成器

use crate::{
    converter::types::{LrcGenerationOptions, LrcStyle},
    model::lyric::{CanonicalLyricDocument, LyricLine},
};

/// 按文档源格式对应的粒度生成 LRC，并输出元数据。
#[must_use]
pub fn generate_lrc(document: &CanonicalLyricDocument) -> String {
    generate_lrc_with(
        document,
        &LrcGenerationOptions {
            style: LrcStyle::for_markup(document.markup()),
            include_metadata: true,
        },
    )
}

/// LRC 生成的主入口函数。
///
/// 每个歌词行恰好输出一行，即使该行文本为空。
#[must_use]
pub fn generate_lrc_with(
    document: &CanonicalLyricDocument,
    options: &LrcGenerationOptions,
) -> String {
    let mut lrc_output = String::with_capacity(document.lines().len() * 50);

    if options.include_metadata {
        for (key, value) in document.metadata() {
            lrc_output.push_str(&format!("[{key}:{value}]\n"));
        }
    }

    for line in document.lines() {
        write_line(&mut lrc_output, line, options.style);
        lrc_output.push('\n');
    }

    lrc_output
}

fn write_line(output: &mut String, line: &LyricLine, style: LrcStyle) {
    match (&line.words, style) {
        (Some(words), LrcStyle::WordTimed) if !words.is_empty() => {
            for word in words {
                output.push_str(&format_lrc_time_ms(u64::from(word.start_ms)));
                output.push_str(&word.text);
            }
        }
        _ => {
            output.push_str(&format_lrc_time_ms(u64::from(line.start_ms)));
            output.push_str(&line.text);
        }
    }
}

/// 将毫秒时间格式化为 LRC 时间字符串 `[mm:ss.xxx]`。
///
/// 分钟至少两位，超过 99 分钟时自然变宽；秒两位，毫秒三位。
#[must_use]
pub fn format_lrc_time_ms(ms: u64) -> String {
    let minutes = ms / 60000;
    let seconds = (ms % 60000) / 1000;
    let milliseconds = ms % 1000;
    format!("[{minutes:02}:{seconds:02}.{milliseconds:03}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::lyric::LyricWord;

    #[test]
    fn test_format_lrc_time_ms() {
        assert_eq!(format_lrc_time_ms(0), "[00:00.000]");
        assert_eq!(format_lrc_time_ms(1200), "[00:01.200]");
        assert_eq!(format_lrc_time_ms(61_005), "[01:01.005]");
        assert_eq!(format_lrc_time_ms(6_000_000), "[100:00.000]");
    }

    #[test]
    fn test_generate_word_and_line_styles() {
        let document = CanonicalLyricDocument::new(
            vec![
                LyricLine::verbatim(
                    1000,
                    vec![
                        LyricWord {
                            start_ms: 1000,
                            text: "你".into(),
                        },
                        LyricWord {
                            start_ms: 1300,
                            text: "好".into(),
                        },
                    ],
                ),
                LyricLine::line(2500, ""),
            ],
            vec![("ti".into(), "标题".into())],
        );

        insta::assert_snapshot!(generate_lrc(&document).trim_end(), @r"
        [ti:标题]
        [00:01.000]你[00:01.300]好
        [00:02.500]
        ");

        let line_timed = generate_lrc_with(
            &document,
            &LrcGenerationOptions {
                style: LrcStyle::LineTimed,
                include_metadata: false,
            },
        );
        assert_eq!(line_timed, "[00:01.000]你好\n[00:02.500]\n");
    }
}
