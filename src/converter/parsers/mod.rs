//! 歌词解析器模块

pub mod krc_parser;
pub mod lrc_parser;
pub mod qrc_parser;
pub mod yrc_parser;
