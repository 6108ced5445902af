//! 定义了库中各组件之间传递的核心数据结构。

pub mod lyric;
pub mod provider;
