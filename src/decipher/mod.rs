//! 各提供商的歌词解密适配器。
//!
//! 每个适配器都是纯函数：输入相同则结果（包括失败的分类）相同，
//! 失败时返回 [`CipherError`](crate::error::CipherError)，从不 panic。

pub mod inflate;
pub mod krc;
pub mod qmc1;
pub mod qrc;
pub mod text;
