//! Narrate - 带缓存的语音合成服务
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - 文本分块、缓存 key 推导、请求校验、音频后处理算法
//!
//! 应用层 (application/):
//! - Ports: SpeechModel, AudioCache, AudioEncoder
//! - Services: 模型单例、合成引擎、音频后处理
//! - Commands: 缓存优先的合成处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + 作业接口
//! - Adapters: Fake / HTTP 模型后端, WAV/MP3 编码器
//! - Persistence: 文件系统音频缓存

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
