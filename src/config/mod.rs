// ==========================================
// LYRIQ 车源价格追踪 - 配置层
// ==========================================
// 职责: 管道配置管理,支持多级覆写
// 来源: 默认值 / JSON 配置文件 / 环境变量
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, MetricsConfig, PipelineConfig};
pub use import_config_trait::ImportConfigReader;
