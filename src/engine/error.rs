// ==========================================
// LYRIQ 车源价格追踪 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    // ===== 快照前置条件 =====
    #[error("快照内 VIN 重复: {vin}（位置 {first_position} 与 {second_position}）")]
    DuplicateVin {
        vin: String,
        first_position: usize,  // 首次出现位置（从 1 开始）
        second_position: usize, // 再次出现位置（从 1 开始）
    },
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
