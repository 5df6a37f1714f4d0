// ==========================================
// LYRIQ 车源价格追踪 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::{DedupKey, DuplicateVinPolicy};

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入管道与快照构建所需的配置读取接口
// 实现者: ConfigManager（默认值 + 配置文件 + 环境变量）
pub trait ImportConfigReader: Send + Sync {
    /// 获取去重键
    ///
    /// # 默认值
    /// - DedupKey::AllFields（全字段组合）
    fn get_dedup_key(&self) -> DedupKey;

    /// 获取必需列（表头规范化之后比较）
    ///
    /// # 默认值
    /// - ["vin"]
    fn get_required_columns(&self) -> Vec<String>;

    /// 获取年款有效区间（闭区间）；区间外的年款置 0
    ///
    /// # 默认值
    /// - None（不校验）
    fn get_year_bounds(&self) -> Option<(u32, u32)>;

    /// 获取电话缺失时的占位号码
    ///
    /// # 默认值
    /// - "(111) 111-1111"
    fn get_phone_placeholder(&self) -> String;

    /// 获取快照内重复 VIN 的处理策略
    ///
    /// # 默认值
    /// - DuplicateVinPolicy::Reject
    fn get_duplicate_vin_policy(&self) -> DuplicateVinPolicy;

    /// 获取 CSV 输入编码标签
    ///
    /// # 默认值
    /// - "utf-8"
    fn get_encoding(&self) -> String;
}
