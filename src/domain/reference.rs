// ==========================================
// 清单项目桥接系统 - 参考数据库只读实体
// ==========================================
// 依据: ecoinvent 3 活动/基本流表结构
// 红线: 本核心只查询,不修改参考数据库
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ReferenceActivity - 参考数据库活动记录
// ==========================================
// 用途: 技术圈匹配的查询结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceActivity {
    pub code: String,                  // 活动编码
    pub name: String,                  // 活动名称
    pub reference_product: String,     // 参考产品
    pub location: String,              // 地理位置代码(如 "RER" / "GLO")
    pub unit: Option<String>,          // 参考产品单位
}

// ==========================================
// ElementaryFlow - 参考基本流记录
// ==========================================
// 用途: 生物圈匹配的查询结果
// 说明: 未指定子舱室的流在参考列表中只有单段类别
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementaryFlow {
    pub code: String,                      // 基本流编码
    pub name: String,                      // 流名称
    pub compartment: String,               // 舱室代码(参考命名,如 "natural resource")
    pub subcompartment: Option<String>,    // 子舱室代码(可缺省)
}

impl ElementaryFlow {
    /// 类别是否与给定(舱室, 子舱室)完全一致
    pub fn categories_match(&self, compartment: &str, subcompartment: Option<&str>) -> bool {
        self.compartment == compartment && self.subcompartment.as_deref() == subcompartment
    }
}
