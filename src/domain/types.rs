// ==========================================
// 清单项目桥接系统 - 基础类型定义
// ==========================================
// 依据: SimaPro 9 CSV 导出格式
// 依据: ecoinvent 3 活动命名规范
// ==========================================
// 红线: 交换流种类为带数据的枚举,字段只在对应种类下存在
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ExchangeKind - 交换流种类
// ==========================================
// 用途: 区分技术圈流 / 生物圈流 / 产出流
// 说明: 类别路径仅生物圈流持有,分配系数仅产出流持有
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExchangeKind {
    /// 技术圈流(过程间的产品/服务链接)
    Technosphere,

    /// 生物圈流(直接环境输入或排放)
    Biosphere {
        /// 类别路径(顶层舱室 + 可选子舱室)
        categories: CategoryPath,
    },

    /// 产出流(过程的产品输出)
    Production {
        /// 联产分配系数(百分比或参数引用,单产出过程可缺省)
        allocation: Option<Allocation>,
    },
}

impl ExchangeKind {
    /// 是否为产出流
    pub fn is_production(&self) -> bool {
        matches!(self, ExchangeKind::Production { .. })
    }

    /// 是否为生物圈流
    pub fn is_biosphere(&self) -> bool {
        matches!(self, ExchangeKind::Biosphere { .. })
    }

    /// 是否为技术圈流
    pub fn is_technosphere(&self) -> bool {
        matches!(self, ExchangeKind::Technosphere)
    }
}

// ==========================================
// CategoryPath - 生物圈类别路径
// ==========================================
// 说明: 源格式为 1-2 段(顶层舱室 + 可选子舱室)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPath {
    pub compartment: String,               // 顶层舱室(如 "Air" / "Water" / "Resources")
    pub subcompartment: Option<String>,    // 子舱室(如 "low population density",可缺省)
}

impl CategoryPath {
    pub fn new(compartment: impl Into<String>, subcompartment: Option<String>) -> Self {
        // 空白子舱室一律归一化为 None
        let subcompartment = subcompartment.filter(|s| !s.trim().is_empty());
        Self {
            compartment: compartment.into(),
            subcompartment,
        }
    }
}

// ==========================================
// Allocation - 联产分配系数
// ==========================================
// 说明: 源文件中可以是字面百分比,也可以是参数名引用
// 红线: 进入分解阶段前必须全部归一化为数值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Allocation {
    /// 数值百分比(0-100)
    Numeric(f64),
    /// 参数名引用(待 AllocationResolver 解析)
    ParameterRef(String),
}

impl Allocation {
    /// 数值形式的分配系数(参数引用返回 None)
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Allocation::Numeric(v) => Some(*v),
            Allocation::ParameterRef(_) => None,
        }
    }

    /// 是否仍为文本参数引用
    pub fn is_textual(&self) -> bool {
        matches!(self, Allocation::ParameterRef(_))
    }
}
