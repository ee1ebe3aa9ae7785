// ==========================================
// 清单项目桥接系统 - 过程领域模型
// ==========================================
// 依据: SimaPro 9 CSV 导出格式 - Process 块结构
// ==========================================
// 用途: 导入层构造,引擎层逐阶段原位修改
// 红线: 过程编码只在多产出分解完成后分配
// ==========================================

use crate::domain::types::{Allocation, ExchangeKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// Process - 单元过程
// ==========================================
// 说明: 分解前可持有多条产出流(联产);分解后恰好一条
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    // ===== 元数据 =====
    pub name: String,                          // 显示名称
    pub reference_product: Option<String>,     // 参考产品
    pub unit: Option<String>,                  // 参考产品单位
    pub production_amount: Option<f64>,        // 参考产品产量

    // ===== 数据体 =====
    pub exchanges: Vec<Exchange>,              // 交换流(有序)
    pub parameters: Vec<Parameter>,            // 过程级参数

    // ===== 标识 =====
    pub code: Option<String>,                  // 过程编码(分解后由引擎分配,UUID hex)
}

impl Process {
    /// 构造空过程(导入层使用)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference_product: None,
            unit: None,
            production_amount: None,
            exchanges: Vec::new(),
            parameters: Vec::new(),
            code: None,
        }
    }

    /// 产出流数量
    pub fn production_count(&self) -> usize {
        self.exchanges
            .iter()
            .filter(|e| e.kind.is_production())
            .count()
    }

    /// 是否为多产出(联产)过程
    pub fn is_multi_output(&self) -> bool {
        self.production_count() >= 2
    }

    /// 产出流迭代
    pub fn production_exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter().filter(|e| e.kind.is_production())
    }

    /// 按名称查找过程级参数(不区分大小写)
    pub fn find_parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

// ==========================================
// Exchange - 交换流
// ==========================================
// 说明: 已解析的交换流是两个编码节点间的有向弧(input, output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub name: String,                      // 流名称(技术圈流为复合标签)
    pub amount: f64,                       // 数量
    pub kind: ExchangeKind,                // 种类(技术圈/生物圈/产出)
    pub unit: Option<String>,              // 单位
    pub formula: Option<String>,           // 数量公式(参数化项目)
    pub original_amount: Option<f64>,      // 公式求值前的数量快照(落库前写入)
    pub link: Option<ExchangeLink>,        // 解析结果(缺失 = 未链接)
}

impl Exchange {
    pub fn new(name: impl Into<String>, amount: f64, kind: ExchangeKind) -> Self {
        Self {
            name: name.into(),
            amount,
            kind,
            unit: None,
            formula: None,
            original_amount: None,
            link: None,
        }
    }

    /// 是否已解析(带双向链接)
    pub fn is_resolved(&self) -> bool {
        self.link.is_some()
    }

    /// 产出流的分配系数(非产出流返回 None)
    pub fn allocation(&self) -> Option<&Allocation> {
        match &self.kind {
            ExchangeKind::Production { allocation } => allocation.as_ref(),
            _ => None,
        }
    }

    /// 覆写产出流分配系数(非产出流为 no-op)
    pub fn set_allocation(&mut self, value: Allocation) {
        if let ExchangeKind::Production { allocation } = &mut self.kind {
            *allocation = Some(value);
        }
    }
}

// ==========================================
// ExchangeLink - 双向编码链接
// ==========================================
// 说明: input 指向被消耗/排放的记录,output 指向持有方过程
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeLink {
    pub input: (String, String),   // (数据库名, 记录编码)
    pub output: (String, String),  // (数据库名, 持有方过程编码)
}

// ==========================================
// Parameter - 参数
// ==========================================
// 说明: 作用域由持有者决定(Process.parameters 或 ParameterSet)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,               // 参数名
    pub amount: f64,                // 数值
    pub formula: Option<String>,    // 公式(计算参数)
    pub comment: Option<String>,    // 注释
}

impl Parameter {
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            amount,
            formula: None,
            comment: None,
        }
    }
}

// ==========================================
// ParameterSet - 项目全局参数集
// ==========================================
// 说明: 查找一律不区分大小写(源格式大小写不稳定)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterSet {
    entries: HashMap<String, Parameter>, // 键为参数名小写形式
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入参数(同名覆盖)
    pub fn insert(&mut self, param: Parameter) {
        self.entries.insert(param.name.to_lowercase(), param);
    }

    /// 按名称查找(不区分大小写)
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.entries.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 参数迭代(无序)
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.values()
    }
}
