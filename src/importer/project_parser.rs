// ==========================================
// 清单项目桥接系统 - 项目文件解析器
// ==========================================
// 依据: SimaPro 9 CSV 导出格式 - Process 块结构
// ==========================================
// 职责: 分号分隔的块状导出文本 → Process 列表 + 全局参数集
// 块文法: "Process" ... 区段关键字 + 数据行 ... "End"
// 区段: Products / Avoided products / Materials/fuels / Electricity/heat /
//       Waste to treatment / Resources / Emissions to air|water|soil /
//       Input parameters / Calculated parameters
// 块外: Database/Project (Input|Calculated) parameters → 全局参数
// ==========================================

use crate::domain::process::{Exchange, Parameter, ParameterSet, Process};
use crate::domain::types::{Allocation, CategoryPath, ExchangeKind};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::source_cleaner::SourceCleaner;
use csv::{ReaderBuilder, StringRecord};
use std::path::Path;
use tracing::{debug, info, warn};

/// 子舱室占位写法,归一化为"未指定"
const UNSPECIFIED_SUBCOMPARTMENT: &str = "(unspecified)";

// ==========================================
// ParsedProject - 解析产物
// ==========================================
#[derive(Debug, Clone)]
pub struct ParsedProject {
    pub processes: Vec<Process>,          // 项目内全部过程(未分解/未编码)
    pub global_parameters: ParameterSet,  // 项目全局参数
}

// ==========================================
// Section - 解析状态机区段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Idle,                          // 块外
    ProcessMeta,                   // Process 块内元数据区
    AwaitingProcessName,           // 下一行为过程显示名称
    Products,                      // 产出流区段
    Technosphere,                  // 技术圈流区段
    Biosphere(BiosphereCompartment), // 生物圈流区段
    InputParameters,               // 过程级输入参数
    CalculatedParameters,          // 过程级计算参数
    GlobalInputParameters,         // 全局输入参数
    GlobalCalculatedParameters,    // 全局计算参数
}

/// 生物圈区段对应的顶层舱室
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BiosphereCompartment {
    Resources,
    Air,
    Water,
    Soil,
}

impl BiosphereCompartment {
    fn as_str(&self) -> &'static str {
        match self {
            BiosphereCompartment::Resources => "Resources",
            BiosphereCompartment::Air => "Air",
            BiosphereCompartment::Water => "Water",
            BiosphereCompartment::Soil => "Soil",
        }
    }
}

// ==========================================
// ProjectParser - 项目文件解析器
// ==========================================
pub struct ProjectParser {
    delimiter: u8,
}

impl ProjectParser {
    /// 创建解析器
    ///
    /// # 参数
    /// - delimiter: 导出文件的字段分隔符(默认 b';')
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// 解析导出文件(含预清洗)
    ///
    /// # 参数
    /// - file_path: 导出文件路径
    ///
    /// # 返回
    /// - Ok(ParsedProject): 过程列表 + 全局参数
    /// - Err: 文件/块结构/数值格式错误
    pub fn parse_file(&self, file_path: &Path) -> ImportResult<ParsedProject> {
        let cleaner = SourceCleaner;
        let text = cleaner.load_and_clean(file_path)?;
        self.parse_text(&text)
    }

    /// 解析已清洗的导出文本
    pub fn parse_text(&self, text: &str) -> ImportResult<ParsedProject> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(text.as_bytes());

        let mut processes: Vec<Process> = Vec::new();
        let mut global_parameters = ParameterSet::new();
        let mut current: Option<Process> = None;
        let mut section = Section::Idle;

        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            // 跳过完全空白的行
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }

            // 关键字行识别(首字段之外必须为空)
            // 注意: 等待名称值时跳过识别,否则单字段的名称行会被误判为关键字
            if section != Section::AwaitingProcessName {
                if let Some(keyword) = keyword_of(&record) {
                    match keyword {
                        "Process" => {
                            if current.is_some() {
                                return Err(ImportError::MalformedBlock {
                                    line,
                                    message: "前一个 Process 块未以 End 结束".to_string(),
                                });
                            }
                            current = Some(Process::new(""));
                            section = Section::ProcessMeta;
                            continue;
                        }
                        "End" => {
                            if let Some(process) = current.take() {
                                processes.push(finalize_process(process));
                            }
                            section = Section::Idle;
                            continue;
                        }
                        "Process name" if current.is_some() => {
                            section = Section::AwaitingProcessName;
                            continue;
                        }
                        "Products" if current.is_some() => {
                            section = Section::Products;
                            continue;
                        }
                        "Avoided products" | "Materials/fuels" | "Electricity/heat"
                        | "Waste to treatment"
                            if current.is_some() =>
                        {
                            section = Section::Technosphere;
                            continue;
                        }
                        "Resources" if current.is_some() => {
                            section = Section::Biosphere(BiosphereCompartment::Resources);
                            continue;
                        }
                        "Emissions to air" if current.is_some() => {
                            section = Section::Biosphere(BiosphereCompartment::Air);
                            continue;
                        }
                        "Emissions to water" if current.is_some() => {
                            section = Section::Biosphere(BiosphereCompartment::Water);
                            continue;
                        }
                        "Emissions to soil" if current.is_some() => {
                            section = Section::Biosphere(BiosphereCompartment::Soil);
                            continue;
                        }
                        "Input parameters" if current.is_some() => {
                            section = Section::InputParameters;
                            continue;
                        }
                        "Calculated parameters" if current.is_some() => {
                            section = Section::CalculatedParameters;
                            continue;
                        }
                        "Database Input parameters" | "Project Input parameters" => {
                            section = Section::GlobalInputParameters;
                            continue;
                        }
                        "Database Calculated parameters" | "Project Calculated parameters" => {
                            section = Section::GlobalCalculatedParameters;
                            continue;
                        }
                        _ => {
                            // 块内未识别的元数据关键字: 跳过其本行(值行随后按数据行忽略)
                            if current.is_some() && section != Section::Idle {
                                section = Section::ProcessMeta;
                                continue;
                            }
                        }
                    }
                }
            }

            // 数据行处理
            match section {
                Section::Idle | Section::ProcessMeta => {
                    // 块外内容与未识别元数据的值行一律忽略
                    debug!(line = line, "忽略非数据行");
                }
                Section::AwaitingProcessName => {
                    if let Some(process) = current.as_mut() {
                        process.name = field(&record, 0).to_string();
                    }
                    section = Section::ProcessMeta;
                }
                Section::Products => {
                    let process = expect_block(&mut current, line)?;
                    process.exchanges.push(parse_product_row(&record, line)?);
                }
                Section::Technosphere => {
                    let process = expect_block(&mut current, line)?;
                    process
                        .exchanges
                        .push(parse_technosphere_row(&record, line)?);
                }
                Section::Biosphere(compartment) => {
                    let process = expect_block(&mut current, line)?;
                    process
                        .exchanges
                        .push(parse_biosphere_row(&record, compartment, line)?);
                }
                Section::InputParameters => {
                    let process = expect_block(&mut current, line)?;
                    process.parameters.push(parse_input_parameter(&record, line)?);
                }
                Section::CalculatedParameters => {
                    let process = expect_block(&mut current, line)?;
                    process.parameters.push(parse_calculated_parameter(&record));
                }
                Section::GlobalInputParameters => {
                    global_parameters.insert(parse_input_parameter(&record, line)?);
                }
                Section::GlobalCalculatedParameters => {
                    global_parameters.insert(parse_calculated_parameter(&record));
                }
            }
        }

        if current.is_some() {
            warn!("文件结尾存在未以 End 结束的 Process 块,按已结束处理");
            if let Some(process) = current.take() {
                processes.push(finalize_process(process));
            }
        }

        info!(
            processes = processes.len(),
            global_parameters = global_parameters.len(),
            "项目文件解析完成"
        );

        Ok(ParsedProject {
            processes,
            global_parameters,
        })
    }
}

/// 关键字行判定: 首字段非空且其余字段全空
fn keyword_of(record: &StringRecord) -> Option<&str> {
    let first = record.get(0).map(str::trim).unwrap_or("");
    if first.is_empty() {
        return None;
    }
    let rest_empty = record.iter().skip(1).all(|f| f.trim().is_empty());
    if rest_empty {
        Some(first)
    } else {
        None
    }
}

fn field<'a>(record: &'a StringRecord, index: usize) -> &'a str {
    record.get(index).map(str::trim).unwrap_or("")
}

fn expect_block<'a>(
    current: &'a mut Option<Process>,
    line: u64,
) -> ImportResult<&'a mut Process> {
    current.as_mut().ok_or_else(|| ImportError::MalformedBlock {
        line,
        message: "数据行出现在 Process 块之外".to_string(),
    })
}

/// 数值解析(兼容逗号小数分隔符)
fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
}

/// 数量单元格: 数值 → (值, None);表达式 → (0.0, Some(公式))
fn parse_amount_cell(cell: &str) -> (f64, Option<String>) {
    match parse_number(cell) {
        Some(value) => (value, None),
        None if cell.trim().is_empty() => (0.0, None),
        None => (0.0, Some(cell.trim().to_string())),
    }
}

/// Products 行: 名称;单位;数量;分配;...
fn parse_product_row(record: &StringRecord, line: u64) -> ImportResult<Exchange> {
    let name = field(record, 0);
    if name.is_empty() {
        return Err(ImportError::MalformedBlock {
            line,
            message: "Products 行缺少流名称".to_string(),
        });
    }

    let (amount, formula) = parse_amount_cell(field(record, 2));

    let allocation_cell = field(record, 3);
    let allocation = if allocation_cell.is_empty() {
        None
    } else if let Some(value) = parse_number(allocation_cell) {
        Some(Allocation::Numeric(value))
    } else {
        Some(Allocation::ParameterRef(allocation_cell.to_string()))
    };

    let mut exchange = Exchange::new(name, amount, ExchangeKind::Production { allocation });
    exchange.unit = non_empty(field(record, 1));
    exchange.formula = formula;
    Ok(exchange)
}

/// 技术圈行: 名称;单位;数量;...
fn parse_technosphere_row(record: &StringRecord, line: u64) -> ImportResult<Exchange> {
    let name = field(record, 0);
    if name.is_empty() {
        return Err(ImportError::MalformedBlock {
            line,
            message: "技术圈行缺少流名称".to_string(),
        });
    }

    let (amount, formula) = parse_amount_cell(field(record, 2));
    let mut exchange = Exchange::new(name, amount, ExchangeKind::Technosphere);
    exchange.unit = non_empty(field(record, 1));
    exchange.formula = formula;
    Ok(exchange)
}

/// 生物圈行: 名称;子舱室;单位;数量;...
fn parse_biosphere_row(
    record: &StringRecord,
    compartment: BiosphereCompartment,
    line: u64,
) -> ImportResult<Exchange> {
    let name = field(record, 0);
    if name.is_empty() {
        return Err(ImportError::MalformedBlock {
            line,
            message: "生物圈行缺少流名称".to_string(),
        });
    }

    let subcompartment = match field(record, 1) {
        "" | UNSPECIFIED_SUBCOMPARTMENT => None,
        value => Some(value.to_string()),
    };

    let (amount, formula) = parse_amount_cell(field(record, 3));
    let mut exchange = Exchange::new(
        name,
        amount,
        ExchangeKind::Biosphere {
            categories: CategoryPath::new(compartment.as_str(), subcompartment),
        },
    );
    exchange.unit = non_empty(field(record, 2));
    exchange.formula = formula;
    Ok(exchange)
}

/// 输入参数行: 名称;数值;...;注释
fn parse_input_parameter(record: &StringRecord, line: u64) -> ImportResult<Parameter> {
    let name = field(record, 0);
    if name.is_empty() {
        return Err(ImportError::MalformedBlock {
            line,
            message: "参数行缺少参数名".to_string(),
        });
    }

    let raw_value = field(record, 1);
    let amount = parse_number(raw_value).ok_or_else(|| ImportError::NumberFormatError {
        line,
        field: name.to_string(),
        value: raw_value.to_string(),
    })?;

    let mut param = Parameter::new(name, amount);
    param.comment = last_comment(record, 2);
    Ok(param)
}

/// 计算参数行: 名称;公式;注释
///
/// 说明: 公式若恰为数字字面量则直接求值,否则数值置 0 待下游求值
fn parse_calculated_parameter(record: &StringRecord) -> Parameter {
    let name = field(record, 0);
    let formula_cell = field(record, 1);

    let mut param = Parameter::new(name, parse_number(formula_cell).unwrap_or(0.0));
    if parse_number(formula_cell).is_none() && !formula_cell.is_empty() {
        param.formula = Some(formula_cell.to_string());
    }
    param.comment = last_comment(record, 2);
    param
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// 取最后一个非空字段作注释(跳过前 skip 个字段)
fn last_comment(record: &StringRecord, skip: usize) -> Option<String> {
    record
        .iter()
        .skip(skip)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .last()
        .map(str::to_string)
}

/// 收尾: 用首条产出流补全缺失的元数据
fn finalize_process(mut process: Process) -> Process {
    if let Some(first_production) = process.production_exchanges().next().cloned() {
        if process.name.is_empty() {
            process.name = first_production.name.clone();
        }
        if process.reference_product.is_none() {
            process.reference_product = Some(first_production.name.clone());
        }
        if process.unit.is_none() {
            process.unit = first_production.unit.clone();
        }
        if process.production_amount.is_none() {
            process.production_amount = Some(first_production.amount);
        }
    }
    process
}
