// ==========================================
// 清单项目桥接系统 - 复合名称解析器
// ==========================================
// 依据: ecoinvent 3 活动命名规范
// 文法: <参考产品> {<地理位置>}| <过程名>
// ==========================================
// 红线: 调用方必须先用 has_composite_delimiter 检查分隔符
// ==========================================

use crate::importer::error::{ImportError, ImportResult};

/// 位置别名规范化: 源格式的长写法 → 参考数据库短代码
const LOCATION_ALIAS_LONG: &str = "WECC, US only";
const LOCATION_ALIAS_SHORT: &str = "WECC";

// ==========================================
// ParsedExchangeName - 复合名称解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExchangeName {
    pub reference_product: String, // 参考产品
    pub process_name: String,      // 过程名
    pub location: String,          // 地理位置代码
}

/// 名称是否携带复合分隔符
pub fn has_composite_delimiter(name: &str) -> bool {
    name.contains('|')
}

/// 解析复合交换流名称
///
/// # 参数
/// - name: 形如 `"Steel, low-alloyed {RER}| steel production, converter"` 的复合标签,
///   可携带第三段系统/单元后缀(如 `"| Cut-off, U"`)
///
/// # 返回
/// - Ok(ParsedExchangeName): 三段裁剪后的字符串
/// - Err: 缺少 `| ` 分隔符或花括号位置段
pub fn parse_composite_name(name: &str) -> ImportResult<ParsedExchangeName> {
    // 过程名取第一、二个 "| " 之间的中段,第三段后缀不属于过程名
    let mut segments = name.split("| ");
    let head = segments.next().unwrap_or("");
    let process_segment = segments
        .next()
        .ok_or_else(|| ImportError::MissingNameDelimiter(name.to_string()))?;

    let (product_part, location_part) = head
        .split_once(" {")
        .ok_or_else(|| ImportError::MissingLocationBraces(name.to_string()))?;

    let location_raw = location_part
        .split_once('}')
        .map(|(loc, _)| loc)
        .ok_or_else(|| ImportError::MissingLocationBraces(name.to_string()))?;

    // 位置别名规范化
    let location = if location_raw == LOCATION_ALIAS_LONG {
        LOCATION_ALIAS_SHORT.to_string()
    } else {
        location_raw.trim().to_string()
    };

    Ok(ParsedExchangeName {
        reference_product: product_part.trim().to_string(),
        process_name: process_segment.trim().to_string(),
        location,
    })
}
