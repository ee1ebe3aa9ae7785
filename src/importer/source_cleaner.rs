// ==========================================
// 清单项目桥接系统 - 源文件预清洗
// ==========================================
// 依据: SimaPro 9 CSV 导出格式 - 参数块
// ==========================================
// 职责: Latin-1 解码 + 保留字参数名改写
// 背景: 源项目常用表达式语言保留字(int/as/pi/add/poly/prod/empty)做参数名,
//       不改写则下游参数机制无法求值
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

// ==========================================
// SourceCleaner - 源文件预清洗器
// ==========================================
pub struct SourceCleaner;

/// 保留字改写规则表(按声明顺序依次应用)
fn substitution_rules() -> &'static Vec<(Regex, &'static str)> {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            // int: 行首定义与公式内引用
            (r"^Int;", "switch_int;"),
            (r"\*int;", "*switch_int;"),
            (r"\*int/", "*switch_int/"),
            (r"\*int\*", "*switch_int*"),
            (r"\*Int", "*switch_int"),
            // as: 行首定义与公式内引用(放过 as_alu 等已合法的名字)
            (r"^as;", "as_;"),
            (r"^AS;", "as_;"),
            (r"\*AS;", "*as_;"),
            // pi: 直接替换为字面值
            (r"\*pi;", "*3.14;"),
            (r"\*Pi\*", "*3.14*"),
            (r"\*pi\)", "*3.14)"),
            (r"\*Pi\)", "*3.14)"),
            // add
            (r"^add;", "added;"),
            (r"add\*", "added*"),
            // poly
            (r"^poly;", "polyy;"),
            (r"\+poly\+", "+polyy+"),
            // prod
            (r"^prod;", "prodd;"),
            (r";prod/", ";prodd/"),
            // empty
            (r"empty;", "empty_factor;"),
            (r"empty/", "empty_factor/"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).expect("内置正则非法"), replacement))
        .collect()
    })
}

/// as 引用的条件改写(放过 as_alu 前缀)
fn conditional_as_rules() -> &'static Vec<(Regex, Regex, &'static str)> {
    static RULES: OnceLock<Vec<(Regex, Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"\*as", r"\*as_alu", "*as_"),
            (r"1-as", r"1-as_alu", "1-as_"),
            (r"1-AS", r"1-AS_", "1-as_"),
        ]
        .into_iter()
        .map(|(pattern, exclusion, replacement)| {
            (
                Regex::new(pattern).expect("内置正则非法"),
                Regex::new(exclusion).expect("内置正则非法"),
                replacement,
            )
        })
        .collect()
    })
}

fn iff_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r";[iI]ff").expect("内置正则非法"))
}

impl SourceCleaner {
    /// 读取导出文件并完成预清洗
    ///
    /// # 参数
    /// - file_path: 导出文件路径
    ///
    /// # 返回
    /// - Ok(String): 清洗后的完整文本
    /// - Err: 文件不存在/读取失败
    pub fn load_and_clean(&self, file_path: &Path) -> ImportResult<String> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let bytes = std::fs::read(file_path)?;
        let text = Self::decode_latin1(&bytes);
        Ok(self.clean_text(&text))
    }

    /// Latin-1 字节流无损解码为 UTF-8 字符串
    ///
    /// 说明: Latin-1 码点与 Unicode 前 256 个码点一一对应
    pub fn decode_latin1(bytes: &[u8]) -> String {
        bytes.iter().map(|&b| b as char).collect()
    }

    /// 对完整文本逐行应用保留字改写
    pub fn clean_text(&self, text: &str) -> String {
        let cleaned: Vec<String> = text.lines().map(|line| self.clean_line(line)).collect();
        cleaned.join("\n")
    }

    /// 单行改写
    fn clean_line(&self, line: &str) -> String {
        let mut current = line.to_string();

        // iff(...) 单元格整体替换为 0(条件表达式无法迁移)
        if iff_pattern().is_match(&current) {
            if let Some(second_field) = current.split(';').nth(1).map(str::to_string) {
                if !second_field.is_empty() {
                    current = current.replacen(&second_field, "0", 1);
                }
            }
        }

        for (pattern, replacement) in substitution_rules() {
            if pattern.is_match(&current) {
                current = pattern.replace_all(&current, *replacement).into_owned();
            }
        }

        for (pattern, exclusion, replacement) in conditional_as_rules() {
            if pattern.is_match(&current) && !exclusion.is_match(&current) {
                current = pattern.replace_all(&current, *replacement).into_owned();
            }
        }

        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_decode_latin1_roundtrip() {
        // 0xE9 = é (Latin-1)
        let bytes = [b'c', b'a', b'f', 0xE9];
        assert_eq!(SourceCleaner::decode_latin1(&bytes), "café");
    }

    #[test]
    fn test_reserved_int_definition_renamed() {
        let cleaner = SourceCleaner;
        assert_eq!(
            cleaner.clean_text("Int;4;Undefined"),
            "switch_int;4;Undefined"
        );
        assert_eq!(cleaner.clean_text("x;2*int;"), "x;2*switch_int;");
    }

    #[test]
    fn test_reserved_as_renamed_but_as_alu_kept() {
        let cleaner = SourceCleaner;
        assert_eq!(cleaner.clean_text("as;0.5;"), "as_;0.5;");
        assert_eq!(cleaner.clean_text("y;2*as;"), "y;2*as_;");
        // as_alu 已是合法名,不得二次改写
        assert_eq!(cleaner.clean_text("y;2*as_alu;"), "y;2*as_alu;");
    }

    #[test]
    fn test_pi_replaced_with_literal() {
        let cleaner = SourceCleaner;
        assert_eq!(cleaner.clean_text("r;2*pi;"), "r;2*3.14;");
        assert_eq!(cleaner.clean_text("r;(d*Pi)"), "r;(d*3.14)");
    }

    #[test]
    fn test_iff_cell_replaced_with_zero() {
        let cleaner = SourceCleaner;
        assert_eq!(
            cleaner.clean_text("flag;iff(x>0,1,0);comment"),
            "flag;0;comment"
        );
    }

    #[test]
    fn test_load_and_clean_missing_file() {
        let cleaner = SourceCleaner;
        let result = cleaner.load_and_clean(Path::new("does_not_exist.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_load_and_clean_applies_rules() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "prod;1;Undefined").unwrap();
        writeln!(temp_file, "normal;2;Undefined").unwrap();

        let cleaner = SourceCleaner;
        let text = cleaner.load_and_clean(temp_file.path()).unwrap();
        assert!(text.starts_with("prodd;1;Undefined"));
        assert!(text.contains("normal;2;Undefined"));
    }
}
