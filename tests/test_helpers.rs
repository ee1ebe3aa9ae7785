// ==========================================
// 集成测试辅助工具
// ==========================================
// 职责: 构建临时参考数据库/对照表目录/转换配置
// ==========================================

use lci_bridge::config::ConversionConfig;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// 创建并填充临时参考数据库(活动 + 基本流)
pub fn create_reference_db(root: &Path) -> PathBuf {
    let db_path = root.join("reference.db");
    let conn = Connection::open(&db_path).expect("Failed to create reference db");

    conn.execute_batch(
        r#"
        CREATE TABLE activity (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            reference_product TEXT NOT NULL,
            location TEXT NOT NULL,
            unit TEXT
        );
        INSERT INTO activity VALUES
            ('c1', 'market for electricity, low voltage', 'electricity, low voltage', 'RER', 'kWh'),
            ('c2', 'steel production, converter, low-alloyed', 'steel, low-alloyed', 'RER', 'kg'),
            ('c3', 'zinc production', 'zinc', 'GLO', 'kg');

        CREATE TABLE elementary_flow (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            compartment TEXT NOT NULL,
            subcompartment TEXT
        );
        INSERT INTO elementary_flow VALUES
            ('f1', 'Carbon dioxide', 'air', NULL),
            ('f2', 'Sulfur dioxide', 'air', NULL),
            ('f3', 'Water, unspecified natural origin', 'natural resource', 'in water');
        "#,
    )
    .expect("Failed to seed reference db");

    db_path
}

/// 写出测试用对照表目录(五个 JSON 文件)
pub fn write_data_tables(root: &Path) -> PathBuf {
    let data_dir = root.join("data");
    std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");

    std::fs::write(
        data_dir.join("obsolete_processes.json"),
        r#"["Electricity, obsolete {GLO}| legacy electricity production"]"#,
    )
    .unwrap();
    std::fs::write(
        data_dir.join("simapro_biosphere.json"),
        r#"[["air", "Sulphur dioxide", "Sulfur dioxide"]]"#,
    )
    .unwrap();
    std::fs::write(data_dir.join("list_of_countries.json"), r#"["FR", "DE"]"#).unwrap();
    std::fs::write(
        data_dir.join("comps.json"),
        r#"{"Air": "air", "Water": "water", "Soil": "soil", "Resources": "natural resource"}"#,
    )
    .unwrap();
    std::fs::write(
        data_dir.join("subcomps.json"),
        r#"{"in water": "in water", "river": "surface water"}"#,
    )
    .unwrap();

    data_dir
}

/// 构造指向临时目录的转换配置
pub fn test_config(root: &Path, target_db_name: &str) -> ConversionConfig {
    ConversionConfig {
        reference_db_path: root.join("reference.db"),
        target_db_path: root.join(target_db_name),
        project_db_name: "demo_project".to_string(),
        reference_db_name: "ecoinvent3.6 cut-off".to_string(),
        biosphere_db_name: "biosphere3".to_string(),
        delimiter: ';',
        data_dir: root.join("data"),
    }
}
