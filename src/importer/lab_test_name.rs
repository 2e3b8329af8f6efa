// ==========================================
// 诊所收费目录系统 - 检验项名称解析
// ==========================================
// 规则: "(参考号)名称" → 子检验项；其他 → 去空白后的原名称
// ==========================================

use crate::domain::tariff::ParsedLabTest;
use regex::Regex;
use std::sync::LazyLock;

static LAB_TEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((\d+)\)(.+)$").unwrap());

/// 解析检验项名称
///
/// # 示例
/// - "(12)Hemoglobin" → { reference_number: "12", test_name: "Hemoglobin" }
/// - "Full Blood Count" → { reference_number: None, test_name: "Full Blood Count" }
pub fn parse_lab_test_name(name: &str) -> ParsedLabTest {
    match LAB_TEST_RE.captures(name) {
        Some(caps) => ParsedLabTest {
            reference_number: Some(caps[1].to_string()),
            test_name: caps[2].trim().to_string(),
        },
        None => ParsedLabTest {
            reference_number: None,
            test_name: name.trim().to_string(),
        },
    }
}

/// 非检验行：不做内嵌参考号解析
pub fn plain_name(name: &str) -> ParsedLabTest {
    ParsedLabTest {
        reference_number: None,
        test_name: name.trim().to_string(),
    }
}
