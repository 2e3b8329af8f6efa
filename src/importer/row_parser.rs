// ==========================================
// 诊所收费目录系统 - CSV 行解析器
// ==========================================
// 职责: CSV 文本 → TariffCsvRow → PreparedRow
// 流程: 解析表头 → 逐行反序列化 → 价格/耗材/科室/检验名称预处理
// 红线: 不访问数据库
// ==========================================

use crate::domain::product::Consumable;
use crate::domain::tariff::{PreparedRow, TariffCsvRow, TariffValues, LAB_DEPARTMENT};
use crate::domain::types::ConsumablePolicy;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::lab_test_name::{parse_lab_test_name, plain_name};
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

/// 唯一必需的表头
pub const NAME_HEADER: &str = "NAME";

// ==========================================
// CSV 解析
// ==========================================

/// 解析 CSV 文本
///
/// # 规则
/// - 第一行为表头（区分大小写），必须包含 NAME
/// - 单元格去除首尾空白；全空行跳过
/// - 列数与表头不一致 → CsvParseError
/// - 无数据行 → EmptyCsv
pub fn parse_csv(csv_content: &str) -> ImportResult<Vec<TariffCsvRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(csv_content.as_bytes());

    let headers = reader.headers()?.clone();
    if !headers.iter().any(|h| h == NAME_HEADER) {
        return Err(ImportError::CsvParseError(format!(
            "缺少 {} 列",
            NAME_HEADER
        )));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;

        // 跳过完全空白的行
        if record.iter().all(|v| v.is_empty()) {
            continue;
        }

        let mut row: TariffCsvRow = record.deserialize(Some(&headers))?;
        row.row_number = rows.len() + 1;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ImportError::EmptyCsv);
    }

    debug!(rows = rows.len(), "CSV 解析完成");
    Ok(rows)
}

// ==========================================
// 字段解析
// ==========================================

/// 解析价格单元格
///
/// # 规则
/// - 与浮点前缀解析一致: 取开头的合法数字部分（"5000 RWF" → 5000）
/// - 空白/无数字前缀 → None（该字段不更新，绝不置零）
pub fn parse_tariff(raw: Option<&str>) -> Option<Decimal> {
    let s = raw?.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();

    let mut pos = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            pos = 1;
            true
        }
        Some(b'+') => {
            pos = 1;
            false
        }
        _ => false,
    };

    let int_start = pos;
    while pos < len && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let int_part = &s[int_start..pos];

    let mut frac_part = "";
    if pos < len && bytes[pos] == b'.' {
        let frac_start = pos + 1;
        let mut end = frac_start;
        while end < len && bytes[end].is_ascii_digit() {
            end += 1;
        }
        frac_part = &s[frac_start..end];
        if !int_part.is_empty() || !frac_part.is_empty() {
            pos = end;
        }
    }

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    let mut mantissa = String::with_capacity(int_part.len() + frac_part.len() + 3);
    if negative {
        mantissa.push('-');
    }
    mantissa.push_str(if int_part.is_empty() { "0" } else { int_part });
    if !frac_part.is_empty() {
        mantissa.push('.');
        mantissa.push_str(frac_part);
    }

    // 指数部分（1e3）
    if pos < len && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut end = pos + 1;
        if end < len && (bytes[end] == b'+' || bytes[end] == b'-') {
            end += 1;
        }
        let digits_start = end;
        while end < len && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > digits_start {
            if let Ok(exp) = s[pos + 1..end].parse::<i64>() {
                return Decimal::from_scientific(&format!("{}e{}", mantissa, exp)).ok();
            }
        }
    }

    Decimal::from_str(&mantissa).ok()
}

/// 解析耗材单元格: "名称(数量),名称(数量)"
///
/// # 规则
/// - 逗号分隔，空项忽略
/// - 缺少 "(" 或名称为空 → 按策略处理
///   - REJECT_ROW: MalformedConsumable（整行失败）
///   - BEST_EFFORT: 保留名称，数量为空
pub fn parse_consumables(
    raw: Option<&str>,
    policy: ConsumablePolicy,
) -> ImportResult<Vec<Consumable>> {
    let raw = match raw {
        Some(r) if !r.trim().is_empty() => r,
        _ => return Ok(Vec::new()),
    };

    let mut consumables = Vec::new();
    for item in raw.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        let parsed = item.split_once('(').and_then(|(name, rest)| {
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Consumable {
                name: name.to_string(),
                quantity: rest.replacen(')', "", 1).trim().to_string(),
            })
        });

        match (parsed, policy) {
            (Some(c), _) => consumables.push(c),
            (None, ConsumablePolicy::RejectRow) => {
                return Err(ImportError::MalformedConsumable(item.to_string()));
            }
            (None, ConsumablePolicy::BestEffort) => {
                debug!(item = %item, "耗材缺少数量，按名称保留");
                consumables.push(Consumable {
                    name: item.trim_matches(|c| c == '(' || c == ')').trim().to_string(),
                    quantity: String::new(),
                });
            }
        }
    }

    Ok(consumables)
}

/// 解析科室单元格（逗号分隔，去空白，丢弃空项）
pub fn parse_departments(raw: Option<&str>) -> Vec<String> {
    raw.map(|r| {
        r.split(',')
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// 父行优先的稳定排序（携带 "#" 的行在前，组内保持原顺序）
pub fn sort_parents_first(rows: &mut [TariffCsvRow]) {
    rows.sort_by_key(|row| !row.has_reference());
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ==========================================
// 行预处理
// ==========================================
impl TariffCsvRow {
    /// 预处理为类型化行
    pub fn prepare(&self, policy: ConsumablePolicy) -> ImportResult<PreparedRow> {
        let raw_name = self.name.trim();
        if raw_name.is_empty() {
            return Err(ImportError::EmptyName(self.row_number));
        }

        let departments = parse_departments(self.department.as_deref());
        let is_lab_test = departments.iter().any(|d| d == LAB_DEPARTMENT);
        let parsed_name = if is_lab_test {
            parse_lab_test_name(raw_name)
        } else {
            plain_name(raw_name)
        };

        let tariffs = TariffValues {
            tariff: parse_tariff(self.tariff.as_deref()),
            gov_insurance: parse_tariff(self.gov_insurance.as_deref()),
            tariff_with_co: parse_tariff(self.tariff_with_co.as_deref()),
            private_tariff: parse_tariff(self.private_tariff.as_deref()),
            foreigners_tariff: parse_tariff(self.foreigners_tariff.as_deref()),
        };

        Ok(PreparedRow {
            row_number: self.row_number,
            raw_name: raw_name.to_string(),
            reference: non_blank(&self.reference),
            category: non_blank(&self.category),
            departments,
            unit: non_blank(&self.unit),
            normal_range: non_blank(&self.normal_range),
            consumables: parse_consumables(self.consumables.as_deref(), policy)?,
            tariffs,
            is_lab_test,
            parsed_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "#,NAME,CATEGORY,DEPARTMENT,UNIT,NORMAL_RANGE,TARIFF,GOV_INSURANCE,TARIFF_WITH_CO,PRIVATE_TARIFF,CONSUMABLES,FOREIGNERS_TARIFF";

    #[test]
    fn test_parse_csv_reads_typed_rows() {
        let csv = format!(
            "{}\n,Consultation,SERVICE,OPD,,,5000,4000,,4500,\"Gloves(2),Syringe(1)\",10000\n\n",
            HEADER
        );
        let rows = parse_csv(&csv).unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.row_number, 1);
        assert_eq!(row.name, "Consultation");
        assert_eq!(row.reference, None);
        assert_eq!(row.tariff.as_deref(), Some("5000"));
        assert_eq!(row.tariff_with_co, None);
        assert_eq!(row.consumables.as_deref(), Some("Gloves(2),Syringe(1)"));
    }

    #[test]
    fn test_parse_csv_only_requires_name_header() {
        let rows = parse_csv("NAME,TARIFF\n X-Ray ,300\n").unwrap();
        assert_eq!(rows[0].name, "X-Ray");
        assert_eq!(rows[0].department, None);
    }

    #[test]
    fn test_parse_csv_errors() {
        assert!(matches!(
            parse_csv("TARIFF\n100\n"),
            Err(ImportError::CsvParseError(_))
        ));
        assert!(matches!(
            parse_csv("NAME,TARIFF\nA,1,2\n"),
            Err(ImportError::CsvParseError(_))
        ));
        assert!(matches!(parse_csv("NAME,TARIFF\n"), Err(ImportError::EmptyCsv)));
        assert!(matches!(parse_csv("NAME,TARIFF\n,\n"), Err(ImportError::EmptyCsv)));
    }

    #[test]
    fn test_parse_tariff_float_prefix_semantics() {
        assert_eq!(parse_tariff(Some("5000")), Some(Decimal::new(5000, 0)));
        assert_eq!(parse_tariff(Some(" 42.50 ")), Some(Decimal::new(4250, 2)));
        assert_eq!(parse_tariff(Some("5000 RWF")), Some(Decimal::new(5000, 0)));
        assert_eq!(parse_tariff(Some("1,200")), Some(Decimal::new(1, 0)));
        assert_eq!(parse_tariff(Some(".5")), Some(Decimal::new(5, 1)));
        assert_eq!(parse_tariff(Some("-3")), Some(Decimal::new(-3, 0)));
        assert_eq!(parse_tariff(Some("1e3")), Some(Decimal::new(1000, 0)));
        assert_eq!(parse_tariff(Some("7.")), Some(Decimal::new(7, 0)));
        assert_eq!(parse_tariff(Some("N/A")), None);
        assert_eq!(parse_tariff(Some("")), None);
        assert_eq!(parse_tariff(Some(".")), None);
        assert_eq!(parse_tariff(None), None);
    }

    #[test]
    fn test_parse_consumables() {
        let items =
            parse_consumables(Some("Gloves(2), Syringe (1),"), ConsumablePolicy::RejectRow)
                .unwrap();
        assert_eq!(
            items,
            vec![
                Consumable {
                    name: "Gloves".to_string(),
                    quantity: "2".to_string()
                },
                Consumable {
                    name: "Syringe".to_string(),
                    quantity: "1".to_string()
                },
            ]
        );
        assert!(parse_consumables(None, ConsumablePolicy::RejectRow)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_malformed_consumable_follows_policy() {
        let rejected = parse_consumables(Some("Gloves(2),Cotton"), ConsumablePolicy::RejectRow);
        assert!(matches!(rejected, Err(ImportError::MalformedConsumable(item)) if item == "Cotton"));

        let kept =
            parse_consumables(Some("Gloves(2),Cotton"), ConsumablePolicy::BestEffort).unwrap();
        assert_eq!(kept[1].name, "Cotton");
        assert_eq!(kept[1].quantity, "");
    }

    #[test]
    fn test_parse_departments() {
        assert_eq!(
            parse_departments(Some(" LABORATOIRE , ,OPD")),
            vec!["LABORATOIRE".to_string(), "OPD".to_string()]
        );
        assert!(parse_departments(None).is_empty());
    }

    #[test]
    fn test_sort_parents_first_is_stable() {
        let mk = |name: &str, reference: Option<&str>| TariffCsvRow {
            name: name.to_string(),
            reference: reference.map(|r| r.to_string()),
            ..Default::default()
        };
        let mut rows = vec![
            mk("(1)Hb", None),
            mk("FBC", Some("1")),
            mk("X-Ray", None),
            mk("Lipids", Some("2")),
        ];
        sort_parents_first(&mut rows);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["FBC", "Lipids", "(1)Hb", "X-Ray"]);
    }

    #[test]
    fn test_prepare_lab_child_row() {
        let row = TariffCsvRow {
            name: "(7)Hemoglobin".to_string(),
            department: Some("LABORATOIRE".to_string()),
            unit: Some("g/dL".to_string()),
            normal_range: Some(" ".to_string()),
            tariff: Some("abc".to_string()),
            row_number: 3,
            ..Default::default()
        };
        let prepared = row.prepare(ConsumablePolicy::RejectRow).unwrap();
        assert!(prepared.is_lab_test);
        assert!(prepared.is_child_test());
        assert_eq!(prepared.parsed_name.test_name, "Hemoglobin");
        assert_eq!(prepared.normal_range, None);
        assert_eq!(prepared.tariffs.tariff, None);
    }

    #[test]
    fn test_prepare_non_lab_row_keeps_full_name() {
        let row = TariffCsvRow {
            name: "(7)Hemoglobin".to_string(),
            department: Some("OPD".to_string()),
            ..Default::default()
        };
        let prepared = row.prepare(ConsumablePolicy::RejectRow).unwrap();
        assert!(!prepared.is_lab_test);
        assert_eq!(prepared.parsed_name.test_name, "(7)Hemoglobin");
    }

    #[test]
    fn test_prepare_rejects_blank_name() {
        let row = TariffCsvRow {
            name: "  ".to_string(),
            department: Some("OPD".to_string()),
            row_number: 4,
            ..Default::default()
        };
        assert!(matches!(
            row.prepare(ConsumablePolicy::RejectRow),
            Err(ImportError::EmptyName(4))
        ));
    }
}
