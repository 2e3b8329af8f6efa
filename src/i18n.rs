// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库，语言包位于 locales/
// 支持: zh-CN（默认）、en
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

use tracing::warn;

/// 默认语言
pub const DEFAULT_LOCALE: &str = "zh-CN";

/// 已提供语言包的语言
pub const SUPPORTED_LOCALES: [&str; 2] = ["zh-CN", "en"];

/// 把外部语言标记归一为已支持的语言
///
/// 只看主语言子标签，大小写与分隔符不敏感：
/// "zh" / "zh_cn" / "ZH-TW" → "zh-CN"，"en-US" / "EN" → "en"
pub fn normalize_locale(raw: &str) -> Option<&'static str> {
    let primary = raw
        .trim()
        .split(|c: char| c == '-' || c == '_')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match primary.as_str() {
        "zh" => Some("zh-CN"),
        "en" => Some("en"),
        _ => None,
    }
}

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言，返回实际生效的语言
///
/// 不支持的语言回退到 DEFAULT_LOCALE
pub fn set_locale(raw: &str) -> &'static str {
    let locale = normalize_locale(raw).unwrap_or_else(|| {
        warn!(requested = raw, fallback = DEFAULT_LOCALE, "不支持的语言，使用默认语言");
        DEFAULT_LOCALE
    });
    rust_i18n::set_locale(locale);
    locale
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use clinic_tariff::i18n::t;
/// let msg = t("common.forbidden");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息，替换 `%{name}` 占位符
///
/// # 示例
/// ```no_run
/// use clinic_tariff::i18n::t_with_args;
/// let msg = t_with_args("import.success", &[("count", "12")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(t(key), |msg, (name, value)| {
        msg.replace(&format!("%{{{}}}", name), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为全局状态，测试并行执行时需串行化
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_normalize_locale() {
        assert_eq!(normalize_locale("zh"), Some("zh-CN"));
        assert_eq!(normalize_locale("zh_cn"), Some("zh-CN"));
        assert_eq!(normalize_locale(" en-US "), Some("en"));
        assert_eq!(normalize_locale("EN"), Some("en"));
        assert_eq!(normalize_locale("fr-FR"), None);
        assert_eq!(normalize_locale(""), None);

        for locale in SUPPORTED_LOCALES {
            assert_eq!(normalize_locale(locale), Some(locale));
        }
    }

    #[test]
    fn test_set_locale_falls_back() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        assert_eq!(set_locale("en-GB"), "en");
        assert_eq!(current_locale(), "en");

        assert_eq!(set_locale("rw"), DEFAULT_LOCALE);
        assert_eq!(current_locale(), "zh-CN");
    }

    #[test]
    fn test_translate() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(t("common.forbidden"), "无权限执行该操作");

        set_locale("en");
        assert_eq!(t("import.csv_required"), "CSV content is required");
        assert_eq!(
            t_with_args("import.success", &[("count", "12")]),
            "Successfully imported 12 products"
        );
        assert_eq!(
            t_with_args("import.parse_failed", &[("reason", "bad quote")]),
            "Failed to parse CSV: bad quote"
        );

        set_locale(DEFAULT_LOCALE);
    }
}
