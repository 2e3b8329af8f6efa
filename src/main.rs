// ==========================================
// 诊所收费目录系统 - 命令行入口
// ==========================================
// 用法:
//   clinic-tariff <csv_path> [clinic_id] [db_path]
// 以 SUPER_ADMIN 身份把 CSV 导入指定诊所，输出 JSON 响应信封
// 环境变量 CLINIC_TARIFF_LANG 指定响应消息语言（默认 zh-CN）
// ==========================================

use anyhow::{bail, Context};
use clinic_tariff::api::ImportProductsRequest;
use clinic_tariff::app::{get_default_db_path, AppState};
use clinic_tariff::{i18n, logging, Principal, Role};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    if let Ok(lang) = std::env::var("CLINIC_TARIFF_LANG") {
        i18n::set_locale(&lang);
    }

    let mut args = std::env::args().skip(1);
    let csv_path = match args.next() {
        Some(path) => path,
        None => bail!("用法: clinic-tariff <csv_path> [clinic_id] [db_path]"),
    };
    let clinic_id: i64 = match args.next() {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("无效的 clinic_id: {}", raw))?,
        None => 1,
    };
    let db_path = args.next().unwrap_or_else(get_default_db_path);

    tracing::info!("==================================================");
    tracing::info!("{} v{}", clinic_tariff::APP_NAME, clinic_tariff::VERSION);
    tracing::info!("使用数据库: {}", db_path);
    tracing::info!("==================================================");

    let csv_content = std::fs::read_to_string(&csv_path)
        .with_context(|| format!("无法读取 CSV 文件: {}", csv_path))?;

    let state = AppState::new(db_path)?;
    state
        .bootstrap_clinic(clinic_id, &format!("Clinic {}", clinic_id))
        .await?;

    let principal = Principal::new("cli", Role::SuperAdmin, clinic_id);
    let response = state
        .tariff_api
        .import_products_from_csv(&principal, ImportProductsRequest { csv_content })
        .await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
