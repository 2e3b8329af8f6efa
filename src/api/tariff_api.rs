// ==========================================
// 诊所收费目录系统 - 价目 API
// ==========================================
// 职责: 价目导入入口、产品价目查询（带缓存）、产品报价
// 鉴权: 导入仅限 CLINIC_ADMIN / SUPER_ADMIN，拒绝发生在任何行被处理之前
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::cache::{get_or_load, invalidate_tariff_caches, product_tariff_key, CacheStore};
use crate::config::TariffImportConfigReader;
use crate::domain::payment::{PaymentContext, PaymentDetail, ProductQuote};
use crate::domain::principal::Principal;
use crate::domain::product::ProductTariff;
use crate::domain::tariff::TariffImportSummary;
use crate::domain::types::PaymentMode;
use crate::i18n::{t, t_with_args};
use crate::importer::TariffImporter;
use crate::repository::TariffRepository;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 导入请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProductsRequest {
    #[serde(alias = "csvContent")]
    pub csv_content: String,
}

/// 统一成功响应信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    fn ok(message: String, data: T) -> Self {
        Self {
            status: 200,
            message,
            data,
        }
    }
}

pub type ImportProductsResponse = ApiResponse<TariffImportSummary>;

// ==========================================
// TariffApi
// ==========================================
pub struct TariffApi {
    importer: Arc<dyn TariffImporter>,
    repo: Arc<TariffRepository>,
    config: Arc<dyn TariffImportConfigReader>,
    cache: Arc<dyn CacheStore>,
}

impl TariffApi {
    pub fn new(
        importer: Arc<dyn TariffImporter>,
        repo: Arc<TariffRepository>,
        config: Arc<dyn TariffImportConfigReader>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            importer,
            repo,
            config,
            cache,
        }
    }

    /// 从 CSV 导入价目
    ///
    /// # 参数
    /// - principal: 调用者（导入目标为其所属诊所）
    /// - request: CSV 文本
    ///
    /// # 返回
    /// - Ok: 成功/失败行数与错误样本
    /// - Err(Forbidden): 角色无权限
    /// - Err(BadRequest): CSV 为空、无法解析或无有效记录
    #[instrument(skip(self, request), fields(user_id = %principal.user_id, clinic_id = principal.clinic_id))]
    pub async fn import_products_from_csv(
        &self,
        principal: &Principal,
        request: ImportProductsRequest,
    ) -> ApiResult<ImportProductsResponse> {
        if !principal.can_manage_tariffs() {
            warn!(role = %principal.role, "无权限导入价目");
            return Err(ApiError::Forbidden(t("common.forbidden")));
        }

        if request.csv_content.trim().is_empty() {
            return Err(ApiError::BadRequest(t("import.csv_required")));
        }

        let summary = self
            .importer
            .import_csv(principal.clinic_id, &request.csv_content)
            .await?;

        // 缓存失效失败不影响已落库的导入结果
        if let Err(e) = invalidate_tariff_caches(
            self.cache.as_ref(),
            principal.clinic_id,
            &summary.touched_product_ids,
        )
        .await
        {
            warn!(error = %e, "价目缓存失效失败");
        }

        let count = summary.successful_imports.to_string();
        let message = t_with_args("import.success", &[("count", count.as_str())]);
        info!(
            successful = summary.successful_imports,
            failed = summary.failed_imports,
            "价目导入请求完成"
        );

        Ok(ApiResponse::ok(message, summary))
    }

    /// 查询调用者所属诊所内单个产品的价目（读穿缓存）
    #[instrument(skip(self), fields(clinic_id = principal.clinic_id))]
    pub async fn get_product_tariff(
        &self,
        principal: &Principal,
        product_id: i64,
    ) -> ApiResult<ApiResponse<ProductTariff>> {
        let ttl = self
            .config
            .get_tariff_cache_ttl()
            .await
            .map_err(|e| ApiError::InternalError(format!("读取缓存配置失败: {}", e)))?;

        let clinic_id = principal.clinic_id;
        let key = product_tariff_key(clinic_id, product_id);
        let tariff = get_or_load(self.cache.as_ref(), &key, ttl, move || async move {
            self.repo
                .find_product_tariff(clinic_id, product_id)?
                .ok_or_else(|| ApiError::NotFound(format!("Product(id={})不存在", product_id)))
        })
        .await?;

        Ok(ApiResponse::ok(t("tariff.fetched"), tariff))
    }

    /// 按支付方式为一组产品报价
    ///
    /// # 规则
    /// - 保险: 保险公司价格 × 覆盖比例；产品缺少该公司价格 → 错误
    /// - 现金: 本国患者 base_price，其他 foreigners_price；缺少 base_price → 错误
    /// - 总额为 0 → 错误
    #[instrument(skip(self, context), fields(clinic_id = principal.clinic_id, mode = ?context.payment_mode))]
    pub async fn quote_products(
        &self,
        principal: &Principal,
        product_ids: &[i64],
        context: &PaymentContext,
    ) -> ApiResult<ApiResponse<ProductQuote>> {
        if product_ids.is_empty() {
            return Err(ApiError::InvalidInput("产品列表不能为空".to_string()));
        }

        let tariffs = self
            .repo
            .find_product_tariffs(principal.clinic_id, product_ids)?;
        let quote = build_quote(&tariffs, context)?;

        Ok(ApiResponse::ok(t("tariff.quoted"), quote))
    }
}

fn build_quote(tariffs: &[ProductTariff], context: &PaymentContext) -> ApiResult<ProductQuote> {
    let mut details = Vec::with_capacity(tariffs.len());

    for tariff in tariffs {
        let detail = match context.payment_mode {
            PaymentMode::Insurance => insurance_detail(tariff, context)?,
            PaymentMode::Cash => cash_detail(tariff, context)?,
        };
        details.push(detail);
    }

    let amount: Decimal = details.iter().map(|d| d.amount).sum();
    if amount.is_zero() {
        return Err(ApiError::BusinessRuleViolation("报价总额为 0".to_string()));
    }

    Ok(ProductQuote {
        payment_mode: context.payment_mode,
        amount,
        patient_amount: details.iter().map(|d| d.patient_amount).sum(),
        insurance_amount: details.iter().map(|d| d.insurance_amount).sum(),
        details,
    })
}

fn insurance_detail(tariff: &ProductTariff, context: &PaymentContext) -> ApiResult<PaymentDetail> {
    let company = context
        .insurance_company
        .as_deref()
        .ok_or_else(|| ApiError::InvalidInput("保险支付缺少保险公司".to_string()))?;

    let price = tariff
        .insurance_prices
        .iter()
        .find(|ip| ip.company_name == company)
        .map(|ip| ip.price)
        .ok_or_else(|| {
            ApiError::BusinessRuleViolation(format!(
                "产品 {} 未定义 {} 的保险价格",
                tariff.product.name, company
            ))
        })?;

    let coverage = context.coverage_percentage.unwrap_or(Decimal::ZERO) / Decimal::ONE_HUNDRED;
    let insurance_amount = price * coverage;

    Ok(PaymentDetail {
        product_id: tariff.product.id,
        product_name: tariff.product.name.clone(),
        amount: price,
        patient_amount: price - insurance_amount,
        insurance_amount,
        quantity: 1,
    })
}

fn cash_detail(tariff: &ProductTariff, context: &PaymentContext) -> ApiResult<PaymentDetail> {
    let base_price = tariff
        .product
        .base_price
        .filter(|p| !p.is_zero())
        .ok_or_else(|| {
            ApiError::BusinessRuleViolation(format!(
                "产品 {} 未定义基础价格",
                tariff.product.name
            ))
        })?;

    let amount = if context.is_national() {
        base_price
    } else {
        tariff.product.foreigners_price.unwrap_or(Decimal::ZERO)
    };

    Ok(PaymentDetail {
        product_id: tariff.product.id,
        product_name: tariff.product.name.clone(),
        amount,
        patient_amount: amount,
        insurance_amount: Decimal::ZERO,
        quantity: 1,
    })
}
