// ==========================================
// TariffApi 集成测试
// ==========================================
// 覆盖: 鉴权、输入校验、响应信封、价目缓存与失效、报价
// ==========================================


use clinic_tariff::api::{ApiError, ImportProductsRequest};
use clinic_tariff::cache::product_tariff_key;
use clinic_tariff::cache::CacheStore;
use clinic_tariff::{PaymentContext, PaymentMode, Principal, Role};
use rust_decimal::Decimal;
use test_helpers::{admin, csv, TestEnv, CLINIC_ID, HEADER};

const CONSULTATION: &str = ",Consultation,EXAM,GENERAL,,,5000,,,4500,,10000";

fn request(content: String) -> ImportProductsRequest {
    ImportProductsRequest {
        csv_content: content,
    }
}

// ==========================================
// 鉴权与输入
// ==========================================

#[tokio::test]
async fn test_non_admin_is_rejected_before_import() {
    let env = TestEnv::new().await;

    for role in [Role::Doctor, Role::Nurse, Role::Accountant, Role::Receptionist] {
        let principal = Principal::new("u", role, CLINIC_ID);
        let err = env
            .state
            .tariff_api
            .import_products_from_csv(&principal, request(csv(&[CONSULTATION])))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(err.status_code(), 403);
    }

    assert_eq!(env.count("SELECT COUNT(*) FROM product"), 0);
}

#[tokio::test]
async fn test_super_admin_can_import() {
    let env = TestEnv::new().await;
    let principal = Principal::new("root", Role::SuperAdmin, CLINIC_ID);

    let response = env
        .state
        .tariff_api
        .import_products_from_csv(&principal, request(csv(&[CONSULTATION])))
        .await
        .unwrap();
    assert_eq!(response.data.successful_imports, 1);
}

#[tokio::test]
async fn test_invalid_csv_is_bad_request() {
    let env = TestEnv::new().await;

    let cases = vec![
        String::new(),
        "   \n".to_string(),
        format!("{}\n", HEADER),
        "CODE,PRICE\nA,1\n".to_string(),
    ];
    for content in cases {
        let err = env
            .state
            .tariff_api
            .import_products_from_csv(&admin(), request(content))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)), "unexpected: {:?}", err);
    }
}

#[tokio::test]
async fn test_uneven_record_rejects_whole_request() {
    let env = TestEnv::new().await;

    let err = env
        .state
        .tariff_api
        .import_products_from_csv(&admin(), request(csv(&[CONSULTATION, ",Broken,EXAM"])))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    assert_eq!(env.count("SELECT COUNT(*) FROM product"), 0);
}

// ==========================================
// 响应信封
// ==========================================

#[tokio::test]
async fn test_response_envelope() {
    let env = TestEnv::new().await;

    let response = env
        .state
        .tariff_api
        .import_products_from_csv(
            &admin(),
            request(csv(&[CONSULTATION, ",Dental Check,EXAM,DENTAL,,,3000,,,2500,,6000"])),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.message.contains('2'));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], 200);
    assert_eq!(json["data"]["successfulImports"], 2);
    assert_eq!(json["data"]["failedImports"], 0);
    assert!(json["data"]["errors"].as_array().unwrap().is_empty());
}

#[test]
fn test_request_accepts_camel_case_field() {
    let req: ImportProductsRequest =
        serde_json::from_str(r#"{"csvContent":"NAME\nConsultation"}"#).unwrap();
    assert_eq!(req.csv_content, "NAME\nConsultation");
}

// ==========================================
// 价目查询与缓存
// ==========================================

#[tokio::test]
async fn test_product_tariff_is_cached() {
    let env = TestEnv::new().await;
    env.state
        .tariff_api
        .import_products_from_csv(&admin(), request(csv(&[CONSULTATION])))
        .await
        .unwrap();
    let product_id = env.product_id("Consultation");

    let first = env
        .state
        .tariff_api
        .get_product_tariff(&admin(), product_id)
        .await
        .unwrap();
    let second = env
        .state
        .tariff_api
        .get_product_tariff(&admin(), product_id)
        .await
        .unwrap();

    assert_eq!(first.data.product.id, product_id);
    assert_eq!(second.data.insurance_prices.len(), 3);

    let stats = env.state.cache.stats().unwrap();
    assert_eq!(stats.keys["tariff"].misses, 1);
    assert_eq!(stats.keys["tariff"].hits, 1);
}

#[tokio::test]
async fn test_import_invalidates_cached_tariff() {
    let env = TestEnv::new().await;
    let api = &env.state.tariff_api;
    api.import_products_from_csv(&admin(), request(csv(&[CONSULTATION])))
        .await
        .unwrap();
    let product_id = env.product_id("Consultation");

    api.get_product_tariff(&admin(), product_id).await.unwrap();
    let key = product_tariff_key(CLINIC_ID, product_id);
    assert!(env.state.cache.get(&key).await.unwrap().is_some());

    api.import_products_from_csv(
        &admin(),
        request(csv(&[",Consultation,EXAM,GENERAL,,,,,,4800,,"])),
    )
    .await
    .unwrap();
    assert!(env.state.cache.get(&key).await.unwrap().is_none());

    let refreshed = api.get_product_tariff(&admin(), product_id).await.unwrap();
    assert_eq!(refreshed.data.product.base_price, Some(Decimal::from(4800)));
}

#[tokio::test]
async fn test_import_invalidates_shared_product_in_other_clinic() {
    let env = TestEnv::new().await;
    let api = &env.state.tariff_api;
    env.state.bootstrap_clinic(2, "Huye").await.unwrap();
    let huye_admin = Principal::new("admin-2", Role::ClinicAdmin, 2);

    api.import_products_from_csv(&admin(), request(csv(&[CONSULTATION])))
        .await
        .unwrap();
    api.import_products_from_csv(&huye_admin, request(csv(&[CONSULTATION])))
        .await
        .unwrap();
    let product_id = env.product_id("Consultation");

    let cached = api.get_product_tariff(&huye_admin, product_id).await.unwrap();
    assert_eq!(cached.data.product.base_price, Some(Decimal::from(4500)));

    // 诊所 1 改价，产品为两诊所共享
    api.import_products_from_csv(
        &admin(),
        request(csv(&[",Consultation,EXAM,GENERAL,,,,,,9999,,"])),
    )
    .await
    .unwrap();
    assert!(env
        .state
        .cache
        .get(&product_tariff_key(2, product_id))
        .await
        .unwrap()
        .is_none());

    let refreshed = api.get_product_tariff(&huye_admin, product_id).await.unwrap();
    assert_eq!(refreshed.data.product.base_price, Some(Decimal::from(9999)));
}

#[tokio::test]
async fn test_tariff_of_other_clinic_is_not_found() {
    let env = TestEnv::new().await;
    env.state.tariff_repo.ensure_clinic(2, "Huye").unwrap();
    env.state
        .tariff_api
        .import_products_from_csv(&admin(), request(csv(&[CONSULTATION])))
        .await
        .unwrap();
    let product_id = env.product_id("Consultation");

    let outsider = Principal::new("u2", Role::Doctor, 2);
    let err = env
        .state
        .tariff_api
        .get_product_tariff(&outsider, product_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

// ==========================================
// 报价
// ==========================================

#[tokio::test]
async fn test_quote_after_import() {
    let env = TestEnv::new().await;
    env.state
        .tariff_api
        .import_products_from_csv(&admin(), request(csv(&[CONSULTATION])))
        .await
        .unwrap();
    let product_id = env.product_id("Consultation");
    let cashier = Principal::new("c1", Role::Accountant, CLINIC_ID);

    let cash = PaymentContext {
        payment_mode: PaymentMode::Cash,
        insurance_company: None,
        coverage_percentage: None,
        nationality: "Rwanda".to_string(),
        is_a_foreigner: false,
    };
    let quote = env
        .state
        .tariff_api
        .quote_products(&cashier, &[product_id], &cash)
        .await
        .unwrap()
        .data;
    assert_eq!(quote.amount, Decimal::from(4500));
    assert_eq!(quote.patient_amount, Decimal::from(4500));

    let insured = PaymentContext {
        payment_mode: PaymentMode::Insurance,
        insurance_company: Some("RSSB".to_string()),
        coverage_percentage: Some(Decimal::from(80)),
        nationality: "Rwanda".to_string(),
        is_a_foreigner: false,
    };
    let quote = env
        .state
        .tariff_api
        .quote_products(&cashier, &[product_id], &insured)
        .await
        .unwrap()
        .data;
    assert_eq!(quote.amount, Decimal::from(5000));
    assert_eq!(quote.insurance_amount, Decimal::from(4000));
    assert_eq!(quote.patient_amount, Decimal::from(1000));
    assert_eq!(quote.details[0].product_name, "Consultation");
}

#[tokio::test]
async fn test_quote_unknown_product_is_not_found() {
    let env = TestEnv::new().await;
    let context = PaymentContext {
        payment_mode: PaymentMode::Cash,
        insurance_company: None,
        coverage_percentage: None,
        nationality: "Rwanda".to_string(),
        is_a_foreigner: false,
    };

    let err = env
        .state
        .tariff_api
        .quote_products(&admin(), &[404], &context)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = env
        .state
        .tariff_api
        .quote_products(&admin(), &[], &context)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}
