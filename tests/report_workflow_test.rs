use chegou_hub::core::efetividade::{parse_orders_csv, EfetividadeOptions};
use chegou_hub::core::export::export_report;
use chegou_hub::core::render::{effectiveness_tier, EffectivenessTier};
use chegou_hub::utils::error::HubError;
use chegou_hub::utils::validation::Validate;
use chegou_hub::{ApiClient, ClientSettings, DashboardEngine, HubConfig, LocalStorage};
use httpmock::prelude::*;
use serde_json::json;
use std::io::Read;
use tempfile::TempDir;

#[test]
fn test_efetividade_from_order_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("pedidos.csv");
    let mut csv = String::from("Order,Product,Status\n");
    for i in 0..10 {
        let status = if i < 4 { "Delivered" } else { "Returned" };
        csv.push_str(&format!("{},Kit Escova,{}\n", i, status));
    }
    csv.push_str("10,Relógio,entregue\n11,Relógio,Cancelled\n");
    std::fs::write(&path, csv)?;

    let bytes = std::fs::read(&path)?;
    let table = parse_orders_csv(&bytes, &EfetividadeOptions::default())?;
    let records = table.to_records();

    let kit = records
        .iter()
        .find(|r| r.text("Produto").as_deref() == Some("Kit Escova"))
        .expect("kit row");
    assert_eq!(kit.text("Totais").as_deref(), Some("10"));
    assert_eq!(kit.text("Entregues").as_deref(), Some("4"));
    assert_eq!(kit.text("Efetividade").as_deref(), Some("40.00%"));
    assert_eq!(effectiveness_tier(40.0), EffectivenessTier::Fair);

    let total = records.last().expect("total row");
    assert_eq!(total.text("Produto").as_deref(), Some("Total"));
    assert_eq!(total.text("Efetividade").as_deref(), Some("45.00% (Média)"));
    Ok(())
}

#[test]
fn test_efetividade_from_confirmed_upload() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("confirmados.csv");
    let mut csv = String::from("Product,Confirmed\n");
    for i in 0..10 {
        csv.push_str(if i < 4 { "Kit Escova,Delivered\n" } else { "Kit Escova,Em trânsito\n" });
    }
    std::fs::write(&path, csv)?;

    let table = parse_orders_csv(&std::fs::read(&path)?, &EfetividadeOptions::default())?;
    let records = table.to_records();
    assert_eq!(records[0].text("Totais").as_deref(), Some("10"));
    assert_eq!(records[0].text("Entregues").as_deref(), Some("4"));
    assert_eq!(records[0].text("Efetividade").as_deref(), Some("40.00%"));
    Ok(())
}

#[test]
fn test_efetividade_missing_column() {
    let err = parse_orders_csv(b"Produto,Situacao\nKit,Entregue\n", &EfetividadeOptions::default())
        .unwrap_err();
    assert!(matches!(err, HubError::ClientValidationError { ref field, .. } if field == "Product"));
}

#[tokio::test]
async fn test_export_view_report_to_zip() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/metricas/dropi/pedidos/");
        then.status(200).json_body(json!({
            "data": [
                {"id": 1, "cliente": "Ana", "status": "entregue", "valor": 100},
                {"id": 2, "cliente": "Bia", "status": "cancelado", "valor": 50},
                {"id": 3, "cliente": "Caio", "status": "entregue", "valor": 150}
            ]
        }));
    });

    std::env::set_var("CHEGOU_TEST_BASE_URL", server.base_url());
    let config = HubConfig::from_toml_str(
        r#"
[api]
base_url = "${CHEGOU_TEST_BASE_URL}"

[[views]]
name = "dropi"
resource = "metricas/dropi/pedidos/"
status_vocabulary = ["entregue", "cancelado"]
sum_field = "valor"
group_field = "cliente"
required_columns = ["status", "valor"]
columns = ["id", "cliente", "status", "valor"]
precision = 2
ratios = [{ name = "entregues", numerator = ["entregue"] }]
"#,
    )?;
    config.validate()?;

    let client = ApiClient::new(config.session(), ClientSettings::default())?;
    let engine = DashboardEngine::new(client, config.view("dropi")?);
    engine.refresh(&Default::default()).await?;
    api_mock.assert();

    let bundle = engine.report().await?;
    assert_eq!(bundle.summary.total, 3);
    assert_eq!(bundle.summary.ratio("entregues"), Some(66.67));

    let storage = LocalStorage::new(output_path.clone());
    let written = export_report(&storage, "relatorio.zip", &bundle).await?;
    assert!(written > 0);

    let zip_path = temp_dir.path().join("relatorio.zip");
    let mut archive = zip::ZipArchive::new(std::fs::File::open(zip_path)?)?;
    let mut csv = String::new();
    archive.by_name("tabela.csv")?.read_to_string(&mut csv)?;
    assert_eq!(
        csv,
        "id,cliente,status,valor\n1,Ana,entregue,100\n2,Bia,cancelado,50\n3,Caio,entregue,150\n"
    );
    assert!(archive.by_name("resumo.json").is_ok());
    assert!(archive.by_name("tabela.tsv").is_ok());
    Ok(())
}
