use crate::adapters::{ApiClient, LocalStorage};
use crate::config::cli::{Cli, Command, EfetividadeArgs, ViewArgs};
use crate::config::HubConfig;
use crate::core::debounce::Debouncer;
use crate::core::efetividade::{parse_orders_csv, EfetividadeOptions, EfetividadeTable};
use crate::core::engine::{DashboardEngine, ViewSnapshot};
use crate::core::export::export_report;
use crate::core::form::{EngajamentoForm, FormController, FormModel, FormState};
use crate::core::render::{effectiveness_tier, render_table, stat_cards};
use crate::core::sort::{parse_percent, sort_records, SortDirection};
use crate::utils::error::{HubError, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(cli: Cli, config: HubConfig) -> Result<()> {
    match cli.command {
        Command::Fetch(args) => fetch(&config, &args).await,
        Command::Export {
            view,
            output,
            file_name,
        } => export(&config, &view, &output, &file_name).await,
        Command::Efetividade(args) => efetividade(&config, &args).await,
        Command::Engajamento {
            url,
            quantidade,
            tipo,
        } => engajamento(&config, EngajamentoForm { url, quantidade, tipo }).await,
        Command::Search { view } => search(&config, &view).await,
    }
}

async fn load_view(config: &HubConfig, args: &ViewArgs) -> Result<DashboardEngine<ApiClient>> {
    let definition = config.view(&args.view)?;
    let client = ApiClient::new(config.session(), config.client_settings())?;
    let engine = DashboardEngine::new(client, definition);
    {
        let view = engine.view();
        let mut view = view.lock().await;
        view.set_criteria(args.criteria());
        if let Some(sort) = args.sort_state() {
            view.set_sort(Some(sort));
        }
    }
    engine.refresh(&args.query()).await?;
    Ok(engine)
}

fn print_snapshot(snapshot: &ViewSnapshot, format: &str, precision: u32) -> Result<()> {
    match format {
        "json" => {
            let rows: Vec<_> = snapshot.rows.iter().map(|r| &r.data).collect();
            let out = serde_json::json!({
                "rows": rows,
                "summary": snapshot.summary,
                "cards": stat_cards(&snapshot.summary, precision),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        "csv" => print!("{}", render_table(&snapshot.rows, &snapshot.columns, b',')?),
        _ => {
            print!("{}", render_table(&snapshot.rows, &snapshot.columns, b'\t')?);
            println!();
            for card in stat_cards(&snapshot.summary, precision) {
                println!("{:<24} {:>12}  [{:?}]", card.label, card.value, card.color);
            }
        }
    }
    Ok(())
}

async fn fetch(config: &HubConfig, args: &ViewArgs) -> Result<()> {
    let engine = load_view(config, args).await?;
    let snapshot = engine.snapshot().await;
    let total = engine.view().lock().await.records().len();
    tracing::info!("📊 {} of {} records visible", snapshot.rows.len(), total);
    print_snapshot(&snapshot, &args.format, engine.precision())
}

async fn export(config: &HubConfig, args: &ViewArgs, output: &str, file_name: &str) -> Result<()> {
    let engine = load_view(config, args).await?;
    let bundle = engine.report().await?;
    let storage = LocalStorage::new(output.to_string());
    let bytes = export_report(&storage, file_name, &bundle).await?;
    tracing::info!("📁 Report saved to: {}/{} ({} bytes)", output, file_name, bytes);
    println!("📁 Report saved to: {}/{}", output, file_name);
    Ok(())
}

/// Reads search terms from stdin and re-filters after the debounce window.
async fn search(config: &HubConfig, args: &ViewArgs) -> Result<()> {
    let engine = load_view(config, args).await?;
    let (mut debouncer, mut terms) = Debouncer::new(config.debounce());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => debouncer.push(line),
                None => break,
            },
            Some(term) = terms.recv() => apply_search(&engine, &term, &args.format).await?,
        }
    }

    if let Ok(Some(term)) = tokio::time::timeout(config.debounce() * 2, terms.recv()).await {
        apply_search(&engine, &term, &args.format).await?;
    }
    Ok(())
}

async fn apply_search(engine: &DashboardEngine<ApiClient>, term: &str, format: &str) -> Result<()> {
    engine.view().lock().await.set_search(term);
    let snapshot = engine.snapshot().await;
    println!("🔍 '{}': {} records", term.trim(), snapshot.rows.len());
    print_snapshot(&snapshot, format, engine.precision())
}

fn print_efetividade(table: &EfetividadeTable, args: &EfetividadeArgs) -> Result<()> {
    let mut rows = table.to_records();
    if let Some(column) = &args.sort {
        let direction = if args.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        rows = sort_records(&rows, column, direction);
    }

    let mut columns = EfetividadeTable::columns();
    columns.push("Faixa".to_string());
    for row in &mut rows {
        let pct = row
            .text("Efetividade")
            .and_then(|s| parse_percent(&s))
            .unwrap_or(0.0);
        row.insert("Faixa", format!("{:?}", effectiveness_tier(pct)));
    }
    print!("{}", render_table(&rows, &columns, b'\t')?);
    Ok(())
}

async fn efetividade(config: &HubConfig, args: &EfetividadeArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.file).await?;
    let options = EfetividadeOptions {
        product_column: args.product_column.clone(),
        status_column: args.status_column.clone(),
        confirmed_column: args.confirmed_column.clone(),
        delivered_column: args.delivered_column.clone(),
        delivered_statuses: args.delivered.clone(),
        ..Default::default()
    };
    let table = parse_orders_csv(&bytes, &options)?;
    tracing::info!("✅ Effectiveness computed for {} products", table.rows.len());
    print_efetividade(&table, args)?;

    if let Some(resource) = &args.upload {
        let mut client = ApiClient::new(config.session(), config.client_settings())?;
        client.ensure_csrf().await?;
        let file_name = std::path::Path::new(&args.file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("pedidos.csv")
            .to_string();
        client.upload(resource, &file_name, bytes, &[]).await?;
        tracing::info!("📤 Uploaded {} to {}", file_name, resource);
    }
    Ok(())
}

async fn engajamento(config: &HubConfig, form: EngajamentoForm) -> Result<()> {
    let mut client = ApiClient::new(config.session(), config.client_settings())?;
    let mut controller = FormController::new();

    // validate before touching the network, including the CSRF round trip
    let errors = form.check();
    if !errors.is_empty() {
        for e in &errors {
            tracing::warn!("❌ {}", e.user_friendly_message());
        }
        return Err(errors.into_iter().next().unwrap_or_else(|| HubError::processing("Formulário inválido")));
    }
    client.ensure_csrf().await?;

    let state = controller.submit(&form, &client).await.clone();
    match state {
        FormState::Success(value) => {
            println!("✅ Pedido enviado: {}", value);
            Ok(())
        }
        FormState::Error(e) => {
            for (field, message) in &e.field_errors {
                tracing::warn!("{}: {}", field, message);
            }
            if let Some(banner) = &e.banner {
                tracing::warn!("{}", banner);
            }
            Err(controller
                .take_error()
                .unwrap_or_else(|| HubError::processing("Falha ao enviar pedido")))
        }
        other => Err(HubError::processing(format!("Unexpected form state: {:?}", other))),
    }
}
