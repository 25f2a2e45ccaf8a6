use crate::core::filter::FilterCriteria;
use crate::core::sort::{SortDirection, SortState};
use crate::domain::model::QueryParams;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "chegou-hub")]
#[command(about = "Fetch, filter and summarise Chegou Hub dashboard data")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, default_value = "chegou-hub.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a view and print its table and summary
    Fetch(ViewArgs),
    /// Fetch a view and write a ZIP report
    Export {
        #[command(flatten)]
        view: ViewArgs,
        /// Output directory
        #[arg(long, default_value = "./output")]
        output: String,
        #[arg(long, default_value = "relatorio.zip")]
        file_name: String,
    },
    /// Compute per-product effectiveness from an order CSV
    Efetividade(EfetividadeArgs),
    /// Submit an engagement (ad boosting) order
    Engajamento {
        #[arg(long)]
        url: String,
        #[arg(long)]
        quantidade: u32,
        #[arg(long, default_value = "curtidas")]
        tipo: String,
    },
    /// Fetch a view once, then re-filter on each search term read from stdin
    Search {
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    /// View name from the configuration file
    #[arg(long)]
    pub view: String,

    /// Server-side start date (YYYY-MM-DD); also the local "created on/after" filter
    #[arg(long)]
    pub from: Option<NaiveDate>,

    #[arg(long)]
    pub to: Option<NaiveDate>,

    #[arg(long)]
    pub country: Option<String>,

    #[arg(long)]
    pub store: Option<String>,

    /// Keep only these statuses (repeatable)
    #[arg(long = "status")]
    pub statuses: Vec<String>,

    /// Keep records created by any of these names (repeatable)
    #[arg(long = "creator")]
    pub creators: Vec<String>,

    #[arg(long)]
    pub search: Option<String>,

    /// Column to sort by
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long)]
    pub desc: bool,

    /// Output format: table, csv or json
    #[arg(long, default_value = "table")]
    pub format: String,
}

impl ViewArgs {
    pub fn query(&self) -> QueryParams {
        QueryParams {
            date_from: self.from,
            date_to: self.to,
            country: self.country.clone(),
            store: self.store.clone(),
            ..Default::default()
        }
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            statuses: self.statuses.iter().cloned().collect(),
            creators: self.creators.iter().map(|c| c.trim().to_string()).collect(),
            search: self.search.clone(),
            created_from: self.from,
            created_to: self.to,
        }
    }

    pub fn sort_state(&self) -> Option<SortState> {
        let direction = if self.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        self.sort.as_deref().map(|c| SortState::new(c, direction))
    }
}

#[derive(Debug, Clone, Args)]
pub struct EfetividadeArgs {
    /// CSV file with one order per line
    #[arg(long)]
    pub file: String,

    #[arg(long, default_value = "Product")]
    pub product_column: String,

    #[arg(long, default_value = "Status")]
    pub status_column: String,

    /// Read when the file has no status column
    #[arg(long, default_value = "Confirmed")]
    pub confirmed_column: String,

    #[arg(long, default_value = "Delivered")]
    pub delivered_column: String,

    /// Statuses that count as delivered
    #[arg(long, value_delimiter = ',', default_value = "Delivered,Entregue")]
    pub delivered: Vec<String>,

    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long)]
    pub desc: bool,

    /// Also upload the file to this resource, e.g. metricas/ecomhub/upload/
    #[arg(long)]
    pub upload: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch_args() {
        let cli = Cli::parse_from([
            "chegou-hub",
            "fetch",
            "--view",
            "projetos",
            "--status",
            "ativo",
            "--status",
            "pausado",
            "--from",
            "2024-01-15",
            "--sort",
            "nome",
            "--desc",
        ]);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(cli.config, "chegou-hub.toml");
        assert_eq!(args.criteria().statuses.len(), 2);
        assert_eq!(args.query().date_from, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(args.sort_state(), Some(SortState::new("nome", SortDirection::Desc)));
    }

    #[test]
    fn test_parse_efetividade_defaults() {
        let cli = Cli::parse_from(["chegou-hub", "-v", "efetividade", "--file", "pedidos.csv"]);
        assert!(cli.verbose);
        let Command::Efetividade(args) = cli.command else {
            panic!("expected efetividade");
        };
        assert_eq!(args.delivered, vec!["Delivered", "Entregue"]);
        assert_eq!(args.product_column, "Product");
    }
}
