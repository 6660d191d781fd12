use crate::server;
use clap::{Args, Parser, Subcommand};
use metrolist::config::{AppConfig, SourceLocation};
use metrolist::error::AppError;
use metrolist::store::JsonFileStore;
use metrolist::telemetry;
use metrolist::workflows::ami::{
    opt_into_recommendation, record_estimate, AmiEstimate, AmiIncomeTable, HouseholdProfile,
    IncomeRate,
};
use metrolist::workflows::search::{
    load_ami_table_or_default, load_listings_or_empty, AmiTableSource, DataSource, FilterChange,
    SearchSession,
};
use serde_json::json;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "Metrolist",
    about = "Search income-restricted housing listings and estimate AMI eligibility",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Filter listings with the persisted search session
    Search(SearchArgs),
    /// Area Median Income tools
    Ami {
        #[command(subcommand)]
        command: AmiCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AmiCommand {
    /// Estimate a household's AMI percentage and the recommended search bound
    Estimate(EstimateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Listings URL or JSON file (defaults to METROLIST_LISTINGS_SOURCE)
    #[arg(long)]
    listings: Option<String>,
    /// Page of results to show
    #[arg(long, allow_negative_numbers = true)]
    page: Option<i64>,
    /// Check a filter box, e.g. `offer.rent` or `location.neighborhood.Dorchester`
    #[arg(long = "check", value_name = "PATH")]
    checks: Vec<String>,
    /// Uncheck a filter box
    #[arg(long = "uncheck", value_name = "PATH")]
    unchecks: Vec<String>,
    /// Set a filter value, e.g. `amiQualification.lowerBound=40`
    #[arg(long = "set", value_name = "PATH=VALUE")]
    sets: Vec<String>,
    /// Reset filters to defaults before applying changes
    #[arg(long)]
    clear: bool,
    /// Restore the filters in place before the last clear
    #[arg(long, conflicts_with = "clear")]
    undo: bool,
}

#[derive(Args, Debug)]
struct EstimateArgs {
    /// Household size as offered by the form (1-6, or `6+`)
    #[arg(long)]
    household_size: String,
    /// Household income, currency formatting allowed (`$5,000.00`)
    #[arg(long)]
    income: String,
    /// Monthly or Annual
    #[arg(long, value_parser = parse_income_rate)]
    rate: IncomeRate,
    /// AMI tier table URL, JSON file, or CSV file (defaults to METROLIST_AMI_SOURCE)
    #[arg(long)]
    table: Option<String>,
    /// Remember the recommendation for the next search
    #[arg(long)]
    save: bool,
    /// Start the next search from the recommended AMI (implies --save)
    #[arg(long)]
    use_as_lower_bound: bool,
}

fn parse_income_rate(raw: &str) -> Result<IncomeRate, String> {
    raw.parse()
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Search(args) => run_search(args).await,
        Command::Ami {
            command: AmiCommand::Estimate(args),
        } => run_estimate(args).await,
    }
}

fn parse_location(raw: &str) -> Result<SourceLocation, AppError> {
    SourceLocation::parse(raw)
        .map_err(|err| AppError::BadRequest(format!("'{raw}' is not a usable source: {err}")))
}

fn search_changes(args: &SearchArgs) -> Result<Vec<FilterChange>, AppError> {
    let mut changes = Vec::new();
    for path in &args.checks {
        changes.push(FilterChange::checkbox(path, true)?);
    }
    for path in &args.unchecks {
        changes.push(FilterChange::checkbox(path, false)?);
    }
    for assignment in &args.sets {
        let (path, value) = assignment.split_once('=').ok_or_else(|| {
            AppError::BadRequest(format!("--set expects PATH=VALUE, got '{assignment}'"))
        })?;
        changes.push(FilterChange::value(path.trim(), value.trim())?);
    }
    Ok(changes)
}

async fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let changes = search_changes(&args)?;
    let listings = match args.listings.as_deref() {
        Some(raw) => Some(parse_location(raw)?),
        None => config.sources.listings.clone(),
    };
    let homes = match listings {
        Some(location) => load_listings_or_empty(&DataSource::new(location)).await,
        None => Vec::new(),
    };

    let store = Arc::new(JsonFileStore::open(&config.search.state_path)?);
    let mut session = SearchSession::with_page_size(store, config.search.page_size)?;
    session.load_listings(homes, args.page)?;

    if args.clear {
        session.clear_filters()?;
    }
    if args.undo {
        session.undo_clear_filters()?;
    }
    for change in &changes {
        session.apply_change(change)?;
    }
    if !changes.is_empty() || args.clear || args.undo {
        session.set_page(args.page);
    }

    let output = json!({
        "filters": session.filters(),
        "showClearFilters": session.show_clear_filters_initially(),
        "listingCounts": session.listing_counts(),
        "results": session.results(),
    });
    println!("{}", pretty(&output));
    Ok(())
}

async fn run_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let table = match args.table.as_deref() {
        Some(raw) => DataSource::new(parse_location(raw)?).fetch_ami_table().await?,
        None => match config.sources.ami_table.clone() {
            Some(location) => load_ami_table_or_default(&DataSource::new(location)).await,
            None => AmiIncomeTable::default(),
        },
    };

    let profile = HouseholdProfile {
        household_size: args.household_size,
        household_income: args.income,
        income_rate: args.rate,
    };
    let estimate = AmiEstimate::for_household(&profile, &table);

    if args.save || args.use_as_lower_bound {
        let store = JsonFileStore::open(&config.search.state_path)?;
        record_estimate(&store, &estimate, profile.annualized_income())?;
        if args.use_as_lower_bound {
            opt_into_recommendation(&store)?;
        }
    }

    println!("{}", pretty(&json!(estimate)));
    println!("{}", estimate.summary());
    Ok(())
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
