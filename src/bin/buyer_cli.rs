use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use procurement_buyer::{
    client::{HttpProcurementApi, Session},
    config::{self, AppConfig},
    models::{OrderSummary, RecordKey, StoreMaterial},
    services::{
        merge_records, BuyerWorkspace, DashboardView, NegotiationTotals, StoreRequestOutcome,
        StoreSelector, Tab,
    },
};
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize()?;

    match cli.command {
        Commands::Stats => handle_stats(&context, cli.json).await?,
        Commands::List(args) => handle_list(&context, args, cli.json).await?,
        Commands::Timeline => handle_timeline(&context, cli.json).await?,
        Commands::Negotiate(args) => handle_negotiate(&context, args, cli.json).await?,
        Commands::Store(args) => handle_store(&context, args, cli.json).await?,
        Commands::Complete(args) => handle_complete(&context, args, cli.json).await?,
        Commands::Resend(args) => handle_resend(&context, args, cli.json).await?,
        Commands::SelectVendor(args) => handle_select_vendor(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "buyer-cli", about = "Buyer console for purchase orders and vendor splits", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dashboard counts per bucket and tab
    Stats,
    /// Records listed under one tab
    List(ListArgs),
    /// Every record, newest first
    Timeline,
    /// Edit negotiated unit prices on a purchase order
    Negotiate(NegotiateArgs),
    /// Route available materials to the internal store
    Store(StoreArgs),
    /// Mark a purchase order or PO child as purchased
    Complete(TargetArgs),
    /// Resend a rejected purchase order for approval
    Resend(ResendArgs),
    /// Assign a vendor to a purchase order or PO child
    SelectVendor(SelectVendorArgs),
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, value_parser = parse_tab, help = "ongoing, pending_approval, completed or rejected")]
    tab: Tab,
}

#[derive(Args)]
struct NegotiateArgs {
    #[arg(long, help = "Purchase order cr_id")]
    order: i64,
    #[arg(
        long = "price",
        value_parser = parse_key_value,
        help = "Negotiated price as material=price; repeatable"
    )]
    prices: Vec<(String, String)>,
    #[arg(long = "reset", help = "Material to restore to its original price; repeatable")]
    resets: Vec<String>,
}

#[derive(Args)]
struct StoreArgs {
    #[arg(long, help = "Purchase order cr_id")]
    order: i64,
    #[arg(
        long = "material",
        help = "Request only these materials; defaults to every available one"
    )]
    materials: Vec<String>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TargetArgs {
    #[arg(long, help = "Parent purchase order cr_id")]
    purchase: Option<i64>,
    #[arg(long, help = "PO child id")]
    child: Option<i64>,
}

impl TargetArgs {
    fn key(&self) -> Result<RecordKey> {
        match (self.purchase, self.child) {
            (Some(cr_id), None) => Ok(RecordKey::Purchase(cr_id)),
            (None, Some(id)) => Ok(RecordKey::PoChild(id)),
            _ => Err(anyhow!("pass exactly one of --purchase or --child")),
        }
    }
}

#[derive(Args)]
struct ResendArgs {
    #[arg(help = "Rejected purchase order cr_id")]
    cr_id: i64,
}

#[derive(Args)]
struct SelectVendorArgs {
    #[command(flatten)]
    target: TargetArgs,
    #[arg(long, help = "Vendor identifier")]
    vendor: i64,
}

struct CliContext {
    workspace: BuyerWorkspace,
}

impl CliContext {
    fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);
        debug!(base_url = %config.api_base_url, environment = %config.environment, "Configuration loaded");

        let workspace = Self::workspace(&config)?;
        Ok(Self { workspace })
    }

    fn workspace(config: &AppConfig) -> Result<BuyerWorkspace> {
        let session = Session::from_config(config);
        if !session.is_authenticated() {
            debug!("No API token configured; requests are sent anonymously");
        }
        let api = HttpProcurementApi::new(config, session).context("failed to build API client")?;
        Ok(BuyerWorkspace::new(Arc::new(api), config))
    }

    async fn load(&self) -> Result<Arc<DashboardView>> {
        self.workspace
            .refresh()
            .await
            .map_err(|e| anyhow!(e.user_message()))
            .context("failed to load purchase orders")
    }
}

async fn handle_stats(context: &CliContext, json: bool) -> Result<()> {
    let view = context.load().await?;
    if json {
        return print_json(view.as_ref());
    }

    let stats = &view.stats;
    println!("Ongoing            {}", stats.ongoing());
    println!("  pending purchase   {}", stats.pending_purchase);
    println!("  store approved     {}", stats.store_approved);
    println!("  vendor approved    {}", stats.vendor_approved + stats.approved_children);
    println!("Pending approval   {}", stats.pending_approval());
    println!("  store requests     {}", stats.store_pending);
    println!("  vendor (TD)        {}", stats.vendor_pending_td + stats.pending_children);
    println!("Completed          {}", stats.completed());
    println!("Rejected           {}", stats.rejected());
    println!("Total              {}", stats.total());
    Ok(())
}

async fn handle_list(context: &CliContext, args: ListArgs, json: bool) -> Result<()> {
    let view = context.load().await?;
    let rows: Vec<ListRow> = args
        .tab
        .buckets()
        .iter()
        .flat_map(|bucket| {
            view.snapshot.bucket(*bucket).iter().map(move |record| ListRow {
                bucket: bucket.to_string(),
                summary: record.into(),
            })
        })
        .collect();

    if json {
        return print_json(&rows);
    }

    println!("{} ({})", args.tab, view.tab_counts.get(args.tab));
    if rows.is_empty() {
        println!("No records.");
    }
    for row in &rows {
        println!("[{}] {}", row.bucket, render_summary(&row.summary));
    }
    Ok(())
}

async fn handle_timeline(context: &CliContext, json: bool) -> Result<()> {
    let view = context.load().await?;
    let records = merge_records(
        Tab::iter()
            .flat_map(|tab| view.snapshot.tab(tab))
            .cloned(),
    );
    let summaries: Vec<OrderSummary> = records.iter().map(OrderSummary::from).collect();

    if json {
        return print_json(&summaries);
    }
    for summary in &summaries {
        println!("{}", render_summary(summary));
    }
    Ok(())
}

async fn handle_negotiate(context: &CliContext, args: NegotiateArgs, json: bool) -> Result<()> {
    if args.prices.is_empty() && args.resets.is_empty() {
        return Err(anyhow!("nothing to change; pass --price or --reset"));
    }
    context.load().await?;

    let mut editor = context
        .workspace
        .open_negotiation(args.order)
        .map_err(|e| anyhow!(e.user_message()))?;
    for material in &args.resets {
        editor
            .reset(material)
            .map_err(|e| anyhow!(e.user_message()))?;
    }
    for (material, price) in &args.prices {
        editor
            .save_edit(material, price)
            .with_context(|| format!("invalid price for '{}'", material))?;
    }

    let totals = editor.totals().map_err(|e| anyhow!(e.user_message()))?;
    let message = context
        .workspace
        .save_negotiation(&mut editor)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    if json {
        return print_json(&NegotiationReport {
            message: message.message,
            totals,
        });
    }
    println!("{}", non_empty(&message.message, "Negotiated prices saved"));
    println!(
        "Original {} • Current {} • Difference {} ({}%)",
        totals.original_total, totals.current_total, totals.diff, totals.diff_percentage
    );
    Ok(())
}

async fn handle_store(context: &CliContext, args: StoreArgs, json: bool) -> Result<()> {
    let mut selector = StoreSelector::new(args.order);
    selector
        .check(context.workspace.api())
        .await
        .map_err(|e| anyhow!(e.user_message()))
        .context("store availability check failed")?;

    if let Some(availability) = selector.availability() {
        if !json {
            render_materials("Available", &availability.available_materials);
            render_materials("Unavailable", &availability.unavailable_materials);
            render_materials("Already requested", &availability.already_requested_materials);
        }
    }

    if !args.materials.is_empty() {
        selector.clear_selection()?;
        for material in &args.materials {
            selector
                .select(material)
                .map_err(|e| anyhow!(e.user_message()))?;
        }
    }

    let outcome = context
        .workspace
        .request_from_store(&mut selector)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    if json {
        return print_json(&outcome);
    }
    match &outcome {
        StoreRequestOutcome::FullyRouted { message } => {
            println!("{}", non_empty(message, "All materials requested from store"));
        }
        StoreRequestOutcome::PartiallyRouted { message, remaining } => {
            println!("{}", non_empty(message, "Materials requested from store"));
            println!("Still needs a vendor: {}", remaining.join(", "));
        }
    }
    Ok(())
}

async fn handle_complete(context: &CliContext, args: TargetArgs, json: bool) -> Result<()> {
    let key = args.key()?;
    let message = context
        .workspace
        .mark_complete(key)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    report_action(json, key, &message.message, "Marked as purchased")
}

async fn handle_resend(context: &CliContext, args: ResendArgs, json: bool) -> Result<()> {
    let message = context
        .workspace
        .resend_rejected(args.cr_id)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    report_action(json, RecordKey::Purchase(args.cr_id), &message.message, "Resent for approval")
}

async fn handle_select_vendor(context: &CliContext, args: SelectVendorArgs, json: bool) -> Result<()> {
    let key = args.target.key()?;
    let message = context
        .workspace
        .select_vendor(key, args.vendor)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    report_action(json, key, &message.message, "Vendor selection sent for approval")
}

#[derive(Serialize)]
struct ListRow {
    bucket: String,
    #[serde(flatten)]
    summary: OrderSummary,
}

#[derive(Serialize)]
struct NegotiationReport {
    message: String,
    totals: NegotiationTotals,
}

#[derive(Serialize)]
struct ActionReport<'a> {
    target: RecordKey,
    message: &'a str,
}

fn report_action(json: bool, target: RecordKey, message: &str, fallback: &str) -> Result<()> {
    let message = non_empty(message, fallback);
    if json {
        return print_json(&ActionReport { target, message });
    }
    println!("{}: {}", target, message);
    Ok(())
}

fn non_empty<'a>(message: &'a str, fallback: &'a str) -> &'a str {
    if message.trim().is_empty() {
        fallback
    } else {
        message
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_summary(summary: &OrderSummary) -> String {
    format!(
        "{} • {} • {} • {} materials • total {}{}",
        summary.reference,
        summary.project_name,
        summary.item_name,
        summary.material_count,
        summary
            .total
            .map(|total| total.to_string())
            .unwrap_or_else(|| "out of range".to_string()),
        summary
            .vendor_name
            .as_deref()
            .map(|vendor| format!(" • vendor {}", vendor))
            .unwrap_or_default()
    )
}

fn render_materials(label: &str, materials: &[StoreMaterial]) {
    if materials.is_empty() {
        return;
    }
    println!("{}:", label);
    for material in materials {
        println!(
            "  • {} (need {}, in store {}{})",
            material.material_name,
            material.required_quantity,
            material.available_quantity,
            material
                .unit
                .as_deref()
                .map(|unit| format!(" {}", unit))
                .unwrap_or_default()
        );
    }
}

fn parse_tab(raw: &str) -> Result<Tab, String> {
    let wanted = raw.trim().replace('-', "_").to_ascii_lowercase();
    Tab::iter()
        .find(|tab| tab.to_string() == wanted)
        .ok_or_else(|| format!("invalid tab '{}'", raw))
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid entry '{}', expected material=price", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid entry '{}', material name is empty", raw));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

