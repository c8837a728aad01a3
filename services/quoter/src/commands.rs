//! Subcommand handlers
//!
//! Each handler turns display-unit arguments into raw amounts, calls the
//! pricing core and returns a JSON document for stdout.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::info;

use gateway_amm::{
    nearest_usable_tick, price_to_tick_with_decimals, quote_liquidity, quote_swap_with_settings,
    tick_to_price_with_decimals, tick_to_sqrt_price, Exact, PoolModel, PoolStateReader, QuoterSettings, Side,
    Token, TokenAmount, TokenResolver,
};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a human price to a tick, optionally snapped to a spacing
    Tick(TickArgs),
    /// Quote a swap against a pool snapshot
    Quote(QuoteArgs),
    /// Size a liquidity deposit
    Size(SizeArgs),
    /// Summarize a pool snapshot
    Info(InfoArgs),
}

#[derive(Args, Debug)]
pub struct TickArgs {
    /// Price of token0 in token1, display units
    #[arg(long)]
    pub price: Decimal,
    #[arg(long)]
    pub decimals0: u8,
    #[arg(long)]
    pub decimals1: u8,
    #[arg(long)]
    pub spacing: Option<i32>,
}

#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Snapshot file or pool name from the config
    #[arg(long)]
    pub pool: String,
    #[arg(long, value_enum)]
    pub side: SideArg,
    #[arg(long, value_enum, default_value = "in")]
    pub exact: ExactArg,
    /// Fixed leg of the trade in display units
    #[arg(long)]
    pub amount: Decimal,
    /// Tolerance in percent, defaults per pool type from the config
    #[arg(long)]
    pub slippage: Option<Decimal>,
    /// Base token symbol or address, token0 when omitted
    #[arg(long)]
    pub base: Option<String>,
}

#[derive(Args, Debug)]
pub struct SizeArgs {
    #[arg(long)]
    pub pool: String,
    /// Lower range edge, quote per base
    #[arg(long, requires = "upper")]
    pub lower: Option<Decimal>,
    /// Upper range edge, quote per base
    #[arg(long, requires = "lower")]
    pub upper: Option<Decimal>,
    #[arg(long)]
    pub base_amount: Option<Decimal>,
    #[arg(long)]
    pub quote_amount: Option<Decimal>,
    #[arg(long)]
    pub slippage: Option<Decimal>,
    #[arg(long)]
    pub base: Option<String>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[arg(long)]
    pub pool: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideArg {
    Buy,
    Sell,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExactArg {
    In,
    Out,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => Side::Buy,
            SideArg::Sell => Side::Sell,
        }
    }
}

impl From<ExactArg> for Exact {
    fn from(exact: ExactArg) -> Self {
        match exact {
            ExactArg::In => Exact::In,
            ExactArg::Out => Exact::Out,
        }
    }
}

pub fn run<R: PoolStateReader>(command: Command, reader: &R, settings: &QuoterSettings) -> Result<Value> {
    match command {
        Command::Tick(args) => tick(args),
        Command::Quote(args) => quote(args, reader, settings),
        Command::Size(args) => size(args, reader, settings),
        Command::Info(args) => {
            let pool = load_pool(reader, &args.pool)?;
            let info = pool.info().context("Failed to summarize pool")?;
            Ok(serde_json::to_value(info)?)
        }
    }
}

fn tick(args: TickArgs) -> Result<Value> {
    let tick = price_to_tick_with_decimals(args.price, args.decimals0, args.decimals1)
        .with_context(|| format!("Cannot convert price {}", args.price))?;
    let usable = match args.spacing {
        Some(spacing) => Some(nearest_usable_tick(tick, spacing)?),
        None => None,
    };
    let snapped = usable.unwrap_or(tick);

    Ok(json!({
        "price": args.price,
        "tick": tick,
        "usable_tick": usable,
        "sqrt_price_x96": tick_to_sqrt_price(snapped)?.to_string(),
        "tick_price": tick_to_price_with_decimals(snapped, args.decimals0, args.decimals1)?,
    }))
}

fn quote<R: PoolStateReader>(args: QuoteArgs, reader: &R, settings: &QuoterSettings) -> Result<Value> {
    let pool = load_pool(reader, &args.pool)?;
    let base = resolve_base(&pool, args.base.as_deref())?;
    let quote_token = counterpart(&pool, &base);

    let side = Side::from(args.side);
    let exact = Exact::from(args.exact);
    let amount_token = if fixed_leg_is_base(side, exact) { &base } else { &quote_token };
    let amount = to_raw(args.amount, amount_token)?;

    let quote = quote_swap_with_settings(settings, &pool, Some(&base.address), amount, side, exact, args.slippage)
        .context("Quote failed")?;
    info!(
        amount_in = %quote.amount_in,
        amount_out = %quote.amount_out,
        "Quoted {:?} {:?} on {}/{}",
        side,
        exact,
        base.symbol,
        quote_token.symbol
    );

    Ok(json!({
        "amount_in_human": to_human(quote.amount_in, &quote.token_in)?,
        "amount_out_human": to_human(quote.amount_out, &quote.token_out)?,
        "fee_human": to_human(quote.fee, &quote.token_in)?,
        "min_amount_out_human": to_human(quote.min_amount_out, &quote.token_out)?,
        "max_amount_in_human": to_human(quote.max_amount_in, &quote.token_in)?,
        "execution_price_human": quote.execution_price_human()?,
        "quote": quote,
    }))
}

fn size<R: PoolStateReader>(args: SizeArgs, reader: &R, settings: &QuoterSettings) -> Result<Value> {
    let pool = load_pool(reader, &args.pool)?;
    let base = resolve_base(&pool, args.base.as_deref())?;
    let quote_token = counterpart(&pool, &base);

    let base_amount = args.base_amount.map(|amount| to_raw(amount, &base)).transpose()?;
    let quote_amount = args.quote_amount.map(|amount| to_raw(amount, &quote_token)).transpose()?;
    if base_amount.is_none() && quote_amount.is_none() {
        bail!("Provide --base-amount, --quote-amount or both");
    }

    let price_range = args.lower.zip(args.upper);
    let slippage_pct = settings.resolve_slippage_pct(&pool, args.slippage);

    let sized = quote_liquidity(&pool, &base.address, price_range, base_amount, quote_amount, slippage_pct)
        .context("Liquidity sizing failed")?;

    Ok(json!({
        "base_amount_human": to_human(sized.base_amount, &sized.base)?,
        "quote_amount_human": to_human(sized.quote_amount, &sized.quote)?,
        "base_amount_max_human": to_human(sized.base_amount_max, &sized.base)?,
        "quote_amount_max_human": to_human(sized.quote_amount_max, &sized.quote)?,
        "slippage_pct": slippage_pct,
        "liquidity": sized,
    }))
}

fn load_pool<R: PoolStateReader>(reader: &R, reference: &str) -> Result<PoolModel> {
    reader
        .read_pool(reference)
        .with_context(|| format!("Failed to load pool {}", reference))
}

fn resolve_base(pool: &PoolModel, base: Option<&str>) -> Result<Token> {
    match base {
        Some(reference) => pool
            .resolve(reference)
            .ok_or_else(|| anyhow!("Token {} is not in this pool", reference)),
        None => Ok(pool.token0().clone()),
    }
}

fn counterpart(pool: &PoolModel, token: &Token) -> Token {
    if pool.token0() == token {
        pool.token1().clone()
    } else {
        pool.token0().clone()
    }
}

/// Whether the fixed `amount` is denominated in the base token
fn fixed_leg_is_base(side: Side, exact: Exact) -> bool {
    matches!((side, exact), (Side::Sell, Exact::In) | (Side::Buy, Exact::Out))
}

fn to_raw(amount: Decimal, token: &Token) -> Result<gateway_amm::U256> {
    let raw = TokenAmount::from_human(amount, token.decimals)
        .with_context(|| format!("Invalid {} amount {}", token.symbol, amount))?
        .raw;
    Ok(raw)
}

fn to_human(raw: gateway_amm::U256, token: &Token) -> Result<Decimal> {
    Ok(TokenAmount::new(raw, token.decimals).to_decimal()?)
}
