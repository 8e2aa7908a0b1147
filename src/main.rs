//! Stock exchange simulation.
//!
//! Walks the engine through its lifecycle: listings, buys and sells, loans,
//! price ticks with trading cut-offs, a random activity batch and a short
//! run of the background price scheduler.

use rust_decimal_macros::dec;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use stockex_core::*;

type DemoResult = Result<(), Box<dyn Error>>;

fn main() -> DemoResult {
    let config = match ExchangeConfig::demo().with_env_overrides() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ignoring environment overrides: {e}");
            ExchangeConfig::demo()
        }
    };
    logging::init(&config.logging)?;

    println!("Stock Exchange Simulation");
    println!("Drifting prices, first-lot sells, fixed loan ceilings\n");

    scenario_1_buy_and_sell(&config)?;
    scenario_2_holdings_checks(&config)?;
    scenario_3_credit_line(&config)?;
    scenario_4_price_ticks(&config)?;
    scenario_5_trading_cutoff(&config)?;
    scenario_6_random_activity(&config)?;
    scenario_7_scheduler(&config)?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn new_engine(config: &ExchangeConfig) -> Engine {
    Engine::new(config.engine.clone()).with_drift(config.scheduler.drift())
}

/// Plain buy then partial sell.
fn scenario_1_buy_and_sell(config: &ExchangeConfig) -> DemoResult {
    println!("Scenario 1: Buy and Sell\n");

    let engine = new_engine(config);
    let alice = engine.open_account("alice", Quote::new(dec!(1000)))?;
    let acme = engine.register_instrument("ACME", 100, dec!(50))?;
    println!("  Alice opens with $1,000, ACME listed at $50 x 100");

    let receipt = engine.buy(alice, acme, 10)?;
    println!(
        "  Alice buys 10 ACME: cost ${}, cash ${}, ACME left {}",
        receipt.transaction.total_amount, receipt.cash_balance, receipt.instrument_available
    );

    let receipt = engine.sell(alice, acme, 4)?;
    println!(
        "  Alice sells 4 ACME: proceeds ${}, cash ${}, ACME left {}",
        receipt.transaction.total_amount, receipt.cash_balance, receipt.instrument_available
    );
    println!("  Ledger holds {} transactions\n", engine.transaction_count());
    Ok(())
}

/// Lots are never merged; a sell only draws from the first one.
fn scenario_2_holdings_checks(config: &ExchangeConfig) -> DemoResult {
    println!("Scenario 2: First-Lot Sells\n");

    let engine = new_engine(config);
    let bob = engine.open_account("bob", Quote::new(dec!(1000)))?;
    let acme = engine.register_instrument("ACME", 100, dec!(20))?;

    engine.buy(bob, acme, 5)?;
    engine.buy(bob, acme, 5)?;
    let account = engine.account(bob).ok_or("bob missing")?;
    println!("  Bob holds {} ACME across {} lots", account.shares_of(acme), account.holdings.len());

    match engine.sell(bob, acme, 10) {
        Err(e) => println!("  Selling 10 at once is refused: {e}"),
        Ok(_) => println!("  Unexpected: 10-share sell filled"),
    }
    engine.sell(bob, acme, 5)?;
    engine.sell(bob, acme, 5)?;
    let account = engine.account(bob).ok_or("bob missing")?;
    println!("  Two 5-share sells clear both lots, cash back to ${}\n", account.cash_balance);
    Ok(())
}

/// Loans up to the fixed ceiling.
fn scenario_3_credit_line(config: &ExchangeConfig) -> DemoResult {
    println!("Scenario 3: Credit Line\n");

    let engine = new_engine(config);
    let carol = engine.open_account("carol", Quote::zero())?;

    let receipt = engine.grant_loan(carol, Quote::new(dec!(90000)))?;
    println!("  Carol borrows $90,000, available credit ${}", receipt.available_credit);

    match engine.grant_loan(carol, Quote::new(dec!(20000))) {
        Err(e) => println!("  $20,000 more is refused: {e}"),
        Ok(_) => println!("  Unexpected: loan above ceiling granted"),
    }
    let receipt = engine.grant_loan(carol, Quote::new(dec!(5000)))?;
    println!(
        "  $5,000 more accepted: loan ${}, cash ${}, available ${}\n",
        receipt.loan_balance, receipt.cash_balance, receipt.available_credit
    );
    Ok(())
}

/// Prices drift inside [1, 100] and performance windows update.
fn scenario_4_price_ticks(config: &ExchangeConfig) -> DemoResult {
    println!("Scenario 4: Price Ticks\n");

    let clock = Arc::new(ManualClock::new(Timestamp::now()));
    let engine = new_engine(config).with_clock(clock.clone());
    let ids = [
        engine.register_instrument("ACME", 100, dec!(50))?,
        engine.register_instrument("PENNY", 100, dec!(1))?,
        engine.register_instrument("TOP", 100, dec!(100))?,
    ];

    for _ in 0..60 {
        engine.tick();
        clock.advance(Timestamp::MINUTE);
    }

    for id in ids {
        let inst = engine.instrument(id).ok_or("instrument missing")?;
        println!(
            "  {:<6} ${:>6}  history {:>2}  daily {:.2}%",
            inst.name,
            inst.current_price,
            inst.price_history.len(),
            inst.performance.daily_change
        );
    }
    println!();
    Ok(())
}

/// Spending every dollar takes an account out of the market on the next tick.
fn scenario_5_trading_cutoff(config: &ExchangeConfig) -> DemoResult {
    println!("Scenario 5: Trading Cut-off\n");

    let engine = Engine::new(config.engine.clone()).with_drift(Arc::new(FixedDrift(dec!(-0.02))));
    let dave = engine.open_account("dave", Quote::new(dec!(500)))?;
    let acme = engine.register_instrument("ACME", 100, dec!(50))?;

    engine.buy(dave, acme, 10)?;
    println!("  Dave spends all $500 on 10 ACME");

    let report = engine.tick();
    println!("  Tick disables {:?}", report.accounts_disabled);

    let summary = engine.portfolio_summary(dave)?;
    println!(
        "  Portfolio ${}, P/L ${}, trading enabled: {}",
        summary.portfolio_value, summary.profit_loss, summary.trading_enabled
    );
    if let Err(e) = engine.buy(dave, acme, 1) {
        println!("  Next buy refused ({:?})", e.kind());
    }
    engine.sell(dave, acme, 10)?;
    println!("  Sells still go through; cash ${}\n", engine.account(dave).ok_or("dave missing")?.cash_balance);
    Ok(())
}

/// Random trades across a small market.
fn scenario_6_random_activity(config: &ExchangeConfig) -> DemoResult {
    println!("Scenario 6: Random Activity\n");

    let engine = new_engine(config);
    for name in ["erin", "frank", "grace", "heidi"] {
        engine.open_account(name, Quote::new(dec!(2500)))?;
    }
    for (name, price) in [("ACME", dec!(12.5)), ("GLOBEX", dec!(48)), ("INITECH", dec!(87.25))] {
        engine.register_instrument(name, 200, price)?;
    }

    let activity = match config.scheduler.seed {
        Some(seed) => MarketActivity::with_seed(config.activity.clone(), seed),
        None => MarketActivity::new(config.activity.clone()),
    };
    let summary = activity.run(&engine);
    println!(
        "  {} attempted, {} filled, {} converted to buys, {} rejected",
        summary.attempted,
        summary.filled(),
        summary.converted,
        summary.rejected()
    );
    for (kind, count) in &summary.rejections {
        println!("    {kind:?}: {count}");
    }

    let report = engine.tick();
    println!(
        "  Follow-up tick revalues {} accounts, disables {}\n",
        report.accounts_revalued,
        report.accounts_disabled.len()
    );
    Ok(())
}

/// The background scheduler for a second of wall time.
fn scenario_7_scheduler(config: &ExchangeConfig) -> DemoResult {
    println!("Scenario 7: Price Scheduler\n");

    let engine = Arc::new(new_engine(config));
    let acme = engine.register_instrument("ACME", 100, dec!(50))?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let ticks = runtime.block_on(async {
        let handle = PriceScheduler::new(engine.clone(), &config.scheduler).spawn();
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.stop().await
    });

    let inst = engine.instrument(acme).ok_or("instrument missing")?;
    println!(
        "  {} ticks every {}ms, ACME now ${} with {} history points",
        ticks,
        config.scheduler.tick_interval_ms,
        inst.current_price,
        inst.price_history.len()
    );
    Ok(())
}
