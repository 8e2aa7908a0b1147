//! End-to-end exchange scenarios.
//!
//! Each test drives the public engine API the way a caller would and checks
//! balances, inventory and the ledger afterwards.

use rust_decimal_macros::dec;
use std::sync::Arc;
use stockex_core::*;

fn engine() -> Engine {
    Engine::new(EngineConfig::default())
        .with_drift(Arc::new(FixedDrift(dec!(0))))
        .with_clock(Arc::new(ManualClock::new(Timestamp::from_millis(0))))
}

mod orders {
    use super::*;

    #[test]
    fn buy_ten_at_fifty() {
        let engine = engine();
        let alice = engine.open_account("alice", Quote::new(dec!(1000))).unwrap();
        let acme = engine.register_instrument("ACME", 100, dec!(50)).unwrap();

        let receipt = engine.buy(alice, acme, 10).unwrap();

        assert_eq!(receipt.cash_balance.value(), dec!(500));
        assert_eq!(receipt.instrument_available, 90);
        let account = engine.account(alice).unwrap();
        assert_eq!(account.holdings.len(), 1);
        assert_eq!(account.holdings[0].quantity, 10);
        assert_eq!(account.holdings[0].purchase_price.value(), dec!(50));
        assert_eq!(account.holdings[0].total_investment.value(), dec!(500));

        let ledger = engine.transactions(&TransactionFilter::default());
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].side, TradeSide::Buy);
        assert_eq!(ledger[0].total_amount.value(), dec!(500));
    }

    #[test]
    fn sell_larger_than_first_lot_changes_nothing() {
        let engine = engine();
        let alice = engine.open_account("alice", Quote::new(dec!(1000))).unwrap();
        let acme = engine.register_instrument("ACME", 100, dec!(50)).unwrap();
        engine.buy(alice, acme, 5).unwrap();
        let before = engine.account(alice).unwrap();

        let err = engine.sell(alice, acme, 10).unwrap_err();

        assert_eq!(
            err,
            TradeError::InsufficientHoldings { instrument_id: acme, requested: 10, held: 5 }
        );
        let after = engine.account(alice).unwrap();
        assert_eq!(after.cash_balance, before.cash_balance);
        assert_eq!(after.holdings, before.holdings);
        assert_eq!(engine.instrument(acme).unwrap().available_quantity, 95);
        assert_eq!(engine.transaction_count(), 1);
    }

    #[test]
    fn sell_only_reads_the_first_lot() {
        let engine = engine();
        let alice = engine.open_account("alice", Quote::new(dec!(1000))).unwrap();
        let acme = engine.register_instrument("ACME", 100, dec!(10)).unwrap();
        engine.buy(alice, acme, 3).unwrap();
        engine.buy(alice, acme, 7).unwrap();

        // 10 shares in total, but the first lot only has 3
        let err = engine.sell(alice, acme, 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientHoldings);

        engine.sell(alice, acme, 3).unwrap();
        // the 7-lot is now first
        engine.sell(alice, acme, 5).unwrap();
        assert_eq!(engine.account(alice).unwrap().holdings[0].quantity, 2);
    }

    #[test]
    fn selling_something_never_bought() {
        let engine = engine();
        let alice = engine.open_account("alice", Quote::new(dec!(100))).unwrap();
        let acme = engine.register_instrument("ACME", 100, dec!(10)).unwrap();
        assert_eq!(
            engine.sell(alice, acme, 1).unwrap_err(),
            TradeError::InsufficientHoldings { instrument_id: acme, requested: 1, held: 0 }
        );
    }

    #[test]
    fn ledger_filters_by_account_instrument_and_time() {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(0)));
        let engine = Engine::new(EngineConfig::default()).with_clock(clock.clone());
        let alice = engine.open_account("alice", Quote::new(dec!(1000))).unwrap();
        let bob = engine.open_account("bob", Quote::new(dec!(1000))).unwrap();
        let acme = engine.register_instrument("ACME", 100, dec!(10)).unwrap();
        let globex = engine.register_instrument("GLOBEX", 100, dec!(20)).unwrap();

        engine.buy(alice, acme, 1).unwrap();
        clock.set(Timestamp::from_millis(1_000));
        engine.buy(bob, acme, 1).unwrap();
        clock.set(Timestamp::from_millis(2_000));
        engine.buy(alice, globex, 1).unwrap();

        assert_eq!(engine.transactions(&TransactionFilter::account(alice)).len(), 2);
        assert_eq!(engine.transactions(&TransactionFilter::instrument(acme)).len(), 2);
        let window = TransactionFilter::default().between(Timestamp::from_millis(500), Timestamp::from_millis(1_500));
        let hits = engine.transactions(&window);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].account_id, bob);
    }

    #[test]
    fn rejected_orders_are_journaled() {
        let engine = engine();
        let alice = engine.open_account("alice", Quote::new(dec!(10))).unwrap();
        let acme = engine.register_instrument("ACME", 100, dec!(50)).unwrap();
        engine.buy(alice, acme, 1).unwrap_err();

        let last = engine.recent_events(1).pop().unwrap();
        match last.payload {
            EventPayload::OrderRejected(e) => {
                assert_eq!(e.kind, ErrorKind::InsufficientFunds);
                assert_eq!(e.side, TradeSide::Buy);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

mod pricing {
    use super::*;

    #[test]
    fn ceiling_holds_under_strong_upward_draw() {
        let engine = Engine::new(EngineConfig::default()).with_drift(Arc::new(FixedDrift(dec!(0.02))));
        let top = engine.register_instrument("TOP", 10, dec!(100)).unwrap();

        engine.tick();

        let inst = engine.instrument(top).unwrap();
        assert_eq!(inst.current_price.value(), dec!(100));
        assert_eq!(inst.price_history.len(), 1);
    }

    #[test]
    fn floor_holds_under_strong_downward_draw() {
        let engine = Engine::new(EngineConfig::default()).with_drift(Arc::new(FixedDrift(dec!(-0.02))));
        let penny = engine.register_instrument("PENNY", 10, dec!(1)).unwrap();
        for _ in 0..5 {
            engine.tick();
        }
        assert_eq!(engine.instrument(penny).unwrap().current_price.value(), dec!(1));
    }

    #[test]
    fn performance_windows_use_earliest_point_inside_window() {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(0)));
        let drift = Arc::new(ScriptedDrift::new([dec!(0), dec!(0.02), dec!(0.02)]));
        let engine = Engine::new(EngineConfig::default()).with_clock(clock.clone()).with_drift(drift);
        let acme = engine.register_instrument("ACME", 10, dec!(50)).unwrap();

        engine.tick(); // 50 at day 0
        clock.advance(2 * Timestamp::DAY);
        engine.tick(); // 51 at day 2
        clock.advance(Timestamp::HOUR);
        engine.tick(); // 52.02 at day 2 + 1h

        let perf = engine.instrument(acme).unwrap().performance;
        // 24h window starts at the day-2 point
        assert_eq!(perf.daily_change, dec!(2));
        // 7d and 30d windows reach back to day 0
        assert_eq!(perf.weekly_change, dec!(4.04));
        assert_eq!(perf.monthly_change, dec!(4.04));
    }
}

mod credit {
    use super::*;

    #[test]
    fn ceiling_is_fixed() {
        let engine = engine();
        let carol = engine.open_account("carol", Quote::zero()).unwrap();
        engine.grant_loan(carol, Quote::new(dec!(90000))).unwrap();

        let err = engine.grant_loan(carol, Quote::new(dec!(20000))).unwrap_err();
        match err {
            TradeError::LoanLimitExceeded { current, limit, available, requested } => {
                assert_eq!(current.value(), dec!(90000));
                assert_eq!(limit.value(), dec!(100000));
                assert_eq!(available.value(), dec!(10000));
                assert_eq!(requested.value(), dec!(20000));
            }
            other => panic!("unexpected {other:?}"),
        }

        let receipt = engine.grant_loan(carol, Quote::new(dec!(5000))).unwrap();
        assert_eq!(receipt.loan_balance.value(), dec!(95000));
        assert_eq!(receipt.cash_balance.value(), dec!(95000));
        assert_eq!(receipt.available_credit.value(), dec!(5000));
    }

    #[test]
    fn configured_limit_applies_to_new_accounts() {
        let mut config = EngineConfig::default();
        config.default_loan_limit = Quote::new(dec!(250));
        let engine = Engine::new(config);
        let id = engine.open_account("small", Quote::zero()).unwrap();
        assert!(engine.grant_loan(id, Quote::new(dec!(251))).is_err());
        assert!(engine.grant_loan(id, Quote::new(dec!(250))).is_ok());
    }
}

mod eligibility {
    use super::*;

    #[test]
    fn no_cash_means_no_buying() {
        let engine = engine();
        let eve = engine.open_account("eve", Quote::zero()).unwrap();
        let acme = engine.register_instrument("ACME", 10, dec!(5)).unwrap();

        assert!(!engine.check_trading_eligibility(eve).unwrap());
        assert!(!engine.account(eve).unwrap().trading_enabled);
        assert_eq!(engine.buy(eve, acme, 1).unwrap_err().kind(), ErrorKind::IneligibleAccount);
    }

    #[test]
    fn a_loan_does_not_re_enable_trading() {
        let engine = engine();
        let eve = engine.open_account("eve", Quote::zero()).unwrap();
        let acme = engine.register_instrument("ACME", 10, dec!(5)).unwrap();
        engine.check_trading_eligibility(eve).unwrap();

        engine.grant_loan(eve, Quote::new(dec!(100))).unwrap();
        assert_eq!(engine.buy(eve, acme, 1).unwrap_err().kind(), ErrorKind::IneligibleAccount);
    }

    #[test]
    fn summary_prices_each_lot() {
        let engine = Engine::new(EngineConfig::default()).with_drift(Arc::new(FixedDrift(dec!(0.02))));
        let frank = engine.open_account("frank", Quote::new(dec!(1000))).unwrap();
        let acme = engine.register_instrument("ACME", 100, dec!(50)).unwrap();
        engine.buy(frank, acme, 10).unwrap();
        engine.grant_loan(frank, Quote::new(dec!(200))).unwrap();
        engine.tick();

        let summary = engine.portfolio_summary(frank).unwrap();
        assert_eq!(summary.portfolio_value.value(), dec!(1210));
        assert_eq!(summary.profit_loss.value(), dec!(1010));
        assert_eq!(summary.positions.len(), 1);
        assert_eq!(summary.positions[0].current_value.value(), dec!(510));
        assert_eq!(summary.positions[0].profit_loss.value(), dec!(10));
        assert_eq!(engine.profit_loss(frank).unwrap(), summary.profit_loss);
    }
}

mod persistence {
    use super::*;

    #[test]
    fn committed_orders_reach_the_store() {
        let store = Arc::new(MemoryPersistence::new());
        let engine = Engine::new(EngineConfig::default()).with_persistence(store.clone());
        let alice = engine.open_account("alice", Quote::new(dec!(1000))).unwrap();
        let acme = engine.register_instrument("ACME", 100, dec!(50)).unwrap();
        engine.buy(alice, acme, 2).unwrap();

        let stored = store.get_account(alice).unwrap().unwrap();
        assert_eq!(stored.cash_balance.value(), dec!(900));
        assert_eq!(store.get_instrument(acme).unwrap().unwrap().available_quantity, 98);
        assert_eq!(store.transactions(&TransactionFilter::account(alice)).unwrap().len(), 1);
    }

    #[test]
    fn outage_then_recovery() {
        let store = Arc::new(MemoryPersistence::new());
        let engine = Engine::new(EngineConfig::default()).with_persistence(store.clone());
        let alice = engine.open_account("alice", Quote::new(dec!(1000))).unwrap();
        let acme = engine.register_instrument("ACME", 100, dec!(50)).unwrap();

        store.set_offline(true);
        assert_eq!(engine.buy(alice, acme, 2).unwrap_err().kind(), ErrorKind::TransientStoreFailure);
        store.set_offline(false);
        engine.buy(alice, acme, 2).unwrap();

        assert_eq!(engine.account(alice).unwrap().cash_balance.value(), dec!(900));
        assert_eq!(engine.transaction_count(), 1);
    }
}
