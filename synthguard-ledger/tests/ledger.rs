use anyhow::Result;
use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use synthguard_ledger::{
    AccountingMethod, BudgetLedger, BudgetState, CompositionMethod, EntryOutcome, LedgerConfig,
    LedgerError, LedgerStore, LEDGER_SCHEMA_VERSION,
};

#[test]
fn sequential_spend_is_additive_and_refusals_are_recorded() -> Result<()> {
    let mut ledger = BudgetLedger::new("D1", LedgerConfig::with_budget(2.0))?;
    ledger.consume(0.5, "sample", "alice")?;
    let receipt = ledger.consume(1.0, "enforce", "bob")?;
    assert_relative_eq!(receipt.state.spent, 1.5);
    assert_relative_eq!(receipt.state.remaining, 0.5);
    assert_eq!(receipt.state.method, AccountingMethod::Sequential);

    let refused = ledger.consume(0.75, "audit", "carol");
    assert_eq!(
        refused,
        Err(LedgerError::BudgetExhausted {
            dataset_id: "D1".into(),
            requested: 0.75,
            spent: 1.5,
            total: 2.0,
        })
    );
    let state = ledger.state();
    assert_relative_eq!(state.spent, 1.5);
    assert_eq!(state.accepted_count(), 2);
    assert_eq!(state.refused_count(), 1);
    let last = state.entries.last().expect("refused entry kept");
    assert_eq!(last.outcome, EntryOutcome::Refused);
    assert_eq!(last.actor, "carol");
    assert_eq!(last.label, "audit");
    Ok(())
}

#[test]
fn invalid_epsilon_records_nothing() -> Result<()> {
    let mut ledger = BudgetLedger::new("D1", LedgerConfig::default())?;
    for epsilon in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            ledger.consume(epsilon, "bad", "alice"),
            Err(LedgerError::InvalidEpsilon { .. })
        ));
    }
    assert!(ledger.state().entries.is_empty());
    Ok(())
}

#[test]
fn overrun_is_accepted_when_auto_pause_is_off() -> Result<()> {
    let config = LedgerConfig {
        auto_pause: false,
        ..LedgerConfig::with_budget(1.0)
    };
    let mut ledger = BudgetLedger::new("D2", config)?;
    ledger.consume(0.8, "first", "alice")?;
    let receipt = ledger.consume(0.5, "second", "alice")?;
    assert!(receipt.overrun);
    assert_relative_eq!(receipt.state.spent, 1.3);
    assert_eq!(receipt.state.remaining, 0.0);
    assert!(receipt.state.is_exhausted());
    assert!(receipt.warning.is_some());
    Ok(())
}

#[test]
fn warning_fires_below_the_threshold() -> Result<()> {
    let mut ledger = BudgetLedger::new("D3", LedgerConfig::with_budget(10.0))?;
    let early = ledger.consume(7.0, "bulk", "alice")?;
    assert!(early.warning.is_none());
    let late = ledger.consume(1.5, "more", "alice")?;
    let warning = late.warning.expect("15% left is under the 20% threshold");
    assert_relative_eq!(warning.remaining_fraction, 0.15, max_relative = 1e-12);
    assert_relative_eq!(warning.threshold, 0.2);
    Ok(())
}

#[test]
fn advanced_and_renyi_never_exceed_sequential() -> Result<()> {
    for composition in [
        CompositionMethod::Advanced { delta: 1e-5 },
        CompositionMethod::renyi_default(),
    ] {
        let config = LedgerConfig {
            composition: composition.clone(),
            ..LedgerConfig::with_budget(100.0)
        };
        let mut ledger = BudgetLedger::new("D4", config)?;
        let first = ledger.consume(1.0, "only", "alice")?;
        assert_eq!(first.state.method, AccountingMethod::Sequential);

        let mut last = first.state;
        for _ in 0..499 {
            last = ledger.consume(0.01, "step", "trainer")?.state;
        }
        assert!(last.spent <= last.sequential_spent);
        assert_relative_eq!(last.sequential_spent, 5.99, max_relative = 1e-9);
        let mut small = BudgetLedger::new(
            "D5",
            LedgerConfig {
                composition,
                ..LedgerConfig::with_budget(100.0)
            },
        )?;
        for _ in 0..1_000 {
            last = small.consume(0.01, "step", "trainer")?.state;
        }
        assert!(last.spent < last.sequential_spent);
        assert_ne!(last.method, AccountingMethod::Sequential);
        let status = small.status();
        assert_eq!(status.method, last.method);
        assert_eq!(status.accepted, 1_000);
    }
    Ok(())
}

#[test]
fn reset_is_archived_and_logged() -> Result<()> {
    let mut ledger = BudgetLedger::new("D6", LedgerConfig::with_budget(1.0))?;
    ledger.consume(0.6, "sample", "alice")?;
    let _ = ledger.consume(0.6, "sample", "alice");
    let record = ledger.reset("admin", "quarterly refresh");
    assert_eq!(record.archived.len(), 2);
    assert_relative_eq!(record.spent_before, 0.6);
    assert_eq!(record.actor, "admin");

    let state = ledger.state();
    assert_eq!(state.spent, 0.0);
    assert!(state.entries.is_empty());
    assert_eq!(state.resets.len(), 1);
    ledger.consume(0.9, "after reset", "alice")?;
    Ok(())
}

#[test]
fn store_creates_ledgers_on_first_consume() -> Result<()> {
    let store = LedgerStore::new(LedgerConfig::with_budget(10.0))?;
    assert_eq!(store.status("D1"), Err(LedgerError::UnknownDataset("D1".into())));
    let receipt = store.consume("D1", 1.0, "certification", "pipeline")?;
    assert_relative_eq!(receipt.state.remaining, 9.0);
    let status = store.status("D1")?;
    assert_eq!(status.accepted, 1);
    assert_relative_eq!(status.spent, 1.0);
    assert_eq!(store.dataset_ids(), vec!["D1".to_string()]);

    store.register("D2", LedgerConfig::with_budget(0.5))?;
    assert_eq!(
        store.register("D2", LedgerConfig::default()).map(|state| state.dataset_id),
        Err(LedgerError::DatasetExists("D2".into()))
    );
    assert!(store.consume("D2", 1.0, "too much", "pipeline").is_err());
    assert_eq!(store.status("D2")?.refused, 1);
    assert_relative_eq!(store.status("D1")?.spent, 1.0);

    let record = store.reset("D1", "admin", "new release")?;
    assert_eq!(record.archived.len(), 1);
    assert_eq!(store.snapshot("D1")?.spent, 0.0);
    Ok(())
}

#[test]
fn invalid_store_config_is_rejected() {
    assert!(matches!(
        LedgerStore::new(LedgerConfig::with_budget(-1.0)),
        Err(LedgerError::InvalidConfig(_))
    ));
}

#[test]
fn concurrent_consumers_never_overspend() -> Result<()> {
    let store = LedgerStore::new(LedgerConfig::with_budget(1.0))?;
    std::thread::scope(|scope| {
        for worker in 0..8 {
            let store = &store;
            scope.spawn(move || {
                for _ in 0..10 {
                    let _ = store.consume("shared", 0.05, "query", &format!("worker-{worker}"));
                    let _ = store.consume("other", 0.01, "query", "noise");
                }
            });
        }
    });
    let state = store.snapshot("shared")?;
    assert_eq!(state.entries.len(), 80);
    assert_eq!(state.accepted_count(), 20);
    assert!(state.spent <= 1.0 + 1e-9);
    let other = store.snapshot("other")?;
    assert_eq!(other.accepted_count(), 80);
    Ok(())
}

#[test]
fn snapshots_round_trip_and_tolerate_missing_fields() -> Result<()> {
    let mut ledger = BudgetLedger::new("D7", LedgerConfig::default())?;
    ledger.consume(1.0, "sample", "alice")?;
    let state = ledger.state();
    let json = serde_json::to_string(&state)?;
    let parsed: BudgetState = serde_json::from_str(&json)?;
    assert_eq!(parsed, state);

    let legacy = r#"{
        "dataset_id": "old",
        "total_budget": 5.0,
        "spent": 1.0,
        "remaining": 4.0,
        "warning_fraction": 0.2,
        "auto_pause": true,
        "entries": []
    }"#;
    let parsed: BudgetState = serde_json::from_str(legacy)?;
    assert_eq!(parsed.schema_version, LEDGER_SCHEMA_VERSION);
    assert_eq!(parsed.method, AccountingMethod::Sequential);
    assert!(parsed.resets.is_empty());
    Ok(())
}
