use anyhow::Result;
use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;
use synthguard_anonymity::AnonymityError;
use synthguard_certify::{
    CertificationConfig, CertifyError, CoreConfig, PrivacyCertificate, PrivacyCore,
    CERTIFICATE_SCHEMA_VERSION, CERTIFICATION_LABEL,
};
use synthguard_inference::InferenceError;
use synthguard_ledger::{EntryOutcome, LedgerConfig, LedgerError};
use synthguard_table::Table;

const STATES: [&str; 5] = ["CA", "NY", "TX", "WA", "FL"];

/// Ages and incomes share a Gaussian dependence; states are independent.
fn portfolio(rows: usize, seed: u64) -> Result<Table> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut ages = Vec::with_capacity(rows);
    let mut states = Vec::with_capacity(rows);
    let mut incomes = Vec::with_capacity(rows);
    for _ in 0..rows {
        let z1: f64 = rng.sample(StandardNormal);
        let z2: f64 = rng.sample(StandardNormal);
        ages.push(45.0 + 12.0 * z1);
        states.push(STATES[rng.gen_range(0..STATES.len())]);
        incomes.push((10.8 + 0.35 * (0.6 * z1 + 0.8 * z2)).exp());
    }
    Ok(Table::builder()
        .numeric("age", ages)
        .categorical("state", states)
        .numeric("income", incomes)
        .build()?)
}

fn qis() -> Vec<String> {
    vec!["age".to_string(), "state".to_string()]
}

fn core(budget: f64) -> Result<PrivacyCore> {
    Ok(PrivacyCore::new(CoreConfig {
        ledger: LedgerConfig::with_budget(budget),
        ..CoreConfig::default()
    })?)
}

fn certification(dataset_id: Option<&str>) -> CertificationConfig {
    CertificationConfig {
        quasi_identifiers: qis(),
        dataset_id: dataset_id.map(str::to_owned),
        actor: "pipeline".into(),
        seed: 17,
        ..CertificationConfig::default()
    }
}

#[test]
fn end_to_end_release_is_certified() -> Result<()> {
    let core = core(10.0)?;
    let original = portfolio(1_000, 2024)?;

    let handle = core.fit_correlation_model(&original)?;
    let synthetic = core.sample_from_model(&handle, 1_000, 7)?;
    assert_eq!(synthetic.row_count(), 1_000);
    assert!(synthetic.same_schema(&original));

    let (released, report) = core.enforce_anonymity(&synthetic, &qis(), 5)?;
    assert!(report.final_k >= 5, "final k {}", report.final_k);
    assert!(report.compliant);
    assert!(released.row_count() > 0);

    let outcome = core.consume_budget("D1", 1.0, "sample", "analyst")?;
    assert!(outcome.success);
    assert_relative_eq!(outcome.state.remaining, 9.0);

    let attack = core.run_membership_attack(&original, &synthetic, &[], 11)?;
    assert!(
        (0.45..=0.60).contains(&attack.attack_success_rate),
        "attack rate {}",
        attack.attack_success_rate
    );

    let certificate = core.generate_certificate(&original, &synthetic, &certification(Some("D1")))?;
    assert!(certificate.compliance.anonymous);
    assert!(certificate.compliance.de_identified);
    assert!(certificate.compliance.safe_harbor);
    assert!(certificate.enforcement.final_k >= 5);
    assert!(certificate.enforcement.compliant);
    assert!(certificate.certificate_id.starts_with("cert-"));
    assert_eq!(certificate.schema_version, CERTIFICATE_SCHEMA_VERSION);
    assert!(certificate.inference.skipped.is_none());
    assert_eq!(certificate.accounting.dataset_id.as_deref(), Some("D1"));
    let ledger = certificate.accounting.ledger.as_ref().expect("ledger snapshot");
    assert_relative_eq!(ledger.spent, 2.0);
    let last = ledger.entries.last().expect("certification entry");
    assert_eq!(last.label, CERTIFICATION_LABEL);
    assert_eq!(last.actor, "pipeline");
    assert_relative_eq!(core.get_budget_status("D1")?.remaining, 8.0);
    Ok(())
}

#[test]
fn unreachable_k_suppresses_everything_without_failing() -> Result<()> {
    let core = core(10.0)?;
    let original = portfolio(40, 1)?;
    let synthetic = portfolio(40, 2)?;
    let config = CertificationConfig {
        target_k: 50,
        ..certification(None)
    };
    let certification = core.certify(&original, &synthetic, &config)?;
    let certificate = &certification.certificate;
    assert_eq!(certification.table.row_count(), 0);
    assert_eq!(certificate.enforcement.final_k, 0);
    assert_eq!(certificate.enforcement.rows_suppressed, 40);
    assert!(!certificate.enforcement.compliant);
    assert!(!certificate.compliance.de_identified);
    assert!(!certificate.compliance.safe_harbor);
    assert!(certificate.compliance.anonymous);
    assert_eq!(
        certificate.inference.skipped.as_deref(),
        Some("no rows released")
    );
    assert_eq!(certificate.risk.prosecutor_risk, 1.0);
    assert!(certificate.accounting.ledger.is_none());
    assert!(certification.summary.contains("skipped"));
    Ok(())
}

#[test]
fn exhausted_budget_aborts_certification() -> Result<()> {
    let core = core(0.5)?;
    let original = portfolio(60, 3)?;
    let synthetic = portfolio(60, 4)?;
    let err = core
        .generate_certificate(&original, &synthetic, &certification(Some("D9")))
        .expect_err("epsilon 1.0 exceeds a 0.5 budget");
    assert!(matches!(
        err,
        CertifyError::Ledger(LedgerError::BudgetExhausted { .. })
    ));
    let state = core.get_budget_status("D9")?;
    assert_eq!(state.spent, 0.0);
    assert_eq!(state.refused_count(), 1);
    assert_eq!(state.entries[0].outcome, EntryOutcome::Refused);
    Ok(())
}

#[test]
fn refused_spend_is_an_outcome_not_an_error() -> Result<()> {
    let core = core(1.0)?;
    assert!(core.consume_budget("D2", 0.9, "sample", "analyst")?.success);
    let refused = core.consume_budget("D2", 0.5, "sample", "analyst")?;
    assert!(!refused.success);
    assert!(refused.message.contains("exhausted"));
    assert_relative_eq!(refused.state.spent, 0.9);
    assert_eq!(refused.state.refused_count(), 1);

    assert!(matches!(
        core.consume_budget("D2", -1.0, "sample", "analyst"),
        Err(CertifyError::Ledger(LedgerError::InvalidEpsilon { .. }))
    ));
    assert!(matches!(
        core.get_budget_status("missing"),
        Err(CertifyError::Ledger(LedgerError::UnknownDataset(_)))
    ));
    Ok(())
}

#[test]
fn malformed_requests_abort_before_spending() -> Result<()> {
    let core = core(10.0)?;
    let original = portfolio(30, 5)?;
    let synthetic = portfolio(30, 6)?;
    let config = CertificationConfig {
        quasi_identifiers: vec!["zip".into()],
        ..certification(Some("D3"))
    };
    let err = core
        .generate_certificate(&original, &synthetic, &config)
        .expect_err("zip is not a column");
    assert!(matches!(
        err,
        CertifyError::Anonymity(AnonymityError::UnknownColumn(ref name)) if name == "zip"
    ));
    assert!(!core.ledgers().contains("D3"));

    let narrow = Table::builder().numeric("age", [1.0]).build()?;
    assert!(matches!(
        core.generate_certificate(&original, &narrow, &certification(Some("D3"))),
        Err(CertifyError::Inference(_))
    ));
    assert!(!core.ledgers().contains("D3"));

    let config = CertificationConfig {
        sensitive_columns: vec!["nope".into()],
        ..certification(Some("D3"))
    };
    assert!(matches!(
        core.generate_certificate(&original, &synthetic, &config),
        Err(CertifyError::Inference(InferenceError::UnknownColumn(ref name))) if name == "nope"
    ));
    assert!(!core.ledgers().contains("D3"));

    let empty = original.select_rows(&[])?;
    assert!(matches!(
        core.generate_certificate(&empty, &synthetic, &certification(Some("D3"))),
        Err(CertifyError::Inference(InferenceError::EmptyInput("original")))
    ));
    assert!(!core.ledgers().contains("D3"));
    Ok(())
}

#[test]
fn default_config_builds_the_facade() -> Result<()> {
    let core = PrivacyCore::new(CoreConfig::default())?;
    let original = portfolio(80, 12)?;
    let synthetic = portfolio(80, 13)?;
    let certificate = core.generate_certificate(&original, &synthetic, &certification(None))?;
    assert!(certificate.accounting.ledger.is_none());
    assert!(matches!(
        core.generate_certificate(&original, &synthetic, &CertificationConfig::default()),
        Err(CertifyError::Config(_))
    ));
    Ok(())
}

#[test]
fn upstream_enforcement_is_only_evaluated() -> Result<()> {
    let core = core(10.0)?;
    let table = Table::builder()
        .numeric("age", [30.0, 30.0, 30.0, 30.0, 30.0, 50.0, 50.0, 50.0, 50.0, 50.0])
        .categorical("state", ["CA", "CA", "CA", "CA", "CA", "NY", "NY", "NY", "NY", "NY"])
        .numeric("income", [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0])
        .build()?;
    let config = CertificationConfig {
        enforcement_applied_upstream: true,
        population_size: Some(100),
        ..certification(None)
    };
    let certification = core.certify(&table, &table, &config)?;
    assert_eq!(certification.table, table);
    assert!(certification.certificate.enforcement.passes.is_empty());
    assert_eq!(certification.certificate.enforcement.final_k, 5);
    assert!(certification.certificate.compliance.de_identified);
    let risk = &certification.certificate.risk;
    assert_relative_eq!(risk.sampling_fraction, 0.1);
    assert_relative_eq!(risk.extrapolated_k, 50.0);
    assert_relative_eq!(risk.prosecutor_risk, 0.2);
    assert_relative_eq!(risk.journalist_risk, 0.02);
    assert_eq!(risk.sample_uniqueness, 0.0);
    Ok(())
}

#[test]
fn certificates_round_trip_and_older_documents_parse() -> Result<()> {
    let core = core(10.0)?;
    let original = portfolio(80, 8)?;
    let synthetic = portfolio(80, 9)?;
    let certificate = core.generate_certificate(&original, &synthetic, &certification(Some("D4")))?;

    let parsed = PrivacyCertificate::from_json(&certificate.to_json()?)?;
    assert_eq!(parsed, certificate);

    let mut legacy = serde_json::to_value(&certificate)?;
    if let Some(document) = legacy.as_object_mut() {
        document.remove("schema_version");
    }
    if let Some(inference) = legacy["inference"].as_object_mut() {
        inference.remove("exact_match_rate");
        inference.remove("sensitive_columns");
    }
    if let Some(accounting) = legacy["accounting"].as_object_mut() {
        accounting.remove("ledger");
        accounting.remove("dataset_id");
    }
    let parsed: PrivacyCertificate = serde_json::from_value(legacy)?;
    assert_eq!(parsed.schema_version, CERTIFICATE_SCHEMA_VERSION);
    assert_eq!(parsed.inference.exact_match_rate, 0.0);
    assert!(parsed.accounting.ledger.is_none());
    assert_eq!(parsed.certificate_id, certificate.certificate_id);
    Ok(())
}

#[test]
fn ids_differ_between_issues() -> Result<()> {
    let core = core(10.0)?;
    let original = portfolio(50, 10)?;
    let synthetic = portfolio(50, 11)?;
    let first = core.generate_certificate(&original, &synthetic, &certification(None))?;
    let second = core.generate_certificate(&original, &synthetic, &certification(None))?;
    assert_ne!(first.certificate_id, second.certificate_id);
    assert_eq!(first.enforcement, second.enforcement);
    assert_eq!(first.inference, second.inference);
    Ok(())
}
