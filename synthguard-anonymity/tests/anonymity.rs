use anyhow::Result;
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use synthguard_anonymity::{
    AnonymityEnforcer, AnonymityError, EnforcerConfig, PassKind, Suppression,
};
use synthguard_table::{EquivalenceClasses, QuasiIdentifierSet, Table};

fn qis(names: &[&str]) -> QuasiIdentifierSet {
    QuasiIdentifierSet::new(names.iter().copied())
}

fn kinds(report: &synthguard_anonymity::EnforcementReport) -> Vec<PassKind> {
    report.passes.iter().map(|pass| pass.kind).collect()
}

#[test]
fn compliant_table_is_returned_unchanged() -> Result<()> {
    let table = Table::builder()
        .numeric("age", [30.0, 30.0, 30.0, 40.0, 40.0, 40.0])
        .categorical("state", ["CA", "CA", "CA", "NY", "NY", "NY"])
        .numeric("income", [1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
        .build()?;
    let enforcer = AnonymityEnforcer::default();
    let (released, report) = enforcer.enforce(&table, &qis(&["age", "state"]), 3)?;
    assert_eq!(released, table);
    assert!(report.passes.is_empty());
    assert_eq!(report.initial_k, 3);
    assert_eq!(report.final_k, 3);
    assert!(report.compliant);

    let (again, second) = enforcer.enforce(&released, &qis(&["age", "state"]), 3)?;
    assert_eq!(again, released);
    assert_eq!(second, report);
    Ok(())
}

#[test]
fn zero_target_is_treated_as_one() -> Result<()> {
    let table = Table::builder().numeric("age", [1.0, 2.0, 3.0]).build()?;
    let (released, report) = AnonymityEnforcer::default().enforce(&table, &qis(&["age"]), 0)?;
    assert_eq!(report.target_k, 1);
    assert!(report.compliant);
    assert_eq!(released, table);
    Ok(())
}

#[test]
fn fixed_width_bands_reach_compliance() -> Result<()> {
    let table = Table::builder()
        .numeric("age", (20..40).map(f64::from))
        .categorical("state", vec!["A"; 20])
        .build()?;
    let enforcer = AnonymityEnforcer::new(EnforcerConfig::default().with_band_width("age", 5.0));
    let (released, report) = enforcer.enforce(&table, &qis(&["age", "state"]), 5)?;
    assert_eq!(kinds(&report), vec![PassKind::NumericGeneralization]);
    assert_eq!(report.initial_k, 1);
    assert_eq!(report.final_k, 5);
    assert!(report.compliant);

    let age = released.require_column("age")?;
    assert_eq!(age.banding().map(|banding| banding.band_count()), Some(4));
    assert_eq!(age.numeric_values().and_then(|values| values[0]), Some(22.5));
    assert_eq!(age.display(0), "[20, 25)");
    assert_eq!(age.display(19), "[35, 40]");
    Ok(())
}

#[test]
fn rare_categories_collapse_into_other() -> Result<()> {
    let states = [vec!["CA"; 6], vec!["NY"; 6], vec!["WY"; 2], vec!["VT"; 3]].concat();
    let table = Table::builder().categorical("state", states).build()?;
    let (released, report) = AnonymityEnforcer::default().enforce(&table, &qis(&["state"]), 5)?;
    assert_eq!(kinds(&report), vec![PassKind::CategoricalGeneralization]);
    assert_eq!(report.passes[0].rows_affected, 5);
    assert_eq!(report.final_k, 5);
    let column = released.require_column("state")?;
    assert_eq!(column.display(12), "Other");
    assert_eq!(column.display(16), "Other");
    assert_eq!(column.display(0), "CA");
    Ok(())
}

#[test]
fn micro_aggregation_merges_sparse_combinations() -> Result<()> {
    let table = Table::builder()
        .categorical("state", ["A", "B", "A", "B", "A", "B", "A", "B", "A", "B"])
        .categorical("grade", ["x", "x", "x", "y", "y", "x", "x", "y", "y", "y"])
        .build()?;
    let (released, report) =
        AnonymityEnforcer::default().enforce(&table, &qis(&["state", "grade"]), 5)?;
    assert_eq!(kinds(&report), vec![PassKind::MicroAggregation]);
    assert_eq!(report.passes[0].rows_affected, 4);
    assert_eq!(report.rows_out, 10);
    assert!(report.compliant);

    let classes = EquivalenceClasses::compute(&released, &qis(&["state", "grade"]))?;
    assert_eq!(classes.len(), 2);
    assert_eq!(classes.min_size(), 5);
    Ok(())
}

#[test]
fn suppression_removes_leftover_rows() -> Result<()> {
    let states = [vec!["A"; 6], vec!["B"; 6], vec!["C"; 2]].concat();
    let table = Table::builder()
        .categorical("state", states)
        .numeric("income", (0..14).map(f64::from))
        .build()?;
    let (released, report) = AnonymityEnforcer::default().enforce(&table, &qis(&["state"]), 5)?;
    assert_eq!(
        kinds(&report),
        vec![PassKind::CategoricalGeneralization, PassKind::Suppression]
    );
    assert_eq!(report.rows_suppressed, 2);
    assert_eq!(report.rows_in, 14);
    assert_eq!(report.rows_out, 12);
    assert_eq!(report.final_k, 6);
    assert!(report.compliant);
    assert_eq!(released.row_count(), 12);
    Ok(())
}

#[test]
fn unreachable_target_suppresses_everything_without_error() -> Result<()> {
    let table = Table::builder()
        .numeric("age", [30.0, 31.0, 32.0, 33.0])
        .categorical("state", ["CA", "CA", "NY", "NY"])
        .build()?;
    let (released, report) =
        AnonymityEnforcer::default().enforce(&table, &qis(&["age", "state"]), 50)?;
    assert!(released.is_empty());
    assert_eq!(report.final_k, 0);
    assert_eq!(report.rows_suppressed, 4);
    assert!(!report.compliant);
    assert!(report.applied(PassKind::Suppression));
    Ok(())
}

#[test]
fn unknown_quasi_identifier_is_rejected() {
    let table = Table::builder()
        .numeric("age", [30.0])
        .build()
        .expect("table");
    let enforcer = AnonymityEnforcer::default();
    assert_eq!(
        enforcer.enforce(&table, &qis(&["zip"]), 2).map(|(_, report)| report),
        Err(AnonymityError::UnknownColumn("zip".into()))
    );
    assert_eq!(
        enforcer.evaluate(&table, &qis(&["zip"]), 2),
        Err(AnonymityError::UnknownColumn("zip".into()))
    );
}

#[test]
fn every_released_class_meets_target() -> Result<()> {
    let mut rng = ChaCha20Rng::seed_from_u64(99);
    let rows = 600;
    let zips: Vec<String> = (0..rows)
        .map(|_| format!("9{:04}", rng.gen_range(0..40) * rng.gen_range(1..4)))
        .collect();
    let table = Table::builder()
        .numeric("age", (0..rows).map(|_| f64::from(rng.gen_range(18..90))))
        .categorical("zip", zips)
        .numeric("income", (0..rows).map(|_| rng.gen_range(20_000.0..150_000.0)))
        .build()?;
    let quasi = qis(&["age", "zip"]);
    for k in [2, 5, 11] {
        let (released, report) = AnonymityEnforcer::default().enforce(&table, &quasi, k)?;
        let classes = EquivalenceClasses::compute(&released, &quasi)?;
        assert!(classes.min_size() >= k, "k={k} min={}", classes.min_size());
        assert_eq!(report.final_k, classes.min_size());
        assert_eq!(report.rows_out + report.rows_suppressed, rows);
        assert!(report.compliant);
        assert!(released.same_schema(&table));
    }
    Ok(())
}

#[test]
fn evaluate_reports_without_transforming() -> Result<()> {
    let table = Table::builder()
        .numeric("age", [30.0, 30.0, 41.0])
        .build()?;
    let report = AnonymityEnforcer::default().evaluate(&table, &qis(&["age"]), 2)?;
    assert_eq!(report.initial_k, 1);
    assert_eq!(report.final_k, 1);
    assert!(report.passes.is_empty());
    assert!(!report.compliant);
    Ok(())
}

#[test]
fn custom_pass_sequence_is_honoured() -> Result<()> {
    let table = Table::builder()
        .numeric("age", [30.0, 30.0, 30.0, 41.0])
        .build()?;
    let enforcer =
        AnonymityEnforcer::with_passes(EnforcerConfig::default(), vec![Box::new(Suppression)]);
    let (released, report) = enforcer.enforce(&table, &qis(&["age"]), 2)?;
    assert_eq!(kinds(&report), vec![PassKind::Suppression]);
    assert_eq!(released.row_count(), 3);
    Ok(())
}

#[test]
fn report_serializes_pass_kinds_in_snake_case() -> Result<()> {
    let table = Table::builder()
        .categorical("state", ["A", "A", "B"])
        .build()?;
    let (_, report) = AnonymityEnforcer::default().enforce(&table, &qis(&["state"]), 2)?;
    let json = serde_json::to_value(&report)?;
    assert_eq!(json["passes"][0]["kind"], "categorical_generalization");
    let parsed: synthguard_anonymity::EnforcementReport = serde_json::from_value(json)?;
    assert_eq!(parsed, report);
    Ok(())
}
