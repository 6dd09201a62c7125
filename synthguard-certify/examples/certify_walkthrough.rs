use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;
use synthguard_certify::{CertificationConfig, CoreConfig, PrivacyCore};
use synthguard_table::Table;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let core = PrivacyCore::new(CoreConfig::sample())?;
    let original = source_table(1_000, 42)?;

    let model = core.fit_correlation_model(&original)?;
    let synthetic = core.sample_from_model(&model, 1_000, 7)?;
    println!(
        "Sampled {} rows preserving correlations over {:?}",
        synthetic.row_count(),
        model.model().numeric_columns()
    );

    let outcome = core.consume_budget("D1", 1.0, "sample", "walkthrough")?;
    println!("Budget: {} (remaining {:.2})", outcome.message, outcome.state.remaining);

    let config = CertificationConfig {
        quasi_identifiers: vec!["age".into(), "state".into()],
        dataset_id: Some("D1".into()),
        population_size: Some(250_000),
        actor: "walkthrough".into(),
        ..CertificationConfig::default()
    };
    let certification = core.certify(&original, &synthetic, &config)?;
    println!("{}", certification.summary);
    println!(
        "Released {} rows; certificate JSON is {} bytes",
        certification.table.row_count(),
        certification.certificate.to_json()?.len()
    );
    Ok(())
}

fn source_table(rows: usize, seed: u64) -> Result<Table, Box<dyn std::error::Error>> {
    const STATES: [&str; 5] = ["CA", "NY", "TX", "WA", "FL"];
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut ages = Vec::with_capacity(rows);
    let mut states = Vec::with_capacity(rows);
    let mut incomes = Vec::with_capacity(rows);
    for _ in 0..rows {
        let z1: f64 = rng.sample(StandardNormal);
        let z2: f64 = rng.sample(StandardNormal);
        ages.push((45.0 + 12.0 * z1).clamp(18.0, 90.0).round());
        states.push(STATES[rng.gen_range(0..STATES.len())]);
        incomes.push((10.8 + 0.35 * (0.6 * z1 + 0.8 * z2)).exp().round());
    }
    Ok(Table::builder()
        .numeric("age", ages)
        .categorical("state", states)
        .numeric("income", incomes)
        .build()?)
}
