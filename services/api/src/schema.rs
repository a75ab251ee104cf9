use clap::Args;
use fraud_decision::config::AppConfig;
use fraud_decision::error::AppError;
use fraud_decision::store::{ConfigStore, SqliteConfigStore, ThresholdSet};
use std::path::PathBuf;

/// Rows mirroring the built-in defaults plus a small reference data set, for local runs.
const SAMPLE_RULES: &str = "
INSERT INTO fraud_threshold (threshold_set, threshold_key, threshold_value) VALUES
    ('card', 'VELOCITY_5_COUNT', 3),
    ('card', 'VELOCITY_5_AMOUNT', 200000),
    ('card', 'VELOCITY_30_COUNT', 5),
    ('card', 'VELOCITY_30_AMOUNT', 500000),
    ('card', 'FAILED_TXN_1DAY', 2),
    ('card', 'ML_FRAUD_THRESHOLD', 0.9),
    ('card', 'WRONG_CVV_10', 2),
    ('card', 'WRONG_PIN_10', 2),
    ('myprime', 'ML_FRAUD_THRESHOLD', 0.7),
    ('myprime', 'ML_SUSPICIOUS_THRESHOLD', 0.5),
    ('myprime', 'LARGE_AMOUNT', 100000),
    ('myprime', 'VERY_LARGE_AMOUNT', 500000),
    ('myprime', 'FAILED_LOGINS_1HR', 3),
    ('myprime', 'FAILED_LOGINS_FRAUD_1HR', 10),
    ('staged', 'TOTAL_RISK_FRAUD', 70),
    ('staged', 'TOTAL_RISK_RISKY', 50),
    ('staged', 'TOTAL_RISK_SUSPICIOUS', 30);

INSERT INTO fraud_mcc_rule (mcc_code) VALUES ('4829'), ('6051'), ('7995');

INSERT INTO fraud_mcc_product_rule (product_code, mcc_code, risk_level) VALUES
    ('CLASSIC', '7995', 'HIGH'),
    ('GOLD', '7995', 'MEDIUM'),
    ('GOLD', '4829', 'HIGH');

INSERT INTO fraud_country_block_rule (country_name, country_code, decision_level) VALUES
    ('NORTH KOREA', 'KP', 'BLOCKED'),
    ('IRAN', 'IR', 'BLOCKED'),
    ('NIGERIA', 'NG', 'HIGH_RISK'),
    ('UNITED ARAB EMIRATES', 'AE', 'MEDIUM_RISK');

INSERT INTO myprime_rule_config (rule_code, points, threshold1, threshold2, multiplier1, multiplier2) VALUES
    ('GLOBAL', NULL, 70, 40, 0.8, 0.5),
    ('LARGE_AMOUNT', 15, 100000, NULL, NULL, NULL),
    ('ODD_HOURS_LOGIN', 10, 0, 6, NULL, NULL),
    ('NEW_DEVICE', 10, NULL, NULL, NULL, NULL);

INSERT INTO myprime_risk_rules (rule_id, rule_name, rule_description, risk_score, severity, priority) VALUES
    ('RULE_29', 'ACCOUNT_TAKEOVER_PATTERN', 'Failed login + new device + large transaction', 55, 'FRAUD', 100),
    ('RULE_22', 'OTP_NOT_VERIFIED_LARGE_TXN', 'OTP not verified for large transaction', 40, 'FRAUD', 80),
    ('RULE_2', 'NEW_DEVICE_LOGIN', 'Login from new/unrecognized device', 10, 'SUSPICIOUS', 10);
";

#[derive(Args, Debug, Default)]
pub(crate) struct SchemaArgs {
    /// SQLite file to create or update (defaults to FRAUD_STORE_PATH)
    #[arg(long)]
    pub(crate) path: Option<PathBuf>,
    /// Insert sample rule configuration rows
    #[arg(long)]
    pub(crate) sample: bool,
}

pub(crate) fn run_schema(args: SchemaArgs) -> Result<(), AppError> {
    let path = match args.path {
        Some(path) => path,
        None => AppConfig::load()?.store.path,
    };

    let store = SqliteConfigStore::open(&path)?;
    if args.sample {
        store.execute_batch(SAMPLE_RULES)?;
    }

    println!("Rule configuration store ready at {}", path.display());
    print_summary(&store)
}

fn print_summary(store: &SqliteConfigStore) -> Result<(), AppError> {
    let now = chrono::Utc::now();
    for set in ThresholdSet::ALL {
        let thresholds = store.active_thresholds(set, now)?;
        println!("  {:<8} thresholds: {}", set.as_str(), thresholds.len());
    }
    println!("  suspicious MCC codes: {}", store.active_category_codes()?.len());
    println!("  product/MCC risk rows: {}", store.active_risk_matrix(None)?.len());
    println!("  country risk rows: {}", store.active_country_risks()?.len());
    println!("  rule parameter rows: {}", store.active_rule_parameters()?.len());
    println!("  risk rule rows: {}", store.active_risk_rules()?.len());
    Ok(())
}
