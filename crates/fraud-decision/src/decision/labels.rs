use std::collections::HashMap;
use std::sync::OnceLock;

const MYPRIME_REASON_LABELS: &[(&str, &str)] = &[
    ("HIGH_ML_SCORE", "High Fraud Risk Score"),
    ("VERY_LARGE_AMOUNT", "Very Large Transaction Amount"),
    ("EXTREME_FAILED_LOGINS", "Excessive Failed Login Attempts"),
    ("HIGH_VELOCITY_24HR_COUNT", "High Transaction Count in 24 Hours"),
    ("HIGH_VELOCITY_24HR_AMOUNT", "High Transaction Amount in 24 Hours"),
    ("NEW_DEVICE_AND_BENEFICIARY", "New Device and New Beneficiary"),
    ("EXCESSIVE_NEW_DEVICES", "Excessive New Devices Detected"),
    ("EXCESSIVE_NEW_BENEFICIARIES", "Excessive New Beneficiaries Detected"),
    ("LARGE_AMOUNT", "Large Transaction Amount"),
    ("MULTIPLE_FAILED_LOGINS", "Multiple Failed Login Attempts"),
    ("HIGH_VELOCITY_1HR_COUNT", "High Transaction Count in 1 Hour"),
    ("HIGH_VELOCITY_1HR_AMOUNT", "High Transaction Amount in 1 Hour"),
    ("MULTI_COUNTRY_ACTIVITY", "Transactions from Multiple Countries"),
    ("MULTI_CITY_ACTIVITY", "Transactions from Multiple Cities"),
    ("ODD_HOURS_LARGE_TXN", "Large Transaction During Odd Hours"),
    ("ODD_HOURS_NEW_DEVICE", "New Device Used During Odd Hours"),
    ("SUSPICIOUS_MCC_CODE", "Suspicious Merchant Category Code"),
    ("NEW_DEVICE", "Transaction from New Device"),
    ("NEW_BENEFICIARY", "Transaction to New Beneficiary"),
    ("MODERATE_ML_SCORE", "Moderate Fraud Risk Score"),
    ("NONE", "No Risk Detected"),
];

/// Reason code to human-readable label. Unknown codes pass through unchanged.
#[derive(Debug)]
pub struct LabelDictionary {
    labels: HashMap<&'static str, &'static str>,
}

impl LabelDictionary {
    pub fn from_entries(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            labels: entries.iter().copied().collect(),
        }
    }

    /// Labels for the MyPrime models, built on first use.
    pub fn myprime() -> &'static LabelDictionary {
        static DICTIONARY: OnceLock<LabelDictionary> = OnceLock::new();
        DICTIONARY.get_or_init(|| LabelDictionary::from_entries(MYPRIME_REASON_LABELS))
    }

    pub fn label<'a>(&self, code: &'a str) -> &'a str {
        self.labels.get(code).copied().unwrap_or(code)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_get_labels() {
        let labels = LabelDictionary::myprime();
        assert_eq!(labels.label("HIGH_ML_SCORE"), "High Fraud Risk Score");
        assert_eq!(labels.label("NONE"), "No Risk Detected");
        assert_eq!(labels.len(), MYPRIME_REASON_LABELS.len());
    }

    #[test]
    fn unknown_codes_pass_through() {
        assert_eq!(
            LabelDictionary::myprime().label("BRAND_NEW_RULE"),
            "BRAND_NEW_RULE"
        );
    }
}
