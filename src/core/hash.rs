use sha2::{Digest, Sha256};

use crate::core::signal::NamedResultSet;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Stable digest of a result set; equal sets hash equally regardless of check completion order.
pub fn result_fingerprint(results: &NamedResultSet) -> String {
    let mut buf = String::new();
    for (name, outcome) in results {
        buf.push_str(name);
        buf.push('=');
        buf.push_str(&outcome.encode().to_string());
        buf.push('|');
    }
    format!("res_{}", sha256_hex(buf.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signal::CheckOutcome;

    #[test]
    fn fingerprint_ignores_insertion_order_and_evidence_text() {
        let mut a = NamedResultSet::new();
        a.insert("no_https".into(), CheckOutcome::positive());
        a.insert("ip_host".into(), CheckOutcome::Negative);

        let mut b = NamedResultSet::new();
        b.insert("ip_host".into(), CheckOutcome::Negative);
        b.insert("no_https".into(), CheckOutcome::positive_with("plain http"));

        assert_eq!(result_fingerprint(&a), result_fingerprint(&b));

        b.insert("ip_host".into(), CheckOutcome::indeterminate("timeout"));
        assert_ne!(result_fingerprint(&a), result_fingerprint(&b));
    }
}
