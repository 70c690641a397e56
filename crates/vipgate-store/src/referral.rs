//! Referral code derivation.

use vipgate_core::UserId;

/// Deterministic referral code for a user.
///
/// The code is the prefix followed by the decimal id, so two distinct ids
/// never share a code under the same prefix.
#[inline]
pub fn referral_code(prefix: &str, user_id: UserId) -> String {
    format!("{prefix}{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(referral_code("GS", 12345), "GS12345");
        assert_eq!(referral_code("GS", 12345), referral_code("GS", 12345));
    }

    #[test]
    fn distinct_ids_distinct_codes() {
        let codes: std::collections::HashSet<_> =
            (1..=1_000).map(|id| referral_code("GS", id)).collect();
        assert_eq!(codes.len(), 1_000);
        assert_ne!(referral_code("GS", -5), referral_code("GS", 5));
    }
}
