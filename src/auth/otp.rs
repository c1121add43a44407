use rand::Rng;
use time::{Duration, OffsetDateTime};

use crate::users::model::Otp;

/// Mint a fresh 4-digit code with an absolute expiry `ttl_minutes` from now.
/// Every issuance replaces the user's outstanding slot, so the previous code
/// is silently invalidated.
pub fn issue(ttl_minutes: i64) -> Otp {
    let code = rand::thread_rng().gen_range(1000..10_000);
    Otp {
        code: code.to_string(),
        expires_at: OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_four_digits() {
        for _ in 0..100 {
            let otp = issue(10);
            assert_eq!(otp.code.len(), 4);
            assert!(otp.code.chars().all(|c| c.is_ascii_digit()));
            assert!(!otp.code.starts_with('0'));
        }
    }

    #[test]
    fn expiry_is_in_the_future() {
        let otp = issue(10);
        let now = OffsetDateTime::now_utc();
        assert!(otp.expires_at > now);
        assert!(otp.expires_at <= now + Duration::minutes(11));
    }
}
