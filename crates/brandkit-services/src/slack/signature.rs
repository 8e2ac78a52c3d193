use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::SlackError;

/// Requests older (or newer) than this are treated as replays
pub const REPLAY_WINDOW_SECS: i64 = 60 * 5;

/// Verify Slack's `v0` request signature.
///
/// `signature` is the `X-Slack-Signature` header (`v0=<hex>`), `timestamp`
/// the `X-Slack-Request-Timestamp` header, `now` the current unix time.
pub fn verify_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> Result<(), SlackError> {
    let ts: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SlackError::StaleTimestamp)?;
    if now.abs_diff(ts) > REPLAY_WINDOW_SECS.unsigned_abs() {
        return Err(SlackError::StaleTimestamp);
    }

    let provided = signature
        .strip_prefix("v0=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or(SlackError::InvalidSignature)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes())
        .map_err(|_| SlackError::InvalidSignature)?;
    mac.update(b"v0:");
    mac.update(timestamp.trim().as_bytes());
    mac.update(b":");
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| SlackError::InvalidSignature)
}

#[cfg(test)]
pub(crate) fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes()).unwrap();
    mac.update(format!("v0:{}:", timestamp).as_bytes());
    mac.update(body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const BODY: &[u8] = b"token=x&team_id=T1&command=%2Fbrand&text=colors";

    #[test]
    fn accepts_valid_signature() {
        let sig = sign(SECRET, "1700000000", BODY);
        assert_eq!(verify_signature(SECRET, "1700000000", BODY, &sig, 1700000100), Ok(()));
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let sig = sign(SECRET, "1700000000", BODY);
        assert_eq!(
            verify_signature(SECRET, "1700000000", b"team_id=T2", &sig, 1700000000),
            Err(SlackError::InvalidSignature)
        );
        assert_eq!(
            verify_signature("other", "1700000000", BODY, &sig, 1700000000),
            Err(SlackError::InvalidSignature)
        );
        assert_eq!(
            verify_signature(SECRET, "1700000000", BODY, "v1=abc", 1700000000),
            Err(SlackError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_outside_replay_window() {
        let sig = sign(SECRET, "1700000000", BODY);
        assert_eq!(
            verify_signature(SECRET, "1700000000", BODY, &sig, 1700000000 + REPLAY_WINDOW_SECS + 1),
            Err(SlackError::StaleTimestamp)
        );
        assert_eq!(
            verify_signature(SECRET, "1700000000", BODY, &sig, 1700000000 - REPLAY_WINDOW_SECS - 1),
            Err(SlackError::StaleTimestamp)
        );
        assert_eq!(
            verify_signature(SECRET, "soon", BODY, &sig, 1700000000),
            Err(SlackError::StaleTimestamp)
        );
    }

    #[test]
    fn extreme_timestamps_are_stale() {
        let now = 1_700_000_000;
        for ts in ["-9223372036854775808", "9223372036854775807"] {
            let sig = sign(SECRET, ts, BODY);
            assert!(matches!(
                verify_signature(SECRET, ts, BODY, &sig, now),
                Err(SlackError::StaleTimestamp)
            ));
        }
    }
}
