//! Frame and hub identity tokens

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

const RANDOM_LETTERS: usize = 10;
const TIME_SUFFIX_DIGITS: usize = 5;

/// Generate a best-effort unique token: random lowercase letters, `:`, and
/// the low base-36 digits of the current time in milliseconds.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let letters: String = (0..RANDOM_LETTERS)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect();

    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let time = to_base36(millis);
    let suffix = &time[time.len().saturating_sub(TIME_SUFFIX_DIGITS)..];

    format!("{}:{}", letters, suffix)
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Identity of one hub process, used to discard self-originated broadcasts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HubId(String);

impl HubId {
    /// Generate a fresh identity for this process
    pub fn generate() -> Self {
        HubId(format!("h{}", generate_token()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HubId {
    fn from(s: &str) -> Self {
        HubId(s.to_string())
    }
}

impl From<String> for HubId {
    fn from(s: String) -> Self {
        HubId(s)
    }
}

impl PartialEq<str> for HubId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl std::fmt::Display for HubId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
