//! Argentine phone canonicalization.
//!
//! Meta matches `ph` hashes against the number stored on the user's account,
//! which for Argentine mobiles is `54 9 <area> <number>` without separators.

const COUNTRY_CODE: &str = "54";
const MOBILE_PREFIX: &str = "549";

/// Converts a raw phone string into the digits-only `549...` form used as hashing input.
///
/// Steps, in order:
/// 1. keep only ASCII digits;
/// 2. `549...` is already canonical;
/// 3. `54...` with 12+ digits is missing the mobile `9`, so it is re-prefixed;
/// 4. a leading domestic trunk `0` is dropped;
/// 5. ten remaining digits (area + subscriber) get `549` prepended.
///
/// Anything else is returned digit-stripped (and trunk-stripped) as a best
/// effort; the result may not be a dialable number. Never fails.
pub fn normalize_ar_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.starts_with(MOBILE_PREFIX) {
        return digits;
    }

    if digits.starts_with(COUNTRY_CODE) && digits.len() >= 12 {
        return format!("{}{}", MOBILE_PREFIX, &digits[COUNTRY_CODE.len()..]);
    }

    let national = digits.strip_prefix('0').unwrap_or(&digits);

    if national.len() == 10 {
        return format!("{}{}", MOBILE_PREFIX, national);
    }

    national.to_string()
}
