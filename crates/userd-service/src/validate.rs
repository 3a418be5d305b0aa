//! Custom validation rules used by the request types.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;
use validator::ValidationError;

/// Characters allowed in names and nicknames: unicode letters and digits,
/// hyphen, underscore and space. Restrictive on purpose, since these fields
/// are echoed to event consumers.
static ALLOWED_RUNES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}\-_ ]*$").expect("allowed-runes pattern is valid"));

/// ISO 3166-1 alpha-2 assigned codes, sorted for binary search.
const COUNTRY_CODES: &[&str] = &[
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX",
    "AZ", "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ",
    "BR", "BS", "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK",
    "CL", "CM", "CN", "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM",
    "DO", "DZ", "EC", "EE", "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR",
    "GA", "GB", "GD", "GE", "GF", "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS",
    "GT", "GU", "GW", "GY", "HK", "HM", "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN",
    "IO", "IQ", "IR", "IS", "IT", "JE", "JM", "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN",
    "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC", "LI", "LK", "LR", "LS", "LT", "LU", "LV",
    "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK", "ML", "MM", "MN", "MO", "MP", "MQ",
    "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA", "NC", "NE", "NF", "NG", "NI",
    "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG", "PH", "PK", "PL", "PM",
    "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW", "SA", "SB", "SC",
    "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS", "ST", "SV",
    "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO", "TR",
    "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
    "VN", "VU", "WF", "WS", "YE", "YT", "ZA", "ZM", "ZW",
];

pub(crate) fn allowed_runes(value: &str) -> Result<(), ValidationError> {
    if ALLOWED_RUNES.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("allowed_runes"))
    }
}

pub(crate) fn iso_country(value: &str) -> Result<(), ValidationError> {
    if COUNTRY_CODES.binary_search(&value).is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("iso3166_1_alpha2"))
    }
}

pub(crate) fn uuid_format(value: &str) -> Result<(), ValidationError> {
    if Uuid::parse_str(value).is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("uuid"))
    }
}

/// Empty passwords are allowed on update (the stored hash is kept);
/// non-empty ones must meet the minimum length.
pub(crate) fn optional_password(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.chars().count() >= 10 {
        Ok(())
    } else {
        Err(ValidationError::new("password_too_short"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_table_is_sorted() {
        let mut sorted = COUNTRY_CODES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, COUNTRY_CODES);
    }

    #[test]
    fn accepts_unicode_names() {
        for name in ["Max", "Ren\u{e9}e", "\u{5c0f}\u{6797}", "Anne-Marie", "a_b 9"] {
            assert!(allowed_runes(name).is_ok(), "rejected {name}");
        }
    }

    #[test]
    fn rejects_punctuation_and_markup() {
        for name in ["<script>", "a;b", "x\u{0}y", "quote\"d"] {
            assert!(allowed_runes(name).is_err(), "accepted {name}");
        }
    }

    #[test]
    fn country_codes_are_exact_match_only() {
        assert!(iso_country("DE").is_ok());
        assert!(iso_country("NL").is_ok());
        assert!(iso_country("de").is_err());
        assert!(iso_country("XX").is_err());
        assert!(iso_country("DEU").is_err());
    }

    #[test]
    fn uuid_rule_requires_parseable_ids() {
        assert!(uuid_format("0e24438f-2e02-4f40-9b4c-8a9ec0a8ec85").is_ok());
        assert!(uuid_format("not-a-uuid").is_err());
        assert!(uuid_format("").is_err());
    }

    #[test]
    fn update_password_may_be_empty_but_not_short() {
        assert!(optional_password("").is_ok());
        assert!(optional_password("password123").is_ok());
        assert!(optional_password("short").is_err());
    }
}
