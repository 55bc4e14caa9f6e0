//! Wallet address and inbox id helpers.

/// True for strict 20-byte EVM addresses in 0x-prefixed hex (`^0x[0-9a-fA-F]{40}$`).
/// Surrounding whitespace is not accepted; callers trim user input first.
pub fn is_valid_address(value: &str) -> bool {
    if value.len() != 42 || !value.starts_with("0x") {
        return false;
    }
    value.as_bytes()[2..].iter().all(|b| b.is_ascii_hexdigit())
}

/// Canonical form used for comparisons and storage keys.
pub fn normalize_address(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

pub fn addresses_equal(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// `0x1234...abcd` for compact display.
pub fn abbreviate_address(addr: &str) -> String {
    if addr.len() > 10 && addr.is_ascii() {
        format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
    } else {
        addr.to_string()
    }
}

/// Inbox ids are long hex strings; keep the first 8 and last 6.
pub fn abbreviate_inbox_id(inbox_id: &str) -> String {
    if inbox_id.len() > 16 && inbox_id.is_ascii() {
        format!("{}...{}", &inbox_id[..8], &inbox_id[inbox_id.len() - 6..])
    } else {
        inbox_id.to_string()
    }
}

/// Two-letter avatar initials for an address: the first two hex digits after `0x`.
pub fn address_initials(addr: &str) -> String {
    match addr.get(2..4) {
        Some(chars) if addr.starts_with("0x") => chars.to_uppercase(),
        _ => "??".to_string(),
    }
}

/// Avatar initials for an inbox id or any other opaque identifier.
pub fn id_initials(id: &str) -> String {
    let initials: String = id.chars().take(2).collect::<String>().to_uppercase();
    if initials.is_empty() {
        "??".to_string()
    } else {
        initials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[test]
    fn accepts_mixed_case_hex() {
        assert!(is_valid_address(ADDR));
        assert!(is_valid_address(&ADDR.to_lowercase()));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("0x1234"));
        assert!(!is_valid_address(&ADDR[2..]));
        assert!(!is_valid_address(&format!(" {ADDR}")));
        assert!(!is_valid_address("0xZZ908400098527886E0F7030069857D2E4169EE7"));
        assert!(!is_valid_address("0X52908400098527886E0F7030069857D2E4169EE7"));
    }

    #[test]
    fn abbreviations() {
        assert_eq!(abbreviate_address(ADDR), "0x5290...9EE7");
        assert_eq!(abbreviate_address("0x12"), "0x12");
        assert_eq!(
            abbreviate_inbox_id("0123456789abcdef0123456789"),
            "01234567...456789"
        );
        assert_eq!(abbreviate_inbox_id("short"), "short");
    }

    #[test]
    fn initials() {
        assert_eq!(address_initials(ADDR), "52");
        assert_eq!(address_initials("abc"), "??");
        assert_eq!(id_initials("ab12"), "AB");
        assert_eq!(id_initials(""), "??");
    }

    #[test]
    fn comparison_ignores_case() {
        assert!(addresses_equal(ADDR, &ADDR.to_lowercase()));
        assert_eq!(normalize_address(&format!(" {ADDR} ")), ADDR.to_lowercase());
    }
}
