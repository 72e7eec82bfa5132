use rand::RngCore;

/// Generates a short reference used as the human-visible transaction id on
/// manual payments: 8 random bytes, uppercase hex (16 characters).
pub fn transaction_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);

    let mut out = String::with_capacity(16);
    for b in bytes {
        out.push_str(&format!("{b:02X}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_is_16_uppercase_hex_chars() {
        let id = transaction_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn transaction_ids_differ() {
        assert_ne!(transaction_id(), transaction_id());
    }
}
