//! Revert payload decoding.

use alloy::{hex, primitives::Bytes, rpc::json_rpc::ErrorPayload};

/// Selector for standard Solidity Error(string) revert.
const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Selector for Solidity Panic(uint256).
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

const EXECUTION_REVERTED: &str = "execution reverted";

/// Decode standard Solidity revert string (Error(string)).
pub fn decode_revert_string(data: &Bytes) -> Option<String> {
    if data.len() < 68 || data[..4] != REVERT_SELECTOR {
        return None;
    }

    // selector | offset (32) | length (32) | utf-8 bytes
    let length_bytes: [u8; 32] = data[36..68].try_into().ok()?;
    if length_bytes[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let length = u64::from_be_bytes(length_bytes[24..32].try_into().ok()?) as usize;

    let end = 68usize.checked_add(length)?;
    if data.len() < end {
        return None;
    }

    String::from_utf8(data[68..end].to_vec()).ok()
}

/// Decode Solidity panic code to a human-readable message.
pub fn decode_panic(data: &Bytes) -> Option<&'static str> {
    if data.len() < 36 || data[..4] != PANIC_SELECTOR {
        return None;
    }

    // Panic code is a uint256, but meaningful codes fit in a single byte
    let code = data[35];
    Some(match code {
        0x01 => "Assertion failed",
        0x11 => "Arithmetic overflow/underflow",
        0x12 => "Division by zero",
        0x21 => "Invalid enum value",
        0x22 => "Storage encoding error",
        0x31 => "Pop on empty array",
        0x32 => "Array index out of bounds",
        0x41 => "Too much memory allocated",
        0x51 => "Zero internal function called",
        _ => "Unknown panic code",
    })
}

/// Reason string for raw revert data.
///
/// `Error(string)` yields the string itself so callers can surface it
/// verbatim; everything else gets a descriptive fallback.
pub fn revert_reason(data: &Bytes) -> String {
    if let Some(reason) = decode_revert_string(data) {
        return reason;
    }

    if let Some(panic) = decode_panic(data) {
        return format!("Panic: {panic}");
    }

    if data.len() >= 4 {
        return format!(
            "Unknown custom error selector 0x{}",
            hex::encode(&data[..4])
        );
    }

    format!("Unknown revert data 0x{}", hex::encode(data))
}

/// Reason embedded in a node message such as `execution reverted: EXPIRED`.
pub fn revert_reason_from_message(message: &str) -> Option<String> {
    let rest = message.trim().strip_prefix(EXECUTION_REVERTED)?;
    let reason = rest.strip_prefix(':')?.trim();
    (!reason.is_empty()).then(|| reason.to_string())
}

fn spelunk_hex_revert(value: &serde_json::Value) -> Option<Bytes> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Object(o) => o.values().find_map(spelunk_hex_revert),
        _ => None,
    }
}

/// Pull revert bytes out of a JSON-RPC error payload.
///
/// Nodes disagree on the shape of `data`: a bare hex string, an object with a
/// nested `data` field, or occasionally invalid JSON holding a bare selector.
pub(crate) fn extract_revert_data(payload: &ErrorPayload) -> Option<Bytes> {
    let raw = payload.data.as_ref()?;
    let s = raw.get().trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(s)
        && let Some(bytes) = spelunk_hex_revert(&value)
    {
        return Some(bytes);
    }

    s.trim_matches('"').parse().ok()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::primitives::bytes;

    use super::*;

    #[test]
    fn test_decode_revert_string() {
        let data = bytes!(
            "08c379a0"  // selector
            "0000000000000000000000000000000000000000000000000000000000000020"  // offset
            "000000000000000000000000000000000000000000000000000000000000000a"  // length
            "74657374206572726f7200000000000000000000000000000000000000000000"  // "test error" padded
        );

        assert_eq!(decode_revert_string(&data), Some("test error".to_string()));
        assert_eq!(revert_reason(&data), "test error");
    }

    #[test]
    fn test_decode_revert_string_truncated() {
        let data = bytes!(
            "08c379a0"
            "0000000000000000000000000000000000000000000000000000000000000020"
            "00000000000000000000000000000000000000000000000000000000000000ff"
            "74657374206572726f7200000000000000000000000000000000000000000000"
        );

        assert_eq!(decode_revert_string(&data), None);
    }

    #[test]
    fn test_decode_panic_overflow() {
        let data = bytes!(
            "4e487b71"
            "0000000000000000000000000000000000000000000000000000000000000011"
        );

        assert_eq!(decode_panic(&data), Some("Arithmetic overflow/underflow"));
        assert_eq!(revert_reason(&data), "Panic: Arithmetic overflow/underflow");
    }

    #[test]
    fn test_custom_selector_fallback() {
        let data = bytes!("deadbeef00");
        assert_eq!(
            revert_reason(&data),
            "Unknown custom error selector 0xdeadbeef"
        );
        assert_eq!(revert_reason(&bytes!("01")), "Unknown revert data 0x01");
    }

    #[test]
    fn test_reason_from_message() {
        assert_eq!(
            revert_reason_from_message("execution reverted: insufficient output amount")
                .as_deref(),
            Some("insufficient output amount")
        );
        assert_eq!(revert_reason_from_message("execution reverted"), None);
        assert_eq!(revert_reason_from_message("execution reverted: "), None);
        assert_eq!(revert_reason_from_message("nonce too low"), None);
    }

    #[test]
    fn test_extract_revert_data_shapes() {
        let nested: ErrorPayload = serde_json::from_str(
            r#"{"code":3,"message":"execution reverted","data":{"data":"0xdeadbeef"}}"#,
        )
        .unwrap();
        assert_eq!(extract_revert_data(&nested), Some(bytes!("deadbeef")));

        let flat: ErrorPayload = serde_json::from_str(
            r#"{"code":3,"message":"execution reverted","data":"0x08c379a0"}"#,
        )
        .unwrap();
        assert_eq!(extract_revert_data(&flat), Some(bytes!("08c379a0")));

        let missing: ErrorPayload =
            serde_json::from_str(r#"{"code":-32000,"message":"boom"}"#).unwrap();
        assert_eq!(extract_revert_data(&missing), None);
    }
}
