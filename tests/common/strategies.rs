#![allow(dead_code)]

use proptest::prelude::*;

/// Dotted numeric versions such as "1.2.3" or "10.0.1"
pub fn dotted_version_strategy() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(0u16..100, 1..4)
}

/// Versions carrying at least one non-digit, non-dot character
pub fn invalid_version_strategy() -> impl Strategy<Value = String> {
    "[0-9]{0,2}\\.?[a-zA-Z_ -]{1,3}[0-9.]{0,3}"
}

/// IPv4 addresses as producers send them
pub fn ipv4_strategy() -> impl Strategy<Value = String> {
    (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
        .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}"))
}

/// Device identifiers in the formats seen on the queue
pub fn device_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{3}-[0-9]{2}-[0-9]{4}",
        "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}",
    ]
}
