//! Property-based tests for the option parser and type mapping.
//!
//! - Rendering options and parsing them back is lossless
//! - Parsing never panics and unknown tokens never change the result
//! - A declared type always wins over the storage tag

use proptest::prelude::*;

use cipherlite_core::config::ConnectOptions;
use cipherlite_core::types::{classify, SemanticType, StorageTag};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_options() -> impl Strategy<Value = ConnectOptions> {
    (
        any::<i32>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        proptest::option::of(1u64..10_000),
    )
        .prop_map(|(busy_timeout_ms, read_only, uri, shared_cache, regexp_cache_size)| {
            ConnectOptions {
                busy_timeout_ms,
                read_only,
                uri,
                shared_cache,
                regexp_cache_size,
            }
        })
}

fn arb_tag() -> impl Strategy<Value = StorageTag> {
    prop_oneof![
        Just(StorageTag::Integer),
        Just(StorageTag::Float),
        Just(StorageTag::Text),
        Just(StorageTag::Blob),
        Just(StorageTag::Null),
    ]
}

proptest! {
    #[test]
    fn display_then_parse_is_identity(opts in arb_options()) {
        prop_assert_eq!(ConnectOptions::parse(&opts.to_string()), opts);
    }

    #[test]
    fn parse_never_panics(input in ".{0,80}") {
        let _ = ConnectOptions::parse(&input);
    }

    #[test]
    fn unknown_tokens_are_ignored(opts in arb_options(), junk in "[a-z]{1,12}(=[0-9a-z]{0,4})?") {
        let with_junk = format!("{junk};{opts};{junk}");
        prop_assert_eq!(ConnectOptions::parse(&with_junk), opts);
    }

    #[test]
    fn declared_integer_ignores_tag(tag in proptest::option::of(arb_tag())) {
        prop_assert_eq!(classify("INTEGER", tag), SemanticType::Integer);
        prop_assert_eq!(classify("varchar(255)", tag), SemanticType::Text);
    }
}

#[test]
fn options_serde_fills_defaults() {
    let opts: ConnectOptions = serde_json::from_str(r#"{"read_only": true}"#).unwrap();
    assert!(opts.read_only);
    assert_eq!(opts.busy_timeout_ms, 5000);
    assert_eq!(opts.regexp_cache_size, None);
}
