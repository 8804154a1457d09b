//! Parameter canonicalization.
//!
//! Signing and verification must serialize a parameter set into the exact
//! same byte string or verification fails even for a structurally valid
//! signature. The rule: trim each value, drop empty values, drop the `sign`
//! and `sign_type` keys, emit `key=value` pairs, sort the full pair strings
//! lexicographically, join with `&`.

/// Key excluded from signing: the signature itself.
pub const SIGN_KEY: &str = "sign";

/// Key excluded from signing: the signature algorithm marker.
pub const SIGN_TYPE_KEY: &str = "sign_type";

/// Build the canonical signable string for a parameter set.
///
/// Pure function of the parameter contents; insertion order never matters.
/// Zero eligible pairs produce an empty string, which is legal and signs as
/// the empty message.
pub fn canonical_string<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| *key != SIGN_KEY && *key != SIGN_TYPE_KEY)
        .filter_map(|(key, value)| {
            let value = value.trim();
            if value.is_empty() {
                None
            } else {
                Some(format!("{key}={value}"))
            }
        })
        .collect();
    pairs.sort();
    pairs.join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn canonicalize_map(map: &HashMap<&str, &str>) -> String {
        canonical_string(map.iter().map(|(k, v)| (*k, *v)))
    }

    #[test]
    fn test_order_independence() {
        let forward = canonical_string(vec![("a", "1"), ("b", "2"), ("c", "3")]);
        let reversed = canonical_string(vec![("c", "3"), ("b", "2"), ("a", "1")]);
        let shuffled = canonical_string(vec![("b", "2"), ("a", "1"), ("c", "3")]);
        assert_eq!(forward, "a=1&b=2&c=3");
        assert_eq!(forward, reversed);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn test_sign_and_sign_type_excluded() {
        let out = canonical_string(vec![
            ("app_id", "2014072300007148"),
            ("sign", "AxoPq1O"),
            ("sign_type", "RSA2"),
        ]);
        assert_eq!(out, "app_id=2014072300007148");
        assert!(!out.contains("sign="));
        assert!(!out.contains("sign_type"));
    }

    #[test]
    fn test_empty_and_whitespace_values_excluded() {
        let out = canonical_string(vec![("a", "1"), ("b", ""), ("c", "   "), ("d", "\t\n")]);
        assert_eq!(out, "a=1");
    }

    #[test]
    fn test_values_are_trimmed() {
        let out = canonical_string(vec![("a", "  hello  "), ("b", "x ")]);
        assert_eq!(out, "a=hello&b=x");
    }

    #[test]
    fn test_empty_parameter_set_is_legal() {
        assert_eq!(canonical_string(Vec::<(&str, &str)>::new()), "");
        assert_eq!(canonical_string(vec![("sign", "abc"), ("x", " ")]), "");
    }

    #[test]
    fn test_map_input_matches_pair_input() {
        let mut map = HashMap::new();
        map.insert("out_trade_no", "X1");
        map.insert("total_amount", "88.88");
        assert_eq!(
            canonicalize_map(&map),
            canonical_string(vec![("total_amount", "88.88"), ("out_trade_no", "X1")])
        );
    }

    #[test]
    fn test_envelope_shaped_set() {
        let out = canonical_string(vec![
            ("app_id", "2014072300007148"),
            ("method", "alipay.trade.query"),
            ("format", "JSON"),
            ("charset", "utf-8"),
            ("sign_type", "RSA2"),
            ("timestamp", "2023-01-01 00:00:00"),
            ("version", "1.0"),
            ("biz_content", r#"{"out_trade_no":"X"}"#),
        ]);
        assert_eq!(
            out,
            "app_id=2014072300007148&biz_content={\"out_trade_no\":\"X\"}&charset=utf-8&format=JSON&method=alipay.trade.query&timestamp=2023-01-01 00:00:00&version=1.0"
        );
    }
}
