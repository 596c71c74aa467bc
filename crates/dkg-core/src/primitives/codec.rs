//! Bytes travel as JSON arrays of integers in `0..=255`, never as base64 or
//! hex strings, so that the engine and the counterpart see the same shapes.
use super::errors::DecodeError;
use serde::{de::DeserializeOwned, Serialize};

/// Decodes a wire message, failing on missing fields, wrong arity or bytes
/// out of range
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decodes a wire message held in a string
pub fn decode_str<T: DeserializeOwned>(s: &str) -> Result<T, DecodeError> {
    decode(s.as_bytes())
}

/// Encodes a wire message. None of the protocol types have fallible
/// serializers, so an error here means a caller-provided type misbehaved.
pub fn encode<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{
        types::{Acknowledgment, CommitRequest, InitRequest, Part, PublicKey},
        DecodeError,
    };
    use proptest::prelude::*;

    #[test]
    fn public_key_is_an_array_of_bytes() {
        let pk = PublicKey::from(vec![137, 228, 0, 255]);
        assert_eq!(encode(&pk).unwrap(), "[137,228,0,255]");
    }

    #[test]
    fn part_uses_coeff_on_the_wire() {
        let part = Part::new(1, vec![vec![1, 2], vec![3]]).unwrap();
        assert_eq!(
            encode(&part).unwrap(),
            r#"{"degree":1,"coeff":[[1,2],[3]]}"#
        );
    }

    #[test]
    fn rejects_part_with_wrong_arity() {
        let err = decode::<Part>(br#"{"degree":2,"coeff":[[1],[2]]}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Shape(_)), "{:?}", err);
        assert!(err.to_string().contains("must have 3 coefficients, got 2"));
    }

    #[test]
    fn rejects_part_with_overflowing_degree() {
        let body = format!(r#"{{"degree":{},"coeff":[]}}"#, usize::MAX);
        let err = decode::<Part>(body.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::Shape(_)));
    }

    #[test]
    fn rejects_bytes_out_of_range() {
        let err = decode::<PublicKey>(b"[1,2,256]").unwrap_err();
        assert!(matches!(err, DecodeError::Shape(_)));

        let err = decode::<PublicKey>(b"[1,-1]").unwrap_err();
        assert!(matches!(err, DecodeError::Shape(_)));
    }

    #[test]
    fn rejects_missing_fields() {
        let err = decode::<InitRequest>(b"{}").unwrap_err();
        assert!(matches!(err, DecodeError::Shape(_)));
        assert!(err.to_string().contains("p1_pk"));

        let err = decode::<CommitRequest>(
            br#"{"run_id":"67e55044-10b1-426f-9247-bb680e5fe0c8","p1_acks":[]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("p1_part"));
    }

    #[test]
    fn classifies_syntax_and_truncation() {
        assert!(matches!(
            decode::<InitRequest>(b"not json").unwrap_err(),
            DecodeError::Syntax(_)
        ));
        assert!(matches!(
            decode::<InitRequest>(br#"{"p1_pk":[1,2"#).unwrap_err(),
            DecodeError::Truncated(_)
        ));
    }

    #[test]
    fn init_request_run_id_is_optional() {
        let req: InitRequest = decode(br#"{"p1_pk":[1,2,3]}"#).unwrap();
        assert_eq!(req.run_id, None);
        assert_eq!(req.p1_pk.as_bytes(), &[1, 2, 3]);
        // and it is left out when absent
        assert_eq!(encode(&req).unwrap(), r#"{"p1_pk":[1,2,3]}"#);
    }

    fn arb_bytes() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 0..64)
    }

    fn arb_part() -> impl Strategy<Value = Part> {
        (0..8usize)
            .prop_flat_map(|degree| prop::collection::vec(arb_bytes(), degree + 1))
            .prop_map(|coeff| Part::new(coeff.len() - 1, coeff).unwrap())
    }

    proptest! {

    #[test]
    fn public_key_roundtrip(bytes in arb_bytes()) {
        let pk = PublicKey::from(bytes);
        let decoded: PublicKey = decode_str(&encode(&pk).unwrap()).unwrap();
        prop_assert_eq!(decoded, pk);
    }

    #[test]
    fn part_roundtrip(part in arb_part()) {
        let decoded: Part = decode_str(&encode(&part).unwrap()).unwrap();
        prop_assert_eq!(decoded.degree() + 1, decoded.coefficients().len());
        prop_assert_eq!(decoded, part);
    }

    #[test]
    fn acknowledgment_roundtrip(values in prop::collection::vec(arb_bytes(), 0..8)) {
        let ack = Acknowledgment::from(values);
        let decoded: Acknowledgment = decode_str(&encode(&ack).unwrap()).unwrap();
        prop_assert_eq!(decoded, ack);
    }

    // any mismatch between degree and coefficient count is refused
    #[test]
    fn arity_mismatch_is_refused(degree in 0..16usize, count in 0..16usize) {
        prop_assume!(count != degree + 1);
        let coeff = vec![vec![7u8]; count];
        let body = serde_json::json!({ "degree": degree, "coeff": coeff }).to_string();
        prop_assert!(decode_str::<Part>(&body).is_err());
        prop_assert!(Part::new(degree, coeff).is_err());
    }
    }
}
