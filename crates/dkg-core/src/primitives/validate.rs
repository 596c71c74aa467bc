use super::{
    errors::{ArityError, ValidationError},
    types::{Part, PublicKey},
};

/// Checks that a public key has the length the engine produces
pub fn public_key(
    field: &'static str,
    pk: &PublicKey,
    expected: usize,
) -> Result<(), ValidationError> {
    if pk.len() != expected {
        return Err(ValidationError::PublicKeyLength {
            field,
            expected,
            got: pk.len(),
        });
    }
    Ok(())
}

/// Checks that a part has `degree + 1` coefficients and none of them is empty
pub fn part(field: &'static str, part: &Part) -> Result<(), ValidationError> {
    let expected = part
        .degree()
        .checked_add(1)
        .ok_or(ArityError::DegreeOverflow(part.degree()))?;
    if part.coefficients().len() != expected {
        return Err(ArityError::CoefficientCount {
            degree: part.degree(),
            got: part.coefficients().len(),
        }
        .into());
    }

    if let Some(index) = part.coefficients().iter().position(|c| c.is_empty()) {
        return Err(ValidationError::EmptyCoefficient { field, index });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_length() {
        let pk = PublicKey::from(vec![1; 48]);
        assert!(public_key("p1_pk", &pk, 48).is_ok());
        assert_eq!(
            public_key("p1_pk", &pk, 32).unwrap_err(),
            ValidationError::PublicKeyLength {
                field: "p1_pk",
                expected: 32,
                got: 48
            }
        );
    }

    #[test]
    fn empty_coefficient() {
        let p = Part::new(2, vec![vec![1], vec![], vec![3]]).unwrap();
        assert_eq!(
            part("p1_part", &p).unwrap_err(),
            ValidationError::EmptyCoefficient {
                field: "p1_part",
                index: 1
            }
        );
        let p = Part::new(0, vec![vec![9]]).unwrap();
        assert!(part("p1_part", &p).is_ok());
    }
}
