use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};
use uuid::Uuid;

use super::errors::ArityError;

/// RunId identifies a single DKG run between P0 and P1. Every round after
/// `init` must carry the id returned by `init`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a fresh random run id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RunId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A party's public key material, as produced by the engine. The length is
/// fixed by the engine and checked by the orchestrator.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short hex prefix, suitable for logs
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..self.0.len().min(8)])
    }
}

impl From<Vec<u8>> for PublicKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey")
            .field(&format!("<{} bytes, {}..>", self.0.len(), self.fingerprint()))
            .finish()
    }
}

/// A party's polynomial contribution to the shared secret. The number of
/// coefficients is always `degree + 1`; this is enforced on construction and
/// when decoding.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPart")]
pub struct Part {
    degree: usize,
    #[serde(rename = "coeff")]
    coefficients: Vec<Vec<u8>>,
}

// Unchecked wire form of a `Part`
#[derive(Deserialize)]
struct RawPart {
    degree: usize,
    coeff: Vec<Vec<u8>>,
}

impl TryFrom<RawPart> for Part {
    type Error = ArityError;

    fn try_from(raw: RawPart) -> Result<Self, Self::Error> {
        Part::new(raw.degree, raw.coeff)
    }
}

impl Part {
    pub fn new(degree: usize, coefficients: Vec<Vec<u8>>) -> Result<Self, ArityError> {
        let expected = degree.checked_add(1).ok_or(ArityError::DegreeOverflow(degree))?;
        if coefficients.len() != expected {
            return Err(ArityError::CoefficientCount {
                degree,
                got: coefficients.len(),
            });
        }
        Ok(Self {
            degree,
            coefficients,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn coefficients(&self) -> &[Vec<u8>] {
        &self.coefficients
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Part")
            .field(&format!("<degree {}>", self.degree))
            .field(&format!("<{} coefficients>", self.coefficients.len()))
            .finish()
    }
}

/// An opaque confirmation that a party received and verified the other
/// party's `Part`. Its contents are never inspected.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acknowledgment(Vec<Vec<u8>>);

impl Acknowledgment {
    pub fn values(&self) -> &[Vec<u8>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Vec<u8>>> for Acknowledgment {
    fn from(values: Vec<Vec<u8>>) -> Self {
        Self(values)
    }
}

impl fmt::Debug for Acknowledgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Acknowledgment")
            .field(&format!("<{} values>", self.0.len()))
            .finish()
    }
}

/// P1's signature share over `signed_msg_1`, made with the secret share it
/// derived from the run. Opaque to this layer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureShare(Vec<u8>);

impl SignatureShare {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SignatureShare {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SignatureShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureShare(<{} bytes>)", self.0.len())
    }
}

///////////////////////////////////////////////////////////////////////////
// P1 -> P0
///////////////////////////////////////////////////////////////////////////

/// First round. P1 announces its public key; the run id is optional and
/// generated by P0 when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub p1_pk: PublicKey,
}

/// Second round. P1 sends its part and its acknowledgments of both parts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub run_id: RunId,
    pub p1_part: Part,
    pub p1_acks: Acknowledgment,
}

/// Third round. P1 proves it derived a usable secret share by signing a
/// message with it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub run_id: RunId,
    pub sig_share_1: SignatureShare,
    pub signed_msg_1: String,
}

///////////////////////////////////////////////////////////////////////////
// P0 -> P1
///////////////////////////////////////////////////////////////////////////

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResponse {
    pub run_id: RunId,
    pub p0_pk: PublicKey,
    pub p0_part: Part,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResponse {
    pub run_id: RunId,
    pub p0_acks: Acknowledgment,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeResponse {
    pub run_id: RunId,
    pub is_success: bool,
    /// The group public key, when the engine reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
}
