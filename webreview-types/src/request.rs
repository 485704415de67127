//! Unsigned and signed object-store request descriptors.

use crate::fileset::Fileset;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The object-store operation a request performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }

    /// Only uploads carry a body and content headers.
    pub fn sends_content(&self) -> bool {
        matches!(self, Verb::Put)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content headers the signature is computed over. Present only for PUT.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeaders {
    /// The service speaks int64 as JSON strings.
    #[serde(
        serialize_with = "serialize_u64_as_str",
        deserialize_with = "deserialize_u64_from_str_or_num"
    )]
    pub content_length: u64,
    /// Base64 of the raw MD5 digest.
    pub content_md5: String,
    pub content_type: String,
}

/// One pending object operation, before the service has signed it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedRequest {
    pub path: String,
    pub verb: Verb,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<RequestHeaders>,
}

/// Query parameters that authorize a signed request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningParams {
    pub google_access_id: String,
    pub signature: String,
    /// Unix timestamp after which the signature is rejected.
    #[serde(
        serialize_with = "serialize_u64_as_str",
        deserialize_with = "deserialize_u64_from_str_or_num"
    )]
    pub expires: u64,
}

/// An unsigned request plus the URL and credentials issued by the signing service.
///
/// Clients never construct these outside of tests; they arrive in
/// [`SignRequestsResponse`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    #[serde(flatten)]
    pub request: UnsignedRequest,
    pub url: String,
    pub params: SigningParams,
}

impl SignedRequest {
    pub fn path(&self) -> &str {
        &self.request.path
    }

    pub fn verb(&self) -> Verb {
        self.request.verb
    }

    pub fn headers(&self) -> Option<&RequestHeaders> {
        self.request.headers.as_ref()
    }
}

/// Body of the `sign_requests` RPC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignRequestsRequest {
    pub fileset: Fileset,
    pub unsigned_requests: Vec<UnsignedRequest>,
}

/// Response of the `sign_requests` RPC.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequestsResponse {
    /// Endpoints omits empty repeated fields entirely.
    #[serde(default)]
    pub signed_requests: Vec<SignedRequest>,
}

fn serialize_u64_as_str<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(value)
}

/// Accepts either a JSON number or a string-encoded number (e.g. `"1024"`).
fn deserialize_u64_from_str_or_num<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct U64Visitor;
    impl<'de> de::Visitor<'de> for U64Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer or string-encoded integer")
        }
        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> { Ok(v) }
        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(de::Error::custom)
        }
        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            v.trim().parse().map_err(de::Error::custom)
        }
    }
    deserializer.deserialize_any(U64Visitor)
}
