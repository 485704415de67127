//! Wire types for the WebReview fileset service.
//!
//! Describes the request descriptors exchanged with the signing service
//! and the fileset identity attached to every signing call. Nothing here
//! performs I/O.

pub mod fileset;
pub mod request;

pub use fileset::{Author, Commit, Fileset, FinalizeRequest, Owner, Project};
pub use request::{
    RequestHeaders, SignRequestsRequest, SignRequestsResponse, SignedRequest, SigningParams,
    UnsignedRequest, Verb,
};
