//! Request correlation ids
//!
//! Every response carries `x-request-id`. A caller that already sent a valid ULID there keeps
//! it, so ids can be followed across services; anything else gets a fresh id.

use crate::server::{HttpResponse, RawRequest};
use serde::{Serialize, Serializer};
use std::fmt;
use ulid::Ulid;

/// Header the id is read from and written to
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// ULID identifying one pass through the request pipeline
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId {
    ulid: Ulid,
    inherited: bool,
}

impl RequestId {
    /// Fresh id, not tied to any incoming header
    #[must_use]
    pub fn generate() -> Self {
        Self {
            ulid: Ulid::new(),
            inherited: false,
        }
    }

    /// Id for `raw`: the caller's `x-request-id` when it is a ULID, otherwise a fresh one
    #[must_use]
    pub fn for_request(raw: &RawRequest) -> Self {
        raw.header(REQUEST_ID_HEADER)
            .and_then(|value| Ulid::from_string(value.trim()).ok())
            .map_or_else(Self::generate, |ulid| Self {
                ulid,
                inherited: true,
            })
    }

    /// Whether the id came from the caller
    #[must_use]
    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    /// Write the id onto the outgoing response
    pub fn stamp(&self, resp: &mut HttpResponse) {
        resp.set_header(REQUEST_ID_HEADER, self.to_string());
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.ulid, f)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
