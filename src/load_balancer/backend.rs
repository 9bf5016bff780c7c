//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Carry the service class used for cost weighting
//! - Define the class/request-type weight table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::dispatch::request::RequestKind;

/// A unique identifier for a backend server.
///
/// Ordering matters: when two backends have the same weighted cost the
/// lower id is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackendId(pub u32);

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of content a backend is tuned to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum ServiceClass {
    Video,
    Music,
}

impl ServiceClass {
    /// Cost multiplier applied to a request's duration on a backend of this class.
    ///
    /// | class | V | M | P |
    /// |-------|---|---|---|
    /// | VIDEO | 1 | 2 | 1 |
    /// | MUSIC | 3 | 1 | 2 |
    pub fn weight(self, kind: RequestKind) -> u32 {
        match (self, kind) {
            (ServiceClass::Video, RequestKind::Video) => 1,
            (ServiceClass::Video, RequestKind::Music) => 2,
            (ServiceClass::Video, RequestKind::Picture) => 1,
            (ServiceClass::Music, RequestKind::Video) => 3,
            (ServiceClass::Music, RequestKind::Music) => 1,
            (ServiceClass::Music, RequestKind::Picture) => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceClass::Video => "VIDEO",
            ServiceClass::Music => "MUSIC",
        }
    }
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("video") {
            Ok(ServiceClass::Video)
        } else if s.eq_ignore_ascii_case("music") {
            Ok(ServiceClass::Music)
        } else {
            Err(format!("unknown service class '{s}' (expected VIDEO or MUSIC)"))
        }
    }
}

impl TryFrom<String> for ServiceClass {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServiceClass> for String {
    fn from(class: ServiceClass) -> Self {
        class.as_str().to_string()
    }
}

/// A single backend server. Immutable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// The unique ID of the backend.
    pub id: BackendId,
    /// The socket address of the backend.
    pub addr: SocketAddr,
    /// The service class of the backend.
    pub class: ServiceClass,
}

impl Backend {
    /// Create a new backend.
    pub fn new(id: BackendId, addr: SocketAddr, class: ServiceClass) -> Self {
        Self { id, addr, class }
    }
}
