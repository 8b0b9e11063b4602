//! # Provider
//!
//! Provider defines external data interfaces for the crate.

use realtime::{Clock, HttpRequest};

use crate::repository::Repository;

/// Provider entry point implemented by the host application.
pub trait Provider: HttpRequest + Repository + Clock {}
