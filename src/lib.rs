//! A client for the [Grafana](https://grafana.com) HTTP API.
//!
//! This crate covers data sources, folders, team external groups, and query
//! execution. The simplest way in is [Client], which sends requests over a
//! blocking [ureq] agent.
//!
//! # HTTP Requests and Responses
//!
//! The API types are designed to work with any HTTP client that uses the [`http`]
//! crate. Use [`ApiRequest::into_request`] to create a request, and
//! [`ApiResponse::from_response`] to parse the response.
//!
//! ```no_run
//! use grafana_api::{ApiRequest, ApiResponse, Profile, folder::GetFolderByUid};
//!
//! # fn main() -> anyhow::Result<()> {
//! let profile = Profile::from_default_env()?;
//!
//! let req = GetFolderByUid { uid: "nErXDvCkzz" };
//! let http_req = req.into_request(&profile)?;
//! let resp = ureq::run(http_req)?;
//!
//! let folder = <GetFolderByUid<'_> as ApiRequest>::Response::from_response(
//!     resp.map(ureq::Body::into_reader),
//! )?;
//!
//! println!("Folder: {} ({})", folder.title, folder.uid);
//! # Ok(())
//! # }
//! ```
//!
//! # Unknown fields
//!
//! Records keep any JSON fields they don't name in an `unknown` map, and
//! write them back out unchanged. A data source can be fetched, edited, and
//! updated without dropping plugin settings this crate doesn't know about.

#![warn(
    anonymous_parameters,
    missing_copy_implementations,
    missing_debug_implementations,
    nonstandard_style,
    rust_2018_idioms,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_qualifications,
    variant_size_differences
)]

mod api;
mod client;
mod config;

pub use api::*;
pub use client::{Client, Error};
pub use config::{Credential, Error as ConfigError, Profile};
