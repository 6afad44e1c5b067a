//! Test utilities for API tests.

use std::{
    hash::{BuildHasher, Hasher},
    time,
};

use crate::{Credential, Profile};

/// A profile pointing at a host that is never contacted.
pub(crate) fn test_profile() -> Profile {
    Profile::new("http://my-grafana.com", Credential::ApiKey("my-key".into()))
        .expect("test profile should be valid")
}

/// A canned JSON response.
pub(crate) fn respond(status: u16, body: &'static str) -> http::Response<&'static [u8]> {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.as_bytes())
        .expect("canned response should be valid")
}

/// Parse the JSON body of a built request.
pub(crate) fn request_json(req: &http::Request<String>) -> serde_json::Value {
    serde_json::from_str(req.body()).expect("request body should be JSON")
}

/// Generate a unique name for test resources.
#[cfg_attr(not(feature = "_integration-tests"), allow(dead_code))]
pub(crate) fn test_name(prefix: &str) -> String {
    let ts = time::SystemTime::now()
        .duration_since(time::UNIX_EPOCH)
        .unwrap()
        .as_millis();
    let rand: u32 = std::hash::RandomState::new().build_hasher().finish() as u32;

    format!("{prefix}_{ts}_{rand:08x}")
}

#[cfg(feature = "_integration-tests")]
pub(crate) use live::*;

#[cfg(feature = "_integration-tests")]
mod live {
    use std::sync::OnceLock;

    use crate::{ApiRequest, Client, Error, Profile};

    fn live_client() -> &'static Client {
        static CLIENT: OnceLock<Client> = OnceLock::new();
        CLIENT.get_or_init(|| {
            let profile = Profile::from_default_env()
                .expect("Failed to load test profile. Did you forget to set GRAFANA_URL?");
            Client::new(profile)
        })
    }

    /// Execute a request against the live instance and parse the response.
    pub(crate) fn roundtrip<T: ApiRequest>(req: T) -> Result<T::Response, Error> {
        live_client().roundtrip(req)
    }

    /// A temporary folder that is deleted when dropped.
    pub(crate) struct TestFolder {
        pub uid: String,
    }

    impl TestFolder {
        pub(crate) fn new(prefix: &str) -> Result<Self, Error> {
            let title = super::test_name(prefix);
            let req = crate::folder::CreateFolder {
                title: &title,
                uid: None,
                parent_uid: None,
            };
            let folder = roundtrip(req)?;

            Ok(Self { uid: folder.uid })
        }
    }

    impl Drop for TestFolder {
        fn drop(&mut self) {
            let req = crate::folder::DeleteFolder { uid: &self.uid };
            if let Err(e) = roundtrip(req) {
                eprintln!("Warning: failed to delete test folder {}: {e}", self.uid);
            }
        }
    }
}
