//! API operations concerning dashboard folders.

use serde::{Deserialize, Serialize};

use crate::{
    PaginatedResponse,
    api::{ApiRequest, DataResponse, Unknown, int, opt_int, segment},
};

/// A folder of dashboards.
///
/// Listings return only `id`, `uid` and `title` (plus `parentUid` for nested
/// folders); single-folder reads return the rest, with permission flags and
/// audit fields kept in `unknown`.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// The numeric ID.
    #[serde(deserialize_with = "int")]
    pub id: i64,
    /// The UID.
    pub uid: String,
    /// The folder title.
    pub title: String,
    /// The folder's path in the UI.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// The parent folder's UID, for nested folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_uid: Option<String>,
    /// The version, for optimistic concurrency on update.
    #[serde(
        default,
        deserialize_with = "opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<i64>,
    /// Fields not named above.
    #[serde(flatten)]
    pub unknown: Unknown,
}

impl DataResponse for Folder {}

/// List folders, one page at a time. Use with [crate::paginate].
#[derive(Debug, Clone, Copy)]
pub struct GetFolders;

impl ApiRequest for GetFolders {
    type Response = PaginatedResponse<Folder>;

    fn path(&self) -> String {
        "/api/folders".to_string()
    }
}

/// Get a single folder by numeric ID.
#[derive(Debug, Clone, Copy)]
pub struct GetFolder {
    /// The folder ID.
    pub id: i64,
}

impl ApiRequest for GetFolder {
    type Response = Folder;

    fn path(&self) -> String {
        format!("/api/folders/id/{}", self.id)
    }
}

/// Get a single folder by UID.
#[derive(Debug, Clone)]
pub struct GetFolderByUid<'a> {
    /// The folder UID.
    pub uid: &'a str,
}

impl ApiRequest for GetFolderByUid<'_> {
    type Response = Folder;

    fn path(&self) -> String {
        format!("/api/folders/{}", segment(self.uid))
    }
}

/// Create a folder.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolder<'a> {
    /// The folder title.
    pub title: &'a str,

    /// A UID to assign. The server generates one if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<&'a str>,

    /// The UID of the folder to nest this one under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_uid: Option<&'a str>,
}

impl ApiRequest for CreateFolder<'_> {
    type Response = Folder;

    fn method(&self) -> http::Method {
        http::Method::POST
    }

    fn path(&self) -> String {
        "/api/folders".to_string()
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(self)
    }
}

/// Update a folder's title, and optionally its UID.
#[derive(Debug, Clone)]
pub struct UpdateFolder<'a> {
    /// The UID of the folder to update.
    pub uid: &'a str,

    /// The new title.
    pub title: &'a str,

    /// A new UID for the folder.
    pub new_uid: Option<&'a str>,

    /// The version the caller last read. If set, the server rejects the update
    /// when the folder has changed since; otherwise the last writer wins.
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
struct UpdateFolderBody<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<i64>,
    overwrite: bool,
}

impl ApiRequest for UpdateFolder<'_> {
    type Response = Folder;

    fn method(&self) -> http::Method {
        http::Method::PUT
    }

    fn path(&self) -> String {
        format!("/api/folders/{}", segment(self.uid))
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(UpdateFolderBody {
            title: self.title,
            uid: self.new_uid,
            version: self.version,
            overwrite: self.version.is_none(),
        })
    }
}

/// Delete a folder, and the dashboards in it.
#[derive(Debug, Clone)]
pub struct DeleteFolder<'a> {
    /// The folder UID.
    pub uid: &'a str,
}

impl ApiRequest for DeleteFolder<'_> {
    type Response = ();

    fn method(&self) -> http::Method {
        http::Method::DELETE
    }

    fn path(&self) -> String {
        format!("/api/folders/{}", segment(self.uid))
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::{
        ApiError, ApiErrorKind, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedRequest,
        api::testutil::{request_json, respond, test_profile},
    };

    const FOLDER_JSON: &str = r#"{
        "id": 1,
        "uid": "nErXDvCkzz",
        "title": "Departmenet ABC",
        "url": "/dashboards/f/nErXDvCkzz/department-abc",
        "hasAcl": false,
        "canSave": true,
        "canEdit": true,
        "canAdmin": true,
        "createdBy": "admin",
        "created": "2018-01-31T17:43:12+01:00",
        "updatedBy": "admin",
        "updated": "2018-01-31T17:43:12+01:00",
        "version": 1
    }"#;

    const SUBFOLDER_JSON: &str = r#"{
        "id": 2,
        "uid": "b7adb34f-08d9-4812-ae23-0b66612e44cb",
        "title": "Department ABC subfolder",
        "url": "/dashboards/f/b7adb34f-08d9-4812-ae23-0b66612e44cb/department-abc-subfolder",
        "parentUid": "nErXDvCkzz"
    }"#;

    fn folder_page(n: usize) -> String {
        format!("[{}]", vec![FOLDER_JSON; n].join(","))
    }

    #[test]
    fn get_folder() -> anyhow::Result<()> {
        let req = GetFolder { id: 1 }.into_request(&test_profile())?;
        assert_eq!(req.uri().path(), "/api/folders/id/1");

        let folder = Folder::from_response(respond(200, FOLDER_JSON))?;
        assert_eq!(folder.id, 1);
        assert_eq!(folder.title, "Departmenet ABC");
        assert_eq!(folder.version, Some(1));
        assert_eq!(folder.unknown["createdBy"], "admin");
        assert_eq!(folder.unknown["canAdmin"], true);

        Ok(())
    }

    #[test]
    fn get_folder_by_uid() -> anyhow::Result<()> {
        let req = GetFolderByUid { uid: "nErXDvCkzz" }.into_request(&test_profile())?;
        assert_eq!(req.uri().path(), "/api/folders/nErXDvCkzz");

        let folder = Folder::from_response(respond(200, FOLDER_JSON))?;
        assert_eq!(folder.uid, "nErXDvCkzz");

        Ok(())
    }

    #[test]
    fn create_folder() -> anyhow::Result<()> {
        let req = CreateFolder {
            title: "test-folder",
            uid: None,
            parent_uid: None,
        }
        .into_request(&test_profile())?;

        assert_eq!(req.method(), http::Method::POST);
        assert_eq!(req.uri().path(), "/api/folders");
        assert_eq!(request_json(&req), json!({"title": "test-folder"}));

        let created = Folder::from_response(respond(200, FOLDER_JSON))?;
        assert_eq!(created.uid, "nErXDvCkzz");

        Ok(())
    }

    #[test]
    fn create_subfolder() -> anyhow::Result<()> {
        let req = CreateFolder {
            title: "subfolder",
            uid: None,
            parent_uid: Some("nErXDvCkzz"),
        }
        .into_request(&test_profile())?;

        assert_eq!(
            request_json(&req),
            json!({"title": "subfolder", "parentUid": "nErXDvCkzz"})
        );

        let created = Folder::from_response(respond(200, SUBFOLDER_JSON))?;
        assert_eq!(created.uid, "b7adb34f-08d9-4812-ae23-0b66612e44cb");
        assert_eq!(created.parent_uid.as_deref(), Some("nErXDvCkzz"));

        Ok(())
    }

    #[test]
    fn update_folder_overwrites_without_version() -> anyhow::Result<()> {
        let req = UpdateFolder {
            uid: "nErXDvCkzz",
            title: "Departmenet DEF",
            new_uid: None,
            version: None,
        }
        .into_request(&test_profile())?;

        assert_eq!(req.method(), http::Method::PUT);
        assert_eq!(req.uri().path(), "/api/folders/nErXDvCkzz");
        assert_eq!(
            request_json(&req),
            json!({"title": "Departmenet DEF", "overwrite": true})
        );

        Ok(())
    }

    #[test]
    fn update_folder_with_version() -> anyhow::Result<()> {
        let req = UpdateFolder {
            uid: "nErXDvCkzz",
            title: "Departmenet DEF",
            new_uid: Some("dept-def"),
            version: Some(1),
        }
        .into_request(&test_profile())?;

        assert_eq!(
            request_json(&req),
            json!({"title": "Departmenet DEF", "uid": "dept-def", "version": 1, "overwrite": false})
        );

        let err = Folder::from_response(respond(
            412,
            r#"{"message":"the folder has been changed by someone else","status":"version-mismatch"}"#,
        ))
        .unwrap_err();
        assert_eq!(err.kind(), Some(&ApiErrorKind::Other));

        Ok(())
    }

    #[test]
    fn delete_folder() -> anyhow::Result<()> {
        let req = DeleteFolder { uid: "nErXDvCkzz" }.into_request(&test_profile())?;
        assert_eq!(req.method(), http::Method::DELETE);
        assert_eq!(req.uri().path(), "/api/folders/nErXDvCkzz");

        assert_matches!(
            <()>::from_response(respond(200, r#"{"message":"Folder deleted"}"#)),
            Ok(())
        );
        assert_matches!(
            <()>::from_response(respond(404, r#"{"message":"folder not found"}"#)),
            Err(ApiError::ErrorResponse {
                kind: ApiErrorKind::NotFound,
                ..
            })
        );

        Ok(())
    }

    #[test]
    fn paginate_2001_folders() -> anyhow::Result<()> {
        let profile = test_profile();
        let mut pages: VecDeque<String> =
            [folder_page(1000), folder_page(1000), folder_page(1)].into();

        let fetch = |req: PaginatedRequest<GetFolders>| {
            let http_req = req.into_request(&profile)?;
            assert_eq!(http_req.uri().path(), "/api/folders");

            let body = pages.pop_front().expect("no more pages");
            let resp = http::Response::builder().status(200).body(body.as_bytes())?;
            Ok::<_, anyhow::Error>(PaginatedResponse::<Folder>::from_response(resp)?)
        };

        let folders = crate::paginate(GetFolders, DEFAULT_PAGE_SIZE, fetch)?
            .collect::<anyhow::Result<Vec<Folder>>>()?;

        assert_eq!(folders.len(), 2001);
        assert_eq!(folders[0].id, 1);
        assert_eq!(folders[0].title, "Departmenet ABC");
        assert_eq!(folders[2000].id, 1);
        assert_eq!(folders[2000].title, "Departmenet ABC");
        assert!(pages.is_empty());

        Ok(())
    }
}
