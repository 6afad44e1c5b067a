//! API operations concerning a team's external identity-provider groups.

use serde::{Deserialize, Serialize};

use crate::api::{ApiRequest, DataResponse, Unknown, opt_int, segment};

/// An external group (for example an LDAP DN or an OAuth group name) whose
/// members are synced into a team.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamGroup {
    /// The organization the team belongs to.
    #[serde(
        default,
        deserialize_with = "opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub org_id: Option<i64>,
    /// The team ID.
    #[serde(
        default,
        deserialize_with = "opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub team_id: Option<i64>,
    /// The external group identifier.
    pub group_id: String,
    /// Fields not named above.
    #[serde(flatten)]
    pub unknown: Unknown,
}

impl DataResponse for TeamGroup {}

/// List the external groups mapped to a team.
#[derive(Debug, Clone, Copy)]
pub struct GetTeamGroups {
    /// The team ID.
    pub team_id: i64,
}

impl ApiRequest for GetTeamGroups {
    type Response = Vec<TeamGroup>;

    fn path(&self) -> String {
        format!("/api/teams/{}/groups", self.team_id)
    }
}

/// Map an external group to a team.
#[derive(Debug, Clone)]
pub struct AddTeamGroup<'a> {
    /// The team ID.
    pub team_id: i64,
    /// The external group identifier.
    pub group_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddTeamGroupBody<'a> {
    group_id: &'a str,
}

impl ApiRequest for AddTeamGroup<'_> {
    type Response = ();

    fn method(&self) -> http::Method {
        http::Method::POST
    }

    fn path(&self) -> String {
        format!("/api/teams/{}/groups", self.team_id)
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(AddTeamGroupBody {
            group_id: self.group_id,
        })
    }
}

/// Remove an external group from a team.
#[derive(Debug, Clone)]
pub struct RemoveTeamGroup<'a> {
    /// The team ID.
    pub team_id: i64,
    /// The external group identifier.
    pub group_id: &'a str,
}

impl ApiRequest for RemoveTeamGroup<'_> {
    type Response = ();

    fn method(&self) -> http::Method {
        http::Method::DELETE
    }

    fn path(&self) -> String {
        format!(
            "/api/teams/{}/groups/{}",
            self.team_id,
            segment(self.group_id)
        )
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::{
        ApiError, ApiErrorKind, ApiResponse,
        api::testutil::{request_json, respond, test_profile},
    };

    #[test]
    fn list_groups() -> anyhow::Result<()> {
        let req = GetTeamGroups { team_id: 1 }.into_request(&test_profile())?;
        assert_eq!(req.method(), http::Method::GET);
        assert_eq!(req.uri().path(), "/api/teams/1/groups");

        let groups = <Vec<TeamGroup>>::from_response(respond(
            200,
            r#"[{"orgId":1,"teamId":1,"groupId":"test"},{"orgId":1,"teamId":1,"groupId":"cn=editors,ou=groups,dc=grafana,dc=org","uid":"abc"}]"#,
        ))?;

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group_id, "test");
        assert_eq!(groups[0].team_id, Some(1));
        assert_eq!(groups[1].unknown["uid"], "abc");

        Ok(())
    }

    #[test]
    fn add_group() -> anyhow::Result<()> {
        let req = AddTeamGroup {
            team_id: 1,
            group_id: "test",
        }
        .into_request(&test_profile())?;

        assert_eq!(req.method(), http::Method::POST);
        assert_eq!(req.uri().path(), "/api/teams/1/groups");
        assert_eq!(request_json(&req), json!({"groupId": "test"}));

        assert_matches!(
            <()>::from_response(respond(200, r#"{"message":"Group added to Team"}"#)),
            Ok(())
        );

        Ok(())
    }

    #[test]
    fn add_duplicate_group() {
        let err = <()>::from_response(respond(
            409,
            r#"{"message":"Group is already added to this team"}"#,
        ))
        .unwrap_err();

        assert_matches!(
            err,
            ApiError::ErrorResponse {
                kind: ApiErrorKind::Conflict,
                ..
            }
        );
    }

    #[test]
    fn remove_group_encodes_dn() -> anyhow::Result<()> {
        let req = RemoveTeamGroup {
            team_id: 1,
            group_id: "cn=editors,ou=groups",
        }
        .into_request(&test_profile())?;

        assert_eq!(req.method(), http::Method::DELETE);
        assert_eq!(
            req.uri().path(),
            "/api/teams/1/groups/cn%3Deditors%2Cou%3Dgroups"
        );

        Ok(())
    }
}
