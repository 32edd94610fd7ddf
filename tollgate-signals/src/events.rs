use serde::Deserialize;

/// CAEP event-type URI for credential changes.
pub const CREDENTIAL_CHANGE_EVENT: &str =
    "https://schemas.openid.net/secevent/caep/event-type/credential-change";

/// Deployment vocabulary URI carrying supplementary credential-change data.
pub const CREDENTIAL_CHANGE_INFORMATION: &str =
    "https://vocab.tollgate.dev/secevent/v1/credentialChange/eventInformation";

/// RISC event-type URI for account purges.
pub const ACCOUNT_PURGED_EVENT: &str =
    "https://schemas.openid.net/secevent/risc/event-type/account-purged";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Update,
    Delete,
    Create,
    Revoke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialType {
    Email,
    Password,
}

/// The subject a signal applies to. `uri` carries the directory user id.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectIdentifier {
    pub format: String,
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialChange {
    pub change_type: ChangeType,
    #[serde(default)]
    pub credential_type: Option<CredentialType>,
    pub subject: SubjectIdentifier,
}

/// Supplementary data for a credential change. The email is only present on
/// email updates and is deliberately never logged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialChangeInformation {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialChangeEvents {
    #[serde(rename = "https://schemas.openid.net/secevent/caep/event-type/credential-change")]
    pub credential_change: CredentialChange,
    #[serde(
        rename = "https://vocab.tollgate.dev/secevent/v1/credentialChange/eventInformation",
        default
    )]
    pub information: Option<CredentialChangeInformation>,
}

/// A credential-change SET payload. Top level is strict: any claim outside
/// the SET profile fails the schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialChangeEvent {
    pub aud: String,
    pub events: CredentialChangeEvents,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountPurged {
    pub subject: SubjectIdentifier,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountPurgedEvents {
    #[serde(rename = "https://schemas.openid.net/secevent/risc/event-type/account-purged")]
    pub account_purged: AccountPurged,
}

/// An account-purged SET payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountPurgedEvent {
    pub aud: String,
    pub events: AccountPurgedEvents,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credential_change_payload() -> serde_json::Value {
        json!({
            "aud": "https://receiver.example.com",
            "iat": 1_700_000_000,
            "iss": "https://transmitter.example.com",
            "jti": "evt-0001",
            "events": {
                CREDENTIAL_CHANGE_EVENT: {
                    "change_type": "update",
                    "credential_type": "email",
                    "subject": { "format": "urn:example:account", "uri": "user-1" }
                },
                CREDENTIAL_CHANGE_INFORMATION: { "email": "new@example.com" }
            }
        })
    }

    #[test]
    fn credential_change_round_trips_through_the_schema() {
        let event: CredentialChangeEvent =
            serde_json::from_value(credential_change_payload()).unwrap();
        assert_eq!(event.jti, "evt-0001");
        let change = &event.events.credential_change;
        assert_eq!(change.change_type, ChangeType::Update);
        assert_eq!(change.credential_type, Some(CredentialType::Email));
        assert_eq!(change.subject.uri, "user-1");
        assert_eq!(
            event.events.information.unwrap().email.as_deref(),
            Some("new@example.com")
        );
    }

    #[test]
    fn event_information_may_be_absent_or_null() {
        let mut payload = credential_change_payload();
        payload["events"]
            .as_object_mut()
            .unwrap()
            .remove(CREDENTIAL_CHANGE_INFORMATION);
        let event: CredentialChangeEvent = serde_json::from_value(payload).unwrap();
        assert!(event.events.information.is_none());

        let mut payload = credential_change_payload();
        payload["events"][CREDENTIAL_CHANGE_INFORMATION] = serde_json::Value::Null;
        let event: CredentialChangeEvent = serde_json::from_value(payload).unwrap();
        assert!(event.events.information.is_none());
    }

    #[test]
    fn unknown_top_level_claims_fail_the_schema() {
        let mut payload = credential_change_payload();
        payload["txn"] = json!("tx-1");
        assert!(serde_json::from_value::<CredentialChangeEvent>(payload).is_err());
    }

    #[test]
    fn unknown_event_keys_are_tolerated() {
        let mut payload = credential_change_payload();
        payload["events"]["https://schemas.example.com/other-event"] = json!({});
        assert!(serde_json::from_value::<CredentialChangeEvent>(payload).is_ok());
    }

    #[test]
    fn unexpected_change_type_values_fail_the_schema() {
        let mut payload = credential_change_payload();
        payload["events"][CREDENTIAL_CHANGE_EVENT]["change_type"] = json!("rotate");
        assert!(serde_json::from_value::<CredentialChangeEvent>(payload).is_err());
    }

    #[test]
    fn account_purged_parses_and_is_not_a_credential_change() {
        let payload = json!({
            "aud": "https://receiver.example.com",
            "iat": 1_700_000_000,
            "iss": "https://transmitter.example.com",
            "jti": "evt-0002",
            "events": {
                ACCOUNT_PURGED_EVENT: {
                    "subject": { "format": "urn:example:account", "uri": "user-2" }
                }
            }
        });

        let event: AccountPurgedEvent = serde_json::from_value(payload.clone()).unwrap();
        assert_eq!(event.events.account_purged.subject.uri, "user-2");
        assert!(serde_json::from_value::<CredentialChangeEvent>(payload).is_err());
    }
}
