use serde::Serialize;

const POLICY_VERSION: &str = "2012-10-17";
const INVOKE_ACTION: &str = "execute-api:Invoke";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyStatement {
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Effect")]
    pub effect: Effect,
    #[serde(rename = "Resource")]
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Statement")]
    pub statement: Vec<PolicyStatement>,
}

/// Gateway-shaped authorizer output: the principal plus an IAM-style policy
/// scoped to the method that triggered authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizerResponse {
    #[serde(rename = "principalId")]
    pub principal_id: String,
    #[serde(rename = "policyDocument")]
    pub policy_document: PolicyDocument,
}

impl AuthorizerResponse {
    pub fn allow(principal_id: impl Into<String>, method_arn: impl Into<String>) -> Self {
        Self::with_effect(principal_id, Effect::Allow, method_arn)
    }

    pub fn deny(principal_id: impl Into<String>, method_arn: impl Into<String>) -> Self {
        Self::with_effect(principal_id, Effect::Deny, method_arn)
    }

    fn with_effect(
        principal_id: impl Into<String>,
        effect: Effect,
        method_arn: impl Into<String>,
    ) -> Self {
        Self {
            principal_id: principal_id.into(),
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![PolicyStatement {
                    action: INVOKE_ACTION.to_string(),
                    effect,
                    resource: method_arn.into(),
                }],
            },
        }
    }

    pub fn is_allow(&self) -> bool {
        self.policy_document
            .statement
            .iter()
            .all(|statement| statement.effect == Effect::Allow)
    }
}
