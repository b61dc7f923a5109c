use crate::environment::Environment;

/// Who is asking the authority for a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub client_id: String,
    pub environment: Environment,
    pub scope: String,
    pub resource: Option<String>,
    pub consumer_org_no: Option<String>,
}

impl ClientIdentity {
    pub fn new(client_id: impl Into<String>, environment: Environment, scope: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            environment,
            scope: scope.into(),
            resource: None,
            consumer_org_no: None,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = non_empty(Some(resource.into()));
        self
    }

    pub fn with_consumer_org_no(mut self, consumer_org_no: impl Into<String>) -> Self {
        self.consumer_org_no = non_empty(Some(consumer_org_no.into()));
        self
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref().filter(|v| !v.is_empty())
    }

    pub fn consumer_org_no(&self) -> Option<&str> {
        self.consumer_org_no.as_deref().filter(|v| !v.is_empty())
    }

    /// Cache key for primary issuance: `{client_id}-{scope}-{resource}-{consumer_org_no}`.
    pub fn cache_key(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.client_id,
            self.scope,
            self.resource().unwrap_or_default(),
            self.consumer_org_no().unwrap_or_default()
        )
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Username/password pair sent to the exchange platform on behalf of an enterprise user.
#[derive(Clone, PartialEq, Eq)]
pub struct EnterpriseCredentials {
    pub username: String,
    pub password: String,
}

impl EnterpriseCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl std::fmt::Debug for EnterpriseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnterpriseCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_renders_missing_parts_empty() {
        let identity = ClientIdentity::new("client", Environment::Ver2, "altinn:scope");
        assert_eq!(identity.cache_key(), "client-altinn:scope--");

        let identity = identity.with_resource("urn:res").with_consumer_org_no("991825827");
        assert_eq!(identity.cache_key(), "client-altinn:scope-urn:res-991825827");
    }

    #[test]
    fn empty_optional_parts_are_dropped() {
        let identity = ClientIdentity::new("client", Environment::Prod, "s").with_resource("");
        assert_eq!(identity.resource(), None);
    }
}
