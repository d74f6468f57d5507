//! URL construction for the collection and profile endpoints.
//!
//! Every parameter is a path segment: `key=value/` when the value is present
//! and non-empty, `key/` otherwise.

use crate::config::ClientConfig;
use crate::core::encoding::url_path_encode;
use crate::core::events::BehaviorEvent;

/// Protocol version segment of both endpoints.
pub const API_VERSION: &str = "5";

/// SDK version reported to the collection endpoint.
pub const SDK_VERSION: &str = "3.0";

/// Append each event to `base_url` as an escaped path segment.
pub fn build(base_url: &str, events: &[BehaviorEvent]) -> String {
    let mut url = String::from(base_url);
    for event in events {
        match event.non_empty_value() {
            Some(value) => {
                url.push_str(&url_path_encode(&event.key));
                url.push('=');
                url.push_str(&url_path_encode(value));
            }
            None => url.push_str(&url_path_encode(&event.key)),
        }
        url.push('/');
    }
    url
}

/// Everything needed to address the endpoints for one device.
///
/// Captured in the same dispatch turn as the drain it accompanies, so a
/// concurrent reconfiguration cannot leak into an in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBuilder {
    client: ClientConfig,
    advertising_id: String,
}

impl RequestBuilder {
    pub fn new(client: ClientConfig, advertising_id: impl Into<String>) -> Self {
        Self {
            client,
            advertising_id: advertising_id.into(),
        }
    }

    pub fn client(&self) -> &ClientConfig {
        &self.client
    }

    pub fn advertising_id(&self) -> &str {
        &self.advertising_id
    }

    /// `{protocol}://bcp.{domain}/5/c={clientId}/mid={adId}/e=app/dt=IDFA/sdk=3.0/`
    pub fn send_base_url(&self) -> String {
        format!(
            "{}://bcp.{}/{}/c={}/mid={}/e=app/dt=IDFA/sdk={}/",
            self.client.protocol,
            self.client.domain,
            API_VERSION,
            url_path_encode(&self.client.client_id),
            url_path_encode(&self.advertising_id),
            SDK_VERSION
        )
    }

    /// `{protocol}://ad.{domain}/5/pe=y/c={clientId}/mid={adId}/`
    pub fn profile_base_url(&self) -> String {
        format!(
            "{}://ad.{}/{}/pe=y/c={}/mid={}/",
            self.client.protocol,
            self.client.domain,
            API_VERSION,
            url_path_encode(&self.client.client_id),
            url_path_encode(&self.advertising_id)
        )
    }

    /// Full collection URL for a drained batch.
    pub fn send_url(&self, events: &[BehaviorEvent]) -> String {
        build(&self.send_base_url(), events)
    }

    /// Full profile-fetch URL; carries no event parameters.
    pub fn profile_url(&self) -> String {
        build(&self.profile_base_url(), &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> RequestBuilder {
        RequestBuilder::new(ClientConfig::new("25"), "AAAA-BBBB")
    }

    #[test]
    fn test_build_value_and_marker_forms() {
        let events = vec![BehaviorEvent::new("a", "1"), BehaviorEvent::new("b", "")];
        assert_eq!(build("http://x/", &events), "http://x/a=1/b/");
    }

    #[test]
    fn test_build_absent_value() {
        let events = vec![BehaviorEvent::marker("flag")];
        assert_eq!(build("base/", &events), "base/flag/");
    }

    #[test]
    fn test_build_escapes_key_and_value() {
        let events = vec![BehaviorEvent::new("int|rest", "café & co")];
        assert_eq!(build("", &events), "int%7Crest=caf%C3%A9 & co/");
    }

    #[test]
    fn test_send_url_template() {
        let events = vec![BehaviorEvent::new("rand", "12"), BehaviorEvent::new("b", "7")];
        assert_eq!(
            builder().send_url(&events),
            "https://bcp.crwdcntrl.net/5/c=25/mid=AAAA-BBBB/e=app/dt=IDFA/sdk=3.0/rand=12/b=7/"
        );
    }

    #[test]
    fn test_profile_url_template() {
        assert_eq!(
            builder().profile_url(),
            "https://ad.crwdcntrl.net/5/pe=y/c=25/mid=AAAA-BBBB/"
        );
    }

    #[test]
    fn test_custom_domain_and_protocol() {
        let client = ClientConfig {
            client_id: "9".to_string(),
            domain: "example.test".to_string(),
            protocol: "http".to_string(),
        };
        let builder = RequestBuilder::new(client, "id");
        assert_eq!(
            builder.profile_url(),
            "http://ad.example.test/5/pe=y/c=9/mid=id/"
        );
    }
}
