//! Integration tests for the reqwest transport against a local stub of the
//! collection and profile endpoints.

#[cfg(feature = "http")]
mod transport_tests {
    use audience_agent::{
        Agent, AgentError, ReqwestTransport, StaticIdentity, Transport, TransportError,
    };
    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode, Uri},
        Router,
    };
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::net::TcpListener;

    const PROFILE: &str =
        r#"{"Profile":{"pid":"p1","tpid":"t1","Audiences":{"Audience":[{"id":"1","abbr":"news"}]}}}"#;

    #[derive(Debug, Clone)]
    struct Captured {
        path: String,
        cache_control: Option<String>,
    }

    type Seen = Arc<Mutex<Vec<Captured>>>;

    async fn endpoint(State(seen): State<Seen>, headers: HeaderMap, uri: Uri) -> (StatusCode, String) {
        seen.lock().unwrap().push(Captured {
            path: uri.path().to_string(),
            cache_control: headers
                .get("cache-control")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });

        if uri.path().contains("/c=broken/") {
            (StatusCode::INTERNAL_SERVER_ERROR, "down".to_string())
        } else if uri.path().starts_with("/5/pe=y/") {
            (StatusCode::OK, PROFILE.to_string())
        } else {
            (StatusCode::OK, String::new())
        }
    }

    async fn start_stub() -> (SocketAddr, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(endpoint).with_state(seen.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub");
        let addr = listener.local_addr().expect("Failed to read stub address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        (addr, seen)
    }

    /// Agent whose `bcp.` and `ad.` hosts resolve to the stub.
    fn agent_for(addr: SocketAddr) -> Agent {
        let client = reqwest::Client::builder()
            .resolve("bcp.stub.test", addr)
            .resolve("ad.stub.test", addr)
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build client");

        Agent::new(
            Arc::new(ReqwestTransport::with_client(client)),
            Arc::new(StaticIdentity::new(Some("IDFA-1".to_string()), true)),
            tokio::runtime::Handle::current(),
        )
        .expect("Failed to create agent")
    }

    #[tokio::test]
    async fn test_send_reaches_collection_endpoint() {
        let (addr, seen) = start_stub().await;
        let agent = agent_for(addr);
        agent
            .configure(format!("stub.test:{}", addr.port()), "http", "25")
            .unwrap();

        agent.add_behavior_id(7);
        agent.add_opportunity_id(8);
        let receipt = agent.send_behavior_data().await.unwrap();
        assert!(receipt.was_new_session);

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        let path = &seen[0].path;
        assert!(path.starts_with("/5/c=25/mid=IDFA-1/e=app/dt=IDFA/sdk=3.0/rand="));
        assert!(path.ends_with("/pv=y/b=7/p=8/dp=y/"));
        assert_eq!(seen[0].cache_control.as_deref(), Some("no-cache"));
    }

    #[tokio::test]
    async fn test_profile_fetch_decodes_response() {
        let (addr, seen) = start_stub().await;
        let agent = agent_for(addr);
        agent
            .configure(format!("stub.test:{}", addr.port()), "http", "25")
            .unwrap();

        let profile = agent.get_audience_data().await.unwrap();
        assert_eq!(profile.tpid.as_deref(), Some("t1"));
        assert_eq!(profile.abbreviations(), vec!["news"]);

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen[0].path, "/5/pe=y/c=25/mid=IDFA-1/");
    }

    #[tokio::test]
    async fn test_server_error_is_unexpected_response() {
        let (addr, _seen) = start_stub().await;
        let agent = agent_for(addr);
        agent
            .configure(format!("stub.test:{}", addr.port()), "http", "broken")
            .unwrap();

        let err = agent.send_behavior_data().await.unwrap_err();
        assert!(matches!(err, AgentError::UnexpectedResponse { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport
            .get(&format!("http://{addr}/5/pe=y/c=1/mid=x/"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
