#![allow(dead_code)]

pub mod sample {
    use ctlrouter::handler::{HandlerGroup, ParamSpec, Route};
    use ctlrouter::server::Cookie;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Item {
        pub id: i64,
        pub name: String,
    }

    /// Handler group exercising every binding source, role gating and failure mode
    pub fn sample_group() -> HandlerGroup {
        HandlerGroup::new("sample")
            .route(Route::get("/MyMethod").handler(|ctx, _| {
                ctx.ok_text("MyMethod");
                Ok(())
            }))
            .route(Route::get("/AnotherMethod").handler(|ctx, _| {
                let name = ctx.cookie("Name").unwrap_or("stranger").to_string();
                ctx.set_cookie(Cookie::new("seen", name.clone()).path("/").http_only());
                ctx.ok_json(&json!({ "name": name }))
            }))
            .route(
                Route::post("/JsonMethod")
                    .param(ParamSpec::json::<Item>("item"))
                    .handler(|ctx, args| {
                        let item: Item = args.get("item")?;
                        ctx.ok_json(&json!({ "received": item }))
                    }),
            )
            .route(Route::get("/objec/sub/subsub").handler(|ctx, _| {
                ctx.ok_text("deep");
                Ok(())
            }))
            .route(Route::get("/AdminMethod").role("Admin").handler(|ctx, _| {
                let name = ctx.principal().name().to_string();
                ctx.ok_text(format!("hello admin {name}"));
                Ok(())
            }))
            .route(
                Route::delete("/RemoveItem")
                    .param(ParamSpec::int("id"))
                    .handler(|ctx, args| {
                        let id: i64 = args.get("id")?;
                        ctx.ok_text(format!("removed {id}"));
                        Ok(())
                    }),
            )
            .route(Route::get("/index.htm").handler(|ctx, _| {
                ctx.ok_bytes(
                    "<html><body>index</body></html>",
                    "text/html",
                    "identity",
                );
                Ok(())
            }))
            .route(
                Route::post("/Login")
                    .params([ParamSpec::text("user"), ParamSpec::text("password")])
                    .handler(|ctx, args| {
                        let user: String = args.get("user")?;
                        let password: String = args.get("password")?;
                        let cookie = match ctx.credential_store() {
                            Some(store) => store.cookie_by_login(&user, &password)?,
                            None => None,
                        };
                        match cookie {
                            Some(value) => {
                                ctx.set_cookie(Cookie::new("auth", value).path("/").http_only());
                                ctx.ok_text("welcome");
                            }
                            None => ctx.not_authenticated(),
                        }
                        Ok(())
                    }),
            )
            .route(
                Route::get("/GetFile")
                    .params([ParamSpec::text("name"), ParamSpec::int("id")])
                    .handler(|ctx, args| {
                        let name: String = args.get("name")?;
                        let id: i64 = args.get("id")?;
                        ctx.ok_text(format!("{name}:{id}"));
                        Ok(())
                    }),
            )
            .route(Route::get("/Fail").handler(|ctx, _| {
                ctx.ok_text("partial");
                anyhow::bail!("handler failed")
            }))
            .route(Route::get("/Panic").handler(|_, _| panic!("handler panicked")))
    }
}

pub mod store {
    use ctlrouter::security::{CredentialError, CredentialStore, InMemoryCredentialStore};
    use ctlrouter::Principal;
    use std::sync::Mutex;

    /// In-memory store that records which lookup ran, without the credential value
    #[derive(Default)]
    pub struct RecordingStore {
        pub inner: InMemoryCredentialStore,
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingStore {
        pub fn with_admin() -> Self {
            let store = Self::default();
            store.inner.add_user("alice", "secret", ["Admin", "User"]);
            store.inner.add_user("bob", "hunter2", ["User"]);
            store.inner.add_key("alice-key", "alice");
            store
        }

        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl CredentialStore for RecordingStore {
        fn user_by_cookie(&self, cookie: &str) -> Result<Option<Principal>, CredentialError> {
            self.record("cookie");
            self.inner.user_by_cookie(cookie)
        }

        fn user_by_login(
            &self,
            user: &str,
            password: &str,
        ) -> Result<Option<Principal>, CredentialError> {
            self.record("login");
            self.inner.user_by_login(user, password)
        }

        fn user_by_key(&self, key: &str) -> Result<Option<Principal>, CredentialError> {
            self.record("key");
            self.inner.user_by_key(key)
        }

        fn cookie_by_login(
            &self,
            user: &str,
            password: &str,
        ) -> Result<Option<String>, CredentialError> {
            self.record("cookie_by_login");
            self.inner.cookie_by_login(user, password)
        }
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Parsed HTTP/1.1 response
    #[derive(Debug)]
    pub struct Response {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl Response {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
            self.headers
                .iter()
                .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_slice(&self.body).unwrap_or_default()
        }
    }

    /// Send one request over a fresh connection and read the reply to EOF.
    ///
    /// `headers` are added verbatim; `Connection: close` and `Content-Length` are always sent.
    pub fn send_request(
        addr: SocketAddr,
        method: &str,
        target: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Response {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut req = format!("{method} {target} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
        for (name, value) in headers {
            req.push_str(&format!("{name}: {value}\r\n"));
        }
        req.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
        stream.write_all(req.as_bytes()).unwrap();

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).unwrap();
        parse_response(&raw)
    }

    pub fn get(addr: SocketAddr, target: &str) -> Response {
        send_request(addr, "GET", target, &[], "")
    }

    fn parse_response(raw: &[u8]) -> Response {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no header terminator");
        let head = String::from_utf8_lossy(&raw[..split]);
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        let mut body = raw[split + 4..].to_vec();
        let chunked = headers.iter().any(|(k, v)| {
            k.eq_ignore_ascii_case("transfer-encoding") && v.eq_ignore_ascii_case("chunked")
        });
        if chunked {
            body = dechunk(&body);
        }
        Response {
            status,
            headers,
            body,
        }
    }

    fn dechunk(mut data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(pos) = data.windows(2).position(|w| w == b"\r\n") {
            let size_line = String::from_utf8_lossy(&data[..pos]);
            let size = usize::from_str_radix(size_line.split(';').next().unwrap_or("0").trim(), 16)
                .unwrap_or(0);
            if size == 0 {
                break;
            }
            let start = pos + 2;
            out.extend_from_slice(&data[start..start + size]);
            data = &data[start + size + 2..];
        }
        out
    }
}

pub mod test_server {
    use ctlrouter::handler::HandlerGroup;
    use ctlrouter::security::{AuthScheme, CredentialStore};
    use ctlrouter::worker_pool::WorkerPoolConfig;
    use ctlrouter::{Server, ServerConfig};
    use std::net::SocketAddr;
    use std::sync::Arc;

    /// Running server on an ephemeral port, stopped on drop
    pub struct TestServer {
        pub server: Server,
        pub addr: SocketAddr,
    }

    impl TestServer {
        pub fn start(auth: AuthScheme, store: Arc<dyn CredentialStore>, groups: Vec<HandlerGroup>) -> Self {
            let config = ServerConfig {
                bind: vec!["127.0.0.1:0".to_string()],
                auth,
                workers: WorkerPoolConfig {
                    num_workers: 4,
                    ..WorkerPoolConfig::default()
                },
                ..ServerConfig::default()
            };
            Self::with_config(config, store, groups)
        }

        pub fn with_config(
            config: ServerConfig,
            store: Arc<dyn CredentialStore>,
            groups: Vec<HandlerGroup>,
        ) -> Self {
            let mut server = Server::new(config, store);
            for group in groups {
                server.add_group(group);
            }
            server.start().unwrap();
            server.wait_ready().unwrap();
            let addr = server.local_addrs()[0];
            Self { server, addr }
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            self.server.stop();
        }
    }
}
