use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{AUTHORIZATION, COOKIE};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use urlencoding::encode;

use super::error::ApiError;
use super::log::ApiCallLogger;
use super::types::{UserFields, UserRecord};
use super::ProxmoxApi;
use crate::config::{Auth, ConnectionSettings};
use crate::ui::prelude::{Level, emit};
use crate::user::UserId;

const CSRF_HEADER: &str = "CSRFPreventionToken";

/// Every response body is wrapped as `{"data": ...}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Ticket {
    ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    csrf_token: String,
}

enum Session {
    Token(String),
    Ticket { cookie: String, csrf_token: String },
}

/// Blocking client for the Proxmox VE `/api2/json` REST API
pub struct PveClient {
    http: Client,
    base_url: String,
    session: Session,
    logger: ApiCallLogger,
}

impl PveClient {
    /// Connect over https and authenticate
    pub fn connect(settings: &ConnectionSettings, logger: ApiCallLogger) -> Result<Self, ApiError> {
        Self::connect_to(settings.base_url(), settings, logger)
    }

    /// Connect to an explicit API root such as `https://node1:8006/api2/json`
    pub fn connect_to(
        base_url: String,
        settings: &ConnectionSettings,
        logger: ApiCallLogger,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("pve-user/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(!settings.validate_certs)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        let base_url = base_url.trim_end_matches('/').to_string();

        let session = match &settings.auth {
            Auth::Token { token_id, secret } => Session::Token(format!(
                "PVEAPIToken={}!{}={}",
                settings.user, token_id, secret
            )),
            Auth::Password(password) => {
                let ticket = Self::login(&http, &base_url, &settings.user, password, &logger)?;
                Session::Ticket {
                    cookie: format!("PVEAuthCookie={}", ticket.ticket),
                    csrf_token: ticket.csrf_token,
                }
            }
        };

        emit(
            Level::Debug,
            "api.connect",
            &format!("Connected to {base_url} as {}", settings.user),
            None,
        );

        Ok(Self {
            http,
            base_url,
            session,
            logger,
        })
    }

    fn login(
        http: &Client,
        base_url: &str,
        user: &str,
        password: &str,
        logger: &ApiCallLogger,
    ) -> Result<Ticket, ApiError> {
        let path = "/access/ticket";
        let request = http
            .post(format!("{base_url}{path}"))
            .form(&[("username", user), ("password", password)]);

        let ticket: Ticket = Self::execute(request, "POST", path, logger).map_err(|e| match e {
            ApiError::Http { status: 401, message } => ApiError::Login(message),
            other => other,
        })?;
        Ok(ticket)
    }

    fn execute<T: DeserializeOwned>(
        request: RequestBuilder,
        method: &str,
        path: &str,
        logger: &ApiCallLogger,
    ) -> Result<T, ApiError> {
        let result = Self::execute_inner(request);

        let (status, error) = match &result {
            Ok((status, _)) => (Some(*status), None),
            Err(e) => (e.status(), Some(e.to_string())),
        };
        if let Err(e) = logger.log_call(method, path, status, error.as_deref()) {
            emit(
                Level::Warn,
                "api.log.failed",
                &format!("Warning: Failed to log API call: {e}"),
                None,
            );
        }

        result.map(|(_, data)| data)
    }

    fn execute_inner<T: DeserializeOwned>(request: RequestBuilder) -> Result<(u16, T), ApiError> {
        let response = request
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::from_response(
                status.as_u16(),
                status.canonical_reason(),
                &body,
            ));
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| ApiError::Json(e.to_string()))?;
        Ok((status.as_u16(), envelope.data))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method.clone(), format!("{}{}", self.base_url, path));
        match &self.session {
            Session::Token(header) => builder.header(AUTHORIZATION, header),
            Session::Ticket { cookie, csrf_token } => {
                let builder = builder.header(COOKIE, cookie);
                if method == Method::GET {
                    builder
                } else {
                    builder.header(CSRF_HEADER, csrf_token)
                }
            }
        }
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&'static str, String)]>,
    ) -> Result<T, ApiError> {
        emit(Level::Debug, "api.request", &format!("{method} {path}"), None);

        let mut request = self.request(method.clone(), path);
        if let Some(form) = form {
            request = request.form(form);
        }
        Self::execute(request, method.as_str(), path, &self.logger)
    }

    // `#`, `?` and `%` are legal in user names and must not reach the URL raw
    fn user_path(userid: &UserId) -> String {
        format!("/access/users/{}", encode(userid.as_str()))
    }
}

impl ProxmoxApi for PveClient {
    fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        self.call(Method::GET, "/access/users", None)
    }

    fn create_user(&self, userid: &UserId, fields: &UserFields) -> Result<(), ApiError> {
        let mut form = vec![("userid", userid.to_string())];
        form.extend(fields.form_pairs());
        self.call::<serde_json::Value>(Method::POST, "/access/users", Some(&form))
            .map(drop)
    }

    fn update_user(&self, userid: &UserId, fields: &UserFields) -> Result<(), ApiError> {
        let form = fields.form_pairs();
        self.call::<serde_json::Value>(Method::PUT, &Self::user_path(userid), Some(&form))
            .map(drop)
    }

    fn delete_user(&self, userid: &UserId) -> Result<(), ApiError> {
        self.call::<serde_json::Value>(Method::DELETE, &Self::user_path(userid), None)
            .map(drop)
    }

    fn set_password(&self, userid: &UserId, password: &str) -> Result<(), ApiError> {
        let form = vec![("userid", userid.to_string()), ("password", password.to_string())];
        self.call::<serde_json::Value>(Method::PUT, "/access/password", Some(&form))
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn settings(auth: Auth) -> ConnectionSettings {
        ConnectionSettings {
            host: "127.0.0.1".into(),
            port: 8006,
            user: "root@pam".into(),
            auth,
            validate_certs: false,
            timeout: Duration::from_secs(5),
        }
    }

    fn token_client(server: &MockServer) -> PveClient {
        let auth = Auth::Token {
            token_id: "automation".into(),
            secret: "0000-1111".into(),
        };
        PveClient::connect_to(server.url("/api2/json"), &settings(auth), ApiCallLogger::disabled())
            .unwrap()
    }

    fn alice() -> UserId {
        UserId::parse("alice@pve").unwrap()
    }

    #[test]
    fn lists_users_with_token_header() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api2/json/access/users")
                .header("authorization", "PVEAPIToken=root@pam!automation=0000-1111");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"data":[{"userid":"root@pam","enable":1},{"userid":"alice@pve","enable":0}]}"#);
        });

        let users = token_client(&server).list_users().unwrap();

        mock.assert();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].userid, "alice@pve");
        assert_eq!(users[1].enable, Some(false));
    }

    #[test]
    fn creates_user_with_form_fields() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api2/json/access/users")
                .form_urlencoded_tuple("userid", "alice@pve")
                .form_urlencoded_tuple("password", "Secret1!")
                .form_urlencoded_tuple("groups", "admins,ops")
                .form_urlencoded_tuple("enable", "1");
            then.status(200).body(r#"{"data":null}"#);
        });

        let fields = UserFields::for_create(&crate::user::UserProfile {
            groups: Some(vec!["ops".into(), "admins".into()]),
            password: Some("Secret1!".into()),
            ..Default::default()
        });
        token_client(&server).create_user(&alice(), &fields).unwrap();

        mock.assert();
    }

    #[test]
    fn updates_and_deletes_by_user_path() {
        let server = MockServer::start();
        let update = server.mock(|when, then| {
            when.method(PUT)
                .path("/api2/json/access/users/alice%40pve")
                .form_urlencoded_tuple("enable", "0");
            then.status(200).body(r#"{"data":null}"#);
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/api2/json/access/users/alice%40pve");
            then.status(200).body(r#"{"data":null}"#);
        });

        let client = token_client(&server);
        let fields = UserFields::for_update(&crate::user::UserProfile {
            enable: false,
            ..Default::default()
        });
        client.update_user(&alice(), &fields).unwrap();
        client.delete_user(&alice()).unwrap();

        update.assert();
        delete.assert();
    }

    #[test]
    fn user_path_is_percent_encoded() {
        let server = MockServer::start();
        let unencoded = server.mock(|when, then| {
            when.method(DELETE).path("/api2/json/access/users/bob@pve");
            then.status(200).body(r#"{"data":null}"#);
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE)
                .path("/api2/json/access/users/bob%40pve%23x%40pve");
            then.status(200).body(r#"{"data":null}"#);
        });
        let update = server.mock(|when, then| {
            when.method(PUT)
                .path("/api2/json/access/users/100%25%3Fx%40pve");
            then.status(200).body(r#"{"data":null}"#);
        });

        let client = token_client(&server);
        client
            .delete_user(&UserId::parse("bob@pve#x@pve").unwrap())
            .unwrap();
        client
            .update_user(
                &UserId::parse("100%?x@pve").unwrap(),
                &UserFields::for_update(&Default::default()),
            )
            .unwrap();

        delete.assert();
        update.assert();
        unencoded.assert_calls(0);
    }

    #[test]
    fn sets_password_on_its_own_endpoint() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api2/json/access/password")
                .form_urlencoded_tuple("userid", "alice@pve")
                .form_urlencoded_tuple("password", "Secret1!");
            then.status(200).body(r#"{"data":null}"#);
        });

        token_client(&server)
            .set_password(&alice(), "Secret1!")
            .unwrap();

        mock.assert();
    }

    #[test]
    fn password_auth_uses_ticket_cookie_and_csrf_token() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/api2/json/access/ticket")
                .form_urlencoded_tuple("username", "root@pam")
                .form_urlencoded_tuple("password", "hunter2");
            then.status(200).body(
                r#"{"data":{"ticket":"PVE:root@pam:66AA::sig","CSRFPreventionToken":"66AA:csrf","username":"root@pam"}}"#,
            );
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE)
                .path("/api2/json/access/users/alice%40pve")
                .header("cookie", "PVEAuthCookie=PVE:root@pam:66AA::sig")
                .header("CSRFPreventionToken", "66AA:csrf");
            then.status(200).body(r#"{"data":null}"#);
        });

        let client = PveClient::connect_to(
            server.url("/api2/json"),
            &settings(Auth::Password("hunter2".into())),
            ApiCallLogger::disabled(),
        )
        .unwrap();
        client.delete_user(&alice()).unwrap();

        login.assert();
        delete.assert();
    }

    #[test]
    fn rejected_login_is_an_authentication_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api2/json/access/ticket");
            then.status(401).body("authentication failure");
        });

        let result = PveClient::connect_to(
            server.url("/api2/json"),
            &settings(Auth::Password("wrong".into())),
            ApiCallLogger::disabled(),
        );

        match result {
            Err(ApiError::Login(message)) => assert_eq!(message, "authentication failure"),
            Err(other) => panic!("expected login error, got {other}"),
            Ok(_) => panic!("expected login error"),
        }
    }

    #[test]
    fn server_errors_carry_status_and_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/api2/json/access/users/alice%40pve");
            then.status(500).body("delete user failed: cannot delete root\n");
        });

        let err = token_client(&server).delete_user(&alice()).unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "HTTP 500: delete user failed: cannot delete root");
    }

    #[test]
    fn malformed_body_is_a_json_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api2/json/access/users");
            then.status(200).body("<html>proxy error</html>");
        });

        let err = token_client(&server).list_users().unwrap_err();
        assert!(matches!(err, ApiError::Json(_)), "got {err:?}");
    }

    #[test]
    fn calls_are_logged_when_enabled() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api2/json/access/users");
            then.status(200).body(r#"{"data":[]}"#);
        });
        let dir = tempfile::tempdir().unwrap();
        let logger = ApiCallLogger::with_dir(dir.path().to_path_buf()).unwrap();
        let auth = Auth::Token {
            token_id: "automation".into(),
            secret: "0000-1111".into(),
        };
        let client =
            PveClient::connect_to(server.url("/api2/json"), &settings(auth), logger.clone()).unwrap();

        client.list_users().unwrap();

        let logs = logger.get_logs().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].method, "GET");
        assert_eq!(logs[0].path, "/access/users");
        assert_eq!(logs[0].status, Some(200));
        assert!(logs[0].success);
    }
}
