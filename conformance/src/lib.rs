//! Backend-independent conformance tests for the storage contract.
//!
//! A backend is accepted only if [`run_test_suite`] passes against it unmodified. Failures are
//! reported by panicking, so the suite is meant to be driven from a `#[tokio::test]`.
use chrono::{DateTime, Duration, SubsecRound, Utc};
use log::info;
use std::future::Future;
use std::sync::Arc;
use storage::{
    new_id, AuthCode, AuthRequest, Claims, Client, Error, JsonWebKey, Keys, RefreshToken, Storage,
    StorageErrorKind, VerificationKey,
};

/// Concurrent updates issued per round of [`concurrent_updates_are_not_lost`].
const CONCURRENT_UPDATES: usize = 8;

/// Runs every conformance test, each against a fresh storage from `new_storage`.
///
/// The factory must return an initialized (migrated) backend holding no data.
pub async fn run_test_suite<F, Fut>(new_storage: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Arc<dyn Storage>>,
{
    run("UpdateAuthRequest", update_auth_request(new_storage().await)).await;
    run(
        "RejectedUpdateAuthRequest",
        rejected_update_auth_request(new_storage().await),
    )
    .await;
    run(
        "UpdateMissingAuthRequest",
        update_missing_auth_request(new_storage().await),
    )
    .await;
    run("CreateAuthCode", create_auth_code(new_storage().await)).await;
    run("CreateRefresh", create_refresh(new_storage().await)).await;
    run("ListRefreshTokens", list_refresh_tokens(new_storage().await)).await;
    run("CreateClient", create_client(new_storage().await)).await;
    run("DuplicateClient", duplicate_client(new_storage().await)).await;
    run("ListClients", list_clients(new_storage().await)).await;
    run("UpdateKeys", update_keys(new_storage().await)).await;
    run("DeleteExactlyOnce", delete_exactly_once(new_storage().await)).await;
    run(
        "ConcurrentUpdates",
        concurrent_updates_are_not_lost(new_storage().await),
    )
    .await;
}

async fn run(name: &str, test: impl Future<Output = ()>) {
    info!("Running conformance test {name}");
    test.await;
    info!("Conformance test {name} passed");
}

/// Far enough in the future to never expire, with whole seconds only so that every backend
/// can store it exactly.
fn never_expire() -> DateTime<Utc> {
    (Utc::now() + Duration::days(365 * 100)).trunc_subsecs(0)
}

fn must_be_not_found(kind: &str, result: Result<impl std::fmt::Debug, Error>) {
    match result {
        Ok(value) => panic!("expected {kind} to be missing, got {value:?}"),
        Err(err) => assert_eq!(
            err.error_kind,
            StorageErrorKind::NotFound,
            "expected not found for {kind}, got {err}"
        ),
    }
}

fn auth_request() -> AuthRequest {
    AuthRequest {
        id: new_id(),
        client_id: "foobar".to_string(),
        response_types: vec!["code".to_string()],
        scopes: vec!["openid".to_string(), "email".to_string()],
        redirect_uri: "https://localhost:80/callback".to_string(),
        nonce: "foo".to_string(),
        state: "bar".to_string(),
        force_approval_prompt: true,
        logged_in: false,
        claims: Claims::default(),
        connector_id: String::new(),
        connector_data: vec![],
        expiry: never_expire(),
    }
}

fn client() -> Client {
    Client {
        id: new_id(),
        secret: "foobar".to_string(),
        redirect_uris: vec![
            "foo://bar.com/".to_string(),
            "https://auth.example.com".to_string(),
        ],
        trusted_peers: vec![],
        public: false,
        name: "dex client".to_string(),
        logo_url: "https://goo.gl/JIyzIC".to_string(),
    }
}

fn jwk(key_id: &str) -> JsonWebKey {
    JsonWebKey {
        key_id: key_id.to_string(),
        algorithm: "RS256".to_string(),
        key_use: "sig".to_string(),
        key: key_id.bytes().chain([0u8, 255]).collect(),
    }
}

async fn update_auth_request(s: Arc<dyn Storage>) {
    let a = auth_request();
    let identity = Claims {
        email: "foobar".to_string(),
        ..Claims::default()
    };

    s.create_auth_request(a.clone())
        .await
        .expect("failed creating auth request");

    let claims = identity.clone();
    s.update_auth_request(
        &a.id,
        Box::new(move |mut old| {
            old.claims = claims;
            old.connector_id = "connID".to_string();
            old.connector_data = b"{\"groups\":[]}".to_vec();
            old.logged_in = true;
            Ok(old)
        }),
    )
    .await
    .expect("failed to update auth request");

    let got = s
        .get_auth_request(&a.id)
        .await
        .expect("failed to get auth request");
    let want = AuthRequest {
        claims: identity,
        connector_id: "connID".to_string(),
        connector_data: b"{\"groups\":[]}".to_vec(),
        logged_in: true,
        ..a
    };
    assert_eq!(got, want, "update did not produce the expected auth request");
}

async fn rejected_update_auth_request(s: Arc<dyn Storage>) {
    let a = auth_request();
    s.create_auth_request(a.clone())
        .await
        .expect("failed creating auth request");

    let err = s
        .update_auth_request(
            &a.id,
            Box::new(|mut old| {
                if !old.logged_in {
                    return Err(Error::rejected("auth request is not logged in"));
                }
                old.state = "consented".to_string();
                Ok(old)
            }),
        )
        .await
        .expect_err("a rejecting updater must fail the update");
    assert_eq!(
        err.error_kind,
        StorageErrorKind::Rejected("auth request is not logged in".to_string()),
        "the updater's error must be returned unchanged"
    );

    let got = s
        .get_auth_request(&a.id)
        .await
        .expect("failed to get auth request");
    assert_eq!(got, a, "a rejected update must not write anything");
}

async fn update_missing_auth_request(s: Arc<dyn Storage>) {
    must_be_not_found(
        "auth request",
        s.update_auth_request(&new_id(), Box::new(|a| Ok(a))).await,
    );
    must_be_not_found("auth request", s.get_auth_request(&new_id()).await);
    must_be_not_found("auth request", s.delete_auth_request(&new_id()).await);
}

async fn create_auth_code(s: Arc<dyn Storage>) {
    let code = AuthCode {
        id: new_id(),
        client_id: "client_id".to_string(),
        scopes: vec!["openid".to_string(), "groups".to_string()],
        nonce: "nonce".to_string(),
        claims: Claims {
            user_id: "1".to_string(),
            username: "jane".to_string(),
            email: "jane.doe@example.com".to_string(),
            email_verified: true,
        },
        connector_id: "ldap".to_string(),
        connector_data: vec![1, 2, 3],
        expiry: never_expire(),
    };

    s.create_auth_code(code.clone())
        .await
        .expect("create auth code");
    let got = s.get_auth_code(&code.id).await.expect("get auth code");
    assert_eq!(got, code, "auth code returned did not match expected");

    s.delete_auth_code(&code.id)
        .await
        .expect("delete auth code");
    must_be_not_found("auth code", s.get_auth_code(&code.id).await);
}

async fn create_refresh(s: Arc<dyn Storage>) {
    let id = new_id();
    let refresh = RefreshToken {
        id: id.clone(),
        client_id: "client_id".to_string(),
        scopes: vec![
            "openid".to_string(),
            "email".to_string(),
            "profile".to_string(),
        ],
        nonce: String::new(),
        claims: Claims::default(),
        connector_id: "client_secret".to_string(),
        connector_data: vec![],
    };

    s.create_refresh(refresh.clone())
        .await
        .expect("create refresh token");
    let got = s.get_refresh(&id).await.expect("get refresh");
    assert_eq!(got, refresh, "refresh returned did not match expected");

    s.delete_refresh(&id)
        .await
        .expect("failed to delete refresh request");
    must_be_not_found("refresh token", s.get_refresh(&id).await);
}

async fn list_refresh_tokens(s: Arc<dyn Storage>) {
    assert!(
        s.list_refresh_tokens()
            .await
            .expect("list refresh tokens")
            .is_empty(),
        "a fresh storage must hold no refresh tokens"
    );

    let mut want: Vec<RefreshToken> = (0..3)
        .map(|i| RefreshToken {
            id: new_id(),
            client_id: format!("client_{i}"),
            scopes: vec!["openid".to_string()],
            nonce: String::new(),
            claims: Claims {
                user_id: format!("user_{i}"),
                ..Claims::default()
            },
            connector_id: "github".to_string(),
            connector_data: vec![],
        })
        .collect();
    for token in &want {
        s.create_refresh(token.clone())
            .await
            .expect("create refresh token");
    }

    let mut got = s.list_refresh_tokens().await.expect("list refresh tokens");
    got.sort_by(|a, b| a.id.cmp(&b.id));
    want.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(got, want, "listed refresh tokens did not match");
}

async fn create_client(s: Arc<dyn Storage>) {
    let mut c = client();
    must_be_not_found("client", s.delete_client(&c.id).await);

    s.create_client(c.clone()).await.expect("create client");
    let got = s.get_client(&c.id).await.expect("get client");
    assert_eq!(got, c, "client retrieved from storage did not match");

    let new_secret = "barfoo".to_string();
    let secret = new_secret.clone();
    s.update_client(
        &c.id,
        Box::new(move |mut old| {
            old.secret = secret;
            Ok(old)
        }),
    )
    .await
    .expect("update client");
    c.secret = new_secret;
    let got = s.get_client(&c.id).await.expect("get client");
    assert_eq!(got, c, "updated client retrieved from storage did not match");

    s.delete_client(&c.id).await.expect("delete client");
    must_be_not_found("client", s.get_client(&c.id).await);
}

async fn duplicate_client(s: Arc<dyn Storage>) {
    let c = client();
    s.create_client(c.clone()).await.expect("create client");

    let err = s
        .create_client(Client {
            name: "impostor".to_string(),
            ..c.clone()
        })
        .await
        .expect_err("creating a client twice must fail");
    assert!(
        !err.is_not_found(),
        "a duplicate create must not be reported as not found"
    );

    let got = s.get_client(&c.id).await.expect("get client");
    assert_eq!(got.name, c.name, "the original client must be unchanged");
}

async fn list_clients(s: Arc<dyn Storage>) {
    assert!(
        s.list_clients().await.expect("list clients").is_empty(),
        "a fresh storage must hold no clients"
    );

    let public_client = Client {
        redirect_uris: vec![],
        public: true,
        secret: String::new(),
        ..client()
    };
    let trusted_client = Client {
        trusted_peers: vec![public_client.id.clone()],
        ..client()
    };
    let mut want = vec![public_client, trusted_client];
    for c in &want {
        s.create_client(c.clone()).await.expect("create client");
    }

    let mut got = s.list_clients().await.expect("list clients");
    got.sort_by(|a, b| a.id.cmp(&b.id));
    want.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(got, want, "listed clients did not match");
}

async fn update_keys(s: Arc<dyn Storage>) {
    must_be_not_found("keys", s.get_keys().await);

    let first = Keys {
        signing_key: Some(jwk("signing-1")),
        signing_key_pub: Some(jwk("signing-1-pub")),
        verification_keys: vec![],
        next_rotation: never_expire(),
    };
    let want = first.clone();
    s.update_keys(Box::new(move |old| {
        assert_eq!(old, Keys::default(), "first update must start from defaults");
        Ok(want)
    }))
    .await
    .expect("first keys update");
    assert_eq!(s.get_keys().await.expect("get keys"), first);

    let rotated_until = never_expire();
    s.update_keys(Box::new(move |old| {
        let retired = VerificationKey {
            public_key: old
                .signing_key_pub
                .clone()
                .ok_or_else(|| Error::rejected("no public key to retire"))?,
            expiry: rotated_until,
        };
        Ok(Keys {
            signing_key: Some(jwk("signing-2")),
            signing_key_pub: Some(jwk("signing-2-pub")),
            verification_keys: vec![retired],
            ..old
        })
    }))
    .await
    .expect("second keys update");

    let got = s.get_keys().await.expect("get keys");
    assert_eq!(got.signing_key, Some(jwk("signing-2")));
    assert_eq!(got.signing_key_pub, Some(jwk("signing-2-pub")));
    assert_eq!(
        got.verification_keys,
        vec![VerificationKey {
            public_key: jwk("signing-1-pub"),
            expiry: rotated_until,
        }]
    );
    assert_eq!(got.next_rotation, first.next_rotation);
}

async fn delete_exactly_once(s: Arc<dyn Storage>) {
    let a = auth_request();
    s.create_auth_request(a.clone())
        .await
        .expect("create auth request");

    s.delete_auth_request(&a.id)
        .await
        .expect("first delete must succeed");
    must_be_not_found("auth request", s.delete_auth_request(&a.id).await);
    must_be_not_found("auth request", s.get_auth_request(&a.id).await);
    must_be_not_found(
        "auth request",
        s.update_auth_request(&a.id, Box::new(|a| Ok(a))).await,
    );
}

/// Increments a counter held in a client's name from many tasks at once.
///
/// A backend may refuse some of the updates (e.g. reporting a serialization conflict), but
/// every update it accepted must be reflected: the final count equals the number of successes.
async fn concurrent_updates_are_not_lost(s: Arc<dyn Storage>) {
    let c = Client {
        name: "0".to_string(),
        ..client()
    };
    s.create_client(c.clone()).await.expect("create client");

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..CONCURRENT_UPDATES {
        let s = Arc::clone(&s);
        let id = c.id.clone();
        tasks.spawn(async move {
            s.update_client(
                &id,
                Box::new(|mut old| {
                    let count: usize = old
                        .name
                        .parse()
                        .map_err(|_| Error::rejected(format!("not a counter: {}", old.name)))?;
                    old.name = (count + 1).to_string();
                    Ok(old)
                }),
            )
            .await
        });
    }

    let mut succeeded = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.expect("update task panicked") {
            Ok(()) => succeeded += 1,
            Err(err) => {
                assert!(
                    !err.is_not_found() && !err.is_integrity_fault(),
                    "unexpected error from concurrent update: {err}"
                );
                info!("Concurrent update refused by backend: {err}");
            }
        }
    }
    assert!(succeeded > 0, "every concurrent update failed");

    let got = s.get_client(&c.id).await.expect("get client");
    assert_eq!(
        got.name,
        succeeded.to_string(),
        "an accepted update was lost"
    );
    assert_eq!(
        got,
        Client {
            name: succeeded.to_string(),
            ..c
        },
        "fields untouched by the updates must be preserved"
    );
}
