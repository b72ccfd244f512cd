use mina_bridge::auth::{JwtAuth, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH};
use mina_bridge::config::JwtConfig;
use mina_bridge::AppError;

fn jwt_config(secret: &str) -> JwtConfig {
    JwtConfig {
        access_minutes: 60,
        refresh_days: 7,
        refresh_threshold_minutes: 10,
        secret: secret.to_owned(),
    }
}

#[test]
fn empty_secret_is_rejected() {
    let err = JwtAuth::new(&jwt_config("")).expect_err("must fail");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn access_token_round_trips() {
    let jwt = JwtAuth::new(&jwt_config("test-secret")).expect("jwt auth");
    let token = jwt.create_access_token("alice").expect("token");

    let claims = jwt.verify(&token, TOKEN_TYPE_ACCESS).expect("verifies");
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.token_type, TOKEN_TYPE_ACCESS);
}

#[test]
fn refresh_token_round_trips() {
    let jwt = JwtAuth::new(&jwt_config("test-secret")).expect("jwt auth");
    let token = jwt.create_refresh_token("alice").expect("token");

    let claims = jwt.verify(&token, TOKEN_TYPE_REFRESH).expect("verifies");
    assert_eq!(claims.token_type, TOKEN_TYPE_REFRESH);
}

#[test]
fn token_types_are_not_interchangeable() {
    let jwt = JwtAuth::new(&jwt_config("test-secret")).expect("jwt auth");

    let access = jwt.create_access_token("alice").expect("token");
    let err = jwt.verify(&access, TOKEN_TYPE_REFRESH).expect_err("type mismatch");
    assert!(matches!(err, AppError::Token(_)));

    let refresh = jwt.create_refresh_token("alice").expect("token");
    let err = jwt.verify(&refresh, TOKEN_TYPE_ACCESS).expect_err("type mismatch");
    assert!(matches!(err, AppError::Token(_)));
}

#[test]
fn wrong_secret_is_rejected() {
    let issuer = JwtAuth::new(&jwt_config("secret-a")).expect("jwt auth");
    let verifier = JwtAuth::new(&jwt_config("secret-b")).expect("jwt auth");

    let token = issuer.create_access_token("alice").expect("token");
    let err = verifier.verify(&token, TOKEN_TYPE_ACCESS).expect_err("bad signature");
    assert!(matches!(err, AppError::Token(_)));
}

#[test]
fn garbage_token_is_rejected() {
    let jwt = JwtAuth::new(&jwt_config("test-secret")).expect("jwt auth");
    let err = jwt.verify("not.a.jwt", TOKEN_TYPE_ACCESS).expect_err("malformed");
    assert!(matches!(err, AppError::Token(_)));
}

#[test]
fn expired_token_is_rejected() {
    // Negative lifetime puts the expiry well past the verifier's leeway.
    let config = JwtConfig {
        access_minutes: -5,
        ..jwt_config("test-secret")
    };
    let jwt = JwtAuth::new(&config).expect("jwt auth");

    let token = jwt.create_access_token("alice").expect("token");
    let err = jwt.verify(&token, TOKEN_TYPE_ACCESS).expect_err("expired");
    match err {
        AppError::Token(msg) => assert!(msg.contains("expired"), "got: {msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn fresh_access_token_does_not_need_refresh() {
    let jwt = JwtAuth::new(&jwt_config("test-secret")).expect("jwt auth");
    let token = jwt.create_access_token("alice").expect("token");
    let claims = jwt.verify(&token, TOKEN_TYPE_ACCESS).expect("verifies");

    assert!(!jwt.should_refresh(&claims));
}

#[test]
fn token_near_expiry_should_refresh() {
    // Threshold larger than the whole access lifetime forces the advisory.
    let config = JwtConfig {
        access_minutes: 5,
        refresh_threshold_minutes: 60,
        ..jwt_config("test-secret")
    };
    let jwt = JwtAuth::new(&config).expect("jwt auth");

    let token = jwt.create_access_token("alice").expect("token");
    let claims = jwt.verify(&token, TOKEN_TYPE_ACCESS).expect("verifies");
    assert!(jwt.should_refresh(&claims));
}
