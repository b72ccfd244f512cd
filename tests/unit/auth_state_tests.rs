use mina_bridge::remote::AuthState;

#[test]
fn blob_round_trips() {
    let auth = AuthState {
        user_id: "31415926".to_owned(),
        service_token: "tok-abc".to_owned(),
    };

    let parsed = AuthState::from_blob(&auth.to_blob()).expect("parses own blob");
    assert_eq!(parsed, auth);
}

#[test]
fn non_json_blob_is_rejected() {
    assert!(AuthState::from_blob(b"not json at all").is_none());
}

#[test]
fn missing_fields_are_rejected() {
    assert!(AuthState::from_blob(br#"{"user_id": "1"}"#).is_none());
    assert!(AuthState::from_blob(br#"{"service_token": "t"}"#).is_none());
    assert!(AuthState::from_blob(br"{}").is_none());
}

#[test]
fn empty_fields_are_rejected() {
    assert!(AuthState::from_blob(br#"{"user_id": "", "service_token": "t"}"#).is_none());
    assert!(AuthState::from_blob(br#"{"user_id": "1", "service_token": ""}"#).is_none());
}

#[test]
fn extra_fields_are_tolerated() {
    let blob = br#"{"user_id": "1", "service_token": "t", "device_id": "legacy"}"#;
    let auth = AuthState::from_blob(blob).expect("parses with extras");
    assert_eq!(auth.user_id, "1");
    assert_eq!(auth.service_token, "t");
}
