//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use idp_core::{IdpConfig, UserProfile};
use idp_protocol_saml::builder::{FixedClock, IdGenerator};
use idp_protocol_saml::secrets::StaticSecretProvider;
use idp_protocol_saml::sso::SsoService;
use idp_protocol_saml::xml::{Element, Node};

pub const KEY: &str = include_str!("../fixtures/idp.key");
pub const CERT: &str = include_str!("../fixtures/idp.crt");
pub const OTHER_CERT: &str = include_str!("../fixtures/other.crt");

pub const SP_ENTITY_ID: &str = "https://sp.example/metadata";
pub const SP_ACS_URL: &str = "https://sp.example/acs";
pub const IDP_SSO_URL: &str = "https://idp.example/sso";

/// Identifiers `_id0`, `_id1`, ... in call order.
#[derive(Default)]
pub struct SequentialIds(AtomicUsize);

impl IdGenerator for SequentialIds {
    fn new_id(&self) -> String {
        format!("_id{}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}

pub fn instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn config(expected_acs_url: Option<&str>) -> IdpConfig {
    IdpConfig {
        entity_id: "https://idp.example/metadata".to_string(),
        endpoint: "https://idp.example".to_string(),
        expected_acs_url: expected_acs_url.map(str::to_string),
        ..IdpConfig::default()
    }
}

pub fn secrets() -> StaticSecretProvider {
    StaticSecretProvider::new()
        .with_secret("PRIVATE_KEY", KEY)
        .with_secret("PUBLIC_CRT", CERT)
}

pub fn service(expected_acs_url: Option<&str>) -> SsoService {
    SsoService::new(Arc::new(config(expected_acs_url)), Arc::new(secrets()))
        .with_clock(Arc::new(FixedClock(instant())))
}

pub fn user() -> UserProfile {
    UserProfile {
        username: "user1".to_string(),
        email: Some("user1@example.com".to_string()),
        attributes: vec![
            ("displayName".to_string(), "User <One> & Co".to_string()),
            ("email".to_string(), "user1@example.com".to_string()),
            ("grafana_role".to_string(), "Admin".to_string()),
        ],
    }
}

/// First element named `{namespace}name` in document order.
pub fn find_mut<'a>(element: &'a mut Element, namespace: &str, name: &str) -> Option<&'a mut Element> {
    if element.is(namespace, name) {
        return Some(element);
    }
    for node in &mut element.children {
        if let Node::Element(child) = node {
            if let Some(found) = find_mut(child, namespace, name) {
                return Some(found);
            }
        }
    }
    None
}

/// Replaces the character content of the first `{namespace}name` element.
pub fn set_text(root: &mut Element, namespace: &str, name: &str, text: &str) {
    let element = find_mut(root, namespace, name).expect("element to modify");
    element.children = vec![Node::Text(text.to_string())];
}
