//! Builders for queue message bodies.

#![allow(dead_code)]

use serde_json::{json, Value};

/// Builder for login event bodies as producers publish them
#[derive(Debug, Clone)]
pub struct LoginEventBuilder {
    user_id: String,
    device_type: String,
    ip: String,
    device_id: String,
    locale: String,
    app_version: String,
    create_date: Option<String>,
}

impl LoginEventBuilder {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            device_type: "android".to_string(),
            ip: "199.172.111.135".to_string(),
            device_id: format!("{user_id}-device"),
            locale: "RU".to_string(),
            app_version: "2.3.0".to_string(),
            create_date: None,
        }
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.ip = ip.to_string();
        self
    }

    pub fn with_device_id(mut self, device_id: &str) -> Self {
        self.device_id = device_id.to_string();
        self
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    pub fn with_app_version(mut self, app_version: &str) -> Self {
        self.app_version = app_version.to_string();
        self
    }

    pub fn with_create_date(mut self, create_date: &str) -> Self {
        self.create_date = Some(create_date.to_string());
        self
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "user_id": self.user_id,
            "device_type": self.device_type,
            "ip": self.ip,
            "device_id": self.device_id,
            "locale": self.locale,
            "app_version": self.app_version,
        });
        if let Some(create_date) = &self.create_date {
            body["create_date"] = json!(create_date);
        }
        body
    }

    pub fn build(&self) -> String {
        self.to_json().to_string()
    }
}

/// Body for `user_id` with every other field at its default
pub fn login_body(user_id: &str) -> String {
    LoginEventBuilder::new(user_id).build()
}
