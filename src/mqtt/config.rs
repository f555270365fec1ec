use super::QOS;
use rumqttc::{LastWill, MqttOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Broker connection settings
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    pub clean_session: bool,
    /// How long `connect` waits for the broker's CONNACK
    pub connect_timeout_secs: u64,
    /// Capacity of the request queue between the client handle and its event loop
    pub request_capacity: usize,
    /// Published on the gestion topic right after connecting
    pub welcome: String,
    /// Registered as last will on the gestion topic
    pub last_will: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "iot.eclipse.org".to_string(),
            port: 1883,
            client_id: "Test134568789".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 60,
            clean_session: true,
            connect_timeout_secs: 10,
            request_capacity: 10,
            welcome: "Hello world! Android Things conectada.".to_string(),
            last_will: "Android Things desconectada!".to_string(),
        }
    }
}

impl MqttConfig {
    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Builds the rumqttc options, registering `last_will` on `will_topic`.
    pub fn to_options(&self, will_topic: &str) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options
            .set_keep_alive(Duration::from_secs(self.keep_alive_secs))
            .set_clean_session(self.clean_session)
            .set_last_will(LastWill::new(
                will_topic,
                self.last_will.clone().into_bytes(),
                QOS,
                false,
            ));
        if let Some(user) = &self.username {
            options.set_credentials(user.clone(), self.password.clone().unwrap_or_default());
        }
        options
    }
}
