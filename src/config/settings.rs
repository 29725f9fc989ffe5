use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::{env, fmt};

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct App {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub http_port: u16,
    pub request_timeout: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Engine {
    pub base_url: String,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Verification {
    #[serde(default = "default_reference_image_path")]
    pub reference_image_path: String,
}

impl Default for Verification {
    fn default() -> Self {
        Verification {
            reference_image_path: default_reference_image_path(),
        }
    }
}

fn default_reference_image_path() -> String {
    "./image2.jpg".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tracer {
    pub uri: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub environment: Option<String>,
    pub server: Server,
    pub logger: Option<Logger>,
    pub engine: Engine,
    #[serde(default)]
    pub verification: Verification,
    pub tracer: Tracer,
    pub app: App,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .add_source(File::with_name("conf/config.toml").format(FileFormat::Toml))
            .add_source(File::with_name("conf/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("conf/local").required(false))
            .add_source(Environment::default().separator("__"));

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.http_port", port)?;
        }

        builder.build()?.try_deserialize()
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "http://localhost:{}", &self.http_port)
    }
}
