use crate::error::SeekerError;
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use webm_seek::{ByteRange, WebmOptions, DEFAULT_EPSILON};

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub seek: Seek,
    #[serde(default)]
    pub media: Vec<Media>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Runtime {
    pub threads: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub addr: String,
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for Http {
    fn default() -> Self {
        Http {
            addr: ":8090".to_string(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Deserialize)]
pub struct Seek {
    /// Seconds a cue may start after the requested time and still be chosen.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

impl Default for Seek {
    fn default() -> Self {
        Seek {
            epsilon: default_epsilon(),
        }
    }
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

/// One container, read over HTTP (`url`) or from disk (`path`).
#[derive(Debug, Clone, Deserialize)]
pub struct Media {
    pub name: String,
    pub url: Option<String>,
    pub path: Option<String>,
    /// `"start-end"` byte range of the init segment.
    pub init: String,
    /// `"start-end"` byte range of the `Cues` element.
    pub index: Option<String>,
}

pub enum Location<'a> {
    Url(&'a str),
    Path(&'a str),
}

impl Media {
    pub fn location(&self) -> Result<Location<'_>, SeekerError> {
        match (&self.url, &self.path) {
            (Some(url), None) => Ok(Location::Url(url)),
            (None, Some(path)) => Ok(Location::Path(path)),
            _ => Err(SeekerError::ConfigError(format!(
                "media '{}': exactly one of url or path is required",
                self.name
            ))),
        }
    }

    pub fn options(&self, epsilon: f64) -> Result<WebmOptions, SeekerError> {
        let init = parse_range(&self.name, "init", &self.init)?;
        let mut options = WebmOptions::new(init).with_epsilon(epsilon);
        if let Some(index) = &self.index {
            options = options.with_index(parse_range(&self.name, "index", index)?);
        }

        Ok(options)
    }
}

fn parse_range(name: &str, field: &str, value: &str) -> Result<ByteRange, SeekerError> {
    value
        .parse()
        .map_err(|e| SeekerError::ConfigError(format!("media '{}': {}: {}", name, field, e)))
}

impl Settings {
    pub fn load(path: &str) -> Result<Settings, SeekerError> {
        let data = fs::read_to_string(path)
            .map_err(|e| SeekerError::ConfigError(format!("read '{}': {}", path, e)))?;
        Settings::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Settings, SeekerError> {
        let settings: Settings =
            toml::from_str(data).map_err(|e| SeekerError::ConfigError(e.to_string()))?;

        if !settings.seek.epsilon.is_finite() || settings.seek.epsilon < 0.0 {
            return Err(SeekerError::ConfigError(format!(
                "seek.epsilon must be a non-negative number, got {}",
                settings.seek.epsilon
            )));
        }

        for (i, media) in settings.media.iter().enumerate() {
            media.location()?;
            media.options(settings.seek.epsilon)?;
            if settings.media[..i].iter().any(|m| m.name == media.name) {
                return Err(SeekerError::ConfigError(format!(
                    "duplicate media name '{}'",
                    media.name
                )));
            }
        }

        Ok(settings)
    }

    pub fn media(&self, name: &str) -> Option<&Media> {
        self.media.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [runtime]
        threads = 2

        [http]
        addr = "127.0.0.1:8090"
        shutdown_timeout = "5s"

        [[media]]
        name = "trailer"
        url = "http://127.0.0.1:8080/trailer.webm"
        init = "0-4095"
        index = "1048576-1050623"

        [[media]]
        name = "local"
        path = "/tmp/local.webm"
        init = "0-"
    "#;

    #[test]
    fn parses_full_config() {
        let settings = Settings::parse(CONFIG).unwrap();
        assert_eq!(settings.runtime.threads, Some(2));
        assert_eq!(settings.http.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(settings.seek.epsilon, DEFAULT_EPSILON);
        assert_eq!(settings.media.len(), 2);

        let options = settings.media("trailer").unwrap().options(0.5).unwrap();
        assert_eq!(options.init, ByteRange::new(0, 4095).unwrap());
        assert_eq!(options.index, Some(ByteRange::new(1048576, 1050623).unwrap()));

        let local = settings.media("local").unwrap();
        assert!(matches!(local.location().unwrap(), Location::Path("/tmp/local.webm")));
        assert!(local.options(0.5).unwrap().init.is_open_ended());
        assert!(settings.media("missing").is_none());
    }

    #[test]
    fn defaults_apply_to_an_empty_file() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings.http.addr, ":8090");
        assert_eq!(settings.http.shutdown_timeout, Duration::from_secs(30));
        assert!(settings.media.is_empty());
    }

    #[test]
    fn rejects_invalid_media() {
        let both = r#"
            [[media]]
            name = "a"
            url = "http://host/a.webm"
            path = "/a.webm"
            init = "0-10"
        "#;
        assert!(matches!(Settings::parse(both), Err(SeekerError::ConfigError(_))));

        let inverted = r#"
            [[media]]
            name = "a"
            path = "/a.webm"
            init = "10-0"
        "#;
        assert!(Settings::parse(inverted).is_err());

        let duplicate = r#"
            [[media]]
            name = "a"
            path = "/a.webm"
            init = "0-10"

            [[media]]
            name = "a"
            path = "/b.webm"
            init = "0-10"
        "#;
        assert!(Settings::parse(duplicate).is_err());
    }

    #[test]
    fn rejects_negative_epsilon() {
        let config = "[seek]\nepsilon = -1.0\n";
        assert!(Settings::parse(config).is_err());
    }
}
