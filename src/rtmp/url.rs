// RTMP URL parsing

use url::Url;

/// Default RTMP port
pub const RTMP_DEFAULT_PORT: u16 = 1935;

/// Parsed rtmp:// URL
#[derive(Clone)]
pub struct RtmpUrl {
    /// Host name or IP address
    pub host: String,

    /// Port
    pub port: u16,

    /// Application name
    pub app: String,

    /// Stream name
    pub stream_name: String,
}

impl RtmpUrl {
    /// Parses an URL of the form rtmp://host[:port]/app/stream_name
    pub fn parse(raw_url: &str) -> Result<RtmpUrl, ()> {
        let parsed = Url::parse(raw_url).map_err(|_| ())?;

        if parsed.scheme() != "rtmp" {
            return Err(());
        }

        let host = match parsed.host_str() {
            Some(h) => h.to_string(),
            None => {
                return Err(());
            }
        };

        let port = parsed.port().unwrap_or(RTMP_DEFAULT_PORT);

        let mut segments = match parsed.path_segments() {
            Some(s) => s,
            None => {
                return Err(());
            }
        };

        let app = match segments.next() {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => {
                return Err(());
            }
        };

        let stream_name = match segments.next() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => {
                return Err(());
            }
        };

        if segments.next().is_some() {
            return Err(());
        }

        Ok(RtmpUrl {
            host,
            port,
            app,
            stream_name,
        })
    }

    /// Gets the stream path: /app/stream_name
    pub fn stream_path(&self) -> String {
        format!("/{}/{}", self.app, self.stream_name)
    }

    /// Gets the tcUrl sent with the connect command
    pub fn tc_url(&self) -> String {
        format!("rtmp://{}:{}/{}", self.host, self.port, self.app)
    }

    /// Gets the address to open the TCP connection to
    pub fn tcp_connect_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_with_port() {
        let url = RtmpUrl::parse("rtmp://127.0.0.1:1935/live/stream0").unwrap();

        assert_eq!(url.host, "127.0.0.1");
        assert_eq!(url.port, 1935);
        assert_eq!(url.app, "live");
        assert_eq!(url.stream_name, "stream0");
        assert_eq!(url.stream_path(), "/live/stream0");
        assert_eq!(url.tc_url(), "rtmp://127.0.0.1:1935/live");
    }

    #[test]
    fn test_parse_url_default_port() {
        let url = RtmpUrl::parse("rtmp://media.example.com/live/abc").unwrap();

        assert_eq!(url.port, RTMP_DEFAULT_PORT);
        assert_eq!(url.tcp_connect_addr(), "media.example.com:1935");
    }

    #[test]
    fn test_parse_url_rejects_bad_urls() {
        assert!(RtmpUrl::parse("http://127.0.0.1/live/stream0").is_err());
        assert!(RtmpUrl::parse("rtmp://127.0.0.1").is_err());
        assert!(RtmpUrl::parse("rtmp://127.0.0.1/live").is_err());
        assert!(RtmpUrl::parse("rtmp://127.0.0.1/live/a/b").is_err());
        assert!(RtmpUrl::parse("not an url").is_err());
    }
}
