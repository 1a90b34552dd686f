//! JDBC-style connection descriptors
//!
//! Accepted shapes:
//!
//! - `jdbc://host:port/catalog/schema?user=alice`
//! - `jdbc:trino://host:port/catalog/schema?user=alice&https=true`
//! - `jdbc:presto://host:port/catalog/schema?user=alice&ssl=1`

use std::collections::BTreeMap;
use std::fmt;

use reqwest::Url;
use tracing::debug;

use super::WarehouseError;

const TLS_FLAGS: &[&str] = &["https", "ssl", "tls", "httpScheme"];
const TLS_TRUE: &[&str] = &["1", "true", "yes", "https"];

/// Where and as whom to reach the warehouse
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub user: String,
    pub password: Option<String>,
    pub tls: bool,
    pub session_properties: BTreeMap<String, String>,
}

impl ConnectionDescriptor {
    pub fn parse(raw: &str) -> Result<Self, WarehouseError> {
        debug!("ConnectionDescriptor::parse: called");
        if raw.trim().is_empty() {
            return Err(WarehouseError::Validation("empty connection URL".to_string()));
        }

        let mut url = Url::parse(raw.trim()).map_err(|e| WarehouseError::Validation(e.to_string()))?;
        if url.scheme() != "jdbc" {
            return Err(WarehouseError::Validation(format!(
                "unsupported scheme '{}', expected jdbc",
                url.scheme()
            )));
        }

        if url.host_str().is_none() {
            url = unwrap_driver_prefix(&url)?.unwrap_or(url);
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| WarehouseError::Validation("URL must contain a host".to_string()))?
            .to_string();

        let mut path = url.path().split('/').filter(|p| !p.is_empty());
        let catalog = path.next().map(str::to_string);
        let schema_from_path = path.next().map(str::to_string);

        let params = QueryParams::from_url(&url);
        let user = params
            .first("user")
            .or_else(|| params.first("username"))
            .ok_or_else(|| WarehouseError::Validation("URL must contain a user parameter".to_string()))?;
        let tls = TLS_FLAGS
            .iter()
            .find_map(|flag| params.first(flag))
            .is_some_and(|v| TLS_TRUE.contains(&v.to_lowercase().as_str()));

        Ok(Self {
            host,
            port: url.port().unwrap_or(if tls { 443 } else { 8080 }),
            catalog,
            schema: params.first("schema").or(schema_from_path),
            user,
            password: params.first("password"),
            tls,
            session_properties: params
                .first("sessionProperties")
                .map(|raw| parse_session_properties(&raw))
                .unwrap_or_default(),
        })
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls { "https" } else { "http" }
    }

    /// `scheme://host:port` of the coordinator
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

// password stays out of logs
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("tls", &self.tls)
            .field("session_properties", &self.session_properties)
            .finish()
    }
}

/// `jdbc:trino://rest` and `jdbc:presto://rest` become `jdbc://rest`
fn unwrap_driver_prefix(url: &Url) -> Result<Option<Url>, WarehouseError> {
    let path = url.path();
    let lowered = path.to_lowercase();
    for prefix in ["trino://", "presto://"] {
        if lowered.starts_with(prefix) {
            let mut rebuilt = format!("jdbc://{}", &path[prefix.len()..]);
            if let Some(query) = url.query() {
                rebuilt.push('?');
                rebuilt.push_str(query);
            }
            return Url::parse(&rebuilt)
                .map(Some)
                .map_err(|e| WarehouseError::Validation(e.to_string()));
        }
    }
    Ok(None)
}

fn parse_session_properties(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// Query parameters in order; the first value of a key wins
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn from_url(url: &Url) -> Self {
        Self(url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect())
    }

    fn first(&self, key: &str) -> Option<String> {
        self.0
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_url() {
        let d = ConnectionDescriptor::parse("jdbc://example.com:8080/sample_catalog/sample_schema?user=alice").unwrap();
        assert_eq!(d.host, "example.com");
        assert_eq!(d.port, 8080);
        assert_eq!(d.catalog.as_deref(), Some("sample_catalog"));
        assert_eq!(d.schema.as_deref(), Some("sample_schema"));
        assert_eq!(d.user, "alice");
        assert!(!d.tls);
        assert_eq!(d.base_url(), "http://example.com:8080");
    }

    #[test]
    fn test_parse_driver_prefixed_urls() {
        for raw in [
            "jdbc:trino://example.com:8443/sample_catalog/sample_schema?user=alice&https=true",
            "jdbc:presto://example.com:8443/sample_catalog/sample_schema?user=alice&ssl=1",
            "JDBC:TRINO://example.com:8443/sample_catalog/sample_schema?user=alice&tls=YES",
        ] {
            let d = ConnectionDescriptor::parse(raw).unwrap();
            assert_eq!(d.host, "example.com", "{raw}");
            assert_eq!(d.port, 8443);
            assert_eq!(d.catalog.as_deref(), Some("sample_catalog"));
            assert_eq!(d.schema.as_deref(), Some("sample_schema"));
            assert_eq!(d.user, "alice");
            assert_eq!(d.scheme(), "https");
        }
    }

    #[test]
    fn test_default_ports() {
        let d = ConnectionDescriptor::parse("jdbc://h/c?user=u").unwrap();
        assert_eq!(d.port, 8080);
        assert_eq!(d.schema, None);

        let d = ConnectionDescriptor::parse("jdbc://h/c?user=u&httpScheme=https").unwrap();
        assert_eq!(d.port, 443);
    }

    #[test]
    fn test_query_parameters() {
        let d = ConnectionDescriptor::parse(
            "jdbc://h:1/c/path_schema?username=bob&password=pw&schema=qs&sessionProperties=a=1,b = 2,bad",
        )
        .unwrap();
        assert_eq!(d.user, "bob");
        assert_eq!(d.password.as_deref(), Some("pw"));
        assert_eq!(d.schema.as_deref(), Some("qs"));
        assert_eq!(d.session_properties.get("a").map(String::as_str), Some("1"));
        assert_eq!(d.session_properties.get("b").map(String::as_str), Some("2"));
        assert_eq!(d.session_properties.len(), 2);
        assert!(!format!("{:?}", d).contains("pw"));
    }

    #[test]
    fn test_tls_flag_values() {
        let d = ConnectionDescriptor::parse("jdbc://h/c?user=u&ssl=false").unwrap();
        assert!(!d.tls);
        // first present flag decides
        let d = ConnectionDescriptor::parse("jdbc://h/c?user=u&https=no&ssl=true").unwrap();
        assert!(!d.tls);
    }

    #[test]
    fn test_invalid_urls() {
        for raw in [
            "",
            "   ",
            "http://h:8080/c?user=u",
            "jdbc://h:8080/c",
            "jdbc:mysql://h:3306/c?user=u",
            "not a url",
        ] {
            assert!(
                matches!(ConnectionDescriptor::parse(raw), Err(WarehouseError::Validation(_))),
                "{raw:?}"
            );
        }
    }
}
