use http::header::{
    HeaderMap, HeaderName, CONNECTION, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE,
    TRANSFER_ENCODING, UPGRADE,
};
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;

use crate::ProxyBody;

/// Connection-scoped headers must not travel to the upstream (RFC 9110
/// section 7.6.1). Headers nominated by `Connection` count as hop-by-hop too.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let nominated: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in nominated {
        headers.remove(name);
    }
    for name in [CONNECTION, TE, TRANSFER_ENCODING, UPGRADE, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION] {
        headers.remove(name);
    }
}

pub fn full_body(bytes: impl Into<Bytes>) -> ProxyBody {
    Full::new(bytes.into()).map_err(|never| match never {}).boxed()
}

pub fn empty_body() -> ProxyBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_hop_by_hop_removes_listed_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, "keep-alive".parse().unwrap());
        headers.insert(TE, "trailers".parse().unwrap());
        headers.insert(TRANSFER_ENCODING, "chunked".parse().unwrap());
        headers.insert(UPGRADE, "websocket".parse().unwrap());
        headers.insert("host", "example.com".parse().unwrap());
        headers.insert("x-request-id", "abc".parse().unwrap());

        strip_hop_by_hop(&mut headers);

        assert!(!headers.contains_key(CONNECTION));
        assert!(!headers.contains_key(TE));
        assert!(!headers.contains_key(TRANSFER_ENCODING));
        assert!(!headers.contains_key(UPGRADE));
        // end-to-end headers survive, Host included
        assert!(headers.contains_key("host"));
        assert!(headers.contains_key("x-request-id"));
    }

    #[test]
    fn test_strip_hop_by_hop_removes_connection_nominated() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, "close, X-Per-Hop".parse().unwrap());
        headers.insert("x-per-hop", "1".parse().unwrap());
        headers.insert("x-kept", "1".parse().unwrap());

        strip_hop_by_hop(&mut headers);

        assert!(!headers.contains_key("x-per-hop"));
        assert!(headers.contains_key("x-kept"));
    }
}
