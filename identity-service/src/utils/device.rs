//! Device metadata extraction from request headers.

use axum::http::HeaderMap;
use std::net::SocketAddr;

use crate::models::DeviceInfo;

/// Derive session device metadata from the User-Agent header and peer
/// address. Best effort: anything unrecognized is recorded as "unknown".
pub fn device_info_from_request(headers: &HeaderMap, addr: Option<SocketAddr>) -> DeviceInfo {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    // Proxied deployments put the client address in X-Forwarded-For.
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| addr.map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    DeviceInfo {
        device_type: device_type_from_user_agent(user_agent),
        browser: browser_from_user_agent(user_agent),
        ip,
    }
}

fn device_type_from_user_agent(ua: &str) -> String {
    let ua_lower = ua.to_lowercase();
    if ua_lower.contains("ipad") || ua_lower.contains("tablet") {
        "tablet".to_string()
    } else if ua_lower.contains("mobi")
        || ua_lower.contains("android")
        || ua_lower.contains("iphone")
    {
        "mobile".to_string()
    } else if ua.is_empty() {
        "unknown".to_string()
    } else {
        "desktop".to_string()
    }
}

fn browser_from_user_agent(ua: &str) -> String {
    // Order matters: Edge and Opera embed "Chrome", Chrome embeds "Safari".
    if ua.contains("Edg/") {
        "Edge".to_string()
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        "Opera".to_string()
    } else if ua.contains("Firefox/") {
        "Firefox".to_string()
    } else if ua.contains("Chrome/") {
        "Chrome".to_string()
    } else if ua.contains("Safari/") {
        "Safari".to_string()
    } else if ua.is_empty() {
        "unknown".to_string()
    } else {
        "other".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIREFOX_DESKTOP: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Mobile Safari/537.36";

    #[test]
    fn test_firefox_desktop() {
        assert_eq!(browser_from_user_agent(FIREFOX_DESKTOP), "Firefox");
        assert_eq!(device_type_from_user_agent(FIREFOX_DESKTOP), "desktop");
    }

    #[test]
    fn test_chrome_android_is_mobile() {
        assert_eq!(browser_from_user_agent(CHROME_ANDROID), "Chrome");
        assert_eq!(device_type_from_user_agent(CHROME_ANDROID), "mobile");
    }

    #[test]
    fn test_empty_user_agent_is_unknown() {
        assert_eq!(browser_from_user_agent(""), "unknown");
        assert_eq!(device_type_from_user_agent(""), "unknown");
    }

    #[test]
    fn test_forwarded_for_wins_over_peer_addr() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        let info = device_info_from_request(&headers, Some(addr));
        assert_eq!(info.ip, "203.0.113.9");
    }
}
