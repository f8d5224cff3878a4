//! Cookie acceptance filtering.
//!
//! The engine's cookie store calls the registered filter for every cookie
//! set/read attempt; the filter decides from the live settings: the global
//! accept mode, per-pattern overrides matched against the first-party URL,
//! and the third-party whitelist.

use crate::config::{CookieAccept, Settings, SharedSettings};
use crate::engine::{CookieFilter, EngineProfile, FilterRequest};
use std::sync::Arc;
use tracing::debug;

/// Decide whether a cookie request is accepted under the given settings.
pub fn accept_cookie(settings: &Settings, request: &FilterRequest) -> bool {
    let accept = settings
        .cookies
        .accept_for_url(request.first_party_url.as_ref());

    if settings.debug.log_cookies {
        let first_party = request
            .first_party_url
            .as_ref()
            .map_or("<invalid>", |u| u.as_str());
        let origin = request.origin.as_ref().map_or("<unknown>", |u| u.as_str());
        debug!(
            "cookie from origin {origin} on {first_party} (third party: {}) -> applying setting {accept}",
            request.third_party
        );
    }

    match accept {
        CookieAccept::All => true,
        CookieAccept::Never => false,
        CookieAccept::No3rdParty | CookieAccept::NoUnknown3rdParty => {
            if !request.third_party {
                return true;
            }
            // Third-party request: only whitelisted origins get through. An
            // invalid origin fails closed.
            match &request.origin {
                Some(origin) => settings.cookies.is_whitelisted(origin),
                None => false,
            }
        }
    }
}

/// Register the acceptance filter on a profile's cookie store. The filter
/// reads the shared settings on every request, so settings edits take
/// effect immediately.
pub fn install_filter(profile: &dyn EngineProfile, settings: SharedSettings) {
    let filter: CookieFilter = Arc::new(move |request: &FilterRequest| {
        let settings = settings.read().expect("settings lock poisoned");
        accept_cookie(&settings, request)
    });
    profile.cookie_store().set_filter(Some(filter));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AcceptOverride, CookiePolicy};
    use crate::engine::memory::MemoryProfile;
    use crate::urlmatch::UrlPattern;

    fn settings(accept: CookieAccept) -> Settings {
        Settings {
            cookies: CookiePolicy {
                accept,
                ..CookiePolicy::default()
            },
            ..Settings::default()
        }
    }

    fn request(third_party: bool) -> FilterRequest {
        FilterRequest {
            first_party_url: Some("https://example.com".parse().unwrap()),
            origin: None,
            third_party,
        }
    }

    fn thirdparty_request() -> FilterRequest {
        FilterRequest::new("https://example.com", "https://hcaptcha.com", true)
    }

    #[test]
    fn test_accept_cookie() {
        let cases = [
            (CookieAccept::All, false, true),
            (CookieAccept::Never, false, false),
            (CookieAccept::No3rdParty, false, true),
            (CookieAccept::No3rdParty, true, false),
        ];
        for (accept, third_party, accepted) in cases {
            assert_eq!(
                accept_cookie(&settings(accept), &request(third_party)),
                accepted,
                "accept={accept} third_party={third_party}"
            );
        }
    }

    #[test]
    fn test_pattern_override_beats_global() {
        let cases = [
            (CookieAccept::Never, CookieAccept::All, false, true),
            (CookieAccept::All, CookieAccept::Never, false, false),
            (CookieAccept::No3rdParty, CookieAccept::All, true, true),
            (CookieAccept::All, CookieAccept::No3rdParty, true, false),
        ];
        for (global, pattern_setting, third_party, accepted) in cases {
            let mut settings = settings(global);
            settings.cookies.overrides.push(AcceptOverride {
                pattern: UrlPattern::parse("https://*.example.com").unwrap(),
                accept: pattern_setting,
            });
            assert_eq!(
                accept_cookie(&settings, &request(third_party)),
                accepted,
                "global={global} pattern={pattern_setting} third_party={third_party}"
            );
        }
    }

    #[test]
    fn test_invalid_first_party_url_falls_back_to_global() {
        // Iframes can produce cookie requests with an empty first-party URL.
        for (global, accepted) in [(CookieAccept::Never, false), (CookieAccept::All, true)] {
            let request = FilterRequest {
                first_party_url: None,
                origin: None,
                third_party: false,
            };
            assert_eq!(accept_cookie(&settings(global), &request), accepted);
        }
    }

    #[test]
    fn test_thirdparty_blocked_without_whitelist() {
        let settings = settings(CookieAccept::No3rdParty);
        assert!(!accept_cookie(&settings, &thirdparty_request()));
    }

    #[test]
    fn test_thirdparty_allowed_with_whitelist() {
        let mut settings = settings(CookieAccept::No3rdParty);
        settings
            .cookies
            .thirdparty_whitelist
            .push(UrlPattern::parse("*://hcaptcha.com/*").unwrap());
        assert!(accept_cookie(&settings, &thirdparty_request()));
    }

    #[test]
    fn test_thirdparty_allowed_with_subdomain_pattern() {
        let mut settings = settings(CookieAccept::No3rdParty);
        settings
            .cookies
            .thirdparty_whitelist
            .push(UrlPattern::parse("*://*.hcaptcha.com/*").unwrap());
        let mut request = thirdparty_request();
        request.origin = Some("https://accounts.hcaptcha.com".parse().unwrap());
        assert!(accept_cookie(&settings, &request));
    }

    #[test]
    fn test_thirdparty_blocked_when_not_matching() {
        let mut settings = settings(CookieAccept::No3rdParty);
        settings
            .cookies
            .thirdparty_whitelist
            .push(UrlPattern::parse("*://*.hcaptcha.com/*").unwrap());
        let mut request = thirdparty_request();
        request.origin = Some("https://tracker.example.net".parse().unwrap());
        assert!(!accept_cookie(&settings, &request));
    }

    #[test]
    fn test_firstparty_unaffected_by_whitelist() {
        let settings = settings(CookieAccept::No3rdParty);
        let mut request = thirdparty_request();
        request.third_party = false;
        assert!(accept_cookie(&settings, &request));
    }

    #[test]
    fn test_whitelist_ignored_when_accept_all() {
        let settings = settings(CookieAccept::All);
        assert!(accept_cookie(&settings, &thirdparty_request()));
    }

    #[test]
    fn test_whitelist_cannot_override_never() {
        let mut settings = settings(CookieAccept::Never);
        settings
            .cookies
            .thirdparty_whitelist
            .push(UrlPattern::parse("*://hcaptcha.com/*").unwrap());
        assert!(!accept_cookie(&settings, &thirdparty_request()));
    }

    #[test]
    fn test_invalid_origin_url_fails_closed() {
        let mut settings = settings(CookieAccept::No3rdParty);
        settings
            .cookies
            .thirdparty_whitelist
            .push(UrlPattern::parse("*://hcaptcha.com/*").unwrap());
        let mut request = thirdparty_request();
        request.origin = None;
        assert!(!accept_cookie(&settings, &request));
    }

    #[test]
    fn test_whitelist_with_no_unknown_3rdparty() {
        let mut settings = settings(CookieAccept::NoUnknown3rdParty);
        settings
            .cookies
            .thirdparty_whitelist
            .push(UrlPattern::parse("*://hcaptcha.com/*").unwrap());
        assert!(accept_cookie(&settings, &thirdparty_request()));
    }

    #[test]
    fn test_install_filter_reads_live_settings() {
        let profile = MemoryProfile::new();
        let shared = settings(CookieAccept::Never).into_shared();
        install_filter(&profile, Arc::clone(&shared));

        let store = profile.memory_store();
        assert!(store.has_filter());
        assert!(!store.would_accept(&request(false)));

        shared.write().unwrap().cookies.accept = CookieAccept::All;
        assert!(store.would_accept(&request(false)));
    }
}
