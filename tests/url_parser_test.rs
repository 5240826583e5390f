//! Tests for short code extraction.

use mockito::Matcher;
use terabox_link::error::ResolveError;
use terabox_link::url_parser::{match_short_code, ShortCodeExtractor};
use terabox_link::ResolverConfig;

mod param_style {
    use super::*;

    #[test]
    fn sharing_link() {
        let url = "https://www.terabox.com/sharing/link?surl=abc123XYZ-_def";
        assert_eq!(match_short_code(url).unwrap(), "abc123XYZ-_def");
    }

    #[test]
    fn wap_filelist() {
        let url = "https://www.terabox.app/wap/share/filelist?surl=abc123XYZ";
        assert_eq!(match_short_code(url).unwrap(), "abc123XYZ");
    }

    #[test]
    fn param_not_first() {
        let url = "https://www.terabox.com/sharing/link?lang=en&surl=abc123XYZ";
        assert_eq!(match_short_code(url).unwrap(), "abc123XYZ");
    }

    #[test]
    fn http_scheme() {
        let url = "http://terabox.com/sharing/link?surl=abc123XYZ";
        assert_eq!(match_short_code(url).unwrap(), "abc123XYZ");
    }
}

mod path_style {
    use super::*;

    #[test]
    fn basic_path() {
        let url = "https://www.terabox.com/s/1abc123XYZ";
        assert_eq!(match_short_code(url).unwrap(), "abc123XYZ");
    }

    #[test]
    fn mirror_domain() {
        let url = "https://www.1024tera.com/s/1abc123XYZ";
        assert_eq!(match_short_code(url).unwrap(), "abc123XYZ");
    }

    #[test]
    fn path_with_query() {
        let url = "https://www.terabox.com/s/1abc123XYZ?pwd=1234";
        assert_eq!(match_short_code(url).unwrap(), "abc123XYZ");
    }
}

mod prefixed_path_style {
    use super::*;

    #[test]
    fn wap_prefix() {
        let url = "https://www.terabox.app/wap/s/1abc123XYZ";
        assert_eq!(match_short_code(url).unwrap(), "abc123XYZ");
    }

    #[test]
    fn embed_prefix() {
        let url = "https://www.terabox.com/sharing/embed/1abc123XYZ";
        assert_eq!(match_short_code(url).unwrap(), "abc123XYZ");
    }
}

mod equivalent_inputs {
    use super::*;

    #[test]
    fn superficial_formatting_is_ignored() {
        let inputs = [
            "https://www.terabox.com/s/1abc123XYZ",
            "https://www.terabox.com/s/1abc123XYZ/",
            "https://www.terabox.com/s/1abc123XYZ#top",
            "  https://www.terabox.app/wap/s/1abc123XYZ/  ",
            "https://www.terabox.com/sharing/link?surl=abc123XYZ&lang=en",
            "https://www.terabox.com/sharing/link?lang=en&surl=abc123XYZ",
            "https://www.terabox.com/sharing/link?surl=abc123XYZ/",
        ];
        for input in inputs {
            assert_eq!(match_short_code(input).as_deref(), Some("abc123XYZ"), "input: {}", input);
        }
    }
}

mod invalid_inputs {
    use super::*;

    #[test]
    fn empty_string() {
        assert!(match_short_code("").is_none());
    }

    #[test]
    fn whitespace_only() {
        assert!(match_short_code("   ").is_none());
        assert!(match_short_code("\t\n").is_none());
    }

    #[test]
    fn foreign_url() {
        assert!(match_short_code("https://example.com/folder/123").is_none());
    }

    #[test]
    fn path_without_share_marker() {
        assert!(match_short_code("https://www.terabox.com/main").is_none());
    }

    #[test]
    fn invalid_characters() {
        assert!(match_short_code("abc 123").is_none());
        assert!(match_short_code("abc@123").is_none());
    }

    #[tokio::test]
    async fn not_a_url() {
        let extractor = ShortCodeExtractor::new(&ResolverConfig::default()).unwrap();
        let err = extractor.extract("definitely not a link").await.unwrap_err();
        assert!(matches!(err, ResolveError::NoShortCode(_)));
    }
}

mod redirect_probe {
    use super::*;

    #[tokio::test]
    async fn code_found_after_redirect() {
        let mut server = mockito::Server::new_async().await;
        let target = format!("{}/sharing/link?surl=abc123XYZ", server.url());

        let short = server
            .mock("GET", "/xyz")
            .with_status(302)
            .with_header("location", &target)
            .expect(1)
            .create_async()
            .await;
        let landing = server
            .mock("GET", "/sharing/link")
            .match_query(Matcher::UrlEncoded("surl".into(), "abc123XYZ".into()))
            .with_status(200)
            .with_body("<html></html>")
            .create_async()
            .await;

        let extractor = ShortCodeExtractor::new(&ResolverConfig::default()).unwrap();
        let url = format!("{}/xyz", server.url());
        let share = extractor.extract(&url).await.unwrap();

        assert_eq!(share.short_code(), "abc123XYZ");
        assert_eq!(share.raw_url(), url);
        short.assert_async().await;
        landing.assert_async().await;
    }

    #[tokio::test]
    async fn literal_match_skips_probe() {
        let mut server = mockito::Server::new_async().await;
        let probe = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let extractor = ShortCodeExtractor::new(&ResolverConfig::default()).unwrap();
        let url = format!("{}/s/1abc123XYZ", server.url());
        let share = extractor.extract(&url).await.unwrap();

        assert_eq!(share.short_code(), "abc123XYZ");
        probe.assert_async().await;
    }

    #[tokio::test]
    async fn no_code_after_redirect() {
        let mut server = mockito::Server::new_async().await;
        let _landing = server
            .mock("GET", "/landing")
            .with_status(200)
            .with_body("nothing to see")
            .create_async()
            .await;

        let extractor = ShortCodeExtractor::new(&ResolverConfig::default()).unwrap();
        let err = extractor
            .extract(&format!("{}/landing", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoShortCode(_)));
    }

    #[tokio::test]
    async fn probe_failure_folds_into_no_short_code() {
        let extractor = ShortCodeExtractor::new(&ResolverConfig::default()).unwrap();
        let err = extractor
            .extract("http://127.0.0.1:9/unreachable")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoShortCode(_)));
    }
}
