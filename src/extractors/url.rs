use crate::extractors::domain::tld_of;
use crate::extractors::SignalExtractor;
use crate::facts::{names, FactMap};
use crate::message::{Enrichment, RawEmail};
use regex::Regex;
use std::collections::HashSet;
use url::{Host, Url};

/// Each link counts in exactly one class, most damaging first, so the
/// per-class facts never double count a single URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkClass {
    IpLiteral,
    Homograph,
    SuspiciousTld,
    Shortener,
    Plain,
}

/// Link-level signals: how many links, and how many of them point at
/// shorteners, abuse-heavy TLDs, raw IPs or lookalike (punycode) hosts.
pub struct UrlExtractor {
    href_regex: Regex,
    bare_url_regex: Regex,
    suspicious_tlds: HashSet<String>,
    shortener_domains: HashSet<String>,
}

impl UrlExtractor {
    pub fn new(suspicious_tlds: &[String], shortener_domains: &[String]) -> Self {
        Self {
            href_regex: Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).unwrap(),
            bare_url_regex: Regex::new(r#"(?i)\bhttps?://[^\s<>"')\]]+"#).unwrap(),
            suspicious_tlds: suspicious_tlds.iter().map(|t| t.to_lowercase()).collect(),
            shortener_domains: shortener_domains.iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    fn collect_urls(&self, email: &RawEmail) -> Vec<String> {
        let mut urls = Vec::new();

        if let Some(body) = &email.body {
            for cap in self.href_regex.captures_iter(body) {
                if let Some(url) = cap.get(1) {
                    urls.push(url.as_str().to_string());
                }
            }
            for m in self.bare_url_regex.find_iter(body) {
                urls.push(m.as_str().trim_end_matches(|c| c == '.' || c == ',').to_string());
            }
        }

        urls.sort();
        urls.dedup();
        urls
    }

    fn classify(&self, raw: &str) -> Option<LinkClass> {
        let parsed = Url::parse(raw).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }

        let host = match parsed.host() {
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => return Some(LinkClass::IpLiteral),
            Some(Host::Domain(domain)) => domain.to_lowercase(),
            None => return None,
        };

        if host.split('.').any(|label| label.starts_with("xn--"))
            || !host.is_ascii()
        {
            return Some(LinkClass::Homograph);
        }

        if let Some(tld) = tld_of(&host) {
            if self.suspicious_tlds.contains(&tld) {
                return Some(LinkClass::SuspiciousTld);
            }
        }

        if self.shortener_domains.contains(&host) {
            return Some(LinkClass::Shortener);
        }

        Some(LinkClass::Plain)
    }
}

impl SignalExtractor for UrlExtractor {
    fn name(&self) -> &str {
        "url"
    }

    fn extract(&self, email: &RawEmail, _enrichment: &Enrichment, facts: &mut FactMap) {
        let urls = self.collect_urls(email);

        let mut total = 0usize;
        let mut suspicious_tld = 0usize;
        let mut shortener = 0usize;
        let mut ip_literal = 0usize;
        let mut homograph = 0usize;

        for url in &urls {
            let class = match self.classify(url) {
                Some(class) => class,
                None => {
                    log::debug!("skipping unparseable link: {url}");
                    continue;
                }
            };
            total += 1;
            match class {
                LinkClass::IpLiteral => ip_literal += 1,
                LinkClass::Homograph => homograph += 1,
                LinkClass::SuspiciousTld => suspicious_tld += 1,
                LinkClass::Shortener => shortener += 1,
                LinkClass::Plain => {}
            }
        }

        facts.insert(names::URL_COUNT, total);
        facts.insert(names::SUSPICIOUS_TLD_COUNT, suspicious_tld);
        facts.insert(names::SHORTENER_URL_COUNT, shortener);
        facts.insert(names::IP_LITERAL_URL_COUNT, ip_literal);
        facts.insert(names::HOMOGRAPH_URL_COUNT, homograph);
    }
}
