//! Robots.txt parser implementation
//!
//! Matching is delegated to the robotstxt crate; `Crawl-delay` is not part of
//! that crate's API and is read from the raw groups here.

use robotstxt::DefaultMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    AllowAll,
    DenyAll,
    Rules,
}

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content
    content: String,
    verdict: Verdict,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            verdict: Verdict::Rules,
        }
    }

    /// Creates a permissive policy (e.g. robots.txt answered 404)
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            verdict: Verdict::AllowAll,
        }
    }

    /// Creates a policy that forbids everything (e.g. robots.txt answered 401/403)
    pub fn deny_all() -> Self {
        Self {
            content: String::new(),
            verdict: Verdict::DenyAll,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self.verdict {
            Verdict::AllowAll => true,
            Verdict::DenyAll => false,
            Verdict::Rules if self.content.trim().is_empty() => true,
            Verdict::Rules => {
                // The matcher compares against the bare product token
                let token = product_token(user_agent);
                let agent = if token.is_empty() { user_agent } else { token.as_str() };
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(&self.content, agent, url)
            }
        }
    }

    /// Gets the crawl delay (seconds) that applies to the given user agent
    ///
    /// A group naming the agent's product token wins over the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.verdict != Verdict::Rules {
            return None;
        }

        let token = product_token(user_agent);
        let mut group: Vec<String> = Vec::new();
        let mut group_open = false;
        let mut wildcard = None;
        let mut specific = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // Consecutive User-agent lines share one group
                    if !group_open {
                        group.clear();
                        group_open = true;
                    }
                    group.push(value.to_ascii_lowercase());
                }
                "crawl-delay" => {
                    group_open = false;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if group.iter().any(|agent| !token.is_empty() && *agent == token) {
                        specific = Some(delay);
                    } else if group.iter().any(|agent| agent == "*") {
                        wildcard = Some(delay);
                    }
                }
                _ => group_open = false,
            }
        }

        specific.or(wildcard)
    }
}

/// Lowercased leading product token of a user agent ("Mozilla/5.0 (...)" → "mozilla")
fn product_token(user_agent: &str) -> String {
    user_agent
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSER: &str = "Mozilla/5.0 (X11; Linux x86_64) Chrome/122.0.0.0 Safari/537.36";

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed("https://portal.test/", BROWSER));
        assert!(robots.is_allowed("https://portal.test/admin", BROWSER));
    }

    #[test]
    fn test_deny_all() {
        let robots = ParsedRobots::deny_all();
        assert!(!robots.is_allowed("https://portal.test/", BROWSER));
    }

    #[test]
    fn test_parse_disallow_all() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed("https://portal.test/", BROWSER));
        assert!(!robots.is_allowed("https://portal.test/schemes", BROWSER));
    }

    #[test]
    fn test_parse_disallow_specific() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /admin");
        assert!(robots.is_allowed("https://portal.test/", BROWSER));
        assert!(!robots.is_allowed("https://portal.test/admin/users", BROWSER));
    }

    #[test]
    fn test_specific_agent_group() {
        let content = "User-agent: Mozilla\nDisallow: /\n\nUser-agent: *\nAllow: /";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed("https://portal.test/page", BROWSER));
        assert!(robots.is_allowed("https://portal.test/page", "OtherBot/1.0"));
    }

    #[test]
    fn test_empty_content_allows() {
        let robots = ParsedRobots::from_content("");
        assert!(robots.is_allowed("https://portal.test/any", BROWSER));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: 10\nDisallow: /admin");
        assert_eq!(robots.crawl_delay(BROWSER), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_specific_beats_wildcard() {
        let content = "User-agent: *\nCrawl-delay: 10\n\nUser-agent: mozilla\nCrawl-delay: 2.5";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay(BROWSER), Some(2.5));
        assert_eq!(robots.crawl_delay("OtherBot/1.0"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_multiple_agents_in_group() {
        let content = "User-agent: BotA\nUser-agent: BotB\nCrawl-delay: 3";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("BotA/1.0"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotB"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotC"), None);
    }

    #[test]
    fn test_no_crawl_delay() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /admin");
        assert_eq!(robots.crawl_delay(BROWSER), None);
        assert_eq!(ParsedRobots::deny_all().crawl_delay(BROWSER), None);
    }
}
