use rand::Rng;
use std::time::Duration;

/// Outbound header identity used for one acquisition attempt.
///
/// Rotated between attempts so repeated failures don't present an
/// identical fingerprint to the upstream service.
#[derive(Debug, Clone, Copy)]
pub struct RequestProfile {
    pub user_agent: &'static str,
    pub accept_language: &'static str,
}

pub const REFERER: &str = "https://www.youtube.com/";

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-US,en;q=0.8",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.9,es;q=0.6",
];

/// Draw a fresh profile. Pure over the supplied random source so tests
/// can seed it.
pub fn pick_profile<R: Rng + ?Sized>(rng: &mut R) -> RequestProfile {
    RequestProfile {
        user_agent: USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())],
        accept_language: ACCEPT_LANGUAGES[rng.gen_range(0..ACCEPT_LANGUAGES.len())],
    }
}

/// Base delay plus uniform random jitter, applied between strategy
/// attempts to break up correlated failure patterns.
pub fn jittered_delay<R: Rng + ?Sized>(base_ms: u64, jitter_ms: u64, rng: &mut R) -> Duration {
    let jitter = if jitter_ms > 0 {
        rng.gen_range(0..jitter_ms)
    } else {
        0
    };
    Duration::from_millis(base_ms + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_profile_comes_from_pools() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let profile = pick_profile(&mut rng);
            assert!(USER_AGENTS.contains(&profile.user_agent));
            assert!(ACCEPT_LANGUAGES.contains(&profile.accept_language));
        }
    }

    #[test]
    fn test_profiles_vary_across_draws() {
        let mut rng = StdRng::seed_from_u64(7);
        let agents: std::collections::HashSet<_> =
            (0..50).map(|_| pick_profile(&mut rng).user_agent).collect();
        assert!(agents.len() > 1, "rotation should produce varied agents");
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let delay = jittered_delay(200, 400, &mut rng);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay < Duration::from_millis(600));
        }
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(jittered_delay(250, 0, &mut rng), Duration::from_millis(250));
    }
}
