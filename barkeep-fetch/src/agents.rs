//! User-agent rotation.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Desktop browser user agents sent to the retailer.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

/// Pool of user agents, optionally rotated per request.
///
/// With rotation disabled the first agent is always used.
#[derive(Debug)]
pub struct UserAgentPool {
    agents: Vec<String>,
    rotate: bool,
    rng: Mutex<StdRng>,
}

impl UserAgentPool {
    /// Creates a pool over the given agents.
    ///
    /// An empty list falls back to [`DEFAULT_USER_AGENTS`].
    pub fn new(agents: Vec<String>, rotate: bool) -> Self {
        let agents = if agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(ToString::to_string).collect()
        } else {
            agents
        };
        Self {
            agents,
            rotate,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a pool over [`DEFAULT_USER_AGENTS`].
    pub fn with_defaults(rotate: bool) -> Self {
        Self::new(Vec::new(), rotate)
    }

    /// Returns true if agents are rotated.
    pub fn rotates(&self) -> bool {
        self.rotate
    }

    /// Returns every agent in the pool.
    pub fn agents(&self) -> &[String] {
        &self.agents
    }

    /// Picks the agent for the next request.
    pub fn pick(&self) -> &str {
        if !self.rotate || self.agents.len() == 1 {
            return &self.agents[0];
        }
        let index = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .gen_range(0..self.agents.len());
        &self.agents[index]
    }
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self::with_defaults(true)
    }
}
