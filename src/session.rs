// src/session.rs

//! The compute session the transform core runs in: a named rayon pool.

use rayon::{ThreadPool, ThreadPoolBuilder};
use sysinfo::System;
use tracing::{info, warn};

use crate::error::SessionError;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub name: String,
    /// Worker threads; 0 means one per logical core.
    pub concurrency: usize,
    /// Memory budget such as `512m` or `2g`.
    pub memory_hint: String,
}

pub struct Session {
    name: String,
    pool: ThreadPool,
}

impl Session {
    /// Build the worker pool. Any failure here is fatal to the pipeline.
    pub fn start(cfg: &SessionConfig) -> Result<Self, SessionError> {
        let memory_hint_bytes = parse_memory_hint(&cfg.memory_hint)?;

        let prefix = cfg.name.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(cfg.concurrency)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()
            .map_err(|source| SessionError::ThreadPool {
                name: cfg.name.clone(),
                source,
            })?;

        let mut sys = System::new();
        sys.refresh_memory();
        let available = sys.available_memory();
        if available > 0 && memory_hint_bytes > available {
            warn!(
                session = %cfg.name,
                hint_bytes = memory_hint_bytes,
                available_bytes = available,
                "memory hint exceeds currently available memory"
            );
        }

        info!(
            session = %cfg.name,
            threads = pool.current_num_threads(),
            memory_hint_bytes,
            "session started"
        );
        Ok(Self {
            name: cfg.name.clone(),
            pool,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the pool; rayon parallel iterators in `op` use it.
    pub fn run<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Tear the pool down. Worker threads exit once queued work drains.
    pub fn shutdown(self) {
        info!(session = %self.name, "session stopped");
        drop(self.pool);
    }
}

/// Parse `2g`, `512m`, `64k`, `1t` or a plain byte count (case-insensitive,
/// optional trailing `b`).
pub fn parse_memory_hint(hint: &str) -> Result<u64, SessionError> {
    let invalid = || SessionError::InvalidMemoryHint(hint.to_string());
    let s = hint.trim().to_ascii_lowercase();
    let s = s.strip_suffix('b').unwrap_or(&s);
    let (digits, shift) = match s.chars().last() {
        Some('k') => (&s[..s.len() - 1], 10),
        Some('m') => (&s[..s.len() - 1], 20),
        Some('g') => (&s[..s.len() - 1], 30),
        Some('t') => (&s[..s.len() - 1], 40),
        Some(c) if c.is_ascii_digit() => (s, 0),
        _ => return Err(invalid()),
    };
    let n: u64 = digits.trim().parse().map_err(|_| invalid())?;
    n.checked_mul(1u64 << shift).ok_or_else(invalid)
}
