use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::spam::{Severity, SpamCheckResult, SpamKeyword, SpamPattern};
use crate::infra::db::Db;

// Severity-to-score constants. Fixed, not tunable: downstream consumers and
// tests depend on the exact values.
const KEYWORD_SCORE_HIGH: f64 = 1.0;
const KEYWORD_SCORE_MEDIUM: f64 = 0.7;
const KEYWORD_SCORE_LOW: f64 = 0.4;
const PATTERN_SCORE_HIGH: f64 = 0.9;
const PATTERN_SCORE_MEDIUM: f64 = 0.6;
const PATTERN_SCORE_LOW: f64 = 0.3;
const LINK_FLOOD_SCORE: f64 = 0.8;
const REPEATED_CHAR_SCORE: f64 = 0.6;
const REPEATED_WORD_SCORE: f64 = 0.5;
const CAPS_SCORE: f64 = 0.4;

const MAX_LINKS: usize = 3;
const REPEATED_CHAR_RUN: usize = 10;
const REPEATED_WORD_MIN_LEN: usize = 3;
const REPEATED_WORD_COUNT: usize = 5;
const CAPS_MIN_LENGTH: usize = 20;
const CAPS_RATIO: f64 = 0.7;

fn link_regex() -> &'static Regex {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    LINK_RE.get_or_init(|| Regex::new(r"https?://\S+").expect("link regex"))
}

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug, Clone)]
pub struct CompiledKeyword {
    pub keyword: String,
    pub severity: Severity,
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub name: String,
    pub regex: Regex,
    pub severity: Severity,
}

/// The active keyword and pattern lists, lowercased/compiled and ready to
/// evaluate against.
#[derive(Debug, Clone, Default)]
pub struct SpamConfig {
    pub keywords: Vec<CompiledKeyword>,
    pub patterns: Vec<CompiledPattern>,
}

/// Single-slot, time-expiring cache for the spam configuration. The clock is
/// injected so expiry is testable without sleeping.
pub struct SpamConfigCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<(OffsetDateTime, Arc<SpamConfig>)>>,
}

impl SpamConfigCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    pub fn get(&self) -> Option<Arc<SpamConfig>> {
        let slot = self.slot.lock().expect("spam config cache poisoned");
        let (loaded_at, config) = slot.as_ref()?;
        if self.clock.now() - *loaded_at >= self.ttl {
            return None;
        }
        Some(Arc::clone(config))
    }

    pub fn store(&self, config: Arc<SpamConfig>) {
        let mut slot = self.slot.lock().expect("spam config cache poisoned");
        *slot = Some((self.clock.now(), config));
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().expect("spam config cache poisoned");
        *slot = None;
    }
}

#[derive(Clone)]
pub struct SpamService {
    db: Db,
    cache: Arc<SpamConfigCache>,
}

impl SpamService {
    pub fn new(db: Db, cache: Arc<SpamConfigCache>) -> Self {
        Self { db, cache }
    }

    /// Classify one outgoing message. Fails open: if the configuration
    /// cannot be fetched the message is treated as clean rather than
    /// blocking legitimate traffic.
    pub async fn check(&self, content: &str, sender_id: Uuid) -> SpamCheckResult {
        match self.config().await {
            Ok(config) => evaluate(content, &config),
            Err(err) => {
                tracing::warn!(
                    error = ?err,
                    sender_id = %sender_id,
                    "spam configuration unavailable, allowing message"
                );
                SpamCheckResult::clean()
            }
        }
    }

    pub fn invalidate_config(&self) {
        self.cache.invalidate();
    }

    async fn config(&self) -> Result<Arc<SpamConfig>> {
        if let Some(config) = self.cache.get() {
            return Ok(config);
        }
        let config = Arc::new(self.load_config().await?);
        self.cache.store(Arc::clone(&config));
        Ok(config)
    }

    async fn load_config(&self) -> Result<SpamConfig> {
        let keyword_rows =
            sqlx::query("SELECT keyword, severity FROM spam_keywords WHERE is_active = true")
                .fetch_all(self.db.pool())
                .await?;
        let mut keywords = Vec::with_capacity(keyword_rows.len());
        for row in keyword_rows {
            let keyword: String = row.get("keyword");
            let severity: String = row.get("severity");
            let Some(severity) = Severity::from_db(&severity) else {
                tracing::warn!(keyword = %keyword, severity = %severity, "skipping keyword with unknown severity");
                continue;
            };
            keywords.push(CompiledKeyword {
                keyword: keyword.to_lowercase(),
                severity,
            });
        }

        let pattern_rows = sqlx::query(
            "SELECT name, pattern, severity FROM spam_patterns WHERE is_active = true",
        )
        .fetch_all(self.db.pool())
        .await?;
        let mut patterns = Vec::with_capacity(pattern_rows.len());
        for row in pattern_rows {
            let name: String = row.get("name");
            let pattern: String = row.get("pattern");
            let severity: String = row.get("severity");
            let Some(severity) = Severity::from_db(&severity) else {
                tracing::warn!(name = %name, severity = %severity, "skipping pattern with unknown severity");
                continue;
            };
            let regex = match Regex::new(&pattern) {
                Ok(regex) => regex,
                Err(err) => {
                    tracing::warn!(name = %name, error = %err, "skipping invalid spam pattern");
                    continue;
                }
            };
            patterns.push(CompiledPattern {
                name,
                regex,
                severity,
            });
        }

        Ok(SpamConfig { keywords, patterns })
    }

    // ------------------------------------------------------------------
    // Configuration management (admin surface)
    // ------------------------------------------------------------------

    pub async fn list_keywords(&self) -> Result<Vec<SpamKeyword>> {
        let rows = sqlx::query(
            "SELECT id, keyword, severity, is_active, created_at \
             FROM spam_keywords ORDER BY created_at DESC",
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| {
                let severity: String = row.get("severity");
                let severity = Severity::from_db(&severity)
                    .ok_or_else(|| anyhow::anyhow!("unknown severity: {}", severity))?;
                Ok(SpamKeyword {
                    id: row.get("id"),
                    keyword: row.get("keyword"),
                    severity,
                    is_active: row.get("is_active"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    pub async fn add_keyword(&self, keyword: String, severity: Severity) -> Result<SpamKeyword> {
        let row = sqlx::query(
            "INSERT INTO spam_keywords (keyword, severity) VALUES ($1, $2) \
             RETURNING id, keyword, severity, is_active, created_at",
        )
        .bind(&keyword)
        .bind(severity.as_db())
        .fetch_one(self.db.pool())
        .await?;

        self.cache.invalidate();
        Ok(SpamKeyword {
            id: row.get("id"),
            keyword: row.get("keyword"),
            severity,
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        })
    }

    pub async fn deactivate_keyword(&self, keyword_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("UPDATE spam_keywords SET is_active = false WHERE id = $1 AND is_active")
                .bind(keyword_id)
                .execute(self.db.pool())
                .await?;
        if result.rows_affected() > 0 {
            self.cache.invalidate();
        }
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_patterns(&self) -> Result<Vec<SpamPattern>> {
        let rows = sqlx::query(
            "SELECT id, name, pattern, severity, is_active, created_at \
             FROM spam_patterns ORDER BY created_at DESC",
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| {
                let severity: String = row.get("severity");
                let severity = Severity::from_db(&severity)
                    .ok_or_else(|| anyhow::anyhow!("unknown severity: {}", severity))?;
                Ok(SpamPattern {
                    id: row.get("id"),
                    name: row.get("name"),
                    pattern: row.get("pattern"),
                    severity,
                    is_active: row.get("is_active"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    pub async fn add_pattern(
        &self,
        name: String,
        pattern: String,
        severity: Severity,
    ) -> Result<SpamPattern> {
        // Reject unparseable patterns up front instead of skipping them at
        // load time.
        Regex::new(&pattern).map_err(|err| anyhow::anyhow!("invalid pattern: {}", err))?;

        let row = sqlx::query(
            "INSERT INTO spam_patterns (name, pattern, severity) VALUES ($1, $2, $3) \
             RETURNING id, name, pattern, severity, is_active, created_at",
        )
        .bind(&name)
        .bind(&pattern)
        .bind(severity.as_db())
        .fetch_one(self.db.pool())
        .await?;

        self.cache.invalidate();
        Ok(SpamPattern {
            id: row.get("id"),
            name: row.get("name"),
            pattern: row.get("pattern"),
            severity,
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        })
    }

    pub async fn deactivate_pattern(&self, pattern_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("UPDATE spam_patterns SET is_active = false WHERE id = $1 AND is_active")
                .bind(pattern_id)
                .execute(self.db.pool())
                .await?;
        if result.rows_affected() > 0 {
            self.cache.invalidate();
        }
        Ok(result.rows_affected() > 0)
    }
}

/// Rule evaluation, first decisive match wins. A non-high keyword match is
/// remembered and only returned if no later rule fires.
pub fn evaluate(content: &str, config: &SpamConfig) -> SpamCheckResult {
    let lowered = content.to_lowercase();

    let mut deferred: Option<SpamCheckResult> = None;
    for entry in &config.keywords {
        if lowered.contains(&entry.keyword) {
            let score = match entry.severity {
                Severity::High => KEYWORD_SCORE_HIGH,
                Severity::Medium => KEYWORD_SCORE_MEDIUM,
                Severity::Low => KEYWORD_SCORE_LOW,
            };
            let result = SpamCheckResult::flagged(
                format!("Contains blocked keyword: {}", entry.keyword),
                entry.severity,
                score,
            );
            if entry.severity == Severity::High {
                return result;
            }
            if deferred.is_none() {
                deferred = Some(result);
            }
        }
    }

    for entry in &config.patterns {
        if entry.regex.is_match(content) {
            let score = match entry.severity {
                Severity::High => PATTERN_SCORE_HIGH,
                Severity::Medium => PATTERN_SCORE_MEDIUM,
                Severity::Low => PATTERN_SCORE_LOW,
            };
            return SpamCheckResult::flagged(
                format!("Matches spam pattern: {}", entry.name),
                entry.severity,
                score,
            );
        }
    }

    if link_regex().find_iter(content).count() > MAX_LINKS {
        return SpamCheckResult::flagged(
            "Too many links in message",
            Severity::High,
            LINK_FLOOD_SCORE,
        );
    }

    if has_repeated_char_run(content) {
        return SpamCheckResult::flagged(
            "Contains repetitive patterns",
            Severity::Medium,
            REPEATED_CHAR_SCORE,
        );
    }
    if has_repeated_word(&lowered) {
        return SpamCheckResult::flagged(
            "Contains repetitive patterns",
            Severity::Low,
            REPEATED_WORD_SCORE,
        );
    }

    if content.chars().count() >= CAPS_MIN_LENGTH {
        let letters = content.chars().filter(|c| c.is_alphabetic()).count();
        let uppercase = content.chars().filter(|c| c.is_uppercase()).count();
        if letters > 0 && uppercase as f64 / letters as f64 > CAPS_RATIO {
            return SpamCheckResult::flagged(
                "Excessive capital letters",
                Severity::Low,
                CAPS_SCORE,
            );
        }
    }

    deferred.unwrap_or_else(SpamCheckResult::clean)
}

fn has_repeated_char_run(content: &str) -> bool {
    let mut previous: Option<char> = None;
    let mut run = 0usize;
    for c in content.chars() {
        if Some(c) == previous {
            run += 1;
            if run >= REPEATED_CHAR_RUN {
                return true;
            }
        } else {
            previous = Some(c);
            run = 1;
        }
    }
    false
}

fn has_repeated_word(lowered: &str) -> bool {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in lowered.split_whitespace() {
        if word.chars().count() < REPEATED_WORD_MIN_LEN {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        *count += 1;
        if *count >= REPEATED_WORD_COUNT {
            return true;
        }
    }
    false
}
