//! Affinity change protection.
//!
//! Every suggested affinity delta passes through an [`AffinityProtector`]
//! before it touches a relationship. The protector bounds single changes,
//! dampens bursts, scales by score zone, and keeps the result inside the
//! legal score range. It never flips the sign of a change.
//!
//! Protectors hold a short ring buffer of recent changes, so they are scoped
//! per relationship through a [`ProtectorRegistry`]. The buffer lives in
//! process memory and starts empty after a restart.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use affinity_config::ProtectorConfig;
use affinity_core::level::{MAX_SCORE, MIN_SCORE};
use affinity_core::relationship::RelationshipKey;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Interaction counts that pay a one-time bonus, with the bonus.
pub const MILESTONES: [(u64, i32); 5] = [(10, 5), (50, 10), (100, 20), (200, 30), (500, 50)];

/// Why a change was adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionReason {
    Normal,
    RapidChangeProtection,
    LowScoreRecovery,
    LowScoreProtection,
    HighScoreDeceleration,
    Acceleration,
    AbsoluteMinBoundary,
    AbsoluteMaxBoundary,
}

impl ProtectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectionReason::Normal => "normal",
            ProtectionReason::RapidChangeProtection => "rapid_change_protection",
            ProtectionReason::LowScoreRecovery => "low_score_recovery",
            ProtectionReason::LowScoreProtection => "low_score_protection",
            ProtectionReason::HighScoreDeceleration => "high_score_deceleration",
            ProtectionReason::Acceleration => "acceleration",
            ProtectionReason::AbsoluteMinBoundary => "absolute_min_boundary",
            ProtectionReason::AbsoluteMaxBoundary => "absolute_max_boundary",
        }
    }
}

/// Outcome of protecting one change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionResult {
    pub original_change: i32,
    pub adjusted_change: i32,
    /// Zone multiplier that was applied (1.0 when none)
    pub applied_rate: f64,
    pub reason: ProtectionReason,
    pub warnings: Vec<String>,
}

/// Direction of recent changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Stable,
    Rising,
    Falling,
    Volatile,
}

/// Totals over the buffered changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub count: usize,
    pub total_increase: i32,
    /// Sum of the negative changes, as a positive number
    pub total_decrease: i32,
    pub net_change: i32,
}

#[derive(Debug, Clone)]
struct ChangeEntry {
    at: Instant,
    delta: i32,
}

/// Bounds and smooths affinity changes for one relationship.
#[derive(Debug, Clone)]
pub struct AffinityProtector {
    config: ProtectorConfig,
    history: VecDeque<ChangeEntry>,
}

impl AffinityProtector {
    pub fn new(config: ProtectorConfig) -> Self {
        let capacity = config.history_capacity.max(1);
        Self {
            config,
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// Adjust `raw_delta` for a relationship currently at `current_score`
    /// and record the adjusted change.
    pub fn protect(&mut self, current_score: i32, raw_delta: i32, reason: &str) -> ProtectionResult {
        let cfg = &self.config;
        // Configured bounds never widen the score scale.
        let floor = cfg.safe_min.max(MIN_SCORE);
        let ceiling = cfg.safe_max.min(MAX_SCORE).max(floor);
        let current = current_score.clamp(floor, ceiling);
        let mut warnings = Vec::new();
        let mut reason_tag = ProtectionReason::Normal;
        let mut applied_rate = 1.0;

        // 1. Single-change envelope
        let mut delta = raw_delta.clamp(-cfg.max_decrease, cfg.max_increase);
        if delta != raw_delta {
            warnings.push(format!("Change of {raw_delta} exceeds the per-turn limit, capped at {delta}"));
        }

        // 2. Burst dampening
        let recent = self.recent_volatility();
        if recent > cfg.rapid_threshold {
            delta /= 2;
            reason_tag = ProtectionReason::RapidChangeProtection;
            warnings.push(format!("Rapid changes detected ({recent} in window), change halved"));
        }

        // 3. Zone multiplier
        let zone = if current < cfg.low_score_threshold {
            if delta > 0 {
                Some((cfg.low_score_recovery, ProtectionReason::LowScoreRecovery))
            } else if delta < 0 {
                warnings.push("Affinity is low, negative change softened".into());
                Some((cfg.low_score_protection, ProtectionReason::LowScoreProtection))
            } else {
                None
            }
        } else if current > cfg.high_score_threshold {
            if delta > 0 {
                warnings.push("Affinity is already high, growth slowed".into());
                Some((cfg.high_score_deceleration, ProtectionReason::HighScoreDeceleration))
            } else {
                None
            }
        } else if current < cfg.acceleration_ceiling && delta > 0 {
            Some((cfg.acceleration, ProtectionReason::Acceleration))
        } else {
            None
        };

        if let Some((rate, zone_reason)) = zone {
            let rate = rate.max(0.0);
            applied_rate = rate;
            delta = (f64::from(delta) * rate).trunc() as i32;
            if reason_tag == ProtectionReason::Normal {
                reason_tag = zone_reason;
            }
        }

        // 4. Absolute bounds
        let target = current + delta;
        if target < floor {
            delta = floor - current;
            reason_tag = ProtectionReason::AbsoluteMinBoundary;
            warnings.push("Affinity reached its minimum".into());
        } else if target > ceiling {
            delta = ceiling - current;
            reason_tag = ProtectionReason::AbsoluteMaxBoundary;
            warnings.push("Affinity reached its maximum".into());
        }

        self.record(delta);

        debug!(
            cause = reason,
            current,
            raw_delta,
            adjusted = delta,
            reason = reason_tag.as_str(),
            "Protected affinity change"
        );

        ProtectionResult {
            original_change: raw_delta,
            adjusted_change: delta,
            applied_rate,
            reason: reason_tag,
            warnings,
        }
    }

    /// Sum of |delta| inside the rapid-change window. Zero until at least
    /// two changes are buffered.
    fn recent_volatility(&self) -> i32 {
        if self.history.len() < 2 {
            return 0;
        }
        let window = Duration::from_secs(self.config.rapid_window_secs);
        let now = Instant::now();
        self.history
            .iter()
            .filter(|e| now.saturating_duration_since(e.at) < window)
            .map(|e| e.delta.abs())
            .sum()
    }

    fn record(&mut self, delta: i32) {
        self.history.push_back(ChangeEntry {
            at: Instant::now(),
            delta,
        });
        while self.history.len() > self.config.history_capacity.max(1) {
            self.history.pop_front();
        }
    }

    /// Trend over the last `window` changes.
    pub fn recent_trend(&self, window: usize) -> Trend {
        if window == 0 || self.history.len() < window {
            return Trend::Stable;
        }
        let recent = self.history.iter().skip(self.history.len() - window);
        let (net, volatility) = recent.fold((0, 0), |(net, vol), e| (net + e.delta, vol + e.delta.abs()));

        if volatility > 50 {
            Trend::Volatile
        } else if net > 10 {
            Trend::Rising
        } else if net < -10 {
            Trend::Falling
        } else {
            Trend::Stable
        }
    }

    pub fn recovery_suggestion(&self, score: i32) -> Option<&'static str> {
        recovery_suggestion(&self.config, score)
    }

    pub fn history_summary(&self) -> HistorySummary {
        self.history.iter().fold(
            HistorySummary {
                count: self.history.len(),
                ..Default::default()
            },
            |mut s, e| {
                if e.delta > 0 {
                    s.total_increase += e.delta;
                } else {
                    s.total_decrease -= e.delta;
                }
                s.net_change += e.delta;
                s
            },
        )
    }
}

/// A hint for scores outside the comfortable middle range.
pub fn recovery_suggestion(config: &ProtectorConfig, score: i32) -> Option<&'static str> {
    if score < config.low_score_threshold {
        Some("Affinity is low; warm interaction and sharing will rebuild it")
    } else if score < config.acceleration_ceiling {
        Some("The relationship is still young; steady friendly interaction grows it quickly")
    } else if score > config.high_score_threshold {
        Some("Affinity is very high; focus on keeping the relationship deep and genuine")
    } else {
        None
    }
}

/// Bonus for every milestone crossed going from `previous` to `current`
/// interactions.
pub fn milestone_bonus(previous: u64, current: u64) -> i32 {
    MILESTONES
        .iter()
        .filter(|(at, _)| previous < *at && *at <= current)
        .map(|(_, bonus)| bonus)
        .sum()
}

/// Per-relationship protectors, created on first use.
pub struct ProtectorRegistry {
    config: ProtectorConfig,
    protectors: Mutex<HashMap<RelationshipKey, AffinityProtector>>,
}

impl ProtectorRegistry {
    pub fn new(config: ProtectorConfig) -> Self {
        Self {
            config,
            protectors: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ProtectorConfig {
        &self.config
    }

    /// Protect a change for `key`, returning the result and the trend after it.
    pub async fn protect(
        &self,
        key: &RelationshipKey,
        current_score: i32,
        raw_delta: i32,
        reason: &str,
    ) -> (ProtectionResult, Trend) {
        let mut protectors = self.protectors.lock().await;
        let protector = protectors
            .entry(key.clone())
            .or_insert_with(|| AffinityProtector::new(self.config.clone()));
        let result = protector.protect(current_score, raw_delta, reason);
        (result, protector.recent_trend(5))
    }

    pub async fn history_summary(&self, key: &RelationshipKey) -> HistorySummary {
        self.protectors
            .lock()
            .await
            .get(key)
            .map(AffinityProtector::history_summary)
            .unwrap_or_default()
    }

    pub fn recovery_suggestion(&self, score: i32) -> Option<&'static str> {
        recovery_suggestion(&self.config, score)
    }
}

impl Default for ProtectorRegistry {
    fn default() -> Self {
        Self::new(ProtectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protector() -> AffinityProtector {
        AffinityProtector::new(ProtectorConfig::default())
    }

    #[test]
    fn early_positive_change_is_accelerated() {
        let r = protector().protect(90, 40, "positive_sharing");
        assert_eq!(r.adjusted_change, 52);
        assert_eq!(r.reason, ProtectionReason::Acceleration);
        assert!((r.applied_rate - 1.3).abs() < f64::EPSILON);
    }

    #[test]
    fn large_decrease_is_capped() {
        let r = protector().protect(500, -80, "negative_complaint");
        assert_eq!(r.original_change, -80);
        assert_eq!(r.adjusted_change, -30);
        assert_eq!(r.reason, ProtectionReason::Normal);
        assert_eq!(r.warnings.len(), 1);
    }

    #[test]
    fn high_score_growth_is_slowed() {
        let r = protector().protect(960, 30, "romantic_confession");
        assert_eq!(r.adjusted_change, 21);
        assert_eq!(r.reason, ProtectionReason::HighScoreDeceleration);
    }

    #[test]
    fn low_score_zone() {
        let up = protector().protect(20, 10, "");
        assert_eq!(up.adjusted_change, 12);
        assert_eq!(up.reason, ProtectionReason::LowScoreRecovery);

        let down = protector().protect(40, -20, "");
        assert_eq!(down.adjusted_change, -8);
        assert_eq!(down.reason, ProtectionReason::LowScoreProtection);
    }

    #[test]
    fn boundaries_clamp_without_flipping_sign() {
        let top = protector().protect(990, 50, "");
        assert_eq!(top.adjusted_change, 10);
        assert_eq!(top.reason, ProtectionReason::AbsoluteMaxBoundary);

        let bottom = protector().protect(5, -30, "");
        assert_eq!(bottom.adjusted_change, -5);
        assert_eq!(bottom.reason, ProtectionReason::AbsoluteMinBoundary);

        let at_max = protector().protect(1000, 20, "");
        assert_eq!(at_max.adjusted_change, 0);
    }

    #[test]
    fn configured_bounds_cannot_leave_score_scale() {
        let wide = ProtectorConfig {
            safe_min: -100,
            safe_max: 1200,
            ..ProtectorConfig::default()
        };

        let top = AffinityProtector::new(wide.clone()).protect(990, 35, "");
        assert_eq!(top.adjusted_change, 10);
        assert_eq!(top.reason, ProtectionReason::AbsoluteMaxBoundary);

        let bottom = AffinityProtector::new(wide).protect(10, -30, "");
        assert_eq!(bottom.adjusted_change, -10);
        assert_eq!(bottom.reason, ProtectionReason::AbsoluteMinBoundary);

        let narrow = ProtectorConfig {
            safe_max: 800,
            ..ProtectorConfig::default()
        };
        let capped = AffinityProtector::new(narrow).protect(790, 30, "");
        assert_eq!(capped.adjusted_change, 10);
    }

    #[test]
    fn zero_change_stays_zero() {
        for score in [0, 30, 90, 500, 960, 1000] {
            let r = protector().protect(score, 0, "");
            assert_eq!(r.adjusted_change, 0, "score {score}");
        }
    }

    #[test]
    fn result_always_in_range_and_sign_preserved() {
        for score in (0..=1000).step_by(7) {
            for raw in (-100..=100).step_by(13) {
                let r = protector().protect(score, raw, "");
                let next = score + r.adjusted_change;
                assert!((0..=1000).contains(&next), "score {score} raw {raw} -> {next}");
                assert!(r.adjusted_change.signum() * raw.signum() >= 0, "sign flipped for {score}/{raw}");
            }
        }
    }

    #[test]
    fn rapid_changes_are_halved() {
        let mut p = protector();
        assert_eq!(p.protect(300, 50, "").adjusted_change, 50);
        assert_eq!(p.protect(350, 50, "").adjusted_change, 50);
        // Window sum is exactly the threshold, not above it
        assert_eq!(p.protect(400, 50, "").adjusted_change, 50);

        let r = p.protect(450, 50, "");
        assert_eq!(r.adjusted_change, 25);
        assert_eq!(r.reason, ProtectionReason::RapidChangeProtection);
    }

    #[test]
    fn rapid_reason_is_not_replaced_by_zone() {
        let mut p = protector();
        for _ in 0..3 {
            p.protect(300, 50, "");
        }
        let r = p.protect(100, 40, "");
        assert_eq!(r.adjusted_change, 26);
        assert_eq!(r.reason, ProtectionReason::RapidChangeProtection);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_window_expires() {
        let mut p = protector();
        for _ in 0..3 {
            p.protect(300, 50, "");
        }
        tokio::time::advance(Duration::from_secs(301)).await;
        let r = p.protect(450, 50, "");
        assert_eq!(r.adjusted_change, 50);
        assert_eq!(r.reason, ProtectionReason::Normal);
    }

    #[test]
    fn ring_buffer_is_bounded() {
        let mut p = protector();
        for i in 0..25 {
            p.protect(500, 1, &format!("turn {i}"));
        }
        let summary = p.history_summary();
        assert_eq!(summary.count, 20);
        assert_eq!(summary.net_change, 20);
    }

    #[test]
    fn trend_classification() {
        let mut p = protector();
        assert_eq!(p.recent_trend(5), Trend::Stable);
        for _ in 0..5 {
            p.protect(500, 5, "");
        }
        assert_eq!(p.recent_trend(5), Trend::Rising);

        let mut p = protector();
        for _ in 0..5 {
            p.protect(500, -4, "");
        }
        assert_eq!(p.recent_trend(5), Trend::Falling);

        let mut p = protector();
        for d in [20, -20, 20, -20, 20] {
            p.protect(500, d, "");
        }
        assert_eq!(p.recent_trend(5), Trend::Volatile);
    }

    #[test]
    fn summary_totals() {
        let mut p = protector();
        p.protect(500, 10, "");
        p.protect(500, -4, "");
        p.protect(500, 6, "");
        let s = p.history_summary();
        assert_eq!(s.count, 3);
        assert_eq!(s.total_increase, 16);
        assert_eq!(s.total_decrease, 4);
        assert_eq!(s.net_change, 12);
    }

    #[test]
    fn recovery_suggestions_by_zone() {
        let p = protector();
        assert!(p.recovery_suggestion(30).is_some());
        assert!(p.recovery_suggestion(200).is_some());
        assert!(p.recovery_suggestion(500).is_none());
        assert!(p.recovery_suggestion(980).is_some());
    }

    #[test]
    fn milestones_pay_once_when_crossed() {
        assert_eq!(milestone_bonus(9, 10), 5);
        assert_eq!(milestone_bonus(10, 11), 0);
        assert_eq!(milestone_bonus(49, 50), 10);
        assert_eq!(milestone_bonus(0, 1), 0);
        assert_eq!(milestone_bonus(0, 600), 115);
    }

    #[test]
    fn reason_serializes_snake_case() {
        let json = serde_json::to_string(&ProtectionReason::RapidChangeProtection).unwrap();
        assert_eq!(json, "\"rapid_change_protection\"");
    }

    #[tokio::test]
    async fn registry_scopes_history_per_relationship() {
        let registry = ProtectorRegistry::default();
        let a = RelationshipKey::new("u1", "c1");
        let b = RelationshipKey::new("u2", "c1");

        for _ in 0..3 {
            registry.protect(&a, 300, 50, "").await;
        }
        let (hot, _) = registry.protect(&a, 450, 50, "").await;
        assert_eq!(hot.reason, ProtectionReason::RapidChangeProtection);

        let (cold, trend) = registry.protect(&b, 450, 50, "").await;
        assert_eq!(cold.adjusted_change, 50);
        assert_eq!(trend, Trend::Stable);
        assert_eq!(registry.history_summary(&b).await.count, 1);
    }
}
