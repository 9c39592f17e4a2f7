//! Notification digest
//!
//! Groups a run's observations per product, attaches a day-over-day delta
//! versus the previous calendar day's stored observation for the same
//! (identifier, category) pair, renders one block per product, and delivers
//! the digest best-effort. Delivery failures are logged, never raised.

use crate::services::slack::NotificationChannel;
use chrono::{Days, NaiveDate};
use rankwatch_common::{CategoryId, RankObservation};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Display-only tier badge from fixed thresholds
pub fn tier_badge(rank: u32) -> Option<&'static str> {
    match rank {
        1..=10 => Some("Top 10"),
        11..=50 => Some("Top 50"),
        51..=100 => Some("Top 100"),
        _ => None,
    }
}

/// Day-over-day movement, computed as `previous_rank - current_rank`
/// (positive = improved, the item moved up the list)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankDelta {
    Improved(u32),
    Dropped(u32),
    Unchanged,
}

impl RankDelta {
    fn annotation(&self) -> String {
        match self {
            RankDelta::Improved(n) => format!("▲ improved by {}", n),
            RankDelta::Dropped(n) => format!("▼ dropped by {}", n),
            RankDelta::Unchanged => "— unchanged".to_string(),
        }
    }
}

/// One rendered line of the digest
#[derive(Debug, Clone)]
pub struct DigestLine {
    pub observation: RankObservation,
    pub delta: Option<RankDelta>,
}

/// All of one product's lines, in observation order
#[derive(Debug, Clone)]
pub struct ProductBlock {
    pub asin: String,
    pub title: String,
    pub lines: Vec<DigestLine>,
}

/// Transient per-run digest; grouping preserves first-seen product order
#[derive(Debug, Clone)]
pub struct NotificationDigest {
    pub run_date: NaiveDate,
    pub blocks: Vec<ProductBlock>,
}

impl NotificationDigest {
    /// Build the digest for one run
    ///
    /// `history` is the stored observation log (or a window of it covering
    /// at least the previous calendar day).
    pub fn build(
        run_date: NaiveDate,
        observations: &[RankObservation],
        history: &[RankObservation],
    ) -> Self {
        let mut blocks: Vec<ProductBlock> = Vec::new();

        for obs in observations {
            let delta = compute_delta(obs, history, run_date);
            let line = DigestLine {
                observation: obs.clone(),
                delta,
            };

            match blocks.iter_mut().find(|b| b.asin == obs.asin) {
                Some(block) => block.lines.push(line),
                None => blocks.push(ProductBlock {
                    asin: obs.asin.clone(),
                    title: obs.title.clone(),
                    lines: vec![line],
                }),
            }
        }

        Self { run_date, blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Render the Slack Block Kit payload: one mrkdwn section per product
    pub fn to_slack_payload(&self) -> Value {
        let mut sections = vec![json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "📊 *Best-seller rank digest* ({})",
                    self.run_date.format("%Y-%m-%d")
                ),
            }
        })];

        for block in &self.blocks {
            let mut lines = vec![format!("*{}* (`{}`)", truncate(&block.title, 40), block.asin)];
            for line in &block.lines {
                lines.push(render_line(line));
            }
            sections.push(json!({
                "type": "section",
                "text": { "type": "mrkdwn", "text": lines.join("\n") }
            }));
        }

        json!({ "blocks": sections })
    }
}

/// Most recent prior-day rank for the same (identifier, category) pair
///
/// Only the calendar day immediately before the run counts; older history
/// never produces an annotation.
fn compute_delta(
    obs: &RankObservation,
    history: &[RankObservation],
    run_date: NaiveDate,
) -> Option<RankDelta> {
    let current = obs.rank?;
    let previous_day = run_date.checked_sub_days(Days::new(1))?;
    let previous = prior_rank(history, &obs.asin, obs.category_id, previous_day)?;

    let delta = previous as i64 - current as i64;
    Some(match delta {
        0 => RankDelta::Unchanged,
        d if d > 0 => RankDelta::Improved(d as u32),
        d => RankDelta::Dropped((-d) as u32),
    })
}

fn prior_rank(
    history: &[RankObservation],
    asin: &str,
    category_id: CategoryId,
    day: NaiveDate,
) -> Option<u32> {
    history
        .iter()
        .filter(|h| {
            h.asin == asin
                && h.category_id == category_id
                && h.observed_at.date_naive() == day
        })
        .max_by_key(|h| h.observed_at)?
        .rank
}

fn render_line(line: &DigestLine) -> String {
    let obs = &line.observation;

    let mut text = match obs.rank {
        Some(rank) => {
            let emoji = match rank {
                1 => "🥇",
                2 => "🥈",
                3 => "🥉",
                _ => "📍",
            };
            let mut s = format!("{} *#{}* — {}", emoji, rank, obs.category_name);
            if let Some(badge) = tier_badge(rank) {
                s.push_str(&format!(" [{}]", badge));
            }
            s
        }
        None => format!("❓ *out of range* — {}", obs.category_name),
    };

    if let Some(delta) = line.delta {
        text.push_str(&format!(" ({})", delta.annotation()));
    }

    text
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

/// Deliver the digest; best-effort, never raises
pub async fn notify<C: NotificationChannel>(
    channel: &C,
    observations: &[RankObservation],
    history: &[RankObservation],
    run_date: NaiveDate,
) {
    let digest = NotificationDigest::build(run_date, observations, history);
    if digest.is_empty() {
        info!("No observations this run, skipping notification");
        return;
    }

    match channel.post(&digest.to_slack_payload()).await {
        Ok(()) => info!(products = digest.blocks.len(), "Digest delivered"),
        Err(e) => warn!(error = %e, "Digest delivery failed (ignored)"),
    }
}
