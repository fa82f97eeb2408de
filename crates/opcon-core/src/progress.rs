//! Training-progress log parser.
//!
//! A `progress.txt` is a loose CSV of `step,score` lines. Headers, partial
//! writes and junk lines are all expected; anything that does not parse as
//! an integer step and a float score is skipped.

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Derived fields extracted from one progress log.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressSummary {
  /// Step of the last valid line.
  pub last_step:  Option<i64>,
  /// Maximum score over all valid lines.
  pub best_score: Option<f64>,
}

/// Scan `step,score` lines, skipping malformed ones.
pub fn parse_progress(text: &str) -> ProgressSummary {
  let mut summary = ProgressSummary::default();

  for line in text.lines() {
    let Some((step_str, score_str)) = line.split_once(',') else {
      continue;
    };
    let Ok(step) = step_str.trim().parse::<i64>() else {
      continue;
    };
    let Ok(score) = score_str.trim().parse::<f64>() else {
      continue;
    };

    summary.last_step = Some(step);
    summary.best_score = Some(match summary.best_score {
      Some(best) => best.max(score),
      None => score,
    });
  }

  summary
}

// ─── Tests ───────────────────────────────────────────────────────────────────
