//! EMA-smoothed average true range.
//!
//! The host platform used to supply this as a built-in indicator; the
//! absorption detector needs it to size the allowed cluster spread, so the
//! crate computes it from bar history directly.

/// EMA ATR over `(high, low, close)` bars in chronological order.
///
/// Returns `None` until at least `period` bars are available — the absorption
/// detector skips its cycle rather than working from a half-warmed value.
pub fn ema_atr(bars: impl IntoIterator<Item = (f64, f64, f64)>, period: usize) -> Option<f64> {
    if period == 0 {
        return None;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev_close: Option<f64> = None;
    let mut atr: Option<f64> = None;
    let mut seen = 0usize;

    for (high, low, close) in bars {
        let tr = match prev_close {
            Some(pc) => (high - low).max((high - pc).abs()).max((low - pc).abs()),
            // First bar has no prior close; its range is the true range
            None => high - low,
        };

        atr = Some(match atr {
            Some(prev) => alpha * tr + (1.0 - alpha) * prev,
            None => tr,
        });
        prev_close = Some(close);
        seen += 1;
    }

    if seen < period { None } else { atr }
}
