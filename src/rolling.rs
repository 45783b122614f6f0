use std::collections::VecDeque;

/// Outcome of one interval, as retained by the rolling window. All fields
/// are fractional so the entry straddling the window boundary can be
/// proportionally truncated.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub spend: f64,
    pub gmv: f64,
    pub clicks: f64,
    pub orders: f64,
}

impl HistoryEntry {
    /// Scale every field by the retained fraction.
    fn truncated(&self, fraction: f64) -> Self {
        Self {
            spend: self.spend * fraction,
            gmv: self.gmv * fraction,
            clicks: self.clicks * fraction,
            orders: self.orders * fraction,
        }
    }
}

/// Rolling history of recent intervals, bounded by total click count rather
/// than entry count. After every trim the retained clicks are at most the
/// window size, with the oldest retained entry scaled down so the window
/// represents exactly the configured click volume once enough history has
/// accumulated.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    entries: VecDeque<HistoryEntry>,
    window_clicks: f64,
}

impl RollingHistory {
    pub fn new(window_clicks: f64) -> Self {
        Self {
            entries: VecDeque::new(),
            window_clicks,
        }
    }

    pub fn window_clicks(&self) -> f64 {
        self.window_clicks
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Append the newest interval outcome and trim back to the window.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        self.trim();
    }

    /// Walk from the most recent entry backward, accumulating clicks until
    /// the window size is reached; the entry that straddles the boundary is
    /// proportionally scaled and everything older is dropped.
    fn trim(&mut self) {
        let mut accumulated = 0.0;
        let mut keep_from = 0;
        let mut boundary: Option<(usize, f64)> = None;

        for index in (0..self.entries.len()).rev() {
            let clicks = self.entries[index].clicks;
            if accumulated + clicks <= self.window_clicks {
                accumulated += clicks;
                keep_from = index;
            } else {
                let retained = self.window_clicks - accumulated;
                if retained > 0.0 && clicks > 0.0 {
                    boundary = Some((index, retained / clicks));
                    keep_from = index;
                }
                break;
            }
        }

        if let Some((index, fraction)) = boundary {
            self.entries[index] = self.entries[index].truncated(fraction);
        }
        for _ in 0..keep_from {
            self.entries.pop_front();
        }
    }

    pub fn total_clicks(&self) -> f64 {
        self.entries.iter().map(|e| e.clicks).sum()
    }

    pub fn total_spend(&self) -> f64 {
        self.entries.iter().map(|e| e.spend).sum()
    }

    pub fn total_gmv(&self) -> f64 {
        self.entries.iter().map(|e| e.gmv).sum()
    }

    /// Delivered ROI over the retained window: gmv / spend.
    /// None when the window holds no spend, so the caller can hold its
    /// previous value instead of dividing by zero.
    pub fn delivered_roi(&self) -> Option<f64> {
        let spend = self.total_spend();
        if spend > 0.0 {
            Some(self.total_gmv() / spend)
        } else {
            None
        }
    }
}
