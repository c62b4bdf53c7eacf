use serde::Deserialize;

use crate::utils::format::signed_yen;

/// One reported play session as the client sends it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecord {
    pub machine: String,
    pub in_amount: i64,
    pub out_amount: i64,
    pub memo: String,
}

impl SessionRecord {
    pub fn new(
        machine: Option<String>,
        in_amount: Option<i64>,
        out_amount: Option<i64>,
        memo: Option<String>,
    ) -> Self {
        SessionRecord {
            machine: machine.unwrap_or_default().trim().to_string(),
            in_amount: in_amount.unwrap_or(0),
            out_amount: out_amount.unwrap_or(0),
            memo: memo.unwrap_or_default().trim().to_string(),
        }
    }

    pub fn balance(&self) -> i64 {
        self.out_amount.saturating_sub(self.in_amount)
    }

    pub fn balance_text(&self) -> String {
        signed_yen(self.balance())
    }

    pub fn machine_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.machine.is_empty() {
            fallback
        } else {
            &self.machine
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlogStyle {
    #[default]
    Polite,
    Casual,
    Live,
}

impl BlogStyle {
    /// Exact-match lookup; anything unrecognized writes politely.
    pub fn from_selector(selector: Option<&str>) -> Self {
        match selector {
            Some("polite") => BlogStyle::Polite,
            Some("casual") => BlogStyle::Casual,
            Some("live") => BlogStyle::Live,
            _ => BlogStyle::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlogStyle::Polite => "polite",
            BlogStyle::Casual => "casual",
            BlogStyle::Live => "live",
        }
    }
}

/// Aggregates the client keeps for the machine being analysed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct MachineStats {
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub wins: Option<u32>,
    #[serde(default, rename = "totalBalance")]
    pub total_balance: Option<i64>,
}

impl MachineStats {
    /// `{}` from the client carries no history at all.
    pub fn is_empty(&self) -> bool {
        self.count.is_none() && self.wins.is_none() && self.total_balance.is_none()
    }

    pub fn count(&self) -> u32 {
        self.count.unwrap_or(0)
    }

    pub fn total_balance(&self) -> i64 {
        self.total_balance.unwrap_or(0)
    }

    /// Win percentage rounded the way the web client's `Math.round` does
    /// (1 of 8 is 13); 0 when nothing has been played.
    pub fn win_rate(&self) -> u32 {
        let count = self.count();
        if count == 0 {
            return 0;
        }
        let wins = self.wins.unwrap_or(0);
        (f64::from(wins) / f64::from(count) * 100.0).round() as u32
    }
}
