use serde::{ Deserialize, Serialize };

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingEntry {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub current_price: f64,
    pub price_change_24h: f64,
    /// Only drives the entrance animation; never affects order or selection.
    pub is_new: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

impl TrendingEntry {
    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }

    pub fn trend(&self) -> Trend {
        if self.price_change_24h >= 0.0 { Trend::Up } else { Trend::Down }
    }
}

/// Price with precision scaled to magnitude: six decimals under one cent,
/// four under one unit, two otherwise.
pub fn format_price(price: f64) -> String {
    if price < 0.01 {
        format!("{:.6}", price)
    } else if price < 1.0 {
        format!("{:.4}", price)
    } else {
        format!("{:.2}", price)
    }
}

pub fn format_change(change: f64) -> String {
    format!("{:.2}%", change)
}

/// Thousands-separated dollar amount without fractional digits, e.g. `$1,234,567`.
pub fn format_usd(amount: f64) -> String {
    let whole = amount.abs().round() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Entry as served to the UI, with the display strings precomputed.
#[derive(Debug, Clone, Serialize)]
pub struct TrendingView {
    #[serde(flatten)]
    pub entry: TrendingEntry,
    pub display_symbol: String,
    pub price_display: String,
    pub change_display: String,
    pub trend: Trend,
}

impl From<&TrendingEntry> for TrendingView {
    fn from(entry: &TrendingEntry) -> Self {
        Self {
            display_symbol: entry.display_symbol(),
            price_display: format_price(entry.current_price),
            change_display: format_change(entry.price_change_24h),
            trend: entry.trend(),
            entry: entry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, price: f64, change: f64) -> TrendingEntry {
        TrendingEntry {
            id: id.to_string(),
            name: id.to_string(),
            symbol: "wif".to_string(),
            image: String::new(),
            current_price: price,
            price_change_24h: change,
            is_new: true,
        }
    }

    #[test]
    fn sub_cent_price_uses_six_decimals() {
        let e = entry("dogwifhat", 0.002345, 12.4);
        let view = TrendingView::from(&e);
        assert_eq!(view.price_display, "0.002345");
        assert_eq!(view.change_display, "12.40%");
        assert_eq!(view.trend, Trend::Up);
        assert_eq!(view.display_symbol, "WIF");
    }

    #[test]
    fn price_precision_tiers() {
        assert_eq!(format_price(0.5), "0.5000");
        assert_eq!(format_price(0.01), "0.0100");
        assert_eq!(format_price(1.0), "1.00");
        assert_eq!(format_price(1234.567), "1234.57");
    }

    #[test]
    fn negative_change_trends_down() {
        let e = entry("pepe", 0.00001, -3.456);
        assert_eq!(e.trend(), Trend::Down);
        assert_eq!(format_change(e.price_change_24h), "-3.46%");
    }

    #[test]
    fn usd_grouping() {
        assert_eq!(format_usd(1234567.0), "$1,234,567");
        assert_eq!(format_usd(999.0), "$999");
        assert_eq!(format_usd(1000.0), "$1,000");
        assert_eq!(format_usd(0.0), "$0");
    }
}
