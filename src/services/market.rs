use crate::models::CoinMarket;
use std::cmp::Ordering;

/// Sort keys accepted by the listing endpoint. Unknown values fall back to
/// sorting by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Price,
    MarketCap,
    Volume,
}

impl SortKey {
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "price" => SortKey::Price,
            "marketcap" | "market_cap" => SortKey::MarketCap,
            "volume" => SortKey::Volume,
            _ => SortKey::Name,
        }
    }
}

/// Case-insensitive substring filter over symbol and name.
pub fn filter_markets(data: Vec<CoinMarket>, filter: &str) -> Vec<CoinMarket> {
    if filter.is_empty() {
        return data;
    }

    let needle = filter.to_lowercase();
    data.into_iter()
        .filter(|coin| {
            coin.symbol.to_lowercase().contains(&needle)
                || coin.name.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Sort the listing: name ascending, numeric keys descending (largest first).
pub fn sort_markets(mut data: Vec<CoinMarket>, key: SortKey) -> Vec<CoinMarket> {
    match key {
        SortKey::Name => data.sort_by(|a, b| a.name.cmp(&b.name)),
        SortKey::Price => data.sort_by(|a, b| desc(a.price, b.price)),
        SortKey::MarketCap => data.sort_by(|a, b| desc(a.market_cap, b.market_cap)),
        SortKey::Volume => data.sort_by(|a, b| desc(a.volume_24h, b.volume_24h)),
    }
    data
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Skip/take pagination; pages are 1-based. The offset saturates so an
/// absurd page number yields an empty page instead of overflowing.
pub fn paginate(data: Vec<CoinMarket>, page: usize, limit: usize) -> Vec<CoinMarket> {
    let offset = page.saturating_sub(1).saturating_mul(limit);
    data.into_iter().skip(offset).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn coin(symbol: &str, name: &str, price: f64, market_cap: f64, volume: f64) -> CoinMarket {
        CoinMarket {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price,
            market_cap,
            volume_24h: volume,
            updated_at: Utc::now(),
        }
    }

    fn sample() -> Vec<CoinMarket> {
        vec![
            coin("BTC", "Bitcoin", 95000.0, 1.9e12, 4.0e10),
            coin("ETH", "Ethereum", 3300.0, 4.0e11, 2.0e10),
            coin("DOGE", "Dogecoin", 0.32, 4.7e10, 3.0e9),
        ]
    }

    #[test]
    fn filter_matches_symbol_or_name_case_insensitively() {
        let hits = filter_markets(sample(), "bit");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol, "BTC");

        let hits = filter_markets(sample(), "doge");
        assert_eq!(hits.len(), 1);

        assert_eq!(filter_markets(sample(), "").len(), 3);
    }

    #[test]
    fn sort_by_name_is_ascending() {
        let sorted = sort_markets(sample(), SortKey::Name);
        let names: Vec<_> = sorted.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bitcoin", "Dogecoin", "Ethereum"]);
    }

    #[test]
    fn numeric_sorts_are_descending() {
        let sorted = sort_markets(sample(), SortKey::Price);
        assert_eq!(sorted[0].symbol, "BTC");
        assert_eq!(sorted[2].symbol, "DOGE");

        let sorted = sort_markets(sample(), SortKey::Volume);
        assert_eq!(sorted[0].symbol, "BTC");
    }

    #[test]
    fn unknown_sort_key_falls_back_to_name() {
        assert_eq!(SortKey::parse("bogus"), SortKey::Name);
        assert_eq!(SortKey::parse("MarketCap"), SortKey::MarketCap);
    }

    #[test]
    fn paginate_is_one_based_skip_take() {
        let page1 = paginate(sample(), 1, 2);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].symbol, "BTC");

        let page2 = paginate(sample(), 2, 2);
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].symbol, "DOGE");

        // Page 0 is clamped to the first page.
        assert_eq!(paginate(sample(), 0, 2)[0].symbol, "BTC");

        assert!(paginate(sample(), 3, 2).is_empty());
    }

    #[test]
    fn paginate_saturates_on_huge_page_numbers() {
        // A query-supplied page at the integer ceiling must not overflow
        // the skip offset.
        assert!(paginate(sample(), usize::MAX, usize::MAX).is_empty());
        assert!(paginate(sample(), usize::MAX, 2).is_empty());
    }
}
